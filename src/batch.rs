//! Batch sizing and the fixed pauses API Gateway's control-plane quotas need.

use std::time::Duration;

/// Resources per REST API, minus the root and one reserved segment.
pub const API_GATEWAY_PATH_LIMIT: usize = 300 - 2;
/// Resources each target URL consumes in the generated document.
pub const INTEGRATIONS_PER_URL: usize = 5;

/// CreateRestApi allows one call every 3 seconds.
pub const CREATE_PAUSE: Duration = Duration::from_millis(3500);
pub const MULTI_BATCH_PAUSE: Duration = Duration::from_secs(3);
/// DeleteRestApi allows one call every 30 seconds.
pub const DELETE_RATE_LIMIT_SECS: u64 = 30;
pub const DELETE_PAUSE: Duration = Duration::from_millis(DELETE_RATE_LIMIT_SECS * 1000 + 500);

pub const fn max_urls_per_definition() -> usize {
    API_GATEWAY_PATH_LIMIT / INTEGRATIONS_PER_URL
}

pub fn batch_count(num_urls: usize, max_urls: usize) -> usize {
    num_urls.div_ceil(max_urls)
}

pub fn batches<T>(items: &[T], max_urls: usize) -> Vec<&[T]> {
    items.chunks(max_urls.max(1)).collect()
}

/// `Estimated time: {m}min {s}s` for deleting `count` definitions.
pub fn delete_estimate(count: usize) -> String {
    let seconds = DELETE_RATE_LIMIT_SECS * count.saturating_sub(1) as u64;
    format!("Estimated time: {}min {}s", seconds / 60, seconds % 60)
}

pub trait Pause {
    fn pause(&self, duration: Duration);
}

pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        tracing::info!(seconds = duration.as_secs_f64(), "pausing for rate limit");
        std::thread::sleep(duration);
    }
}

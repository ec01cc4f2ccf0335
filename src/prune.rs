//! Input URL validation and reduction to the set of origins to proxy.

use std::collections::HashSet;
use url::Url;

use crate::error::{GatewayError, PruneError};
use crate::inventory::UrlPair;

pub const DOMAIN_ONLY_NOTE: &str = "NOTE: Currently this only adds domains as targets, not the full path.\n\
For example, creating a proxy to http://example.com/a/b/c will only create a proxy to http://example.com.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pruned {
    pub urls: Vec<String>,
    /// (before, after) when collapsing to origins shrank the list.
    pub merged: Option<(usize, usize)>,
    pub duplicates_dropped: usize,
}

impl Pruned {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn notices(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some((before, after)) = self.merged {
            out.push(format!("Merged {before} urls into {after} domains."));
        }
        if self.duplicates_dropped > 0 {
            out.push(format!(
                "Pruned {} duplicates. => {} domains.",
                self.duplicates_dropped,
                self.urls.len()
            ));
        }
        out
    }
}

/// `host[:port]` as written in the URL, without userinfo.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn port_allowed(port: u16) -> bool {
    port == 80 || port == 443 || port > 1024
}

/// Validates `urls` and collapses them to unique `scheme://host[:port]`
/// origins in first-seen order. With `unique`, origins whose authority
/// already backs a proxy are dropped; `existing` is only called then.
pub fn prune<F>(urls: &[String], existing: F, unique: bool) -> Result<Pruned, PruneError>
where
    F: FnOnce() -> Result<Vec<UrlPair>, GatewayError>,
{
    let missing = urls.iter().filter(|u| !u.contains("://")).count();
    if missing > 0 {
        return Err(PruneError::MissingScheme { count: missing });
    }

    let mut parsed = Vec::with_capacity(urls.len());
    let mut bad_ports = Vec::new();
    for raw in urls {
        let url = Url::parse(raw).map_err(|err| PruneError::Unparseable {
            url: raw.clone(),
            reason: err.to_string(),
        })?;
        let Some(auth) = authority(&url) else {
            return Err(PruneError::Unparseable {
                url: raw.clone(),
                reason: "missing host".to_string(),
            });
        };
        if url.port().is_some_and(|p| !port_allowed(p)) {
            bad_ports.push(raw.clone());
        }
        parsed.push((url.scheme().to_string(), auth));
    }
    if !bad_ports.is_empty() {
        return Err(PruneError::DisallowedPorts { urls: bad_ports });
    }

    let mut seen = HashSet::new();
    let mut origins: Vec<(String, String)> = Vec::new();
    for (scheme, auth) in parsed {
        let origin = format!("{scheme}://{auth}");
        if seen.insert(origin) {
            origins.push((scheme, auth));
        }
    }
    let merged = (origins.len() != urls.len()).then_some((urls.len(), origins.len()));

    let mut duplicates_dropped = 0;
    if unique {
        let existing_hosts: HashSet<String> = existing()?
            .iter()
            .filter_map(|pair| Url::parse(&pair.target_url).ok())
            .filter_map(|url| authority(&url))
            .collect();
        let before = origins.len();
        origins.retain(|(_, auth)| !existing_hosts.contains(auth));
        duplicates_dropped = before - origins.len();
    }

    Ok(Pruned {
        urls: origins
            .into_iter()
            .map(|(scheme, auth)| format!("{scheme}://{auth}"))
            .collect(),
        merged,
        duplicates_dropped,
    })
}

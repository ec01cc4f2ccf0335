use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

/// Environment variables the tool reads. Captured once so nothing below
/// `main` touches the process environment.
const CAPTURED_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
    "AWS_PROFILE",
    "AWS_EC2_METADATA_DISABLED",
];

/// Process-lifetime settings, threaded explicitly through every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials_file: PathBuf,
    pub config_file: PathBuf,
    /// Management API endpoint override; `None` means the regional default.
    pub endpoint_url: Option<String>,
    /// Instance metadata endpoint; `None` disables the instance lookup.
    pub metadata_endpoint: Option<String>,
    pub env: HashMap<String, String>,
}

impl Config {
    pub fn from_env() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let aws_dir = home.join(".aws");

        let credentials_file = env::var_os("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| aws_dir.join("credentials"));
        let config_file = env::var_os("AWS_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| aws_dir.join("config"));

        let captured: HashMap<String, String> = CAPTURED_VARS
            .iter()
            .filter_map(|name| env::var(name).ok().map(|v| (name.to_string(), v)))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let metadata_disabled = captured
            .get("AWS_EC2_METADATA_DISABLED")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let metadata_endpoint = if metadata_disabled {
            None
        } else {
            Some(
                env::var("AWS_EC2_METADATA_SERVICE_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_METADATA_ENDPOINT.to_string()),
            )
        };

        Self {
            credentials_file,
            config_file,
            endpoint_url: env::var("AWS_ENDPOINT_URL_API_GATEWAY").ok(),
            metadata_endpoint,
            env: captured,
        }
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Region from the environment, preferring `AWS_REGION`.
    pub fn env_region(&self) -> Option<&str> {
        self.var("AWS_REGION").or_else(|| self.var("AWS_DEFAULT_REGION"))
    }

    pub fn endpoint_for(&self, region: &str) -> String {
        match &self.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://apigateway.{region}.amazonaws.com"),
        }
    }
}

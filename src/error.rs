use thiserror::Error;

/// Failure of a single call against the API Gateway management API.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("send request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{kind} (http {status}): {message}")]
    Remote {
        status: u16,
        kind: String,
        message: String,
    },
    #[error("decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("sign request: {0}")]
    Signing(String),
    #[error("invalid endpoint {0}")]
    Endpoint(String),
    #[error("{0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        match self {
            GatewayError::NotFound(_) => true,
            GatewayError::Remote { status, .. } => *status == 404,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("{count} URL(s) did not have a scheme. Please specify http:// or https://.")]
    MissingScheme { count: usize },
    #[error("could not parse URL {url}: {reason}")]
    Unparseable { url: String, reason: String },
    #[error("AWS API Gateway require ports to be 80, 443, or above 1024.\n{}", port_preview(.urls))]
    DisallowedPorts { urls: Vec<String> },
    #[error("fetch existing proxies: {0}")]
    Existing(#[from] GatewayError),
}

const PORT_PREVIEW: usize = 8;

fn port_preview(urls: &[String]) -> String {
    let mut out = String::from("Offending URLs:");
    for url in urls.iter().take(PORT_PREVIEW) {
        out.push_str("\n\t");
        out.push_str(url);
    }
    if urls.len() > PORT_PREVIEW {
        out.push_str(&format!("\n\t + {} more URLs", urls.len() - PORT_PREVIEW));
    }
    out
}

/// Where a credential attempt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Profile,
    Environment,
    SharedProfile,
    InstanceMetadata,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CredentialSource::Explicit => "explicit keys",
            CredentialSource::Profile => "named profile",
            CredentialSource::Environment => "environment",
            CredentialSource::SharedProfile => "shared credentials file",
            CredentialSource::InstanceMetadata => "instance metadata",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct AttemptFailure {
    pub source: CredentialSource,
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please provide a region with AWS credentials")]
    MissingRegion,
    #[error("Please create a section for {0} in your ~/.aws/config file")]
    MissingConfigSection(String),
    #[error("Unable to load AWS credentials{}", describe_failures(.0))]
    Exhausted(Vec<AttemptFailure>),
    #[error("write {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("\n  {failure}"))
        .collect()
}

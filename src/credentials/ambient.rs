//! Ambient identity: environment variables, the shared default profile, then
//! EC2 instance metadata (IMDSv2).

use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Credentials, Session};
use crate::config::Config;
use crate::error::{AttemptFailure, CredentialSource};
use crate::profile_store::{ProfileStore, config_section_name};

const TOKEN_TTL_SECONDS: &str = "21600";
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: Option<String>,
}

/// Finds the first available ambient identity. Verification is left to the
/// caller.
pub fn discover(config: &Config, region: Option<&str>) -> Result<Session, AttemptFailure> {
    let profile = config.var("AWS_PROFILE").unwrap_or("default").to_string();
    let shared_region = || {
        ProfileStore::load(&config.config_file)
            .section(&config_section_name(&profile))
            .and_then(|s| s.get("region"))
            .map(str::to_string)
    };
    let region = region
        .map(str::to_string)
        .or_else(|| config.env_region().map(str::to_string))
        .or_else(shared_region);

    if let (Some(key), Some(secret)) = (
        config.var("AWS_ACCESS_KEY_ID"),
        config.var("AWS_SECRET_ACCESS_KEY"),
    ) {
        let credentials = Credentials {
            access_key_id: key.to_string(),
            secret_access_key: secret.to_string(),
            session_token: config.var("AWS_SESSION_TOKEN").map(str::to_string),
        };
        return session(credentials, region, CredentialSource::Environment);
    }

    let shared = ProfileStore::load(&config.credentials_file);
    if let Some(section) = shared.section(&profile) {
        if let (Some(key), Some(secret)) = (
            section.get("aws_access_key_id"),
            section.get("aws_secret_access_key"),
        ) {
            let credentials = Credentials {
                access_key_id: key.to_string(),
                secret_access_key: secret.to_string(),
                session_token: section.get("aws_session_token").map(str::to_string),
            };
            return session(credentials, region, CredentialSource::SharedProfile);
        }
    }

    let Some(endpoint) = &config.metadata_endpoint else {
        return Err(AttemptFailure {
            source: CredentialSource::InstanceMetadata,
            reason: "no credentials in environment or shared files, instance metadata disabled"
                .to_string(),
        });
    };
    let metadata = InstanceMetadata::new(endpoint).map_err(metadata_failure)?;
    let credentials = metadata.credentials()?;
    let region = match region {
        Some(region) => Some(region),
        None => metadata.region().ok(),
    };
    session(credentials, region, CredentialSource::InstanceMetadata)
}

fn session(
    credentials: Credentials,
    region: Option<String>,
    source: CredentialSource,
) -> Result<Session, AttemptFailure> {
    let region = region.ok_or_else(|| AttemptFailure {
        source,
        reason: "no region configured (use --region or AWS_REGION)".to_string(),
    })?;
    Ok(Session {
        credentials,
        region,
        source,
    })
}

fn metadata_failure(err: reqwest::Error) -> AttemptFailure {
    AttemptFailure {
        source: CredentialSource::InstanceMetadata,
        reason: format!("instance metadata unavailable: {err}"),
    }
}

struct InstanceMetadata {
    base: String,
    token: String,
    client: Client,
}

impl InstanceMetadata {
    fn new(endpoint: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(METADATA_TIMEOUT).build()?;
        let base = endpoint.trim_end_matches('/').to_string();
        let token = client
            .put(format!("{base}/latest/api/token"))
            .header("x-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(Self {
            base,
            token,
            client,
        })
    }

    fn get(&self, path: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(format!("{}/latest/{path}", self.base))
            .header("x-aws-ec2-metadata-token", &self.token)
            .send()?
            .error_for_status()?
            .text()
    }

    fn credentials(&self) -> Result<Credentials, AttemptFailure> {
        let roles = self
            .get("meta-data/iam/security-credentials/")
            .map_err(metadata_failure)?;
        let role = roles.lines().next().unwrap_or_default().trim().to_string();
        let raw = self
            .get(&format!("meta-data/iam/security-credentials/{role}"))
            .map_err(metadata_failure)?;
        let parsed: RoleCredentials =
            serde_json::from_str(&raw).map_err(|err| AttemptFailure {
                source: CredentialSource::InstanceMetadata,
                reason: format!("instance role {role} credentials unreadable: {err}"),
            })?;
        tracing::debug!(role = %role, "instance role credentials");
        Ok(Credentials {
            access_key_id: parsed.access_key_id,
            secret_access_key: parsed.secret_access_key,
            session_token: parsed.token,
        })
    }

    fn region(&self) -> Result<String, reqwest::Error> {
        Ok(self.get("meta-data/placement/region")?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn config(credentials: &str, config_body: &str) -> Config {
        let dir = std::env::temp_dir().join(format!("fireprox-ambient-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("credentials"), credentials).unwrap();
        fs::write(dir.join("config"), config_body).unwrap();
        Config {
            credentials_file: dir.join("credentials"),
            config_file: dir.join("config"),
            endpoint_url: None,
            metadata_endpoint: None,
            env: HashMap::new(),
        }
    }

    #[test]
    fn shared_default_profile_with_config_region() {
        let cfg = config(
            "[default]\naws_access_key_id = AKIASHARED\naws_secret_access_key = s\n",
            "[default]\nregion = eu-north-1\n",
        );
        let session = discover(&cfg, None).unwrap();
        assert_eq!(session.source, CredentialSource::SharedProfile);
        assert_eq!(session.credentials.access_key_id, "AKIASHARED");
        assert_eq!(session.region, "eu-north-1");
    }

    #[test]
    fn aws_profile_selects_named_shared_profile() {
        let mut cfg = config(
            "[default]\naws_access_key_id = AKIADEF\naws_secret_access_key = s\n\
             [ops]\naws_access_key_id = AKIAOPS\naws_secret_access_key = s\n",
            "[profile ops]\nregion = us-west-2\n",
        );
        cfg.env.insert("AWS_PROFILE".into(), "ops".into());
        let session = discover(&cfg, None).unwrap();
        assert_eq!(session.credentials.access_key_id, "AKIAOPS");
        assert_eq!(session.region, "us-west-2");
    }

    #[test]
    fn missing_region_is_a_failure() {
        let mut cfg = config("", "");
        cfg.env.insert("AWS_ACCESS_KEY_ID".into(), "AKIA".into());
        cfg.env.insert("AWS_SECRET_ACCESS_KEY".into(), "s".into());
        let failure = discover(&cfg, None).unwrap_err();
        assert_eq!(failure.source, CredentialSource::Environment);
        assert!(failure.reason.contains("no region"));
    }

    #[test]
    fn nothing_available_with_metadata_disabled() {
        let cfg = config("", "");
        let failure = discover(&cfg, Some("us-east-1")).unwrap_err();
        assert_eq!(failure.source, CredentialSource::InstanceMetadata);
    }
}

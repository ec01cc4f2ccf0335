//! Resolves the credentials and region used for every management call.
//!
//! Attempts run in a fixed order (named profile, explicit keys, or the ambient
//! identity when neither is given) and each one yields a typed outcome. The
//! first verified attempt wins. Only a verified explicit-key attempt with a
//! profile name writes back to the shared files.

mod ambient;

use std::fmt;

use crate::config::{Config, DEFAULT_REGION};
use crate::error::{AttemptFailure, AuthError, CredentialSource, GatewayError};
use crate::gateway::{Gateway, GatewayClient};
use crate::http::HttpClient;
use crate::profile_store::{ProfileStore, config_section_name};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Credential-related command line flags.
#[derive(Debug, Clone, Default)]
pub struct CredentialArgs {
    pub profile_name: Option<String>,
    pub access_key: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub credentials: Credentials,
    pub region: String,
    pub source: CredentialSource,
}

impl Session {
    pub fn client(&self, config: &Config) -> Result<GatewayClient, GatewayError> {
        let http = HttpClient::new(
            config.endpoint_for(&self.region),
            self.region.clone(),
            self.credentials.clone(),
        )?;
        Ok(GatewayClient::new(http))
    }
}

/// Lightweight call proving a session works.
pub trait AccountProbe {
    fn verify(&self, session: &Session) -> Result<(), GatewayError>;
}

/// Probes with `GET /account` against the configured endpoint.
pub struct GatewayProbe<'a> {
    pub config: &'a Config,
}

impl AccountProbe for GatewayProbe<'_> {
    fn verify(&self, session: &Session) -> Result<(), GatewayError> {
        session.client(self.config)?.get_account()?;
        Ok(())
    }
}

pub fn resolve(
    args: &CredentialArgs,
    config: &Config,
    probe: &dyn AccountProbe,
) -> Result<Session, AuthError> {
    if args.access_key.is_none() && args.secret_access_key.is_none() && args.profile_name.is_none()
    {
        let session = ambient::discover(config, args.region.as_deref())
            .map_err(|failure| AuthError::Exhausted(vec![failure]))?;
        return verified(session, probe).map_err(|failure| AuthError::Exhausted(vec![failure]));
    }

    let mut credentials_store = ProfileStore::load(&config.credentials_file);
    let mut config_store = ProfileStore::load(&config.config_file);
    let mut failures = Vec::new();
    let mut region = args.region.clone();

    if let Some(profile) = &args.profile_name {
        if let Some(section) = credentials_store.section(profile) {
            let Some(profile_config) = config_store.section(&config_section_name(profile)) else {
                return Err(AuthError::MissingConfigSection(profile.clone()));
            };
            if region.is_none() {
                region = Some(
                    profile_config
                        .get("region")
                        .unwrap_or(DEFAULT_REGION)
                        .to_string(),
                );
            }
            let attempt = match (
                section.get("aws_access_key_id"),
                section.get("aws_secret_access_key"),
            ) {
                (Some(key), Some(secret)) => verified(
                    Session {
                        credentials: Credentials {
                            access_key_id: key.to_string(),
                            secret_access_key: secret.to_string(),
                            session_token: section.get("aws_session_token").map(str::to_string),
                        },
                        region: region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()),
                        source: CredentialSource::Profile,
                    },
                    probe,
                ),
                _ => Err(AttemptFailure {
                    source: CredentialSource::Profile,
                    reason: format!("profile {profile} has no access key pair"),
                }),
            };
            match attempt {
                Ok(session) => return Ok(session),
                Err(failure) => failures.push(failure),
            }
        } else {
            tracing::debug!(profile = %profile, "profile not in credentials store");
        }
    }

    match (&args.access_key, &args.secret_access_key) {
        (Some(key), Some(secret)) => {
            let region = region.ok_or(AuthError::MissingRegion)?;
            let session = Session {
                credentials: Credentials {
                    access_key_id: key.clone(),
                    secret_access_key: secret.clone(),
                    session_token: args.session_token.clone(),
                },
                region,
                source: CredentialSource::Explicit,
            };
            match verified(session, probe) {
                Ok(session) => {
                    if let Some(profile) = &args.profile_name {
                        persist(
                            profile,
                            &session,
                            &mut credentials_store,
                            &mut config_store,
                            config,
                        )?;
                    }
                    Ok(session)
                }
                Err(failure) => {
                    failures.push(failure);
                    Err(AuthError::Exhausted(failures))
                }
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            failures.push(AttemptFailure {
                source: CredentialSource::Explicit,
                reason: "access key and secret access key must be given together".to_string(),
            });
            Err(AuthError::Exhausted(failures))
        }
        (None, None) => {
            if failures.is_empty() {
                if let Some(profile) = &args.profile_name {
                    failures.push(AttemptFailure {
                        source: CredentialSource::Profile,
                        reason: format!("profile {profile} not found"),
                    });
                }
            }
            Err(AuthError::Exhausted(failures))
        }
    }
}

fn verified(session: Session, probe: &dyn AccountProbe) -> Result<Session, AttemptFailure> {
    match probe.verify(&session) {
        Ok(()) => {
            tracing::info!(source = %session.source, region = %session.region, "credentials verified");
            Ok(session)
        }
        Err(err) => {
            tracing::warn!(source = %session.source, "credential attempt failed: {err}");
            Err(AttemptFailure {
                source: session.source,
                reason: err.to_string(),
            })
        }
    }
}

fn persist(
    profile: &str,
    session: &Session,
    credentials_store: &mut ProfileStore,
    config_store: &mut ProfileStore,
    config: &Config,
) -> Result<(), AuthError> {
    config_store
        .section_mut(&config_section_name(profile))
        .set("region", &session.region);
    config_store
        .save(&config.config_file)
        .map_err(|source| AuthError::Store {
            path: config.config_file.display().to_string(),
            source,
        })?;

    let section = credentials_store.section_mut(profile);
    section.set("aws_access_key_id", &session.credentials.access_key_id);
    section.set("aws_secret_access_key", &session.credentials.secret_access_key);
    match &session.credentials.session_token {
        Some(token) => section.set("aws_session_token", token),
        None => {
            section.remove("aws_session_token");
        }
    }
    credentials_store
        .save(&config.credentials_file)
        .map_err(|source| AuthError::Store {
            path: config.credentials_file.display().to_string(),
            source,
        })?;

    tracing::info!(profile = %profile, "saved credentials to profile");
    Ok(())
}

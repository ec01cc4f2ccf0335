//! Handlers for each `--command`. Everything user-facing is written to the
//! handler's sink; diagnostics go through tracing.

use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::batch::{
    CREATE_PAUSE, DELETE_PAUSE, MULTI_BATCH_PAUSE, Pause, batches, delete_estimate,
    max_urls_per_definition,
};
use crate::gateway::{Gateway, RestApi};
use crate::inventory::{Inventory, proxy_base};
use crate::prune::{DOMAIN_ONLY_NOTE, prune};
use crate::template::{self, clean_url};
use crate::words::WordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    List,
    ListId,
    Create,
    Delete,
    DeleteAll,
    Update,
}

impl CommandKind {
    pub const NAMES: &'static str = "list, list-id, create, delete, delete-all, update";
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(CommandKind::List),
            "list-id" => Ok(CommandKind::ListId),
            "create" => Ok(CommandKind::Create),
            "delete" => Ok(CommandKind::Delete),
            "delete-all" => Ok(CommandKind::DeleteAll),
            "update" => Ok(CommandKind::Update),
            other => Err(CommandError::Unsupported(other.to_string())),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandKind::List => "list",
            CommandKind::ListId => "list-id",
            CommandKind::Create => "create",
            CommandKind::Delete => "delete",
            CommandKind::DeleteAll => "delete-all",
            CommandKind::Update => "update",
        })
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unsupported command: {0}")]
    Unsupported(String),
    #[error("{0}")]
    MissingArgument(&'static str),
    #[error("Unable to update, no valid resource for {0}")]
    NoResources(String),
}

/// Everything a command needs from the command line besides credentials.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub kind: CommandKind,
    pub api_id: Option<String>,
    pub url: Option<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Nothing needed doing.
    NoOp,
    /// The command ran but reported `Failed!`.
    Failed,
}

#[derive(Debug, Clone)]
pub struct CreatedApi {
    pub api: RestApi,
    pub deployment_id: String,
    /// (proxy url, target url) in input order.
    pub endpoints: Vec<(String, String)>,
}

pub struct Handlers<'a, G: Gateway + ?Sized, W: Write> {
    gateway: &'a G,
    pause: &'a dyn Pause,
    out: W,
}

impl<'a, G: Gateway + ?Sized, W: Write> Handlers<'a, G, W> {
    pub fn new(gateway: &'a G, pause: &'a dyn Pause, out: W) -> Self {
        Self {
            gateway,
            pause,
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}").context("write output")
    }

    pub fn dispatch(
        &mut self,
        invocation: &Invocation,
        words: Option<&mut dyn WordSource>,
    ) -> Result<Outcome> {
        match invocation.kind {
            CommandKind::List => {
                self.list(invocation.api_id.as_deref())?;
                Ok(Outcome::Success)
            }
            CommandKind::ListId => {
                self.list_ids()?;
                Ok(Outcome::Success)
            }
            CommandKind::Create => {
                let arg = invocation.url.as_deref().ok_or(CommandError::MissingArgument(
                    "Expected url or a file containing a list of urls.",
                ))?;
                let words = words.context("create needs a word list")?;
                let urls = self.read_url_argument(arg)?;
                let created = self.create(&urls, invocation.unique, words)?;
                Ok(if created.is_empty() {
                    Outcome::NoOp
                } else {
                    Outcome::Success
                })
            }
            CommandKind::Delete => {
                let api_id = invocation
                    .api_id
                    .as_deref()
                    .ok_or(CommandError::MissingArgument("Please provide a valid API ID"))?;
                let deleted = self.delete(api_id)?;
                let status = if deleted { "Success!" } else { "Failed!" };
                self.line(&format!("Deleting {api_id} => {status}"))?;
                Ok(if deleted { Outcome::Success } else { Outcome::Failed })
            }
            CommandKind::DeleteAll => {
                if self.delete_all()? {
                    self.line("Deleted all APIs!")?;
                    Ok(Outcome::Success)
                } else {
                    Ok(Outcome::NoOp)
                }
            }
            CommandKind::Update => {
                let (Some(api_id), Some(url)) =
                    (invocation.api_id.as_deref(), invocation.url.as_deref())
                else {
                    return Err(CommandError::MissingArgument(
                        "Please provide a valid API ID and URL end-point",
                    )
                    .into());
                };
                self.line(&format!("Updating {api_id} => {url}..."))?;
                let updated = self.update(api_id, url)?;
                let status = if updated { "Success!" } else { "Failed!" };
                self.line(&format!("API Update Complete: {status}"))?;
                Ok(if updated { Outcome::Success } else { Outcome::Failed })
            }
        }
    }

    /// A literal URL, or the path of a file with one URL per line.
    pub fn read_url_argument(&mut self, arg: &str) -> Result<Vec<String>> {
        let path = Path::new(arg);
        if !path.is_file() {
            return Ok(vec![arg.to_string()]);
        }
        self.line(&format!("Found file: {arg}"))?;
        let raw = std::fs::read_to_string(path).with_context(|| format!("read url file {arg}"))?;
        let urls: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        self.line(&format!("Parsed {} urls", urls.len()))?;
        Ok(urls)
    }

    pub fn list(&mut self, api_filter: Option<&str>) -> Result<()> {
        self.line("Listing API's...")?;
        let inventory = Inventory::new(self.gateway);
        for api in inventory.definitions() {
            let api = api?;
            if api_filter.is_some_and(|id| id != api.id) {
                continue;
            }
            let created = api.created_display();
            for pair in inventory.pairs_for(&api.id)? {
                self.line(&format!(
                    "[{created}] ({}) {}: {} => {}",
                    api.id, api.name, pair.proxy_url, pair.target_url
                ))?;
            }
        }
        Ok(())
    }

    pub fn list_ids(&mut self) -> Result<()> {
        self.line("Listing unique API IDs...")?;
        for api in Inventory::new(self.gateway).definitions() {
            let api = api?;
            self.line(&format!("[{}] ({}) {}", api.created_display(), api.id, api.name))?;
        }
        Ok(())
    }

    /// Validates `urls`, then creates one definition per batch. An empty
    /// result means nothing was left to create.
    pub fn create(
        &mut self,
        urls: &[String],
        unique: bool,
        words: &mut dyn WordSource,
    ) -> Result<Vec<CreatedApi>> {
        self.line(DOMAIN_ONLY_NOTE)?;
        self.line("")?;

        let inventory = Inventory::new(self.gateway);
        let pruned = prune(urls, || inventory.url_pairs(None), unique)?;
        for notice in pruned.notices() {
            self.line(&notice)?;
        }
        if pruned.is_empty() {
            self.line("Nothing to do.")?;
            return Ok(Vec::new());
        }

        let parts = batches(&pruned.urls, max_urls_per_definition());
        if parts.len() > 1 {
            self.line(&format!("Preparing to create {} batches...", parts.len()))?;
            self.pause.pause(MULTI_BATCH_PAUSE);
        }

        let mut created = Vec::with_capacity(parts.len());
        for (i, batch) in parts.iter().enumerate() {
            self.line(&format!("\nBatch {}: {} URLs", i + 1, batch.len()))?;
            created.push(self.create_api(batch, words)?);
            // One CreateRestApi every 3s, across runs too.
            self.pause.pause(CREATE_PAUSE);
        }
        Ok(created)
    }

    /// Imports and deploys a single definition fronting `urls`.
    pub fn create_api(&mut self, urls: &[String], words: &mut dyn WordSource) -> Result<CreatedApi> {
        match urls {
            [] => return Err(CommandError::MissingArgument("Please provide a valid URL end-point").into()),
            [single] => self.line(&format!("Creating => {single}..."))?,
            many => self.line(&format!("Creating => {} urls...", many.len()))?,
        }

        let (document, drawn) = template::build(urls, words);
        let body = document.to_json().context("serialize import document")?;
        let api = self
            .gateway
            .import_rest_api(&body)
            .context("import rest api")?;
        let deployment = self
            .gateway
            .create_deployment(&api.id)
            .with_context(|| format!("deploy {}", api.id))?;
        tracing::debug!(api_id = %api.id, deployment = %deployment.id, "deployed");

        let base = proxy_base(&api.id, self.gateway.region());
        let created = api.created_display();
        let mut endpoints = Vec::with_capacity(urls.len());
        for (url, word) in urls.iter().zip(&drawn) {
            let proxy_url = format!("{base}{word}/");
            self.line(&format!(
                "[{created}] ({}) {} => {proxy_url} ({url})",
                api.id, api.name
            ))?;
            endpoints.push((proxy_url, url.clone()));
        }

        Ok(CreatedApi {
            api,
            deployment_id: deployment.id,
            endpoints,
        })
    }

    /// Deletes `api_id` if it is among the existing definitions.
    pub fn delete(&mut self, api_id: &str) -> Result<bool> {
        for api in Inventory::new(self.gateway).definitions() {
            if api?.id != api_id {
                continue;
            }
            return match self.gateway.delete_rest_api(api_id) {
                Ok(()) => Ok(true),
                Err(err) if err.is_not_found() => {
                    tracing::warn!(api_id = %api_id, "gone before delete: {err}");
                    Ok(false)
                }
                Err(err) => Err(err).with_context(|| format!("delete {api_id}")),
            };
        }
        Ok(false)
    }

    pub fn delete_all(&mut self) -> Result<bool> {
        let items = Inventory::new(self.gateway).collect_definitions()?;
        if items.is_empty() {
            self.line("Nothing to delete.")?;
            return Ok(false);
        }
        if items.len() > 1 {
            self.line("This may take a while...")?;
            self.line(&delete_estimate(items.len()))?;
        }

        for (i, api) in items.iter().enumerate() {
            self.gateway
                .delete_rest_api(&api.id)
                .with_context(|| format!("delete {}", api.id))?;
            self.line(&format!("Deleting {} => Success!", api.id))?;
            if i + 1 < items.len() {
                self.pause.pause(DELETE_PAUSE);
            }
        }
        Ok(true)
    }

    /// Points the first proxy resource of `api_id` at `url`.
    pub fn update(&mut self, api_id: &str, url: &str) -> Result<bool> {
        let url = clean_url(url);
        let resources = self.gateway.proxy_resources(api_id)?;
        let Some(resource) = resources.first() else {
            return Err(CommandError::NoResources(api_id.to_string()).into());
        };
        self.line(&format!("Found resource {} for {api_id}!", resource.id))?;

        let integration = self
            .gateway
            .update_integration_uri(api_id, &resource.id, &format!("{url}/{{proxy}}"))
            .with_context(|| format!("update integration {}", resource.id))?;
        let uri = integration.uri.unwrap_or_default();
        Ok(uri.replace("/{proxy}", "") == url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_round_trip() {
        for name in ["list", "list-id", "create", "delete", "delete-all", "update"] {
            let kind: CommandKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
    }

    #[test]
    fn unknown_command_is_unsupported() {
        let err = "serve".parse::<CommandKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported command: serve");
    }
}

use crate::error::GatewayError;
use crate::gateway::{Definitions, Gateway, RestApi, definitions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPair {
    pub proxy_url: String,
    pub target_url: String,
}

/// Target of one proxied path inside a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub target_url: String,
    pub subdir: String,
}

pub fn proxy_base(api_id: &str, region: &str) -> String {
    format!("https://{api_id}.execute-api.{region}.amazonaws.com/fireprox/")
}

/// Rebuilds what exists remotely; nothing is cached between calls.
pub struct Inventory<'a, G: Gateway + ?Sized> {
    gateway: &'a G,
}

impl<'a, G: Gateway + ?Sized> Inventory<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    pub fn definitions(&self) -> Definitions<'a, G> {
        definitions(self.gateway)
    }

    pub fn collect_definitions(&self) -> Result<Vec<RestApi>, GatewayError> {
        self.definitions().collect()
    }

    pub fn integrations(&self, api_id: &str) -> Result<Vec<Target>, GatewayError> {
        let resources = self.gateway.proxy_resources(api_id)?;
        if resources.is_empty() {
            return Err(GatewayError::NotFound(format!(
                "Could not find resources in the API {api_id}"
            )));
        }

        let mut targets = Vec::with_capacity(resources.len());
        for resource in resources {
            let integration = self.gateway.get_integration(api_id, &resource.id)?;
            let uri = integration.uri.unwrap_or_default();
            targets.push(Target {
                target_url: uri.replace("{proxy}", ""),
                subdir: resource
                    .prefix
                    .strip_prefix('/')
                    .unwrap_or(&resource.prefix)
                    .to_string(),
            });
        }
        Ok(targets)
    }

    pub fn pairs_for(&self, api_id: &str) -> Result<Vec<UrlPair>, GatewayError> {
        let base = proxy_base(api_id, self.gateway.region());
        Ok(self
            .integrations(api_id)?
            .into_iter()
            .map(|target| UrlPair {
                proxy_url: format!("{base}{}/", target.subdir),
                target_url: target.target_url,
            })
            .collect())
    }

    /// Pairs across every definition, or only across `prefetched` when the
    /// caller already listed them.
    pub fn url_pairs(&self, prefetched: Option<&[RestApi]>) -> Result<Vec<UrlPair>, GatewayError> {
        let mut pairs = Vec::new();
        match prefetched {
            Some(apis) => {
                for api in apis {
                    pairs.extend(self.pairs_for(&api.id)?);
                }
            }
            None => {
                for api in self.definitions() {
                    pairs.extend(self.pairs_for(&api?.id)?);
                }
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_base_is_region_scoped() {
        assert_eq!(
            proxy_base("abc123", "eu-west-1"),
            "https://abc123.execute-api.eu-west-1.amazonaws.com/fireprox/"
        );
    }
}

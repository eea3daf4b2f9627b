//! Resource Manager REST client and the client bundle handed to adapters

use crate::api::{GetGroupOptions, ManagementGroupsApi, SubnetsApi, VirtualNetworksApi};
use crate::error::{AzureError, Result};
use crate::models::{CreateManagementGroupRequest, ManagementGroup, Subnet, VirtualNetwork};
use armflow_cloud::ids::{validate_management_group_name, validate_uuid};
use armflow_cloud::{ManagementGroupId, SubnetId, UserFeatures, VirtualNetworkId};
use armflow_config::ProviderConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

const MANAGEMENT_GROUPS_API_VERSION: &str = "2020-05-01";
const NETWORK_API_VERSION: &str = "2022-07-01";

/// Wait used for a 429 without a usable `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Settings shared by every client built for one provider instance
#[derive(Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    pub access_token: Option<String>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    /// Skip client-side validation of request arguments
    pub disable_sdk_validation: bool,
    /// Count HTTP 429 responses against `max_retries`. When off, throttled
    /// requests are retried until the caller's deadline.
    pub count_429_as_retry: bool,
    pub max_retries: u32,
    pub features: UserFeatures,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            subscription_id: None,
            tenant_id: None,
            disable_sdk_validation: true,
            count_429_as_retry: false,
            max_retries: 3,
            features: UserFeatures::default(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("disable_sdk_validation", &self.disable_sdk_validation)
            .field("count_429_as_retry", &self.count_429_as_retry)
            .field("max_retries", &self.max_retries)
            .field("features", &self.features)
            .finish()
    }
}

impl ClientOptions {
    pub fn from_provider_config(config: &ProviderConfig) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: config.endpoint.clone().unwrap_or(defaults.endpoint),
            access_token: config.access_token.clone(),
            subscription_id: config.subscription_id.clone(),
            tenant_id: config.tenant_id.clone(),
            disable_sdk_validation: config
                .disable_sdk_validation
                .unwrap_or(defaults.disable_sdk_validation),
            count_429_as_retry: config
                .count_429_as_retry
                .unwrap_or(defaults.count_429_as_retry),
            max_retries: defaults.max_retries,
            features: config.user_features(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Bearer-authenticated Resource Manager client
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    validate: bool,
    count_429_as_retry: bool,
    max_retries: u32,
}

impl ArmClient {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let token = options
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AzureError::MissingEnvVar("ARM_ACCESS_TOKEN".to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("armflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            token,
            validate: !options.disable_sdk_validation,
            count_429_as_retry: options.count_429_as_retry,
            max_retries: options.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn group_path(name: &str) -> String {
        ManagementGroupId::new(name).id()
    }

    /// Send a request, retrying while the service throttles with 429
    async fn send<F>(&self, what: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut throttled = 0u32;
        loop {
            let response = build().bearer_auth(&self.token).send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                throttled += 1;
                if self.count_429_as_retry && throttled > self.max_retries {
                    return check_status(what, response).await;
                }

                let wait = retry_after(&response).unwrap_or(DEFAULT_RETRY_AFTER);
                tracing::warn!("{} was throttled, retrying in {:?}", what, wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            return check_status(what, response).await;
        }
    }

    async fn send_json<T, F>(&self, what: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned + Default,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.send(what, build).await?;
        let body = response.text().await?;
        // Long-running PUTs answer 202 with an empty body
        if body.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn put<B: Serialize>(
        &self,
        url: &str,
        api_version: &'static str,
        body: &B,
    ) -> reqwest::RequestBuilder {
        self.http
            .put(url)
            .query(&[("api-version", api_version)])
            .json(body)
    }

    fn check_group_name(&self, name: &str) -> Result<()> {
        if self.validate {
            validate_management_group_name(name)?;
        }
        Ok(())
    }

    fn check_subscription_id(&self, subscription_id: &str) -> Result<()> {
        if self.validate {
            validate_uuid(subscription_id)?;
        }
        Ok(())
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map non-success statuses onto [`AzureError`]
async fn check_status(what: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(AzureError::NotFound(what.to_string())),
        StatusCode::FORBIDDEN => Err(AzureError::Forbidden(what.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(AzureError::Status {
                context: what.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl ManagementGroupsApi for ArmClient {
    async fn get(&self, name: &str, options: GetGroupOptions<'_>) -> Result<ManagementGroup> {
        self.check_group_name(name)?;
        let url = self.url(&Self::group_path(name));
        let recurse = if options.recurse { "true" } else { "false" };
        let what = format!("Management Group {:?}", name);

        self.send_json(&what, || {
            let mut request = self.http.get(&url).query(&[
                ("api-version", MANAGEMENT_GROUPS_API_VERSION),
                ("$expand", "children"),
                ("$recurse", recurse),
            ]);
            if !options.cache_control.is_empty() {
                request = request.header(reqwest::header::CACHE_CONTROL, options.cache_control);
            }
            request
        })
        .await
    }

    async fn create_or_update(
        &self,
        name: &str,
        request: &CreateManagementGroupRequest,
    ) -> Result<ManagementGroup> {
        self.check_group_name(name)?;
        let url = self.url(&Self::group_path(name));
        let what = format!("Management Group {:?}", name);

        self.send_json(&what, || self.put(&url, MANAGEMENT_GROUPS_API_VERSION, request))
            .await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.check_group_name(name)?;
        let url = self.url(&Self::group_path(name));
        let what = format!("Management Group {:?}", name);

        self.send(&what, || {
            self.http
                .delete(&url)
                .query(&[("api-version", MANAGEMENT_GROUPS_API_VERSION)])
        })
        .await?;
        Ok(())
    }

    async fn add_subscription(&self, group: &str, subscription_id: &str) -> Result<()> {
        self.check_group_name(group)?;
        self.check_subscription_id(subscription_id)?;
        let url = self.url(&format!(
            "{}/subscriptions/{}",
            Self::group_path(group),
            subscription_id
        ));
        let what = format!(
            "Subscription {:?} in Management Group {:?}",
            subscription_id, group
        );

        self.send(&what, || {
            self.http
                .put(&url)
                .query(&[("api-version", MANAGEMENT_GROUPS_API_VERSION)])
        })
        .await?;
        Ok(())
    }

    async fn remove_subscription(&self, group: &str, subscription_id: &str) -> Result<()> {
        self.check_group_name(group)?;
        self.check_subscription_id(subscription_id)?;
        let url = self.url(&format!(
            "{}/subscriptions/{}",
            Self::group_path(group),
            subscription_id
        ));
        let what = format!(
            "Subscription {:?} in Management Group {:?}",
            subscription_id, group
        );

        self.send(&what, || {
            self.http
                .delete(&url)
                .query(&[("api-version", MANAGEMENT_GROUPS_API_VERSION)])
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VirtualNetworksApi for ArmClient {
    async fn get(&self, id: &VirtualNetworkId) -> Result<VirtualNetwork> {
        let url = self.url(&id.id());
        self.send_json(&id.to_string(), || {
            self.http
                .get(&url)
                .query(&[("api-version", NETWORK_API_VERSION)])
        })
        .await
    }

    async fn create_or_update(
        &self,
        id: &VirtualNetworkId,
        body: &VirtualNetwork,
    ) -> Result<VirtualNetwork> {
        if self.validate && body.location.as_deref().unwrap_or_default().is_empty() {
            return Err(AzureError::InvalidConfig(format!("{} requires a location", id)));
        }
        let url = self.url(&id.id());
        self.send_json(&id.to_string(), || self.put(&url, NETWORK_API_VERSION, body))
            .await
    }

    async fn delete(&self, id: &VirtualNetworkId) -> Result<()> {
        let url = self.url(&id.id());
        self.send(&id.to_string(), || {
            self.http
                .delete(&url)
                .query(&[("api-version", NETWORK_API_VERSION)])
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SubnetsApi for ArmClient {
    async fn get(&self, id: &SubnetId) -> Result<Subnet> {
        let url = self.url(&id.id());
        self.send_json(&id.to_string(), || {
            self.http
                .get(&url)
                .query(&[("api-version", NETWORK_API_VERSION)])
        })
        .await
    }

    async fn create_or_update(&self, id: &SubnetId, body: &Subnet) -> Result<Subnet> {
        let url = self.url(&id.id());
        self.send_json(&id.to_string(), || self.put(&url, NETWORK_API_VERSION, body))
            .await
    }

    async fn delete(&self, id: &SubnetId) -> Result<()> {
        let url = self.url(&id.id());
        self.send(&id.to_string(), || {
            self.http
                .delete(&url)
                .query(&[("api-version", NETWORK_API_VERSION)])
        })
        .await?;
        Ok(())
    }
}

/// Everything a resource adapter may need, built once per provider
/// instance
#[derive(Clone)]
pub struct Clients {
    pub management_groups: Arc<dyn ManagementGroupsApi>,
    pub virtual_networks: Arc<dyn VirtualNetworksApi>,
    pub subnets: Arc<dyn SubnetsApi>,
    pub features: UserFeatures,
    pub options: ClientOptions,
}

impl Clients {
    /// Build the bundle around one shared [`ArmClient`]
    pub fn build(options: ClientOptions) -> Result<Self> {
        tracing::debug!("Building Resource Manager clients for {}", options.endpoint);
        let arm = Arc::new(ArmClient::new(&options)?);

        Ok(Self {
            management_groups: arm.clone(),
            virtual_networks: arm.clone(),
            subnets: arm,
            features: options.features.clone(),
            options,
        })
    }

    /// Assemble a bundle from existing API implementations
    pub fn from_parts(
        options: ClientOptions,
        management_groups: Arc<dyn ManagementGroupsApi>,
        virtual_networks: Arc<dyn VirtualNetworksApi>,
        subnets: Arc<dyn SubnetsApi>,
    ) -> Self {
        Self {
            management_groups,
            virtual_networks,
            subnets,
            features: options.features.clone(),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeGroups, FakeNetworks};

    #[test]
    fn test_option_defaults() {
        let options = ClientOptions::default();
        assert!(options.disable_sdk_validation);
        assert!(!options.count_429_as_retry);
        assert_eq!(options.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_options_from_provider_config() {
        let config = ProviderConfig {
            endpoint: Some("http://localhost:9999".to_string()),
            access_token: Some("tok-8f3a".to_string()),
            count_429_as_retry: Some(true),
            ..Default::default()
        };

        let options = ClientOptions::from_provider_config(&config);
        assert_eq!(options.endpoint, "http://localhost:9999");
        assert!(options.count_429_as_retry);
        assert!(options.disable_sdk_validation);
        let debug = format!("{:?}", options);
        assert!(!debug.contains("tok-8f3a"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_client_requires_token() {
        let err = ArmClient::new(&ClientOptions::default()).err().unwrap();
        assert!(matches!(err, AzureError::MissingEnvVar(_)));

        let empty = ClientOptions::default().with_access_token("");
        assert!(ArmClient::new(&empty).is_err());
    }

    #[test]
    fn test_build_bundle() {
        let clients = Clients::build(ClientOptions::default().with_access_token("t")).unwrap();
        assert!(clients.features.key_vault.purge_soft_delete_on_destroy);
    }

    #[tokio::test]
    async fn test_bundle_from_parts() {
        let groups = Arc::new(FakeGroups::with_group(testing::group(
            "mg1",
            vec![testing::subscription_child("s1")],
        )));
        let networks = Arc::new(FakeNetworks::default());
        let options = ClientOptions::default().with_access_token("t");

        let clients = Clients::from_parts(options, groups.clone(), networks.clone(), networks);
        assert!(clients.features.key_vault.purge_soft_delete_on_destroy);

        let group = clients
            .management_groups
            .get("mg1", GetGroupOptions::recursive("no-cache"))
            .await
            .unwrap();
        assert_eq!(group.name.as_deref(), Some("mg1"));
        assert_eq!(groups.calls().len(), 1);
    }
}

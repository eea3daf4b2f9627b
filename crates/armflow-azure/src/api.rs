//! Narrow API traits the resource adapters depend on
//!
//! Each adapter takes only the trait it needs, so tests can hand it an
//! in-memory fake instead of an HTTP client.

use crate::error::Result;
use crate::models::{CreateManagementGroupRequest, ManagementGroup, Subnet, VirtualNetwork};
use armflow_cloud::{SubnetId, VirtualNetworkId};
use async_trait::async_trait;

/// Options for a management group `get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetGroupOptions<'a> {
    /// Expand grandchildren as well as direct children
    pub recurse: bool,
    /// Sent as `Cache-Control` when non-empty
    pub cache_control: &'a str,
}

impl<'a> GetGroupOptions<'a> {
    pub fn recursive(cache_control: &'a str) -> Self {
        Self {
            recurse: true,
            cache_control,
        }
    }

    /// Direct children only, served from cache
    pub fn direct() -> Self {
        Self {
            recurse: false,
            cache_control: "",
        }
    }
}

#[async_trait]
pub trait ManagementGroupsApi: Send + Sync {
    /// Fetch a group with its children expanded
    async fn get(&self, name: &str, options: GetGroupOptions<'_>) -> Result<ManagementGroup>;

    async fn create_or_update(
        &self,
        name: &str,
        request: &CreateManagementGroupRequest,
    ) -> Result<ManagementGroup>;

    async fn delete(&self, name: &str) -> Result<()>;

    async fn add_subscription(&self, group: &str, subscription_id: &str) -> Result<()>;

    async fn remove_subscription(&self, group: &str, subscription_id: &str) -> Result<()>;
}

#[async_trait]
pub trait VirtualNetworksApi: Send + Sync {
    async fn get(&self, id: &VirtualNetworkId) -> Result<VirtualNetwork>;

    async fn create_or_update(
        &self,
        id: &VirtualNetworkId,
        body: &VirtualNetwork,
    ) -> Result<VirtualNetwork>;

    async fn delete(&self, id: &VirtualNetworkId) -> Result<()>;
}

#[async_trait]
pub trait SubnetsApi: Send + Sync {
    async fn get(&self, id: &SubnetId) -> Result<Subnet>;

    async fn create_or_update(&self, id: &SubnetId, body: &Subnet) -> Result<Subnet>;

    async fn delete(&self, id: &SubnetId) -> Result<()>;
}

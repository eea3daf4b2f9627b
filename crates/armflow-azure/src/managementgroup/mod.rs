//! Management groups and their subscription membership

pub mod association;
pub mod refresh;
pub mod resource;

pub use association::AssociationConfig;
pub use refresh::{ManagementGroupCreateRefresh, SubscriptionAssociationRefresh};
pub use resource::{ManagementGroupConfig, expand_subscription_ids, update_membership};

/// Bypass the service cache when reading a group
pub const CACHE_CONTROL: &str = "no-cache";

pub const MANAGEMENT_GROUP_RESOURCE: &str = "azurerm_management_group";
pub const ASSOCIATION_RESOURCE: &str = "azurerm_management_group_subscription_association";

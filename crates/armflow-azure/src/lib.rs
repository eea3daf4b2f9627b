//! Azure Resource Manager adapters for armflow
//!
//! Each adapter reads a remote resource into a [`armflow_cloud::ResourceState`],
//! expands typed configuration into request bodies, and waits for the
//! service to settle after writes.
//!
//! # Resources
//!
//! - `azurerm_management_group`
//! - `azurerm_management_group_subscription_association`
//! - `azurerm_virtual_network`
//! - `azurerm_subnet`
//!
//! # Requirements
//!
//! `ARM_ACCESS_TOKEN` (or `access_token` in the provider file) must hold a
//! bearer token for `https://management.azure.com`.
//!
//! # Example
//!
//! ```ignore
//! use armflow_azure::{ClientOptions, Clients};
//! use armflow_azure::managementgroup::resource;
//! use armflow_cloud::ResourceState;
//!
//! let clients = Clients::build(ClientOptions::default().with_access_token(token))?;
//!
//! let mut state = ResourceState::new(
//!     "azurerm_management_group",
//!     "/providers/Microsoft.Management/managementGroups/platform",
//! );
//! resource::read(clients.management_groups.as_ref(), &mut state).await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod managementgroup;
pub mod models;
pub mod network;
pub mod provider;

#[cfg(test)]
mod testing;

pub use api::{GetGroupOptions, ManagementGroupsApi, SubnetsApi, VirtualNetworksApi};
pub use client::{ArmClient, ClientOptions, Clients};
pub use error::{AzureError, ResponseKind, Result};
pub use managementgroup::{AssociationConfig, ManagementGroupConfig};
pub use network::{SubnetConfig, VirtualNetworkConfig};
pub use provider::{supported_resources, supported_services, validate_import_id};

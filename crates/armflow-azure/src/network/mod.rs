//! Virtual networks and subnets

pub mod refresh;
pub mod subnet;
pub mod virtual_network;

pub use refresh::{SubnetProvisioningRefresh, VirtualNetworkProvisioningRefresh};
pub use subnet::SubnetConfig;
pub use virtual_network::VirtualNetworkConfig;

use crate::models::ExtendedLocation;

pub const VIRTUAL_NETWORK_RESOURCE: &str = "azurerm_virtual_network";
pub const SUBNET_RESOURCE: &str = "azurerm_subnet";

const EDGE_ZONE_TYPE: &str = "EdgeZone";

/// Lowercase with spaces removed, so "West Europe" and "westeurope" compare
/// equal
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

pub fn normalize_location_opt(location: Option<&str>) -> String {
    location.map(normalize_location).unwrap_or_default()
}

pub fn expand_edge_zone(edge_zone: Option<&str>) -> Option<ExtendedLocation> {
    let edge_zone = edge_zone.filter(|z| !z.is_empty())?;
    Some(ExtendedLocation {
        name: Some(normalize_location(edge_zone)),
        kind: Some(EDGE_ZONE_TYPE.to_string()),
    })
}

/// The edge zone name, or "" when the resource is not in one
pub fn flatten_edge_zone(location: Option<&ExtendedLocation>) -> String {
    location
        .filter(|l| {
            l.kind
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(EDGE_ZONE_TYPE))
        })
        .and_then(|l| l.name.as_deref())
        .map(normalize_location)
        .unwrap_or_default()
}

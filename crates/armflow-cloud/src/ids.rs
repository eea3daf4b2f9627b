//! Resource identifiers
//!
//! Typed forms of the path-like ARM identifiers the adapters consume and
//! produce, plus the child-identifier parser used by membership
//! reconciliation.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of a management group child nested inside another group
pub const MANAGEMENT_GROUP_PREFIX: &str = "/providers/Microsoft.Management/managementGroups/";

/// Classification of a child identifier reported by a management group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedChild {
    /// `/subscriptions/{id}`; carries the id verbatim
    Subscription(SubscriptionId),
    /// A nested management group; callers skip it
    NotASubscription,
}

/// Parse a management group child identifier.
///
/// Nested groups are reported as [`ParsedChild::NotASubscription`] whatever
/// follows the prefix. Anything else must split into exactly three
/// `/`-delimited segments; the third one is returned without further
/// validation.
pub fn parse_child_subscription_id(raw: &str) -> Result<ParsedChild> {
    if raw.starts_with(MANAGEMENT_GROUP_PREFIX) {
        return Ok(ParsedChild::NotASubscription);
    }

    let components: Vec<&str> = raw.split('/').collect();
    if components.len() != 3 {
        return Err(CloudError::MalformedIdentifier {
            raw: raw.to_string(),
            segment_count: components.len() - 1,
        });
    }

    Ok(ParsedChild::Subscription(SubscriptionId::new(components[2])))
}

/// Match `raw` against a segment pattern. `Some` entries are literal keys
/// (compared case-insensitively), `None` entries capture a value.
fn match_segments(raw: &str, pattern: &[Option<&str>], kind: &str) -> Result<Vec<String>> {
    let rest = raw
        .strip_prefix('/')
        .ok_or_else(|| CloudError::invalid_id(raw, format!("{} id must start with '/'", kind)))?;

    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() != pattern.len() {
        return Err(CloudError::invalid_id(
            raw,
            format!(
                "{} id should have {} segments, got {}",
                kind,
                pattern.len(),
                segments.len()
            ),
        ));
    }

    let mut values = Vec::new();
    for (segment, expected) in segments.iter().zip(pattern) {
        match expected {
            Some(key) if !segment.eq_ignore_ascii_case(key) => {
                return Err(CloudError::invalid_id(
                    raw,
                    format!("expected segment {:?}, got {:?}", key, segment),
                ));
            }
            Some(_) => {}
            None if segment.is_empty() => {
                return Err(CloudError::invalid_id(raw, "empty value segment"));
            }
            None => values.push(segment.to_string()),
        }
    }

    Ok(values)
}

/// `/providers/Microsoft.Management/managementGroups/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagementGroupId {
    pub name: String,
}

impl ManagementGroupId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let values = match_segments(
            raw,
            &[
                Some("providers"),
                Some("Microsoft.Management"),
                Some("managementGroups"),
                None,
            ],
            "management group",
        )?;
        Ok(Self::new(values[0].clone()))
    }

    pub fn id(&self) -> String {
        format!("{}{}", MANAGEMENT_GROUP_PREFIX, self.name)
    }
}

impl fmt::Display for ManagementGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Management Group {:?}", self.name)
    }
}

/// `/subscriptions/{subscriptionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId {
    pub subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let values = match_segments(raw, &[Some("subscriptions"), None], "subscription")?;
        Ok(Self::new(values[0].clone()))
    }

    pub fn id(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription {:?}", self.subscription_id)
    }
}

/// `/managementGroup/{managementGroup}/subscription/{subscriptionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagementGroupSubscriptionAssociationId {
    pub management_group: String,
    pub subscription_id: String,
}

impl ManagementGroupSubscriptionAssociationId {
    pub fn new(management_group: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            management_group: management_group.into(),
            subscription_id: subscription_id.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let values = match_segments(
            raw,
            &[Some("managementGroup"), None, Some("subscription"), None],
            "management group subscription association",
        )?;
        Ok(Self::new(values[0].clone(), values[1].clone()))
    }

    pub fn id(&self) -> String {
        format!(
            "/managementGroup/{}/subscription/{}",
            self.management_group, self.subscription_id
        )
    }
}

impl fmt::Display for ManagementGroupSubscriptionAssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subscription Association {:?} (Management Group {:?})",
            self.subscription_id, self.management_group
        )
    }
}

/// `/subscriptions/{s}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VirtualNetworkId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

const VIRTUAL_NETWORK_PATTERN: [Option<&str>; 8] = [
    Some("subscriptions"),
    None,
    Some("resourceGroups"),
    None,
    Some("providers"),
    Some("Microsoft.Network"),
    Some("virtualNetworks"),
    None,
];

impl VirtualNetworkId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let values = match_segments(raw, &VIRTUAL_NETWORK_PATTERN, "virtual network")?;
        Ok(Self::new(
            values[0].clone(),
            values[1].clone(),
            values[2].clone(),
        ))
    }

    pub fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

impl fmt::Display for VirtualNetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Virtual Network {:?} (Resource Group {:?})",
            self.name, self.resource_group
        )
    }
}

/// A subnet nested under a virtual network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetId {
    pub subscription_id: String,
    pub resource_group: String,
    pub virtual_network_name: String,
    pub name: String,
}

impl SubnetId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        virtual_network_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            virtual_network_name: virtual_network_name.into(),
            name: name.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut pattern = VIRTUAL_NETWORK_PATTERN.to_vec();
        pattern.extend([Some("subnets"), None]);
        let values = match_segments(raw, &pattern, "subnet")?;
        Ok(Self::new(
            values[0].clone(),
            values[1].clone(),
            values[2].clone(),
            values[3].clone(),
        ))
    }

    pub fn virtual_network(&self) -> VirtualNetworkId {
        VirtualNetworkId::new(
            &self.subscription_id,
            &self.resource_group,
            &self.virtual_network_name,
        )
    }

    pub fn id(&self) -> String {
        format!("{}/subnets/{}", self.virtual_network().id(), self.name)
    }
}

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subnet {:?} (Virtual Network {:?} / Resource Group {:?})",
            self.name, self.virtual_network_name, self.resource_group
        )
    }
}

/// Management group names: 1-90 characters of alphanumerics, `-`, `_`,
/// `(`, `)` and `.`, not ending with a period.
pub fn validate_management_group_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > 90 {
        return Err(CloudError::InvalidConfig(format!(
            "management group name {:?} must be between 1 and 90 characters",
            name
        )));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '(' | ')' | '.');
    if !name.chars().all(allowed) {
        return Err(CloudError::InvalidConfig(format!(
            "management group name {:?} may only contain alphanumerics, hyphens, underscores, periods and parentheses",
            name
        )));
    }

    if name.ends_with('.') {
        return Err(CloudError::InvalidConfig(format!(
            "management group name {:?} cannot end with a period",
            name
        )));
    }

    Ok(())
}

pub fn validate_uuid(value: &str) -> Result<()> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|e| CloudError::InvalidConfig(format!("{:?} is not a valid UUID: {}", value, e)))
}

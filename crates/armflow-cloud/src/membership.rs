//! Management group membership reconciliation
//!
//! Works out which subscriptions have to leave (or join) a management group
//! so that its subscription children match the configured set.

use crate::action::{Action, ActionType, Plan};
use crate::error::Result;
use crate::ids::{ManagementGroupId, ParsedChild, parse_child_subscription_id};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Type tag the management API uses for nested management groups
pub const CHILD_TYPE_MANAGEMENT_GROUP: &str = "Microsoft.Management/managementGroups";

/// Type tag the management API uses for subscriptions
pub const CHILD_TYPE_SUBSCRIPTION: &str = "/subscriptions";

/// A child of a management group as reported by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildEntry {
    Subscription {
        name: Option<String>,
        id: Option<String>,
    },
    Group {
        name: Option<String>,
        id: Option<String>,
    },
    /// A type tag this provider does not know about
    Other {
        kind_tag: String,
        name: Option<String>,
        id: Option<String>,
    },
}

impl ChildEntry {
    pub fn subscription(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Subscription {
            id: Some(format!("/subscriptions/{}", name)),
            name: Some(name),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Group {
            id: Some(ManagementGroupId::new(&name).id()),
            name: Some(name),
        }
    }

    /// Build an entry from the wire representation (type tag, name, id)
    pub fn from_parts(kind: Option<&str>, name: Option<String>, id: Option<String>) -> Self {
        match kind {
            Some(CHILD_TYPE_SUBSCRIPTION) => Self::Subscription { name, id },
            Some(CHILD_TYPE_MANAGEMENT_GROUP) => Self::Group { name, id },
            other => Self::Other {
                kind_tag: other.unwrap_or_default().to_string(),
                name,
                id,
            },
        }
    }

    pub fn raw_id(&self) -> Option<&str> {
        match self {
            Self::Subscription { id, .. } | Self::Group { id, .. } | Self::Other { id, .. } => {
                id.as_deref()
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Subscription { name, .. }
            | Self::Group { name, .. }
            | Self::Other { name, .. } => name.as_deref(),
        }
    }

    /// True for a subscription child whose name is exactly `subscription_id`
    pub fn is_subscription_named(&self, subscription_id: &str) -> bool {
        matches!(self, Self::Subscription { name: Some(name), .. } if name == subscription_id)
    }
}

/// Subscription ids of every subscription-like child.
///
/// Children without an id are ignored, nested groups are skipped, and a
/// malformed id aborts the whole pass.
fn child_subscription_ids(children: &[ChildEntry]) -> Result<Vec<String>> {
    let mut ids = Vec::new();

    for child in children {
        if matches!(child, ChildEntry::Group { .. }) {
            continue;
        }

        let Some(raw) = child.raw_id().filter(|raw| !raw.is_empty()) else {
            continue;
        };

        match parse_child_subscription_id(raw)? {
            ParsedChild::Subscription(id) => ids.push(id.subscription_id),
            ParsedChild::NotASubscription => {}
        }
    }

    Ok(ids)
}

/// All subscription ids currently inside a group
pub fn flatten_subscription_ids(children: &[ChildEntry]) -> Result<BTreeSet<String>> {
    Ok(child_subscription_ids(children)?.into_iter().collect())
}

/// Subscriptions present remotely but absent from `desired`
pub fn subscriptions_to_remove(
    existing: &[ChildEntry],
    desired: &BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    Ok(child_subscription_ids(existing)?
        .into_iter()
        .filter(|id| !desired.contains(id))
        .collect())
}

/// Plan the membership changes for one management group
pub fn plan_membership(
    group: &ManagementGroupId,
    existing: &[ChildEntry],
    desired: &BTreeSet<String>,
) -> Result<Plan> {
    let current = flatten_subscription_ids(existing)?;
    let to_remove = subscriptions_to_remove(existing, desired)?;
    let details: HashMap<String, serde_json::Value> =
        [("management_group".to_string(), serde_json::json!(group.name))]
            .into_iter()
            .collect();

    let mut actions = Vec::new();

    for subscription_id in desired {
        let (action_type, verb) = if current.contains(subscription_id) {
            (ActionType::NoOp, "stays in")
        } else {
            (ActionType::Create, "joins")
        };
        actions.push(Action {
            id: format!("{}-{}", action_type, subscription_id),
            action_type,
            resource_type: "subscription".to_string(),
            resource_id: subscription_id.clone(),
            description: format!("Subscription {} {} {}", subscription_id, verb, group),
            details: details.clone(),
        });
    }

    for subscription_id in to_remove {
        actions.push(Action {
            id: format!("{}-{}", ActionType::Delete, subscription_id),
            action_type: ActionType::Delete,
            resource_type: "subscription".to_string(),
            description: format!("Subscription {} leaves {}", subscription_id, group),
            resource_id: subscription_id,
            details: details.clone(),
        });
    }

    Ok(Plan::new(actions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;

    const SUB_1: &str = "00000000-0000-0000-0000-000000000001";
    const SUB_2: &str = "00000000-0000-0000-0000-000000000002";
    const SUB_3: &str = "00000000-0000-0000-0000-000000000003";

    fn desired(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_removal_set_skips_groups() {
        let existing = vec![
            ChildEntry::subscription(SUB_1),
            ChildEntry::subscription(SUB_2),
            ChildEntry::group("child-group-a"),
        ];

        let removed = subscriptions_to_remove(&existing, &desired(&[SUB_1])).unwrap();
        assert_eq!(removed, desired(&[SUB_2]));
    }

    #[test]
    fn test_group_name_collision_never_removed() {
        // a nested group that happens to be named like a subscription
        let existing = vec![ChildEntry::Group {
            name: Some(SUB_3.to_string()),
            id: Some(format!("/subscriptions/{}", SUB_3)),
        }];

        let removed = subscriptions_to_remove(&existing, &BTreeSet::new()).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn test_missing_or_empty_ids_are_ignored() {
        let existing = vec![
            ChildEntry::Subscription {
                name: Some(SUB_1.to_string()),
                id: None,
            },
            ChildEntry::Subscription {
                name: Some(SUB_2.to_string()),
                id: Some(String::new()),
            },
        ];

        let removed = subscriptions_to_remove(&existing, &BTreeSet::new()).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn test_malformed_child_fails_fast() {
        let existing = vec![
            ChildEntry::subscription(SUB_1),
            ChildEntry::Subscription {
                name: None,
                id: Some("/bad".to_string()),
            },
            ChildEntry::subscription(SUB_2),
        ];

        let err = subscriptions_to_remove(&existing, &BTreeSet::new()).unwrap_err();
        assert!(matches!(
            err,
            CloudError::MalformedIdentifier { segment_count: 1, .. }
        ));
    }

    #[test]
    fn test_membership_is_case_sensitive() {
        let existing = vec![ChildEntry::subscription("ABC")];
        let removed = subscriptions_to_remove(&existing, &desired(&["abc"])).unwrap();
        assert_eq!(removed, desired(&["ABC"]));
    }

    #[test]
    fn test_removal_is_idempotent() {
        let existing = vec![
            ChildEntry::subscription(SUB_1),
            ChildEntry::subscription(SUB_2),
            ChildEntry::subscription(SUB_3),
            ChildEntry::group("child-group-a"),
        ];
        let wanted = desired(&[SUB_2]);

        let first = subscriptions_to_remove(&existing, &wanted).unwrap();
        let second = subscriptions_to_remove(&existing, &wanted).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, desired(&[SUB_1, SUB_3]));
    }

    #[test]
    fn test_from_parts() {
        assert!(matches!(
            ChildEntry::from_parts(Some("/subscriptions"), None, None),
            ChildEntry::Subscription { .. }
        ));
        assert!(matches!(
            ChildEntry::from_parts(Some("Microsoft.Management/managementGroups"), None, None),
            ChildEntry::Group { .. }
        ));
        assert!(matches!(
            ChildEntry::from_parts(None, None, None),
            ChildEntry::Other { .. }
        ));
    }

    #[test]
    fn test_is_subscription_named() {
        assert!(ChildEntry::subscription(SUB_1).is_subscription_named(SUB_1));
        assert!(!ChildEntry::subscription(SUB_1).is_subscription_named(SUB_2));
        assert!(!ChildEntry::group(SUB_1).is_subscription_named(SUB_1));
    }

    #[test]
    fn test_plan_membership() {
        let group = ManagementGroupId::new("mg1");
        let existing = vec![
            ChildEntry::subscription(SUB_1),
            ChildEntry::subscription(SUB_2),
            ChildEntry::group("child-group-a"),
        ];

        let plan = plan_membership(&group, &existing, &desired(&[SUB_1, SUB_3])).unwrap();
        assert!(plan.has_changes);

        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(summary.no_change, 1);

        let deletes = plan.actions_by_type(ActionType::Delete);
        assert_eq!(deletes[0].resource_id, SUB_2);
        let creates = plan.actions_by_type(ActionType::Create);
        assert_eq!(creates[0].resource_id, SUB_3);
    }

    #[test]
    fn test_plan_membership_without_changes() {
        let group = ManagementGroupId::new("mg1");
        let existing = vec![ChildEntry::subscription(SUB_1)];
        let plan = plan_membership(&group, &existing, &desired(&[SUB_1])).unwrap();
        assert!(!plan.has_changes);
    }
}

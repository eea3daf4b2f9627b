//! armflow core
//!
//! Provider-neutral building blocks for managing Azure Resource Manager
//! resources declaratively: typed resource identifiers, management group
//! membership reconciliation, convergence polling and the state records that
//! reads flatten remote resources into.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  armflow CLI                     │
//! │           (arm mg / association / vnet)          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                armflow-azure                     │
//! │  resource adapters (read / expand / flatten)     │
//! │  trait ManagementGroupsApi, VirtualNetworksApi   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                armflow-cloud                     │
//! │  ┌────────────┐ ┌────────────┐ ┌─────────────┐  │
//! │  │ ids        │ │ membership │ │ refresh     │  │
//! │  └────────────┘ └────────────┘ └─────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod features;
pub mod ids;
pub mod membership;
pub mod provider;
pub mod refresh;
pub mod state;
pub mod timeouts;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use features::UserFeatures;
pub use ids::{
    ManagementGroupId, ManagementGroupSubscriptionAssociationId, ParsedChild, SubnetId,
    SubscriptionId, VirtualNetworkId, parse_child_subscription_id,
};
pub use membership::{
    ChildEntry, flatten_subscription_ids, plan_membership, subscriptions_to_remove,
};
pub use provider::{ResourceDefinition, ServiceRegistration, find_resource};
pub use refresh::{RefreshState, Refreshed, StateChangeConf, StateRefresh};
pub use state::{ResourceState, StateFile, StateStore};
pub use timeouts::{Timeouts, with_timeout};

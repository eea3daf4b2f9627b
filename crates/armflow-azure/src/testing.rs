//! In-memory API fakes for adapter tests

use crate::api::{GetGroupOptions, ManagementGroupsApi, SubnetsApi, VirtualNetworksApi};
use crate::error::{AzureError, Result};
use crate::models::*;
use armflow_cloud::membership::CHILD_TYPE_SUBSCRIPTION;
use armflow_cloud::{ManagementGroupId, SubnetId, VirtualNetworkId};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub fn subscription_child(subscription_id: &str) -> ManagementGroupChildInfo {
    ManagementGroupChildInfo {
        kind: Some(CHILD_TYPE_SUBSCRIPTION.to_string()),
        id: Some(format!("/subscriptions/{}", subscription_id)),
        name: Some(subscription_id.to_string()),
        ..Default::default()
    }
}

pub fn group_child(name: &str) -> ManagementGroupChildInfo {
    ManagementGroupChildInfo {
        kind: Some(armflow_cloud::membership::CHILD_TYPE_MANAGEMENT_GROUP.to_string()),
        id: Some(ManagementGroupId::new(name).id()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn group(name: &str, children: Vec<ManagementGroupChildInfo>) -> ManagementGroup {
    ManagementGroup {
        id: Some(ManagementGroupId::new(name).id()),
        name: Some(name.to_string()),
        kind: Some("Microsoft.Management/managementGroups".to_string()),
        properties: Some(ManagementGroupProperties {
            display_name: Some(name.to_string()),
            children: Some(children),
            ..Default::default()
        }),
    }
}

#[derive(Default)]
pub struct FakeGroups {
    pub groups: Mutex<BTreeMap<String, ManagementGroup>>,
    /// Returned by `get` (front first) before the map is consulted
    pub get_errors: Mutex<VecDeque<AzureError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeGroups {
    pub fn with_group(group: ManagementGroup) -> Self {
        let fake = Self::default();
        fake.insert(group);
        fake
    }

    pub fn insert(&self, group: ManagementGroup) {
        let name = group.name.clone().unwrap_or_default();
        self.groups.lock().unwrap().insert(name, group);
    }

    pub fn fail_next_get(&self, err: AzureError) {
        self.get_errors.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subscriptions_of(&self, name: &str) -> Vec<String> {
        self.groups
            .lock()
            .unwrap()
            .get(name)
            .and_then(|g| g.properties.as_ref())
            .and_then(|p| p.children.as_ref())
            .map(|children| children.iter().filter_map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ManagementGroupsApi for FakeGroups {
    async fn get(&self, name: &str, options: GetGroupOptions<'_>) -> Result<ManagementGroup> {
        self.record(format!(
            "get {} recurse={} cache={:?}",
            name, options.recurse, options.cache_control
        ));
        if let Some(err) = self.get_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.groups
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| AzureError::NotFound(name.to_string()))
    }

    async fn create_or_update(
        &self,
        name: &str,
        request: &CreateManagementGroupRequest,
    ) -> Result<ManagementGroup> {
        self.record(format!("put {}", name));
        let mut groups = self.groups.lock().unwrap();
        let entry = groups
            .entry(name.to_string())
            .or_insert_with(|| group(name, vec![]));
        let props = entry.properties.get_or_insert_with(Default::default);
        props.display_name = request.properties.display_name.clone();
        props.details = request
            .properties
            .details
            .as_ref()
            .map(|d| ManagementGroupDetails {
                parent: Some(ParentGroupInfo {
                    id: Some(d.parent.id.clone()),
                    ..Default::default()
                }),
            });
        Ok(entry.clone())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.record(format!("delete {}", name));
        self.groups.lock().unwrap().remove(name);
        Ok(())
    }

    async fn add_subscription(&self, group_name: &str, subscription_id: &str) -> Result<()> {
        self.record(format!("add {} {}", group_name, subscription_id));
        let mut groups = self.groups.lock().unwrap();
        let entry = groups
            .get_mut(group_name)
            .ok_or_else(|| AzureError::NotFound(group_name.to_string()))?;
        let children = entry
            .properties
            .get_or_insert_with(Default::default)
            .children
            .get_or_insert_with(Vec::new);
        if !children
            .iter()
            .any(|c| c.name.as_deref() == Some(subscription_id))
        {
            children.push(subscription_child(subscription_id));
        }
        Ok(())
    }

    async fn remove_subscription(&self, group_name: &str, subscription_id: &str) -> Result<()> {
        self.record(format!("remove {} {}", group_name, subscription_id));
        let mut groups = self.groups.lock().unwrap();
        if let Some(children) = groups
            .get_mut(group_name)
            .and_then(|g| g.properties.as_mut())
            .and_then(|p| p.children.as_mut())
        {
            children.retain(|c| c.name.as_deref() != Some(subscription_id));
        }
        Ok(())
    }
}

/// Virtual networks and subnets keyed by their ARM id
#[derive(Default)]
pub struct FakeNetworks {
    pub vnets: Mutex<BTreeMap<String, VirtualNetwork>>,
    pub subnets: Mutex<BTreeMap<String, Subnet>>,
    pub subnet_errors: Mutex<VecDeque<AzureError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeNetworks {
    pub fn insert_vnet(&self, id: &VirtualNetworkId, vnet: VirtualNetwork) {
        self.vnets.lock().unwrap().insert(id.id(), vnet);
    }

    pub fn insert_subnet(&self, id: &SubnetId, subnet: Subnet) {
        self.subnets.lock().unwrap().insert(id.id(), subnet);
    }

    pub fn fail_next_subnet_get(&self, err: AzureError) {
        self.subnet_errors.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VirtualNetworksApi for FakeNetworks {
    async fn get(&self, id: &VirtualNetworkId) -> Result<VirtualNetwork> {
        self.record(format!("get vnet {}", id.name));
        self.vnets
            .lock()
            .unwrap()
            .get(&id.id())
            .cloned()
            .ok_or_else(|| AzureError::NotFound(id.to_string()))
    }

    async fn create_or_update(
        &self,
        id: &VirtualNetworkId,
        body: &VirtualNetwork,
    ) -> Result<VirtualNetwork> {
        self.record(format!("put vnet {}", id.name));
        let mut stored = body.clone();
        stored.id = Some(id.id());
        stored.name = Some(id.name.clone());
        let props = stored.properties.get_or_insert_with(Default::default);
        props.provisioning_state = Some("Succeeded".to_string());
        props.resource_guid = Some("00000000-0000-0000-0000-00000000beef".to_string());
        self.vnets.lock().unwrap().insert(id.id(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &VirtualNetworkId) -> Result<()> {
        self.record(format!("delete vnet {}", id.name));
        self.vnets.lock().unwrap().remove(&id.id());
        Ok(())
    }
}

#[async_trait]
impl SubnetsApi for FakeNetworks {
    async fn get(&self, id: &SubnetId) -> Result<Subnet> {
        self.record(format!("get subnet {}", id.name));
        if let Some(err) = self.subnet_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.subnets
            .lock()
            .unwrap()
            .get(&id.id())
            .cloned()
            .ok_or_else(|| AzureError::NotFound(id.to_string()))
    }

    async fn create_or_update(&self, id: &SubnetId, body: &Subnet) -> Result<Subnet> {
        self.record(format!("put subnet {}", id.name));
        let mut stored = body.clone();
        stored.id = Some(id.id());
        stored.properties.get_or_insert_with(Default::default).provisioning_state =
            Some("Succeeded".to_string());
        self.subnets.lock().unwrap().insert(id.id(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &SubnetId) -> Result<()> {
        self.record(format!("delete subnet {}", id.name));
        self.subnets.lock().unwrap().remove(&id.id());
        Ok(())
    }
}

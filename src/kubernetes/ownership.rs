// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Get-or-create-or-adopt-or-update for every child resource of an Addon.

use std::collections::BTreeMap;
use std::fmt::Debug;

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{
    api::{DeleteParams, PostParams},
    Api, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{AddonError, Result};
use crate::types::addon::ResourceAdoptionStrategy;
use crate::types::monitoring::{MonitoringStack, ServiceMonitor};
use crate::types::olm::{CatalogSource, OperatorGroup, Subscription};
use crate::types::package::ClusterObjectTemplate;
use crate::types::{Addon, AddonInstance};

/// What to do with an object that already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdoptionAction {
    NoOp,
    Update,
    Adopt,
    Reject,
}

pub fn decide(
    owned_by_us: bool,
    spec_changed: bool,
    labels_changed: bool,
    strategy: ResourceAdoptionStrategy,
) -> AdoptionAction {
    match (owned_by_us, strategy) {
        (true, _) if !spec_changed && !labels_changed => AdoptionAction::NoOp,
        (true, _) => AdoptionAction::Update,
        (false, ResourceAdoptionStrategy::AdoptAll) => AdoptionAction::Adopt,
        (false, _) => AdoptionAction::Reject,
    }
}

/// A child kind whose desired portion can be compared and copied.
pub trait Reconcilable:
    Resource<DynamicType = ()>
    + Clone
    + Serialize
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Whether `self` (the live object) already carries the desired state
    fn matches_desired(&self, desired: &Self) -> bool;

    /// Copy the desired state onto the live object
    fn apply_desired(&mut self, desired: &Self);
}

macro_rules! reconcilable_by_spec {
    ($($kind:ty),* $(,)?) => {
        $(
            impl Reconcilable for $kind {
                fn matches_desired(&self, desired: &Self) -> bool {
                    self.spec == desired.spec
                }

                fn apply_desired(&mut self, desired: &Self) {
                    self.spec = desired.spec.clone();
                }
            }
        )*
    };
}

reconcilable_by_spec!(
    CatalogSource,
    OperatorGroup,
    ServiceMonitor,
    MonitoringStack,
    ClusterObjectTemplate,
    NetworkPolicy,
);

impl Reconcilable for Namespace {
    fn matches_desired(&self, desired: &Self) -> bool {
        is_subset(desired.annotations(), self.annotations())
    }

    fn apply_desired(&mut self, desired: &Self) {
        let merged = merge_maps(self.annotations(), desired.annotations());
        self.meta_mut().annotations = Some(merged);
    }
}

impl Reconcilable for Secret {
    fn matches_desired(&self, desired: &Self) -> bool {
        self.data == desired.data
    }

    // `type` is immutable on existing secrets
    fn apply_desired(&mut self, desired: &Self) {
        self.data = desired.data.clone();
        self.string_data = None;
    }
}

impl Reconcilable for ConfigMap {
    fn matches_desired(&self, desired: &Self) -> bool {
        self.data == desired.data
    }

    fn apply_desired(&mut self, desired: &Self) {
        self.data = desired.data.clone();
    }
}

impl Reconcilable for Subscription {
    fn matches_desired(&self, desired: &Self) -> bool {
        let mut expected = desired.spec.clone();
        expected.install_plan_approval = preserved_install_plan_approval(self, desired);
        self.spec == expected
    }

    // installPlanApproval may be changed by whoever approves upgrades
    fn apply_desired(&mut self, desired: &Self) {
        let approval = preserved_install_plan_approval(self, desired);
        self.spec = desired.spec.clone();
        self.spec.install_plan_approval = approval;
    }
}

fn preserved_install_plan_approval(
    current: &Subscription,
    desired: &Subscription,
) -> Option<String> {
    current
        .spec
        .install_plan_approval
        .clone()
        .or_else(|| desired.spec.install_plan_approval.clone())
}

impl Reconcilable for AddonInstance {
    fn matches_desired(&self, desired: &Self) -> bool {
        self.spec.heartbeat_update_period == desired.spec.heartbeat_update_period
    }

    // markedForDeletion belongs to the deletion coordinator
    fn apply_desired(&mut self, desired: &Self) {
        self.spec.heartbeat_update_period = desired.spec.heartbeat_update_period.clone();
    }
}

/// Controller owner reference pointing at the addon.
pub fn controller_ref(addon: &Addon) -> Vec<OwnerReference> {
    addon.controller_owner_ref(&()).into_iter().collect()
}

fn controller_uid<K: Resource>(obj: &K) -> Option<&str> {
    obj.meta()
        .owner_references
        .as_ref()?
        .iter()
        .find(|o| o.controller == Some(true))
        .map(|o| o.uid.as_str())
}

pub fn is_controlled_by<K: Resource>(obj: &K, addon: &Addon) -> bool {
    match (controller_uid(obj), addon.meta().uid.as_deref()) {
        (Some(owner), Some(uid)) => owner == uid,
        _ => false,
    }
}

/// Union of both maps, `desired` wins on conflicting keys
pub fn merge_maps(
    current: &BTreeMap<String, String>,
    desired: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = current.clone();
    merged.extend(desired.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn is_subset(subset: &BTreeMap<String, String>, superset: &BTreeMap<String, String>) -> bool {
    subset.iter().all(|(k, v)| superset.get(k) == Some(v))
}

/// Make the live object match `desired`, honouring the adoption strategy.
///
/// `desired` must carry the addon's controller reference.
#[instrument(skip(api, desired), fields(kind = %K::kind(&()), name = %desired.name_any()))]
pub async fn reconcile_object<K: Reconcilable>(
    api: &Api<K>,
    desired: K,
    strategy: ResourceAdoptionStrategy,
) -> Result<K> {
    let name = desired.name_any();

    let Some(mut current) = api.get_opt(&name).await? else {
        info!("Creating {} {}", K::kind(&()), name);
        return Ok(api.create(&PostParams::default(), &desired).await?);
    };

    let owned_by_us = match (controller_uid(&current), controller_uid(&desired)) {
        (Some(current_uid), Some(desired_uid)) => current_uid == desired_uid,
        _ => false,
    };
    let merged_labels = merge_maps(current.labels(), desired.labels());
    let labels_changed = &merged_labels != current.labels();
    let spec_changed = !current.matches_desired(&desired);

    match decide(owned_by_us, spec_changed, labels_changed, strategy) {
        AdoptionAction::NoOp => {
            debug!("{} {} is up to date", K::kind(&()), name);
            Ok(current)
        }
        AdoptionAction::Reject => Err(AddonError::NotOwnedByUs {
            kind: K::kind(&()).to_string(),
            name,
        }),
        action => {
            if action == AdoptionAction::Adopt {
                info!("Adopting {} {}", K::kind(&()), name);
            } else {
                info!("Updating {} {}", K::kind(&()), name);
            }
            current.apply_desired(&desired);
            current.meta_mut().labels = Some(merged_labels);
            current.meta_mut().owner_references = desired.meta().owner_references.clone();
            Ok(api.replace(&name, &PostParams::default(), &current).await?)
        }
    }
}

/// Delete the named object if, and only if, the addon controls it.
pub async fn delete_if_controlled<K: Reconcilable>(
    api: &Api<K>,
    name: &str,
    addon: &Addon,
) -> Result<bool> {
    match api.get_opt(name).await? {
        Some(obj) if is_controlled_by(&obj, addon) => {
            info!("Deleting {} {}", K::kind(&()), name);
            match api.delete(name, &DeleteParams::default()).await.map_err(AddonError::from) {
                Ok(_) => Ok(true),
                Err(e) if e.is_not_found() => {
                    debug!("{} {} was already gone", K::kind(&()), name);
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{addon_owner_ref, make_addon, not_found_json, to_json, MockService};
    use crate::types::olm::SubscriptionSpec;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;

    const SECRET_PATH: &str = "/api/v1/namespaces/addon-foo/secrets/pull";

    fn make_secret(owner: Option<OwnerReference>, value: &str, type_: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("pull".to_string()),
                namespace: Some("addon-foo".to_string()),
                owner_references: owner.map(|o| vec![o]),
                labels: Some(BTreeMap::from([("keep".to_string(), "me".to_string())])),
                resource_version: Some("7".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "key".to_string(),
                ByteString(value.as_bytes().to_vec()),
            )])),
            type_: Some(type_.to_string()),
            ..Default::default()
        }
    }

    fn desired_secret() -> Secret {
        let addon = make_addon("foo");
        let mut secret = make_secret(None, "new", "kubernetes.io/dockerconfigjson");
        secret.metadata.owner_references = Some(controller_ref(&addon));
        secret.metadata.labels = Some(addon.common_labels());
        secret.metadata.resource_version = None;
        secret
    }

    fn secrets_api(mock: &MockService) -> Api<Secret> {
        Api::namespaced(mock.clone().into_client(), "addon-foo")
    }

    #[test]
    fn test_decision_table() {
        use AdoptionAction::*;
        use ResourceAdoptionStrategy::*;

        assert_eq!(decide(true, false, false, Unset), NoOp);
        assert_eq!(decide(true, true, false, Prevent), Update);
        assert_eq!(decide(true, false, true, Unset), Update);
        assert_eq!(decide(false, false, false, AdoptAll), Adopt);
        assert_eq!(decide(false, true, true, Prevent), Reject);
        assert_eq!(decide(false, false, false, Unset), Reject);
    }

    #[test]
    fn test_merge_maps_desired_wins_and_keeps_unrelated() {
        let current = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "old".to_string()),
        ]);
        let desired = BTreeMap::from([("b".to_string(), "new".to_string())]);

        let merged = merge_maps(&current, &desired);
        assert_eq!(merged.get("a").unwrap(), "1");
        assert_eq!(merged.get("b").unwrap(), "new");
    }

    #[tokio::test]
    async fn test_creates_missing_object() {
        let mock = MockService::new();

        let strategy = ResourceAdoptionStrategy::Unset;
        let created = reconcile_object(&secrets_api(&mock), desired_secret(), strategy)
            .await
            .unwrap();

        assert_eq!(created.name_any(), "pull");
        let writes = mock.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].method, "POST");
    }

    #[tokio::test]
    async fn test_owned_and_unchanged_is_noop() {
        let mut live = desired_secret();
        live.metadata.resource_version = Some("7".to_string());
        let mock = MockService::new().on_get(SECRET_PATH, 200, &to_json(&live));

        reconcile_object(&secrets_api(&mock), desired_secret(), ResourceAdoptionStrategy::Unset)
            .await
            .unwrap();

        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_owned_and_changed_updates_but_keeps_type() {
        let live = make_secret(Some(addon_owner_ref("foo", "uid-foo")), "old", "Opaque");
        let mock = MockService::new().on_get(SECRET_PATH, 200, &to_json(&live));

        let strategy = ResourceAdoptionStrategy::Unset;
        let updated = reconcile_object(&secrets_api(&mock), desired_secret(), strategy)
            .await
            .unwrap();

        assert_eq!(mock.requests_to("PUT", SECRET_PATH).len(), 1);
        assert_eq!(updated.type_.as_deref(), Some("Opaque"));
        assert_eq!(
            updated.data.unwrap().get("key").unwrap().0,
            b"new".to_vec()
        );
        let labels = updated.metadata.labels.unwrap();
        assert_eq!(labels.get("keep").unwrap(), "me");
    }

    #[tokio::test]
    async fn test_unowned_object_is_rejected_without_adopt_all() {
        for strategy in [ResourceAdoptionStrategy::Unset, ResourceAdoptionStrategy::Prevent] {
            let live = make_secret(None, "old", "Opaque");
            let mock = MockService::new().on_get(SECRET_PATH, 200, &to_json(&live));

            let err = reconcile_object(&secrets_api(&mock), desired_secret(), strategy)
                .await
                .unwrap_err();

            assert!(matches!(err, AddonError::NotOwnedByUs { .. }));
            assert!(mock.writes().is_empty());
        }
    }

    #[tokio::test]
    async fn test_foreign_controller_is_adopted_with_adopt_all() {
        let live = make_secret(Some(addon_owner_ref("other", "uid-other")), "old", "Opaque");
        let mock = MockService::new().on_get(SECRET_PATH, 200, &to_json(&live));

        let strategy = ResourceAdoptionStrategy::AdoptAll;
        let adopted = reconcile_object(&secrets_api(&mock), desired_secret(), strategy)
            .await
            .unwrap();

        let owners = adopted.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "uid-foo");
        assert_eq!(mock.requests_to("PUT", SECRET_PATH).len(), 1);
    }

    #[test]
    fn test_subscription_keeps_live_install_plan_approval() {
        let spec = SubscriptionSpec {
            catalog_source: "addon-foo-catalog".to_string(),
            catalog_source_namespace: "addon-foo".to_string(),
            package: "foo-operator".to_string(),
            channel: "stable".to_string(),
            install_plan_approval: Some("Automatic".to_string()),
            config: None,
        };
        let desired = Subscription::new("addon-foo", spec.clone());
        let mut live = Subscription::new(
            "addon-foo",
            SubscriptionSpec {
                install_plan_approval: Some("Manual".to_string()),
                ..spec
            },
        );

        assert!(live.matches_desired(&desired));

        let mut newer = desired.clone();
        newer.spec.channel = "fast".to_string();
        assert!(!live.matches_desired(&newer));
        live.apply_desired(&newer);
        assert_eq!(live.spec.channel, "fast");
        assert_eq!(live.spec.install_plan_approval.as_deref(), Some("Manual"));
    }

    #[test]
    fn test_namespace_merges_annotations() {
        let mut live = Namespace::default();
        live.metadata.annotations = Some(BTreeMap::from([("a".to_string(), "1".to_string())]));
        let mut desired = Namespace::default();
        desired.metadata.annotations = Some(BTreeMap::from([("b".to_string(), "2".to_string())]));

        assert!(!live.matches_desired(&desired));
        live.apply_desired(&desired);
        assert!(live.matches_desired(&desired));
        assert_eq!(live.annotations().len(), 2);
    }

    #[test]
    fn test_addon_instance_keeps_marked_for_deletion() {
        let mut live = AddonInstance::new("addon-instance", Default::default());
        live.spec.marked_for_deletion = true;
        let mut desired = AddonInstance::new("addon-instance", Default::default());
        desired.spec.heartbeat_update_period = "30s".to_string();

        live.apply_desired(&desired);
        assert!(live.spec.marked_for_deletion);
        assert_eq!(live.spec.heartbeat_update_period, "30s");
    }

    #[tokio::test]
    async fn test_delete_if_controlled_skips_foreign_objects() {
        let addon = make_addon("foo");
        let live = make_secret(Some(addon_owner_ref("other", "uid-other")), "old", "Opaque");
        let mock = MockService::new().on_get(SECRET_PATH, 200, &to_json(&live));

        let deleted = delete_if_controlled(&secrets_api(&mock), "pull", &addon).await.unwrap();

        assert!(!deleted);
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_delete_if_controlled_tolerates_concurrent_removal() {
        let addon = make_addon("foo");
        let live = make_secret(Some(addon_owner_ref("foo", "uid-foo")), "old", "Opaque");
        let mock = MockService::new()
            .on_get(SECRET_PATH, 200, &to_json(&live))
            .on("DELETE", SECRET_PATH, 404, &not_found_json("secrets", "pull"));

        let deleted = delete_if_controlled(&secrets_api(&mock), "pull", &addon).await.unwrap();

        assert!(!deleted);
        assert_eq!(mock.requests_to("DELETE", SECRET_PATH).len(), 1);
    }
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use crate::ocm::types::{AddOnStatus, Cluster, UpgradePolicyState};
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request seen by the mock, kept for assertions.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// A mock HTTP service that returns predefined responses based on request paths.
///
/// Unregistered POST/PUT requests echo their body back (so creates and
/// updates succeed), unregistered PATCH requests answer with the object
/// registered for GET on the same path (minus a `/status` suffix), and
/// unregistered DELETE requests succeed. Everything else is a 404.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for requests with the given method and exact path
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests that changed state (everything except GET)
    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn find_response(&self, method: &str, path: &str, body: &str) -> (u16, String) {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return resp.clone();
        }

        match method {
            "POST" => (201, body.to_string()),
            "PUT" => (200, body.to_string()),
            "PATCH" => {
                let object_path = path.strip_suffix("/status").unwrap_or(path);
                responses
                    .get(&("GET".to_string(), object_path.to_string()))
                    .filter(|(status, _)| *status < 300)
                    .cloned()
                    .unwrap_or_else(|| (200, body.to_string()))
            }
            "DELETE" => (200, success_json()),
            _ => (404, not_found_json("object", path)),
        }
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let this = self.clone();

        Box::pin(async move {
            let method = req.method().to_string();
            let path = req.uri().path().to_string();
            let bytes = req
                .into_body()
                .collect()
                .await
                .map(|b| b.to_bytes())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&bytes).to_string();

            let (status, response) = this.find_response(&method, &path, &body);
            this.requests.lock().unwrap().push(RecordedRequest { method, path, body });

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(response.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

fn success_json() -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Success",
        "code": 200
    })
    .to_string()
}

/// Serialize any object into a response body
pub fn to_json<T: serde::Serialize>(object: &T) -> String {
    serde_json::to_string(object).unwrap()
}

/// Serialize `object` as the API server returns it, with server-populated metadata
pub fn served<K: kube::Resource + serde::Serialize + Clone>(object: &K) -> String {
    let mut served = object.clone();
    let meta = served.meta_mut();
    meta.uid = Some("0b8f5c2e-served".to_string());
    meta.resource_version = Some("4711".to_string());
    meta.generation = Some(1);
    meta.creation_timestamp = Some(k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(
        chrono::Utc::now(),
    ));
    to_json(&served)
}

/// Owner reference pointing at an addon with the given uid
pub fn addon_owner_ref(name: &str, uid: &str) -> OwnerReference {
    OwnerReference {
        api_version: "addons.managed.openshift.io/v1alpha1".to_string(),
        kind: "Addon".to_string(),
        name: name.to_string(),
        uid: uid.to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// An OLMOwnNamespace addon named `name`, with uid `uid-<name>`, installing into `addon-<name>`
pub fn make_addon(name: &str) -> crate::types::Addon {
    use crate::types::addon::{AddonInstallOlmCommon, AddonInstallSpec, AddonInstallType};

    let namespace = format!("addon-{}", name);
    let mut addon = crate::types::Addon::new(
        name,
        crate::types::AddonSpec {
            display_name: name.to_string(),
            namespaces: vec![crate::types::addon::AddonNamespace {
                name: namespace.clone(),
                ..Default::default()
            }],
            install: AddonInstallSpec {
                install_type: AddonInstallType::OLMOwnNamespace,
                olm_own_namespace: Some(AddonInstallOlmCommon {
                    namespace,
                    catalog_source_image: "quay.io/osd/index:latest".to_string(),
                    channel: "stable".to_string(),
                    package_name: format!("{}-operator", name),
                    ..Default::default()
                }),
                olm_all_namespaces: None,
            },
            ..Default::default()
        },
    );
    addon.metadata.uid = Some(format!("uid-{}", name));
    addon.metadata.generation = Some(1);
    addon
}

/// In-memory OCM that remembers reported statuses and counts calls.
#[derive(Default)]
pub struct FakeOcmClient {
    fail: bool,
    statuses: Mutex<HashMap<String, AddOnStatus>>,
    posts: std::sync::atomic::AtomicUsize,
    patches: std::sync::atomic::AtomicUsize,
    upgrade_states: Mutex<Vec<String>>,
}

impl FakeOcmClient {
    /// Every call fails with an OCM error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn posts(&self) -> usize {
        self.posts.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn patches(&self) -> usize {
        self.patches.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn upgrade_states(&self) -> Vec<String> {
        self.upgrade_states.lock().unwrap().clone()
    }

    fn check(&self) -> crate::error::Result<()> {
        if self.fail {
            return Err(crate::error::AddonError::Ocm("unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::ocm::OcmClient for FakeOcmClient {
    async fn post_addon_status(&self, status: &AddOnStatus) -> crate::error::Result<()> {
        self.check()?;
        self.posts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .insert(status.addon_id.clone(), status.clone());
        Ok(())
    }

    async fn patch_addon_status(&self, status: &AddOnStatus) -> crate::error::Result<()> {
        self.check()?;
        self.patches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .insert(status.addon_id.clone(), status.clone());
        Ok(())
    }

    async fn get_addon_status(&self, addon_id: &str) -> crate::error::Result<Option<AddOnStatus>> {
        self.check()?;
        Ok(self.statuses.lock().unwrap().get(addon_id).cloned())
    }

    async fn get_cluster(&self, external_id: &str) -> crate::error::Result<Cluster> {
        self.check()?;
        Ok(Cluster {
            id: format!("ocm-{}", external_id),
            external_id: external_id.to_string(),
        })
    }

    async fn get_upgrade_policy(
        &self,
        _policy_id: &str,
    ) -> crate::error::Result<UpgradePolicyState> {
        self.check()?;
        let value = self.upgrade_states.lock().unwrap().last().cloned().unwrap_or_default();
        Ok(UpgradePolicyState {
            value,
            description: String::new(),
        })
    }

    async fn patch_upgrade_policy(
        &self,
        _policy_id: &str,
        state: &UpgradePolicyState,
    ) -> crate::error::Result<()> {
        self.check()?;
        self.upgrade_states.lock().unwrap().push(state.value.clone());
        Ok(())
    }
}

// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use super::types::{AddOnStatus, Cluster, ClusterList, UpgradePolicyState};
use crate::error::{AddonError, Result};
use crate::metrics::Metrics;
use crate::types::addon_operator::AddonOperatorOcm;
use crate::types::openshift::ClusterVersion;

const PULL_SECRET_KEY: &str = ".dockerconfigjson";
const OCM_AUTH_HOST: &str = "cloud.openshift.com";
const CLUSTER_VERSION_NAME: &str = "version";

/// Calls made against OCM on behalf of this cluster.
#[async_trait]
pub trait OcmClient: Send + Sync {
    async fn post_addon_status(&self, status: &AddOnStatus) -> Result<()>;

    async fn patch_addon_status(&self, status: &AddOnStatus) -> Result<()>;

    /// None when OCM has never seen a status for the addon
    async fn get_addon_status(&self, addon_id: &str) -> Result<Option<AddOnStatus>>;

    async fn get_cluster(&self, external_id: &str) -> Result<Cluster>;

    async fn get_upgrade_policy(&self, policy_id: &str) -> Result<UpgradePolicyState>;

    async fn patch_upgrade_policy(&self, policy_id: &str, state: &UpgradePolicyState) -> Result<()>;
}

pub struct HttpOcmClient {
    http: reqwest::Client,
    base: Url,
    authorization: String,
    cluster_id: String,
    metrics: Option<Arc<Metrics>>,
}

impl HttpOcmClient {
    /// Build a client and resolve the OCM cluster id of `external_cluster_id`
    pub async fn connect(
        endpoint: &str,
        access_token: &str,
        external_cluster_id: &str,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let base = Url::parse(endpoint)
            .map_err(|e| {
                AddonError::Configuration(format!("invalid OCM endpoint {}: {}", endpoint, e))
            })?;
        let mut client = Self {
            http: reqwest::Client::new(),
            base,
            authorization: format!("AccessToken {}:{}", external_cluster_id, access_token),
            cluster_id: String::new(),
            metrics,
        };
        client.cluster_id = client.get_cluster(external_cluster_id).await?.id;
        info!("Connected to OCM at {} as cluster {}", endpoint, client.cluster_id);
        Ok(client)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AddonError::Ocm(format!("invalid request path {}: {}", path, e)))
    }

    fn status_path(&self) -> String {
        format!("/api/addons_mgmt/v1/clusters/{}/status", self.cluster_id)
    }

    fn upgrade_policy_path(&self, policy_id: &str) -> String {
        format!(
            "/api/clusters_mgmt/v1/clusters/{}/upgrade_policies/{}/state",
            self.cluster_id, policy_id
        )
    }

    /// Send a request; `Ok(None)` on 404
    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<T>> {
        let started = Instant::now();
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(reqwest::header::AUTHORIZATION, &self.authorization);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_ocm_request(method.as_str(), started.elapsed());
        }

        let response = response?;
        let status = response.status();
        debug!("{} {} -> {}", method, url.path(), status);
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AddonError::Ocm(format!(
                "{} {} returned {}: {}",
                method,
                url.path(),
                status,
                text
            )));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Some(serde_json::from_str("null")?));
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn send_required<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let path = url.path().to_string();
        self.send(method.clone(), url, body)
            .await?
            .ok_or_else(|| AddonError::Ocm(format!("{} {} returned 404", method, path)))
    }
}

#[async_trait]
impl OcmClient for HttpOcmClient {
    #[instrument(skip_all, fields(addon = %status.addon_id))]
    async fn post_addon_status(&self, status: &AddOnStatus) -> Result<()> {
        let url = self.url(&self.status_path())?;
        let _: serde_json::Value = self.send_required(Method::POST, url, Some(status)).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(addon = %status.addon_id))]
    async fn patch_addon_status(&self, status: &AddOnStatus) -> Result<()> {
        let url = self.url(&format!("{}/{}", self.status_path(), status.addon_id))?;
        let _: serde_json::Value = self.send_required(Method::PATCH, url, Some(status)).await?;
        Ok(())
    }

    async fn get_addon_status(&self, addon_id: &str) -> Result<Option<AddOnStatus>> {
        let url = self.url(&format!("{}/{}", self.status_path(), addon_id))?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    async fn get_cluster(&self, external_id: &str) -> Result<Cluster> {
        let mut url = self.url("/api/clusters_mgmt/v1/clusters")?;
        url.query_pairs_mut()
            .append_pair("search", &format!("external_id='{}'", external_id));
        let list: ClusterList = self.send_required::<(), _>(Method::GET, url, None).await?;
        list.items
            .into_iter()
            .next()
            .ok_or_else(|| {
                AddonError::Ocm(format!("no OCM cluster with external id {}", external_id))
            })
    }

    async fn get_upgrade_policy(&self, policy_id: &str) -> Result<UpgradePolicyState> {
        let url = self.url(&self.upgrade_policy_path(policy_id))?;
        self.send_required::<(), _>(Method::GET, url, None).await
    }

    #[instrument(skip(self, state))]
    async fn patch_upgrade_policy(
        &self,
        policy_id: &str,
        state: &UpgradePolicyState,
    ) -> Result<()> {
        let url = self.url(&self.upgrade_policy_path(policy_id))?;
        let _: serde_json::Value = self.send_required(Method::PATCH, url, Some(state)).await?;
        Ok(())
    }
}

/// The `cloud.openshift.com` auth entry of a `.dockerconfigjson` pull secret
pub fn access_token_from_pull_secret(secret: &Secret) -> Result<String> {
    let raw = secret
        .data
        .as_ref()
        .and_then(|d| d.get(PULL_SECRET_KEY))
        .ok_or_else(|| {
            AddonError::Configuration(format!("pull secret has no {} key", PULL_SECRET_KEY))
        })?;
    let config: serde_json::Value = serde_json::from_slice(&raw.0)?;
    config["auths"][OCM_AUTH_HOST]["auth"]
        .as_str()
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AddonError::Configuration(format!("pull secret has no auth for {}", OCM_AUTH_HOST))
        })
}

/// Build an OCM client from the AddonOperator's OCM settings
pub async fn connect_from_cluster(
    kube: &kube::Client,
    ocm: &AddonOperatorOcm,
    metrics: Option<Arc<Metrics>>,
) -> Result<HttpOcmClient> {
    let secrets: Api<Secret> = Api::namespaced(kube.clone(), &ocm.secret.namespace);
    let token = access_token_from_pull_secret(&secrets.get(&ocm.secret.name).await?)?;

    let versions: Api<ClusterVersion> = Api::all(kube.clone());
    let cluster_id = versions.get(CLUSTER_VERSION_NAME).await?.spec.cluster_id;

    HttpOcmClient::connect(&ocm.endpoint, &token, &cluster_id, metrics).await
}

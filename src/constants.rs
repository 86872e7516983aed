// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name, used as field manager and in log fields
pub const OPERATOR_NAME: &str = "addon-operator";

/// Name of the singleton AddonOperator object
pub const ADDON_OPERATOR_OBJECT_NAME: &str = "addon-operator";

/// Name of the AddonInstance object in each addon target namespace
pub const ADDON_INSTANCE_NAME: &str = "addon-instance";

/// Finalizer added to every Addon; removed once the Addon is deleted
pub const CACHE_FINALIZER: &str = "addons.managed.openshift.io/cache";

/// Default interval for "not ready yet" retries
pub const DEFAULT_RETRY_SECS: u64 = 10;

/// Upper bound for requeue delays derived from user supplied durations
pub const MAX_REQUEUE_SECS: u64 = 24 * 60 * 60;

/// Kubernetes label keys used by the operator
pub mod labels {
    /// Identifies the addon that owns a child resource
    pub const ADDON: &str = "addons.managed.openshift.io/addon";
    /// Marks objects that the operator caches and watches
    pub const CACHE: &str = "addons.managed.openshift.io/cache";
    /// Marks propagated secrets with the owning addon name
    pub const SECRET_PROPAGATION: &str = "addons.managed.openshift.io/secret-propagation";
    /// Marks an addon for deletion when set to "true"
    pub const DELETE: &str = "addons.managed.openshift.io/delete";
    /// Label OLM puts on CatalogSource pods
    pub const OLM_CATALOG_SOURCE: &str = "olm.catalogSource";
}

/// Kubernetes annotation keys used by the operator
pub mod annotations {
    /// Overrides the deletion acknowledgement timeout (e.g. "30m")
    pub const DELETE_TIMEOUT: &str = "addons.managed.openshift.io/delete-timeout";
}

/// Status condition types and reasons
pub mod conditions {
    pub const AVAILABLE: &str = "Available";
    pub const PAUSED: &str = "Paused";
    pub const INSTALLED: &str = "Installed";
    pub const UPGRADE_STARTED: &str = "UpgradeStarted";
    pub const UPGRADE_SUCCEEDED: &str = "UpgradeSucceeded";
    pub const READY_TO_BE_DELETED: &str = "ReadyToBeDeleted";
    pub const DELETE_TIMEOUT: &str = "DeleteTimeout";

    pub mod reasons {
        pub const FULLY_RECONCILED: &str = "FullyReconciled";
        pub const TERMINATING: &str = "Terminating";
        pub const CONFIGURATION_ERROR: &str = "ConfigurationError";
        pub const UNREADY_NAMESPACES: &str = "UnreadyNamespaces";
        pub const UNREADY_SECRET_PROPAGATION: &str = "UnreadySecretPropagation";
        pub const COLLIDED_NAMESPACES: &str = "CollidedNamespaces";
        pub const UNREADY_CATALOG_SOURCE: &str = "UnreadyCatalogSource";
        pub const UNREADY_CSV: &str = "UnreadyCSV";
        pub const MISSING_CSV: &str = "MissingCSV";
        pub const UNREADY_MONITORING_STACK: &str = "UnreadyMonitoringStack";
        pub const UNREADY_PACKAGE: &str = "UnreadyClusterObjectTemplate";
        pub const ADDON_OPERATOR_PAUSED: &str = "AddonOperatorPaused";
        pub const ADDON_PAUSED: &str = "AddonPaused";
        pub const ADDON_INSTALLED: &str = "AddonInstalled";
        pub const ADDON_NOT_INSTALLED_YET: &str = "AddonNotInstalledYet";
        pub const UPGRADE_STARTED: &str = "AddonUpgradeStarted";
        pub const UPGRADE_SUCCEEDED: &str = "AddonUpgradeSucceeded";
        pub const READY_TO_BE_DELETED: &str = "AddonReadyToBeDeleted";
        pub const NOT_READY_TO_BE_DELETED: &str = "AddonNotReadyToBeDeleted";
        pub const DELETION_TIMED_OUT: &str = "AddonDeletionTimedOut";
        pub const HEARTBEAT_TIMEOUT: &str = "HeartbeatTimeout";
        pub const NO_HEARTBEAT: &str = "NoHeartbeatReported";
        pub const READY: &str = "Ready";
    }
}

/// OLM related naming
pub mod olm {
    /// gRPC port served by CatalogSource registry pods
    pub const CATALOG_SOURCE_GRPC_PORT: i32 = 50051;
    pub const CATALOG_SOURCE_READY_STATE: &str = "READY";
    pub const INSTALL_PLAN_APPROVAL_AUTOMATIC: &str = "Automatic";
}

/// Legacy deletion signal
pub mod legacy {
    /// Label put on the ConfigMap (named after the addon) in the addon target
    /// namespace to request uninstall
    pub fn delete_config_map_label(addon_name: &str) -> String {
        format!("api.openshift.com/addon-{}-delete", addon_name)
    }
}

/// Deletion coordination defaults
pub mod deletion {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60 * 60;
}

/// AddonInstance heartbeat defaults
pub mod heartbeat {
    pub const DEFAULT_UPDATE_PERIOD: &str = "10s";
    /// Missed periods before a heartbeat is considered timed out
    pub const THRESHOLD_MULTIPLIER: u32 = 3;
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
    /// API groups that must be served before controllers start
    pub const REQUIRED_GROUPS: &[&str] = &["operators.coreos.com"];
}

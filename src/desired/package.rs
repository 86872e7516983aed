// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::ResourceExt;
use serde_json::json;

use super::child_meta;
use crate::error::Result;
use crate::types::package::{ClusterObjectTemplate, ClusterObjectTemplateSpec};
use crate::types::Addon;

/// ClusterObjectTemplate rendering a ClusterPackage for the addon's package image
pub fn build_cluster_object_template(
    addon: &Addon,
    image: &str,
    target_namespace: &str,
) -> Result<ClusterObjectTemplate> {
    let package = json!({
        "apiVersion": "package-operator.run/v1alpha1",
        "kind": "ClusterPackage",
        "metadata": {
            "name": addon.name_any(),
        },
        "spec": {
            "image": image,
            "config": {
                "addonsv1": {
                    "targetNamespace": target_namespace,
                    "clusterID": "{{.config.clusterID}}",
                    "ocmClusterID": "{{.config.ocmClusterID}}",
                    "ocmClusterName": "{{.config.ocmClusterName}}",
                },
            },
        },
    });

    Ok(ClusterObjectTemplate {
        metadata: child_meta(addon, &addon.name_any(), None),
        spec: ClusterObjectTemplateSpec {
            template: serde_yaml::to_string(&package)?,
            sources: Vec::new(),
        },
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_addon;

    #[test]
    fn test_template_renders_cluster_package() {
        let addon = make_addon("foo");

        let template =
            build_cluster_object_template(&addon, "quay.io/osd/foo-package:v1", "addon-foo")
                .unwrap();

        let rendered: serde_json::Value = serde_yaml::from_str(&template.spec.template).unwrap();
        assert_eq!(rendered["kind"], "ClusterPackage");
        assert_eq!(rendered["spec"]["image"], "quay.io/osd/foo-package:v1");
        assert_eq!(rendered["spec"]["config"]["addonsv1"]["targetNamespace"], "addon-foo");
        assert!(template.namespace().is_none());
    }
}

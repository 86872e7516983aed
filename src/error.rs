// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddonError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} {name} is not owned by this addon")]
    NotOwnedByUs { kind: String, name: String },

    #[error("Invalid addon configuration: {0}")]
    Configuration(String),

    #[error("{name}: {source}")]
    SubReconciler {
        name: &'static str,
        #[source]
        source: Box<AddonError>,
    },

    #[error("OCM API error: {0}")]
    Ocm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("{}", join_errors(.0))]
    Aggregate(Vec<AddonError>),
}

impl AddonError {
    /// Number of leaf errors carried by this error.
    pub fn count(&self) -> usize {
        match self {
            AddonError::Aggregate(errors) => errors.iter().map(AddonError::count).sum(),
            _ => 1,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AddonError::KubeError(kube::Error::Api(e)) if e.code == 404)
    }
}

fn join_errors(errors: &[AddonError]) -> String {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("[{}]", messages.join(", "))
}

pub type Result<T> = std::result::Result<T, AddonError>;

/// Collects failures of independent concerns so one does not hide another.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<AddonError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: AddonError) {
        match error {
            AddonError::Aggregate(inner) => self.errors.extend(inner),
            other => self.errors.push(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(mut self) -> Result<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(AddonError::Aggregate(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_is_ok() {
        assert!(ErrorList::new().into_result().is_ok());
    }

    #[test]
    fn test_single_error_is_not_wrapped() {
        let mut errors = ErrorList::new();
        errors.push(AddonError::Ocm("boom".to_string()));

        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, AddonError::Ocm(_)));
        assert_eq!(err.count(), 1);
    }

    #[test]
    fn test_multiple_errors_are_aggregated_and_flattened() {
        let mut errors = ErrorList::new();
        errors.push(AddonError::Ocm("first".to_string()));
        errors.push(AddonError::Aggregate(vec![
            AddonError::Configuration("second".to_string()),
            AddonError::InvalidDuration("third".to_string()),
        ]));

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.count(), 3);
        assert!(err.to_string().contains("first"));
        assert!(err.to_string().contains("third"));
    }

    #[test]
    fn test_sub_reconciler_error_names_the_phase() {
        let err = AddonError::SubReconciler {
            name: "olm",
            source: Box::new(AddonError::NotOwnedByUs {
                kind: "CatalogSource".to_string(),
                name: "addon-foo-catalog".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "olm: CatalogSource addon-foo-catalog is not owned by this addon"
        );
    }
}

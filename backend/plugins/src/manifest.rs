//! Plugin manifest: describes a BrainDrive plugin package and the modules its
//! module-federation container exposes.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Context;
use braindrive_core::ServiceName;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_BUNDLE: &str = "remoteEntry.js";

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("manifest is missing '{0}'")]
    MissingField(&'static str),
    #[error("version '{0}' is not MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
    #[error("manifest declares no modules")]
    NoModules,
    #[error("module id '{0}' is declared more than once")]
    DuplicateModule(String),
    #[error("module '{module}' expose path '{path}' must start with './'")]
    InvalidExposePath { module: String, path: String },
    #[error("module '{module}' requires unknown service '{service}'")]
    UnknownService { module: String, service: String },
}

/// One exposed sub-module of the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginModule {
    pub id: String,
    pub name: String,
    pub display_name: String,
    /// Key in the federation `exposes` map, e.g. `./PluginTemplate`.
    pub expose_path: String,
    #[serde(default)]
    pub description: String,
    /// Field name → field schema, as shown by the host's config editor.
    #[serde(default)]
    pub config_fields: serde_json::Map<String, Value>,
    #[serde(default)]
    pub required_services: Vec<String>,
}

/// Full plugin manifest (parsed from `plugin.json` in the package).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Module-federation container name.
    pub scope: String,
    #[serde(default = "default_bundle")]
    pub bundle: String,
    #[serde(default)]
    pub modules: Vec<PluginModule>,
}

fn default_bundle() -> String {
    DEFAULT_BUNDLE.to_string()
}

impl PluginManifest {
    /// The manifest the template ships with.
    pub fn template() -> Self {
        Self {
            id: "braindrive-plugin-template".to_string(),
            name: "BrainDrive Plugin Template".to_string(),
            version: "1.0.0".to_string(),
            description: "A template for building BrainDrive plugins".to_string(),
            author: Some("BrainDrive".to_string()),
            scope: "BrainDrivePluginTemplate".to_string(),
            bundle: default_bundle(),
            modules: vec![PluginModule {
                id: "PluginTemplate".to_string(),
                name: "PluginTemplate".to_string(),
                display_name: "Plugin Template".to_string(),
                expose_path: "./PluginTemplate".to_string(),
                description: "Displays data from the host API with theme support".to_string(),
                config_fields: serde_json::Map::new(),
                required_services: ServiceName::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            }],
        }
    }

    /// Every problem found, in declaration order.
    pub fn problems(&self) -> Vec<ManifestError> {
        let mut problems = Vec::new();
        for (field, value) in [("id", &self.id), ("name", &self.name), ("scope", &self.scope), ("bundle", &self.bundle)] {
            if value.trim().is_empty() {
                problems.push(ManifestError::MissingField(field));
            }
        }
        if self.version.trim().is_empty() {
            problems.push(ManifestError::MissingField("version"));
        } else if !SEMVER.is_match(&self.version) {
            problems.push(ManifestError::InvalidVersion(self.version.clone()));
        }
        if self.modules.is_empty() {
            problems.push(ManifestError::NoModules);
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            if module.id.trim().is_empty() {
                problems.push(ManifestError::MissingField("modules[].id"));
            } else if !seen.insert(module.id.as_str()) {
                problems.push(ManifestError::DuplicateModule(module.id.clone()));
            }
            if !module.expose_path.starts_with("./") || module.expose_path.len() <= 2 {
                problems.push(ManifestError::InvalidExposePath {
                    module: module.id.clone(),
                    path: module.expose_path.clone(),
                });
            }
            for service in &module.required_services {
                if service.parse::<ServiceName>().is_err() {
                    problems.push(ManifestError::UnknownService {
                        module: module.id.clone(),
                        service: service.clone(),
                    });
                }
            }
        }
        problems
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        match self.problems().into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }

    /// The federation `exposes` map: expose path → module name.
    pub fn federation_exposes(&self) -> BTreeMap<String, String> {
        self.modules.iter().map(|m| (m.expose_path.clone(), m.name.clone())).collect()
    }

    pub fn module(&self, id: &str) -> Option<&PluginModule> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// Read and validate a manifest file.
pub fn load_manifest(path: &Path) -> anyhow::Result<PluginManifest> {
    let manifest = read_manifest(path)?;
    manifest.validate()?;
    Ok(manifest)
}

/// Read and parse a manifest without validating it.
pub fn read_manifest(path: &Path) -> anyhow::Result<PluginManifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read manifest at {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse manifest at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_valid() {
        let manifest = PluginManifest::template();
        assert!(manifest.validate().is_ok());
        let exposes = manifest.federation_exposes();
        assert_eq!(exposes.get("./PluginTemplate").map(String::as_str), Some("PluginTemplate"));
    }

    #[test]
    fn reports_every_problem() {
        let mut manifest = PluginManifest::template();
        manifest.version = "1.0".into();
        let mut dup = manifest.modules[0].clone();
        dup.expose_path = "PluginTemplate".into();
        dup.required_services.push("clipboard".into());
        manifest.modules.push(dup);

        let problems = manifest.problems();
        assert_eq!(problems[0], ManifestError::InvalidVersion("1.0".into()));
        assert!(problems.contains(&ManifestError::DuplicateModule("PluginTemplate".into())));
        assert!(problems.iter().any(|p| matches!(p, ManifestError::InvalidExposePath { .. })));
        assert!(problems.iter().any(|p| matches!(p, ManifestError::UnknownService { service, .. } if service == "clipboard")));
    }

    #[test]
    fn load_defaults_bundle_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.json");
        let json = r#"{
            "id": "weather", "name": "Weather", "version": "0.2.0-beta.1", "scope": "Weather",
            "modules": [{"id": "Forecast", "name": "Forecast", "displayName": "Forecast",
                         "exposePath": "./Forecast", "requiredServices": ["api", "theme"]}]
        }"#;
        std::fs::write(&path, json).unwrap();
        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.bundle, DEFAULT_BUNDLE);
        assert!(manifest.module("Forecast").is_some());
    }

    #[test]
    fn load_rejects_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.json");
        std::fs::write(&path, r#"{"id": "", "name": "x", "version": "1.0.0", "scope": "x"}"#).unwrap();
        let err = load_manifest(&path).unwrap_err();
        assert_eq!(err.downcast_ref::<ManifestError>(), Some(&ManifestError::MissingField("id")));

        let unchecked = read_manifest(&path).unwrap();
        assert_eq!(unchecked.problems().len(), 2);
    }
}

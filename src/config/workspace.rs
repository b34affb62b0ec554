//! Workspace file parsing
//!
//! The workspace file is JSON and lists projects, each with named targets:
//!
//! ```json
//! {
//!   "version": 1,
//!   "defaultProject": "app",
//!   "projects": {
//!     "app": {
//!       "root": "apps/app",
//!       "targets": {
//!         "build": {
//!           "builder": "architect:run-commands",
//!           "options": { "commands": ["make"] },
//!           "configurations": {
//!             "production": { "commands": ["make release"] }
//!           }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Other project fields such as `root` or `sourceRoot` are accepted and ignored.
//!
//! `architect` is accepted in place of `targets`.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::validation::validate_workspace;
use crate::error::{hints, ArchitectError};

/// Workspace file names, in lookup order within one directory
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "angular.json",
    ".angular.json",
    "workspace.json",
    ".workspace.json",
];

fn default_version() -> u32 {
    1
}

/// Root of the workspace file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project used when a target string leaves the project empty
    pub default_project: Option<String>,

    #[serde(default)]
    pub projects: IndexMap<String, ProjectConfig>,
}

/// One project of the workspace
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default, alias = "architect")]
    pub targets: IndexMap<String, TargetConfig>,
}

/// A named target of a project
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Builder name in `package:name` form
    pub builder: String,

    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(default)]
    pub configurations: IndexMap<String, Map<String, Value>>,

    /// Configuration applied when the target string names none
    pub default_configuration: Option<String>,
}

impl Workspace {
    /// Load and validate a workspace file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::from_json(path, &content)?)
    }

    pub fn from_json(path: &Path, content: &str) -> Result<Self, ArchitectError> {
        let workspace: Workspace = serde_json::from_str(content).map_err(|e| {
            ArchitectError::invalid_workspace(
                path,
                e.to_string(),
                Some(hints::invalid_json().to_string()),
            )
        })?;
        validate_workspace(&workspace, path)?;
        Ok(workspace)
    }

    /// Name of the project a target string refers to
    pub fn resolve_project_name<'a>(&'a self, name: &'a str) -> Result<&'a str, ArchitectError> {
        if !name.is_empty() {
            return Ok(name);
        }
        self.default_project.as_deref().ok_or_else(|| ArchitectError::UnknownProject {
            project: String::new(),
            available: self.project_names(),
        })
    }

    pub fn project(&self, name: &str) -> Result<&ProjectConfig, ArchitectError> {
        self.projects
            .get(name)
            .ok_or_else(|| ArchitectError::UnknownProject {
                project: name.to_string(),
                available: self.project_names(),
            })
    }

    pub fn project_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }
}

impl ProjectConfig {
    pub fn target(&self, project: &str, name: &str) -> Result<&TargetConfig, ArchitectError> {
        self.targets
            .get(name)
            .ok_or_else(|| ArchitectError::UnknownTarget {
                project: project.to_string(),
                target: name.to_string(),
                available: self.targets.keys().cloned().collect(),
            })
    }
}

impl TargetConfig {
    /// Merge target options, configuration options and overrides, in that order
    ///
    /// `configuration` may name several configurations separated by commas;
    /// they are applied left to right. Without one, the target's
    /// `defaultConfiguration` is used if set.
    pub fn resolve_options(
        &self,
        target: &str,
        configuration: Option<&str>,
        overrides: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ArchitectError> {
        let mut options = self.options.clone();

        let configuration = configuration.or(self.default_configuration.as_deref());
        for name in configuration
            .into_iter()
            .flat_map(|c| c.split(','))
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let values = self.configurations.get(name).ok_or_else(|| {
                ArchitectError::UnknownConfiguration {
                    target: target.to_string(),
                    configuration: name.to_string(),
                    available: self.configurations.keys().cloned().collect(),
                }
            })?;
            options.extend(values.clone());
        }

        options.extend(overrides.clone());
        Ok(options)
    }
}

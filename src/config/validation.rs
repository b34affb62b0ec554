//! Workspace validation with helpful error messages

use std::path::Path;

use super::workspace::{TargetConfig, Workspace};
use crate::error::ArchitectError;

const SUPPORTED_VERSION: u32 = 1;

/// Validate the entire workspace file
pub fn validate_workspace(workspace: &Workspace, path: &Path) -> Result<(), ArchitectError> {
    if workspace.version != SUPPORTED_VERSION {
        return Err(ArchitectError::invalid_workspace(
            path,
            format!("unsupported version {}", workspace.version),
            Some(format!("Set \"version\": {} in the workspace file", SUPPORTED_VERSION)),
        ));
    }

    if let Some(default) = &workspace.default_project {
        if !workspace.projects.contains_key(default) {
            return Err(ArchitectError::invalid_workspace(
                path,
                format!("defaultProject '{}' is not a project of this workspace", default),
                None,
            ));
        }
    }

    for (project, config) in &workspace.projects {
        if project.trim().is_empty() {
            return Err(ArchitectError::invalid_workspace(
                path,
                "project names cannot be empty",
                None,
            ));
        }

        for (name, target) in &config.targets {
            if name.trim().is_empty() {
                return Err(ArchitectError::invalid_workspace(
                    path,
                    format!("project '{}' has a target with an empty name", project),
                    None,
                ));
            }
            validate_target(target, &format!("{}:{}", project, name), path)?;
        }
    }

    Ok(())
}

/// Validate a single target definition
fn validate_target(target: &TargetConfig, name: &str, path: &Path) -> Result<(), ArchitectError> {
    let well_formed = target
        .builder
        .split_once(':')
        .is_some_and(|(package, builder)| !package.is_empty() && !builder.is_empty());

    if !well_formed {
        return Err(ArchitectError::invalid_workspace(
            path,
            format!("target '{}' has invalid builder '{}'", name, target.builder),
            Some(
                "Builders are named package:builder, e.g.:\n\
                 • architect:run-commands\n\
                 • architect:batch\n\
                 • architect:noop"
                    .to_string(),
            ),
        ));
    }

    if let Some(default) = &target.default_configuration {
        for configuration in default.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if !target.configurations.contains_key(configuration) {
                return Err(ArchitectError::invalid_workspace(
                    path,
                    format!(
                        "target '{}' defaults to unknown configuration '{}'",
                        name, configuration
                    ),
                    None,
                ));
            }
        }
    }

    Ok(())
}

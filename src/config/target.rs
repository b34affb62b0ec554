//! `project:target:configuration` target strings

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ArchitectError;

/// A target of a workspace project, optionally with a configuration
///
/// An empty `project` stands for the workspace default project until the
/// scheduler resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub project: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

impl Target {
    #[cfg(test)]
    pub fn new(project: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            target: target.into(),
            configuration: None,
        }
    }

    #[cfg(test)]
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.target)?;
        if let Some(configuration) = &self.configuration {
            write!(f, ":{}", configuration)?;
        }
        Ok(())
    }
}

impl FromStr for Target {
    type Err = ArchitectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return Err(ArchitectError::invalid_target(
                s,
                "expected at most three ':'-separated parts",
            ));
        }

        let project = parts[0].trim();
        let target = parts.get(1).map(|t| t.trim()).unwrap_or_default();
        if target.is_empty() {
            return Err(ArchitectError::invalid_target(s, "no target name given"));
        }

        let configuration = parts
            .get(2)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            project: project.to_string(),
            target: target.to_string(),
            configuration,
        })
    }
}

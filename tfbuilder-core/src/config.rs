use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::catalog;
use crate::model::{Provider, ServiceType};
use crate::resolver;
use crate::services::ServiceSelection;

/// Tag key mirrored from the environment field
pub const ENVIRONMENT_TAG: &str = "Environment";

/// Root aggregate describing one infrastructure project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub provider: Provider,

    /// Blank means the provider's default region
    #[serde(default)]
    pub region: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Azure only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,

    #[serde(default)]
    pub services: ServiceSelection,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

pub const DEFAULT_PROJECT_NAME: &str = "my-terraform-project";

fn default_name() -> String {
    DEFAULT_PROJECT_NAME.into()
}

fn default_environment() -> String {
    "dev".into()
}

fn default_version() -> String {
    "1".into()
}

impl ProjectConfig {
    /// Resource group name, falling back to `rg-<name>`
    pub fn resource_group_name(&self) -> String {
        match &self.resource_group {
            Some(rg) if !rg.is_empty() => rg.clone(),
            _ => format!("rg-{}", self.name),
        }
    }

    pub fn enabled_services(&self) -> Vec<ServiceType> {
        self.services.enabled()
    }

    /// Check region and dependency closure against the provider catalog
    pub fn validate(&self) -> Result<(), ConfigError> {
        let catalog = catalog(self.provider);

        if catalog.region(&self.region).is_none() {
            return Err(ConfigError::UnknownRegion {
                provider: self.provider,
                region: self.region.clone(),
            });
        }

        let enabled = self.services.enabled_set();
        if let Some((service, missing)) = resolver::first_unsatisfied(&catalog.graph, &enabled) {
            return Err(ConfigError::InconsistentSelection {
                service,
                missing: missing.into_iter().collect(),
            });
        }

        Ok(())
    }

    fn fill_defaults(&mut self) {
        if self.region.trim().is_empty() {
            self.region = self.provider.default_region().to_string();
        }
    }
}

/// On-disk project document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Document format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(flatten)]
    pub project: ProjectConfig,

    /// Template the services were last loaded from, if unchanged since
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_template: Option<String>,
}

/// Project document loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no project file found, searched: {searched:?}")]
    NotFound { searched: Vec<PathBuf> },
    #[error("service '{service}' is enabled but depends on disabled services: {}", join_services(.missing))]
    InconsistentSelection {
        service: ServiceType,
        missing: Vec<ServiceType>,
    },
    #[error("unknown {provider} region '{region}'")]
    UnknownRegion { provider: Provider, region: String },
}

fn join_services(services: &[ServiceType]) -> String {
    services
        .iter()
        .map(ServiceType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variable naming an explicit project file
pub const PROJECT_ENV: &str = "TFBUILDER_PROJECT";

/// File names searched by [`ProjectFile::discover`], in order
pub const PROJECT_FILE_NAMES: [&str; 4] = [
    "tfbuilder.yaml",
    "tfbuilder.yml",
    ".tfbuilder.yaml",
    ".tfbuilder.yml",
];

impl ProjectFile {
    pub fn new(project: ProjectConfig, selected_template: Option<String>) -> Self {
        Self {
            version: default_version(),
            project,
            selected_template,
        }
    }

    /// Load a project document from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a project document from a string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let mut file: ProjectFile = serde_yaml::from_str(content)?;
        file.project.fill_defaults();
        file.project.validate()?;
        Ok(file)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Search for a project document in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let mut searched = Vec::new();

        // Check environment variable first
        if let Ok(env_path) = std::env::var(PROJECT_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        // Search current directory and parents
        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &PROJECT_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }
}

//! Subcommand implementations. Each loads the project document, drives the
//! store and writes the document back when something changed.

mod check;
mod edit;
mod generate;
mod init;
mod list;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tfbuilder_core::config::ProjectFile;
use tfbuilder_core::model::ServiceType;
use tfbuilder_core::store::ProjectStore;
use tfbuilder_core::validate;

pub use check::run_check;
pub use edit::{
    ProjectField, run_configure, run_provider, run_set, run_template, run_toggle,
};
pub use generate::{run_generate, run_show};
pub use init::run_init;
pub use list::{run_services, run_templates};

/// Document path and contents, from `--project` or discovery
fn load(project: Option<&Path>) -> Result<(PathBuf, ProjectFile)> {
    match project {
        Some(path) => {
            let file = ProjectFile::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            Ok((path.to_path_buf(), file))
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            ProjectFile::discover(&cwd).context("Run `tfbuilder init` to create a project")
        }
    }
}

fn open(project: Option<&Path>) -> Result<(PathBuf, ProjectStore)> {
    let (path, file) = load(project)?;
    Ok((path, ProjectStore::from(file)))
}

fn save(path: &Path, store: &ProjectStore) -> Result<()> {
    store
        .to_file()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn enabled_set(store: &ProjectStore) -> BTreeSet<ServiceType> {
    store.enabled_services().into_iter().collect()
}

fn join(services: impl IntoIterator<Item = ServiceType>) -> String {
    services
        .into_iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Field-level checks on the free-text parts of the project
fn validate_fields(store: &ProjectStore) -> Vec<validate::ValidationError> {
    let project = store.project();
    let services = &project.services;
    let mut errors = Vec::new();

    if let Err(e) = validate::project_name(&project.name) {
        errors.push(e);
    }
    if let Some(vpc) = &services.vpc {
        errors.extend(validate::cidr(&vpc.cidr_block).err());
    }
    if let Some(subnets) = &services.subnets {
        for block in subnets
            .public_subnet_cidrs
            .iter()
            .chain(&subnets.private_subnet_cidrs)
        {
            errors.extend(validate::cidr(block).err());
        }
    }
    if let Some(s3) = &services.s3 {
        errors.extend(validate::bucket_prefix(&s3.bucket_prefix).err());
    }
    errors
}

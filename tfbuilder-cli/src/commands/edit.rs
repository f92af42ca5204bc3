use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;

use tfbuilder_core::catalog::catalog;
use tfbuilder_core::model::{Provider, ServiceType};
use tfbuilder_core::patch::ServicePatch;
use tfbuilder_core::templates::template;
use tfbuilder_core::validate;

use super::{enabled_set, join, open, save, validate_fields};

/// Project fields settable with `tfbuilder set`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProjectField {
    Name,
    Region,
    Environment,
    ResourceGroup,
}

pub fn run_toggle(project: Option<&Path>, service: ServiceType, enabled: bool) -> Result<()> {
    let (path, mut store) = open(project)?;
    let before = enabled_set(&store);

    if !store.toggle_service(service, enabled) {
        let state = if enabled { "enabled" } else { "disabled" };
        println!("{service} is already {state}");
        return Ok(());
    }
    save(&path, &store)?;

    let after = enabled_set(&store);
    if enabled {
        println!("Enabled {service}");
        let added: Vec<ServiceType> = after
            .difference(&before)
            .copied()
            .filter(|s| *s != service)
            .collect();
        if !added.is_empty() {
            println!("  also enabled: {}", join(added));
        }
    } else {
        println!("Disabled {service}");
        let removed: Vec<ServiceType> = before
            .difference(&after)
            .copied()
            .filter(|s| *s != service)
            .collect();
        if !removed.is_empty() {
            println!("  also disabled: {}", join(removed));
        }
    }
    Ok(())
}

pub fn run_set(project: Option<&Path>, field: ProjectField, value: String) -> Result<()> {
    let (path, mut store) = open(project)?;
    let provider = store.project().provider;

    let changed = match field {
        ProjectField::Name => {
            validate::project_name(&value)?;
            store.update_project_name(value.as_str())
        }
        ProjectField::Region => {
            if catalog(provider).region(&value).is_none() {
                bail!("Unknown {provider} region '{value}'");
            }
            store.update_region(value.as_str())
        }
        ProjectField::Environment => store.update_environment(value.as_str()),
        ProjectField::ResourceGroup => {
            if provider != Provider::Azure {
                bail!("Resource groups only apply to azure projects");
            }
            let value = value.trim();
            store.set_resource_group((!value.is_empty()).then(|| value.to_string()))
        }
    };

    if changed {
        save(&path, &store)?;
        println!("Updated {}", path.display());
    } else {
        println!("No change");
    }
    Ok(())
}

pub fn run_configure(project: Option<&Path>, service: ServiceType, file: &Path) -> Result<()> {
    let (path, mut store) = open(project)?;
    if !store.is_service_enabled(service) {
        bail!("{service} is not enabled. Run `tfbuilder enable {service}` first.");
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let patch = ServicePatch::from_yaml(service, &content)
        .with_context(|| format!("Invalid {service} patch in {}", file.display()))?;

    if !store.update_service_config(patch) {
        println!("No change");
        return Ok(());
    }
    if let Some(error) = validate_fields(&store).into_iter().next() {
        bail!(error);
    }
    save(&path, &store)?;
    println!("Updated {service}");
    Ok(())
}

pub fn run_template(project: Option<&Path>, id: &str) -> Result<()> {
    let (path, mut store) = open(project)?;
    let provider = store.project().provider;
    if template(provider, id).is_none() {
        bail!("Unknown {provider} template '{id}'. Run `tfbuilder templates` to list them.");
    }

    store.load_template(id);
    save(&path, &store)?;
    println!("Loaded template {id}");
    println!("  services: {}", join(store.enabled_services()));
    Ok(())
}

pub fn run_provider(project: Option<&Path>, provider: Provider) -> Result<()> {
    let (path, mut store) = open(project)?;
    if store.project().provider == provider {
        println!("Project already uses {provider}");
        return Ok(());
    }

    let cleared = store.enabled_services();
    store.set_provider(provider);
    save(&path, &store)?;

    println!("Switched to {provider} ({})", store.project().region);
    if !cleared.is_empty() {
        println!("  cleared services: {}", join(cleared));
    }
    Ok(())
}

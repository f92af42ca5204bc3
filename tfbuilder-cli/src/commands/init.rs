//! `tfbuilder init` - writes a fresh project document

use std::path::Path;

use anyhow::{Context, Result, bail};

use tfbuilder_core::model::Provider;
use tfbuilder_core::store::ProjectStore;
use tfbuilder_core::templates::template;
use tfbuilder_core::validate;

use super::{join, save};

pub fn run_init(
    project: Option<&Path>,
    provider: Provider,
    name: Option<String>,
    template_id: Option<String>,
    yes: bool,
) -> Result<()> {
    let path = match project {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()
            .context("Failed to get current directory")?
            .join("tfbuilder.yaml"),
    };
    check_existing(&path, yes)?;

    let mut store = ProjectStore::new(provider);
    if let Some(name) = name {
        validate::project_name(&name)?;
        store.update_project_name(name);
    }
    if let Some(id) = template_id {
        if template(provider, &id).is_none() {
            bail!("Unknown {provider} template '{id}'. Run `tfbuilder templates --provider {provider}` to list them.");
        }
        store.load_template(&id);
    }

    save(&path, &store)?;

    let project = store.project();
    println!("Created: {}\n", path.display());
    println!("  project:  {}", project.name);
    println!("  provider: {}", project.provider);
    println!("  region:   {}", project.region);
    let enabled = store.enabled_services();
    if !enabled.is_empty() {
        println!("  services: {}", join(enabled));
    }
    println!();
    println!("Next steps:");
    println!("  1. Enable services with `tfbuilder enable <service>`");
    println!("  2. Run `tfbuilder generate` to render Terraform");

    Ok(())
}

fn check_existing(path: &Path, yes: bool) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if !yes {
        bail!(
            "Project file {} already exists. Use --yes to overwrite.",
            path.display()
        );
    }
    println!("Overwriting existing project: {}", path.display());
    Ok(())
}

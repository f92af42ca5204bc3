use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use tfbuilder_core::catalog::catalog;
use tfbuilder_core::model::{Provider, ServiceType};
use tfbuilder_core::templates::templates;

use super::{enabled_set, join, open};

/// Provider to list for, with the project's enabled services when a project
/// for that provider is found
fn context(project: Option<&Path>, provider: Option<Provider>) -> (Provider, BTreeSet<ServiceType>) {
    match open(project) {
        Ok((_, store)) if provider.is_none_or(|p| p == store.project().provider) => {
            (store.project().provider, enabled_set(&store))
        }
        Ok(_) => (provider.unwrap_or_default(), BTreeSet::new()),
        Err(e) => {
            debug!("no project loaded: {e:#}");
            (provider.unwrap_or_default(), BTreeSet::new())
        }
    }
}

pub fn run_services(project: Option<&Path>, provider: Option<Provider>) -> Result<()> {
    let (provider, enabled) = context(project, provider);
    let catalog = catalog(provider);

    println!("{} services\n", provider.as_str().to_uppercase());
    for category in &catalog.categories {
        println!("{}:", category.name);
        for service in &category.services {
            let mark = if enabled.contains(service) { "*" } else { " " };
            let requires = catalog.graph.dependencies(*service);
            let requires = if requires.is_empty() {
                String::new()
            } else {
                format!(" (requires {})", join(requires.iter().copied()))
            };
            println!(
                "  {mark} {:<16} {}{requires}",
                service.as_str(),
                catalog.display_name(*service)
            );
        }
        println!();
    }
    if !enabled.is_empty() {
        println!("* enabled in the current project");
    }
    Ok(())
}

pub fn run_templates(project: Option<&Path>, provider: Option<Provider>) -> Result<()> {
    let (provider, _) = context(project, provider);

    println!("{} templates\n", provider.as_str().to_uppercase());
    for template in templates(provider) {
        println!("  {:<24} {}", template.id, template.name);
        println!("  {:<24} {}", "", template.description);
        let services = template.services.enabled();
        if !services.is_empty() {
            println!("  {:<24} services: {}", "", join(services));
        }
    }
    Ok(())
}

use std::path::Path;

use anyhow::{Result, bail};

use tfbuilder_core::catalog::Catalog;
use tfbuilder_core::model::Provider;
use tfbuilder_core::store::ProjectStore;
use tfbuilder_core::templates::templates;

use super::{load, validate_fields};

#[derive(Debug)]
struct Check {
    name: String,
    passed: bool,
    message: String,
    hint: Option<String>,
}

impl Check {
    fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub fn run_check(project: Option<&Path>) -> Result<()> {
    println!("Catalogs:");
    let mut checks: Vec<Check> = Provider::ALL.into_iter().map(check_catalog).collect();
    checks.iter().for_each(print_check);
    println!();

    let project_checks = check_project(project);
    println!("Project:");
    project_checks.iter().for_each(print_check);
    checks.extend(project_checks);

    let failed = checks.iter().filter(|c| !c.passed).count();
    println!();
    if failed > 0 {
        bail!("{failed} check(s) failed");
    }
    println!("All checks passed");
    Ok(())
}

fn check_catalog(provider: Provider) -> Check {
    let name = format!("{provider} catalog");
    match Catalog::build(provider) {
        Ok(catalog) => Check::ok(
            name,
            format!(
                "{} categories, {} regions, {} templates",
                catalog.categories.len(),
                catalog.regions.len(),
                templates(provider).len()
            ),
        ),
        Err(e) => Check::fail(name, e.to_string()),
    }
}

fn check_project(project: Option<&Path>) -> Vec<Check> {
    let (path, file) = match load(project) {
        Ok(found) => found,
        Err(e) => {
            return vec![
                Check::fail("document", format!("{e:#}"))
                    .with_hint("Fix the document or run `tfbuilder init --yes`"),
            ];
        }
    };

    let store = ProjectStore::from(file);
    let mut checks = vec![Check::ok(
        "document",
        format!(
            "{} ({} services enabled)",
            path.display(),
            store.enabled_services().len()
        ),
    )];
    let errors = validate_fields(&store);
    if errors.is_empty() {
        checks.push(Check::ok("fields", "names and address ranges are valid"));
    } else {
        checks.extend(
            errors
                .into_iter()
                .map(|e| Check::fail("fields", e.to_string())),
        );
    }
    checks
}

fn print_check(check: &Check) {
    let icon = if check.passed { "✓" } else { "✗" };
    let color = if check.passed { "\x1b[32m" } else { "\x1b[31m" };
    let reset = "\x1b[0m";

    println!(
        "  {}{}{} {}: {}",
        color, icon, reset, check.name, check.message
    );

    if let Some(hint) = &check.hint {
        println!("    └─ {}", hint);
    }
}

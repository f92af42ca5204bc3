//! Provider-independent root files: README and .gitignore.

use std::fmt::Write;

use crate::catalog::catalog;
use crate::config::ProjectConfig;
use crate::model::Provider;

const GITIGNORE: &str = "# Terraform
.terraform/
*.tfstate
*.tfstate.*
*.tfplan
crash.log
.terraform.lock.hcl

# Local overrides and secrets
*.auto.tfvars
override.tf
override.tf.json
*_override.tf

# IDE
.idea/
.vscode/
*.swp
*.swo

# OS
.DS_Store
Thumbs.db
";

pub(super) fn gitignore() -> String {
    GITIGNORE.to_string()
}

fn prerequisites(provider: Provider) -> &'static str {
    match provider {
        Provider::Aws => {
            "1. [Terraform](https://developer.hashicorp.com/terraform/install) >= 1.5.0
2. [AWS CLI](https://aws.amazon.com/cli/) installed and configured
3. AWS credentials with permission to create the resources below"
        }
        Provider::Azure => {
            "1. [Terraform](https://developer.hashicorp.com/terraform/install) >= 1.5.0
2. [Azure CLI](https://learn.microsoft.com/cli/azure/install-azure-cli) installed and authenticated
3. Azure subscription with appropriate permissions"
        }
    }
}

fn login(provider: Provider) -> &'static str {
    match provider {
        Provider::Aws => "# Configure credentials\naws configure",
        Provider::Azure => {
            "# Login to Azure\naz login\n\n# Set subscription (if you have multiple)\naz account set --subscription \"Your-Subscription-Name\""
        }
    }
}

/// README for the generated project.
///
/// `modules` lists the generated module names in generation order;
/// `required` lists root variables the user has to supply.
pub(super) fn readme(project: &ProjectConfig, modules: &[&str], required: &[(&str, &str)]) -> String {
    let provider = project.provider;
    let catalog = catalog(provider);
    let mut out = String::new();

    let _ = writeln!(out, "# {} - {} Infrastructure\n", project.name, provider.display_name());
    out.push_str("This Terraform configuration was generated by **tfbuilder**.\n\n");

    out.push_str("## Overview\n\n| Property | Value |\n|----------|-------|\n");
    let _ = writeln!(out, "| Cloud Provider | {} |", provider.display_name());
    let _ = writeln!(out, "| Region | {} |", project.region);
    let _ = writeln!(out, "| Environment | {} |", project.environment);
    if provider == Provider::Azure {
        let _ = writeln!(out, "| Resource Group | {} |", project.resource_group_name());
    }

    out.push_str("\n## Enabled Services\n\n");
    for service in project.enabled_services() {
        let _ = writeln!(out, "- {}", catalog.display_name(service));
    }

    let _ = write!(
        out,
        "\n## Prerequisites\n\n{}\n\n## Quick Start\n\n```bash\n{}\n\n# Initialize Terraform\nterraform init\n\n# Preview changes\nterraform plan\n\n# Apply changes\nterraform apply\n```\n",
        prerequisites(provider),
        login(provider)
    );

    if !required.is_empty() {
        out.push_str("\n## Required Variables\n\nSet these in `terraform.tfvars` before applying:\n\n");
        for (name, description) in required {
            let _ = writeln!(out, "- `{name}`: {description}");
        }
    }

    out.push_str("\n## Module Structure\n\n```\n.\n");
    out.push_str("├── main.tf              # Provider and module calls\n");
    out.push_str("├── variables.tf         # Input variables\n");
    out.push_str("├── outputs.tf           # Output values\n");
    out.push_str("├── versions.tf          # Terraform and provider versions\n");
    out.push_str("├── terraform.tfvars     # Variable values\n");
    if provider == Provider::Aws {
        out.push_str("├── locals.tf            # Shared locals\n");
    }
    out.push_str("└── modules/\n");
    for (index, module) in modules.iter().enumerate() {
        let branch = if index + 1 == modules.len() { "└──" } else { "├──" };
        let _ = writeln!(out, "    {branch} {module}/");
    }
    out.push_str("```\n\n## Cleanup\n\n```bash\nterraform destroy\n```\n");

    let mut tags = project.tags.clone();
    tags.insert("Project".to_string(), project.name.clone());
    out.push_str("\n## Tags\n\nAll resources are tagged with:\n\n");
    for (key, value) in &tags {
        let _ = writeln!(out, "- {key}: {value}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_project;
    use crate::model::ServiceType;
    use crate::services::S3Config;

    #[test]
    fn test_aws_readme() {
        let mut project = default_project(Provider::Aws);
        project.services.set(S3Config::default().into());
        let readme = readme(&project, &["storage"], &[]);
        assert!(readme.starts_with(&format!("# {} - Amazon Web Services", project.name)));
        assert!(readme.contains("| Region | us-east-1 |"));
        assert!(!readme.contains("Resource Group"));
        assert!(readme.contains(&format!(
            "- {}",
            catalog(Provider::Aws).display_name(ServiceType::S3)
        )));
        assert!(readme.contains("    └── storage/"));
        assert!(readme.contains("aws configure"));
        assert!(!readme.contains("Required Variables"));
    }

    #[test]
    fn test_azure_readme_lists_required_variables() {
        let project = default_project(Provider::Azure);
        let readme = readme(
            &project,
            &["networking", "compute"],
            &[("ssh_public_key", "SSH public key for VM access")],
        );
        assert!(readme.contains(&format!("| Resource Group | rg-{} |", project.name)));
        assert!(readme.contains("- `ssh_public_key`: SSH public key for VM access"));
        assert!(readme.contains("    ├── networking/\n    └── compute/"));
        assert!(readme.contains("az login"));
        assert!(!readme.contains("locals.tf"));
    }

    #[test]
    fn test_gitignore_keeps_state_out() {
        let ignore = gitignore();
        assert!(ignore.contains("*.tfstate"));
        assert!(ignore.contains(".terraform/"));
        assert!(!ignore.contains("\n*.tfvars\n"));
    }
}

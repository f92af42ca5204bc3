use std::collections::BTreeSet;

use super::{grants_storage_access, hcl};
use crate::config::ProjectConfig;
use crate::generate::project::{gitignore, readme};
use crate::generate::{GeneratedFile, GeneratorUnit, ModuleOutput};
use crate::services::{OriginType, ServiceSelection, SubnetKind};

const VERSIONS: &str = r#"terraform {
  required_version = ">= 1.5.0"

  required_providers {
    azurerm = {
      source  = "hashicorp/azurerm"
      version = "~> 4.0"
    }
    random = {
      source  = "hashicorp/random"
      version = "~> 3.6"
    }
  }

  # Uncomment to keep state in Azure Storage
  # backend "azurerm" {
  #   resource_group_name  = "tfstate-rg"
  #   storage_account_name = "tfstatestorage"
  #   container_name       = "tfstate"
  #   key                  = "terraform.tfstate"
  # }
}"#;

const PROVIDER: &str = r#"provider "azurerm" {
  # subscription_id is read from ARM_SUBSCRIPTION_ID
  features {}
}

locals {
  common_tags = merge(var.tags, {
    Environment = var.environment
  })
}

resource "azurerm_resource_group" "main" {
  name     = var.resource_group_name
  location = var.location

  tags = local.common_tags
}"#;

/// Root variables without a usable default, as `(name, description, example)`
fn required_variables(present: &BTreeSet<GeneratorUnit>) -> Vec<(&'static str, &'static str, &'static str)> {
    let mut required = Vec::new();
    if present.contains(&GeneratorUnit::Compute) {
        required.push((
            "ssh_public_key",
            "SSH public key for the VM admin user",
            "ssh-ed25519 AAAA... user@host",
        ));
    }
    if present.contains(&GeneratorUnit::Api) {
        required.push((
            "api_publisher_email",
            "Publisher email for API Management",
            "admin@example.com",
        ));
    }
    if present.contains(&GeneratorUnit::Database) {
        required.push((
            "key_vault_id",
            "Key Vault that stores the database password",
            "/subscriptions/.../providers/Microsoft.KeyVault/vaults/my-vault",
        ));
    }
    required
}

/// Root files for an Azure project, in their fixed order
pub(super) fn files(
    project: &ProjectConfig,
    modules: &[(GeneratorUnit, ModuleOutput)],
) -> Vec<GeneratedFile> {
    let present: BTreeSet<GeneratorUnit> = modules.iter().map(|(unit, _)| *unit).collect();
    let names: Vec<&str> = modules.iter().map(|(unit, _)| unit.module_name()).collect();
    let required = required_variables(&present);
    let readme_required: Vec<(&str, &str)> = required.iter().map(|(n, d, _)| (*n, *d)).collect();

    vec![
        GeneratedFile::new("main.tf", main(project, modules, &present)),
        GeneratedFile::new("variables.tf", variables(project, &required)),
        GeneratedFile::new("outputs.tf", outputs(&project.services, &present)),
        GeneratedFile::new("versions.tf", VERSIONS),
        GeneratedFile::new("terraform.tfvars", tfvars(project, &required)),
        GeneratedFile::new("README.md", readme(project, &names, &readme_required)),
        GeneratedFile::new(".gitignore", gitignore()),
    ]
}

/// Modules deployed without a region of their own
fn is_global(unit: GeneratorUnit) -> bool {
    matches!(unit, GeneratorUnit::Cdn | GeneratorUnit::Email)
}

fn main(
    project: &ProjectConfig,
    modules: &[(GeneratorUnit, ModuleOutput)],
    present: &BTreeSet<GeneratorUnit>,
) -> String {
    let mut sections = vec![hcl::section(
        "Provider",
        "Azure provider and the project resource group.",
        PROVIDER,
    )];

    for (unit, output) in modules {
        let name = unit.module_name();
        let mut pairs = vec![("project_name".to_string(), "var.project_name".to_string())];
        if !is_global(*unit) {
            pairs.push((
                "location".to_string(),
                "azurerm_resource_group.main.location".to_string(),
            ));
        }
        pairs.push((
            "resource_group_name".to_string(),
            "azurerm_resource_group.main.name".to_string(),
        ));
        pairs.push(("tags".to_string(), "local.common_tags".to_string()));
        pairs.extend(wiring(*unit, &project.services, present));
        for map in &output.reference_maps {
            let value = if present.contains(&map.owner()) {
                map.source().to_string()
            } else {
                "{}".to_string()
            };
            pairs.push((map.var_name().to_string(), value));
        }

        sections.push(format!(
            "{}\n\nmodule \"{name}\" {{\n  source = \"./modules/{name}\"\n\n{}\n}}",
            hcl::comment_block(&format!("Module: {name}"), None),
            hcl::attributes(&pairs, 2)
        ));
    }

    hcl::join_sections(sections)
}

fn subnet_kinds(services: &ServiceSelection) -> (bool, bool) {
    services.subnets.as_ref().map_or((false, false), |s| {
        (
            !s.public_subnet_cidrs.is_empty(),
            !s.private_subnet_cidrs.is_empty(),
        )
    })
}

/// First subnet of the preferred kind, else of the other kind
fn first_subnet(preferred: SubnetKind, public: bool, private: bool) -> &'static str {
    match (preferred, public, private) {
        (SubnetKind::Public, true, _) | (SubnetKind::Private, true, false) => {
            "module.networking.public_subnet_ids[0]"
        }
        (_, _, true) => "module.networking.private_subnet_ids[0]",
        _ => "\"\"",
    }
}

/// Inputs `unit` takes from other modules and root variables
fn wiring(
    unit: GeneratorUnit,
    services: &ServiceSelection,
    present: &BTreeSet<GeneratorUnit>,
) -> Vec<(String, String)> {
    let networking = present.contains(&GeneratorUnit::Networking);
    let (public, private) = if networking {
        subnet_kinds(services)
    } else {
        (false, false)
    };
    let identity = present.contains(&GeneratorUnit::Identity);
    let pair = |k: &str, v: &str| (k.to_string(), v.to_string());
    let cdn_on_storage = services
        .cloudfront
        .as_ref()
        .is_some_and(|cf| cf.origin_type == OriginType::S3);

    match unit {
        GeneratorUnit::Identity => {
            let mut pairs = vec![pair("resource_group_id", "azurerm_resource_group.main.id")];
            if grants_storage_access(services) {
                pairs.push(pair(
                    "storage_account_id",
                    "module.storage.storage_account_id",
                ));
            }
            if present.contains(&GeneratorUnit::Database) {
                pairs.push(pair("key_vault_id", "var.key_vault_id"));
            }
            pairs
        }
        GeneratorUnit::Storage if cdn_on_storage => {
            vec![pair("enable_static_website", "true")]
        }
        GeneratorUnit::Database => vec![pair("key_vault_id", "var.key_vault_id")],
        GeneratorUnit::Serverless => {
            let mut pairs = Vec::new();
            if identity {
                pairs.push(pair("managed_identity_id", "module.identity.identity_id"));
            }
            let vnet_function = services
                .lambda
                .as_ref()
                .and_then(|l| l.functions.iter().find(|f| f.vpc_enabled));
            if let Some(func) = vnet_function {
                pairs.push(pair(
                    "subnet_id",
                    first_subnet(func.vpc_subnet_type, public, private),
                ));
            }
            pairs
        }
        GeneratorUnit::Api => vec![pair("publisher_email", "var.api_publisher_email")],
        GeneratorUnit::Events => vec![pair("resource_group_id", "azurerm_resource_group.main.id")],
        GeneratorUnit::Monitoring
            if present.contains(&GeneratorUnit::Compute)
                && services
                    .cloudwatch
                    .as_ref()
                    .is_some_and(|cw| !cw.alarms.is_empty()) =>
        {
            vec![pair("monitored_resource_ids", "[module.compute.vm_id]")]
        }
        GeneratorUnit::Cdn if cdn_on_storage && present.contains(&GeneratorUnit::Storage) => {
            vec![pair("origin_hostname", "module.storage.primary_web_host")]
        }
        GeneratorUnit::Compute => {
            let mut pairs = vec![
                pair("subnet_id", first_subnet(SubnetKind::Public, public, private)),
                pair("ssh_public_key", "var.ssh_public_key"),
            ];
            if identity {
                pairs.push(pair("managed_identity_id", "module.identity.identity_id"));
            }
            pairs
        }
        _ => Vec::new(),
    }
}

fn variables(project: &ProjectConfig, required: &[(&str, &str, &str)]) -> String {
    let mut sections = vec![
        hcl::variable(
            "project_name",
            "Name of the project, used for resource naming",
            "string",
            Some(&hcl::quote(&project.name)),
        ),
        hcl::variable(
            "environment",
            "Deployment environment",
            "string",
            Some(&hcl::quote(&project.environment)),
        ),
        hcl::variable(
            "location",
            "Azure region to deploy into",
            "string",
            Some(&hcl::quote(&project.region)),
        ),
        hcl::variable(
            "resource_group_name",
            "Name of the resource group",
            "string",
            Some(&hcl::quote(&project.resource_group_name())),
        ),
        hcl::variable(
            "tags",
            "Tags to apply to all resources",
            "map(string)",
            Some(&hcl::format_tags(&project.tags, &project.name)),
        ),
    ];
    for (name, description, _) in required {
        sections.push(hcl::variable(name, description, "string", None));
    }
    hcl::join_sections(sections)
}

fn outputs(services: &ServiceSelection, present: &BTreeSet<GeneratorUnit>) -> String {
    let mut sections = vec![
        hcl::output(
            "resource_group_name",
            "Name of the resource group",
            "azurerm_resource_group.main.name",
        ),
        hcl::output(
            "resource_group_id",
            "ID of the resource group",
            "azurerm_resource_group.main.id",
        ),
    ];
    let mut add = |name: &str, description: &str, value: &str| {
        sections.push(hcl::output(name, description, value));
    };

    if present.contains(&GeneratorUnit::Networking) {
        add("vnet_id", "ID of the virtual network", "module.networking.vnet_id");
    }
    if present.contains(&GeneratorUnit::Identity) {
        add(
            "identity_client_id",
            "Client ID of the managed identity",
            "module.identity.client_id",
        );
    }
    if present.contains(&GeneratorUnit::Storage) {
        add(
            "storage_account_name",
            "Name of the storage account",
            "module.storage.storage_account_name",
        );
    }
    if present.contains(&GeneratorUnit::Database) {
        add(
            "database_fqdn",
            "FQDN of the database server",
            "module.database.server_fqdn",
        );
    }
    if present.contains(&GeneratorUnit::Serverless) {
        add(
            "function_hostnames",
            "Map of function names to hostnames",
            "module.serverless.function_hostnames",
        );
    }
    if present.contains(&GeneratorUnit::Api) {
        add("api_url", "Base URL of the API", "module.api.api_url");
    }
    if present.contains(&GeneratorUnit::Messaging) {
        add(
            "servicebus_namespace",
            "Name of the Service Bus namespace",
            "module.messaging.namespace_name",
        );
    }
    if present.contains(&GeneratorUnit::Monitoring) {
        add(
            "log_analytics_workspace_id",
            "ID of the Log Analytics workspace",
            "module.monitoring.log_analytics_workspace_id",
        );
    }
    if present.contains(&GeneratorUnit::Cdn) {
        add("cdn_url", "HTTPS URL of the CDN endpoint", "module.cdn.cdn_url");
    }
    if present.contains(&GeneratorUnit::Email) {
        add(
            "communication_service_id",
            "ID of the Communication Service",
            "module.email.communication_service_id",
        );
    }
    if present.contains(&GeneratorUnit::Compute) {
        add(
            "vm_private_ip",
            "Private IP address of the VM",
            "module.compute.private_ip",
        );
        if services.ec2.as_ref().is_some_and(|ec2| ec2.associate_public_ip) {
            add(
                "vm_public_ip",
                "Public IP address of the VM",
                "module.compute.public_ip",
            );
        }
    }

    hcl::join_sections(sections)
}

fn tfvars(project: &ProjectConfig, required: &[(&str, &str, &str)]) -> String {
    let pairs = [
        ("project_name", hcl::quote(&project.name)),
        ("environment", hcl::quote(&project.environment)),
        ("location", hcl::quote(&project.region)),
        ("resource_group_name", hcl::quote(&project.resource_group_name())),
    ];
    let mut tags = project.tags.clone();
    tags.insert("Project".to_string(), project.name.clone());

    let mut out = format!(
        "{}\n\n{}\n\ntags = {}",
        hcl::comment_block("Variable values", Some("Adjust before running terraform apply.")),
        hcl::attributes(&pairs, 0),
        hcl::string_map(&tags, 0)
    );
    if !required.is_empty() {
        let lines: Vec<String> = required
            .iter()
            .map(|(name, _, example)| format!("# {name} = {}", hcl::quote(example)))
            .collect();
        out.push_str(&format!(
            "\n\n# Required, no default:\n{}",
            lines.join("\n")
        ));
    }
    out
}

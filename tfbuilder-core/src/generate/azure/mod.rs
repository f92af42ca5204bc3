//! Azure generator table.
//!
//! Takes the same service records as AWS and maps them onto azurerm
//! resources: VPC becomes a VNet, security groups become NSGs, Lambda becomes
//! Function Apps, SQS/SNS become Service Bus, and so on. Every module but
//! `cdn` and `email` takes `location`; all take `resource_group_name`.

mod api;
mod cdn;
mod compute;
mod database;
mod email;
mod events;
mod identity;
mod messaging;
mod monitoring;
mod networking;
mod root;
mod serverless;
mod storage;

use std::collections::BTreeSet;

use super::hcl;
use super::{
    GeneratedFile, GeneratorUnit, ModuleOutput, ReferenceMap, ReferenceScope, References,
    TerraformProvider,
};
use crate::config::ProjectConfig;
use crate::model::Provider;
use crate::services::ServiceSelection;

#[derive(Clone, Copy, Debug, Default)]
pub struct AzureGenerator;

impl TerraformProvider for AzureGenerator {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn module(
        &self,
        unit: GeneratorUnit,
        project: &ProjectConfig,
        refs: &References,
    ) -> Option<ModuleOutput> {
        let services = &project.services;
        let mut scope = ReferenceScope::new(refs);
        let output = match unit {
            GeneratorUnit::Networking => networking::render(
                services.vpc.as_ref()?,
                services.subnets.as_ref(),
                services.security_groups.as_ref(),
            ),
            GeneratorUnit::Identity => {
                identity::render(services.iam.as_ref()?, grants_storage_access(services))
            }
            GeneratorUnit::Storage => storage::render(services.s3.as_ref()?),
            GeneratorUnit::Database => database::render(services.rds.as_ref()?),
            GeneratorUnit::Serverless => {
                serverless::render(services.lambda.as_ref()?, services.iam.is_some())
            }
            GeneratorUnit::Api => api::render(services.api_gateway.as_ref()?, scope),
            GeneratorUnit::Messaging => {
                if services.sqs.is_none() && services.sns.is_none() {
                    return None;
                }
                messaging::render(services.sqs.as_ref(), services.sns.as_ref(), scope)
            }
            GeneratorUnit::Events => events::render(services.eventbridge.as_ref()?, scope),
            GeneratorUnit::Monitoring => monitoring::render(services.cloudwatch.as_ref()?),
            GeneratorUnit::Cdn => cdn::render(services.cloudfront.as_ref()?),
            GeneratorUnit::Email => email::render(services.ses.as_ref()?),
            GeneratorUnit::Compute => {
                let ec2 = services.ec2.as_ref()?;
                let nsg = vm_security_group(services)
                    .map(|name| scope.lookup(ReferenceMap::NsgIds, &name));
                compute::render(ec2, services.iam.is_some(), nsg, scope)
            }
        };
        Some(output)
    }

    fn root_files(
        &self,
        project: &ProjectConfig,
        modules: &[(GeneratorUnit, ModuleOutput)],
    ) -> Vec<GeneratedFile> {
        root::files(project, modules)
    }
}

fn grants_storage_access(services: &ServiceSelection) -> bool {
    services.s3.is_some() && services.iam.as_ref().is_some_and(|iam| iam.s3_access)
}

/// NSG for the VM's network interface: the first one the instance names,
/// else the first configured group
fn vm_security_group(services: &ServiceSelection) -> Option<String> {
    let ec2 = services.ec2.as_ref()?;
    ec2.security_group_ids.first().cloned().or_else(|| {
        services
            .security_groups
            .as_ref()
            .and_then(|sg| sg.groups.first())
            .map(|group| group.name.clone())
    })
}

/// Unique `value`, suffixed `{sep}2`, `{sep}3`, ... on collision
fn unique(taken: &mut BTreeSet<String>, value: String, sep: &str) -> String {
    if taken.insert(value.clone()) {
        return value;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{value}{sep}{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// `project_name`, `location` (unless `global`), `resource_group_name` and `tags`
fn base_variables(global: bool) -> String {
    let mut sections = vec![hcl::variable(
        "project_name",
        "Project name used for resource naming",
        "string",
        None,
    )];
    if !global {
        sections.push(hcl::variable("location", "Azure region", "string", None));
    }
    sections.push(hcl::variable(
        "resource_group_name",
        "Name of the resource group",
        "string",
        None,
    ));
    sections.push(hcl::variable(
        "tags",
        "Tags to apply to resources",
        "map(string)",
        Some("{}"),
    ));
    hcl::join_sections(sections)
}

/// `name`, `location` and `resource_group_name` lines for a regional resource
fn placement(name: &str) -> String {
    hcl::attributes(
        &[
            ("name", name),
            ("location", "var.location"),
            ("resource_group_name", "var.resource_group_name"),
        ],
        2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Ec2Config, SecurityGroupConfig};

    #[test]
    fn test_base_variables() {
        let regional = base_variables(false);
        assert!(regional.contains("variable \"location\""));
        assert!(regional.contains("variable \"resource_group_name\""));

        let global = base_variables(true);
        assert!(!global.contains("variable \"location\""));
        assert!(global.contains("variable \"tags\""));
    }

    #[test]
    fn test_placement() {
        assert_eq!(
            placement("\"${var.project_name}-vnet\""),
            "  name                = \"${var.project_name}-vnet\"\n  location            = var.location\n  resource_group_name = var.resource_group_name"
        );
    }

    #[test]
    fn test_vm_security_group_fallbacks() {
        let mut services = ServiceSelection::default();
        assert_eq!(vm_security_group(&services), None);

        services.ec2 = Some(Ec2Config::default());
        assert_eq!(vm_security_group(&services), None);

        services.security_groups = Some(SecurityGroupConfig::default());
        assert_eq!(vm_security_group(&services).as_deref(), Some("web"));

        if let Some(ec2) = services.ec2.as_mut() {
            ec2.security_group_ids = vec!["api".into()];
        }
        assert_eq!(vm_security_group(&services).as_deref(), Some("api"));
    }
}

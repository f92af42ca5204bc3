//! AWS generator table.
//!
//! One submodule per generator unit, plus `root` for the files that wire the
//! modules together. Every module takes `project_name` and `tags`.

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

use super::hcl;
use super::{GeneratedFile, GeneratorUnit, ModuleOutput, ReferenceScope, References, TerraformProvider};
use crate::config::ProjectConfig;
use crate::model::Provider;
use crate::services::ServiceSelection;

#[derive(Clone, Copy, Debug, Default)]
pub struct AwsGenerator;

impl TerraformProvider for AwsGenerator {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn module(
        &self,
        unit: GeneratorUnit,
        project: &ProjectConfig,
        refs: &References,
    ) -> Option<ModuleOutput> {
        let services = &project.services;
        let scope = ReferenceScope::new(refs);
        let output = match unit {
            GeneratorUnit::Networking => networking::render(
                services.vpc.as_ref()?,
                services.subnets.as_ref(),
                services.security_groups.as_ref(),
                scope,
            ),
            GeneratorUnit::Identity => {
                identity::render(services.iam.as_ref()?, grants_s3_access(services))
            }
            GeneratorUnit::Storage => storage::render(services.s3.as_ref()?),
            GeneratorUnit::Database => database::render(services.rds.as_ref()?, scope),
            GeneratorUnit::Serverless => {
                serverless::render(services.lambda.as_ref()?, lambda_in_vpc(services))
            }
            GeneratorUnit::Api => api::render(services.api_gateway.as_ref()?, scope),
            GeneratorUnit::Messaging => {
                if services.sqs.is_none() && services.sns.is_none() {
                    return None;
                }
                messaging::render(services.sqs.as_ref(), services.sns.as_ref(), scope)
            }
            GeneratorUnit::Events => events::render(services.eventbridge.as_ref()?, scope),
            GeneratorUnit::Monitoring => monitoring::render(services.cloudwatch.as_ref()?, scope),
            GeneratorUnit::Cdn => cdn::render(services.cloudfront.as_ref()?),
            GeneratorUnit::Email => email::render(services.ses.as_ref()?),
            GeneratorUnit::Compute => compute::render(
                services.ec2.as_ref()?,
                attaches_instance_profile(services),
                scope,
            ),
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

/// The identity module grants the instance role access to the bucket
fn grants_s3_access(services: &ServiceSelection) -> bool {
    services.s3.is_some() && services.iam.as_ref().is_some_and(|iam| iam.s3_access)
}

fn attaches_instance_profile(services: &ServiceSelection) -> bool {
    services
        .iam
        .as_ref()
        .is_some_and(|iam| iam.create_instance_profile)
}

/// At least one function asks for VPC placement and a VPC exists
fn lambda_in_vpc(services: &ServiceSelection) -> bool {
    services.vpc.is_some()
        && services
            .lambda
            .as_ref()
            .is_some_and(|lambda| lambda.functions.iter().any(|f| f.vpc_enabled))
}

/// `project_name` and `tags`, declared by every AWS module
fn base_variables() -> String {
    hcl::join_sections([
        hcl::variable(
            "project_name",
            "Name of the project, used for resource naming",
            "string",
            None,
        ),
        hcl::variable("tags", "Tags to apply to all resources", "map(string)", Some("{}")),
    ])
}

/// Two-space `tags = merge(var.tags, { Name = ... })` line for a resource body
fn name_tag(name: &str) -> String {
    format!(
        "  tags = merge(var.tags, {{\n    Name = \"${{var.project_name}}-{}\"\n  }})",
        hcl::escape_string(name)
    )
}

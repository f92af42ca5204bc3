use std::collections::{BTreeMap, BTreeSet};

use super::{attaches_instance_profile, grants_s3_access, hcl, lambda_in_vpc};
use crate::config::ProjectConfig;
use crate::generate::project::{gitignore, readme};
use crate::generate::{GeneratedFile, GeneratorUnit, ModuleOutput};
use crate::services::{OriginType, ServiceSelection};

const VERSIONS: &str = r#"terraform {
  required_version = ">= 1.5.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
    random = {
      source  = "hashicorp/random"
      version = "~> 3.6"
    }
  }

  # Uncomment to keep state in S3
  # backend "s3" {
  #   bucket         = "your-terraform-state-bucket"
  #   key            = "terraform.tfstate"
  #   region         = "us-east-1"
  #   encrypt        = true
  #   dynamodb_table = "terraform-locks"
  # }
}"#;

const LOCALS: &str = r#"locals {
  common_tags = merge(var.tags, {
    Environment = var.environment
  })
}"#;

const PROVIDER: &str = r#"provider "aws" {
  region = var.aws_region

  default_tags {
    tags = local.common_tags
  }
}"#;

/// Root files for an AWS project, in their fixed order
pub(super) fn files(
    project: &ProjectConfig,
    modules: &[(GeneratorUnit, ModuleOutput)],
) -> Vec<GeneratedFile> {
    let present: BTreeSet<GeneratorUnit> = modules.iter().map(|(unit, _)| *unit).collect();
    let names: Vec<&str> = modules.iter().map(|(unit, _)| unit.module_name()).collect();

    vec![
        GeneratedFile::new("main.tf", main(project, modules, &present)),
        GeneratedFile::new("variables.tf", variables(project)),
        GeneratedFile::new("outputs.tf", outputs(&project.services, &present)),
        GeneratedFile::new("versions.tf", VERSIONS),
        GeneratedFile::new("terraform.tfvars", tfvars(project)),
        GeneratedFile::new("locals.tf", LOCALS),
        GeneratedFile::new("README.md", readme(project, &names, &[])),
        GeneratedFile::new(".gitignore", gitignore()),
    ]
}

fn project_tags(project: &ProjectConfig) -> BTreeMap<String, String> {
    let mut tags = project.tags.clone();
    tags.insert("Project".to_string(), project.name.clone());
    tags
}

fn has_public_subnets(services: &ServiceSelection) -> bool {
    services
        .subnets
        .as_ref()
        .is_some_and(|s| !s.public_subnet_cidrs.is_empty())
}

fn has_private_subnets(services: &ServiceSelection) -> bool {
    services
        .subnets
        .as_ref()
        .is_some_and(|s| !s.private_subnet_cidrs.is_empty())
}

fn main(
    project: &ProjectConfig,
    modules: &[(GeneratorUnit, ModuleOutput)],
    present: &BTreeSet<GeneratorUnit>,
) -> String {
    let mut sections = vec![hcl::section(
        "Provider",
        "AWS provider with tags applied to every resource.",
        PROVIDER,
    )];

    for (unit, output) in modules {
        let name = unit.module_name();
        let mut pairs = vec![
            ("project_name".to_string(), "var.project_name".to_string()),
            ("tags".to_string(), "local.common_tags".to_string()),
        ];
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

/// Inputs `unit` takes from other modules
fn wiring(
    unit: GeneratorUnit,
    services: &ServiceSelection,
    present: &BTreeSet<GeneratorUnit>,
) -> Vec<(String, String)> {
    let networking = present.contains(&GeneratorUnit::Networking);
    let storage = present.contains(&GeneratorUnit::Storage);
    let public = networking && has_public_subnets(services);
    let private = networking && has_private_subnets(services);
    let vpc_id = if networking {
        "module.networking.vpc_id"
    } else {
        "\"\""
    };
    let pair = |k: &str, v: &str| (k.to_string(), v.to_string());

    match unit {
        GeneratorUnit::Database => {
            let subnets = if private {
                "module.networking.private_subnet_ids"
            } else if public {
                "module.networking.public_subnet_ids"
            } else {
                "[]"
            };
            vec![pair("vpc_id", vpc_id), pair("subnet_ids", subnets)]
        }
        GeneratorUnit::Serverless if lambda_in_vpc(services) => {
            let groups = if services.security_groups.is_some() {
                "values(module.networking.security_group_ids)"
            } else {
                "[]"
            };
            vec![
                pair(
                    "public_subnet_ids",
                    if public { "module.networking.public_subnet_ids" } else { "[]" },
                ),
                pair(
                    "private_subnet_ids",
                    if private { "module.networking.private_subnet_ids" } else { "[]" },
                ),
                pair("lambda_security_group_ids", groups),
            ]
        }
        GeneratorUnit::Identity if grants_s3_access(services) => {
            vec![pair("s3_bucket_arn", "module.storage.bucket_arn")]
        }
        GeneratorUnit::Cdn
            if services
                .cloudfront
                .as_ref()
                .is_some_and(|cf| cf.origin_type == OriginType::S3) =>
        {
            let from_storage = |output: &str| {
                if storage {
                    format!("module.storage.{output}")
                } else {
                    "\"\"".to_string()
                }
            };
            vec![
                ("s3_bucket_id".to_string(), from_storage("bucket_id")),
                ("s3_bucket_arn".to_string(), from_storage("bucket_arn")),
                (
                    "s3_bucket_regional_domain_name".to_string(),
                    from_storage("bucket_regional_domain_name"),
                ),
            ]
        }
        GeneratorUnit::Compute => {
            let subnet = if public {
                "module.networking.public_subnet_ids[0]"
            } else if private {
                "module.networking.private_subnet_ids[0]"
            } else {
                "\"\""
            };
            let mut pairs = vec![pair("vpc_id", vpc_id), pair("subnet_id", subnet)];
            if attaches_instance_profile(services) {
                pairs.push(pair(
                    "instance_profile_name",
                    "module.identity.instance_profile_name",
                ));
            }
            pairs
        }
        _ => Vec::new(),
    }
}

fn variables(project: &ProjectConfig) -> String {
    hcl::join_sections([
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
            "aws_region",
            "AWS region to deploy into",
            "string",
            Some(&hcl::quote(&project.region)),
        ),
        hcl::variable(
            "tags",
            "Tags to apply to all resources",
            "map(string)",
            Some(&hcl::format_tags(&project.tags, &project.name)),
        ),
    ])
}

fn outputs(services: &ServiceSelection, present: &BTreeSet<GeneratorUnit>) -> String {
    let mut sections = Vec::new();
    let mut add = |name: &str, description: &str, value: &str| {
        sections.push(hcl::output(name, description, value));
    };

    if present.contains(&GeneratorUnit::Networking) {
        add("vpc_id", "ID of the VPC", "module.networking.vpc_id");
        if has_public_subnets(services) {
            add(
                "public_subnet_ids",
                "IDs of the public subnets",
                "module.networking.public_subnet_ids",
            );
        }
        if has_private_subnets(services) {
            add(
                "private_subnet_ids",
                "IDs of the private subnets",
                "module.networking.private_subnet_ids",
            );
        }
    }
    if present.contains(&GeneratorUnit::Identity) {
        add("role_arn", "ARN of the IAM role", "module.identity.role_arn");
    }
    if present.contains(&GeneratorUnit::Storage) {
        add("bucket_name", "Name of the S3 bucket", "module.storage.bucket_name");
    }
    if present.contains(&GeneratorUnit::Database) {
        add(
            "db_instance_endpoint",
            "Connection endpoint of the database",
            "module.database.db_instance_endpoint",
        );
    }
    if present.contains(&GeneratorUnit::Serverless) {
        add(
            "lambda_function_arns",
            "Map of Lambda function names to ARNs",
            "module.serverless.function_arns",
        );
    }
    if present.contains(&GeneratorUnit::Api) {
        add("api_endpoint", "Endpoint of the HTTP API", "module.api.api_endpoint");
    }
    if present.contains(&GeneratorUnit::Messaging) {
        if services.sqs.as_ref().is_some_and(|s| !s.queues.is_empty()) {
            add(
                "sqs_queue_arns",
                "Map of queue names to ARNs",
                "module.messaging.sqs_queue_arns",
            );
        }
        if services.sns.as_ref().is_some_and(|s| !s.topics.is_empty()) {
            add(
                "sns_topic_arns",
                "Map of topic names to ARNs",
                "module.messaging.sns_topic_arns",
            );
        }
    }
    if present.contains(&GeneratorUnit::Cdn) {
        add(
            "cdn_domain_name",
            "Domain name of the CloudFront distribution",
            "module.cdn.distribution_domain_name",
        );
    }
    if present.contains(&GeneratorUnit::Email) {
        add(
            "ses_configuration_set",
            "Name of the SES configuration set",
            "module.email.configuration_set_name",
        );
    }
    if present.contains(&GeneratorUnit::Compute) {
        add("instance_id", "ID of the EC2 instance", "module.compute.instance_id");
        add(
            "instance_public_ip",
            "Public IP address of the EC2 instance",
            "module.compute.instance_public_ip",
        );
    }

    if sections.is_empty() {
        return "# Module outputs are available as module.<name>.<output>".to_string();
    }
    hcl::join_sections(sections)
}

fn tfvars(project: &ProjectConfig) -> String {
    let pairs = [
        ("project_name", hcl::quote(&project.name)),
        ("environment", hcl::quote(&project.environment)),
        ("aws_region", hcl::quote(&project.region)),
    ];
    format!(
        "{}\n\n{}\n\ntags = {}",
        hcl::comment_block("Variable values", Some("Adjust before running terraform apply.")),
        hcl::attributes(&pairs, 0),
        hcl::string_map(&project_tags(project), 0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_project;
    use crate::generate::{generate_project, file_by_path, References, TerraformProvider};
    use crate::generate::aws::AwsGenerator;
    use crate::model::{Provider, ServiceType};
    use crate::services::{
        CloudFrontConfig, Ec2Config, IamConfig, S3Config, SecurityGroupConfig, SubnetConfig,
        VpcConfig,
    };

    fn build(project: &ProjectConfig) -> Vec<GeneratedFile> {
        let refs = References::from_selection(&project.services);
        let modules: Vec<(GeneratorUnit, ModuleOutput)> = GeneratorUnit::ALL
            .into_iter()
            .filter_map(|unit| Some((unit, AwsGenerator.module(unit, project, &refs)?)))
            .collect();
        files(project, &modules)
    }

    fn content<'a>(files: &'a [GeneratedFile], path: &str) -> &'a str {
        &files.iter().find(|f| f.path == path).unwrap().content
    }

    fn web_project() -> ProjectConfig {
        let mut project = default_project(Provider::Aws);
        project.services.set(VpcConfig::default().into());
        project.services.set(SubnetConfig::default().into());
        project.services.set(IamConfig::default().into());
        project.services.set(Ec2Config::default().into());
        project
    }

    #[test]
    fn test_compute_wiring() {
        let files = build(&web_project());
        let main = content(&files, "main.tf");
        assert!(main.contains("provider \"aws\""));
        assert!(main.contains("module \"compute\" {\n  source = \"./modules/compute\""));
        assert!(main.contains("vpc_id                = module.networking.vpc_id"));
        assert!(main.contains("subnet_id             = module.networking.public_subnet_ids[0]"));
        assert!(main
            .contains("instance_profile_name = module.identity.instance_profile_name"));
    }

    #[test]
    fn test_reference_maps_are_passed_through() {
        let mut project = web_project();
        project.services.set(SecurityGroupConfig::default().into());
        if let Some(ec2) = project.services.ec2.as_mut() {
            ec2.security_group_ids = vec!["web".into()];
        }
        let files = build(&project);
        let main = content(&files, "main.tf");
        assert!(main.contains("security_group_ids    = module.networking.security_group_ids"));
    }

    #[test]
    fn test_s3_wiring_for_identity_and_cdn() {
        let mut project = default_project(Provider::Aws);
        project.services.set(S3Config::default().into());
        project.services.set(IamConfig::default().into());
        project.services.set(CloudFrontConfig::default().into());
        let files = build(&project);
        let main = content(&files, "main.tf");
        assert!(main.contains("s3_bucket_arn = module.storage.bucket_arn"));
        assert!(main.contains(
            "s3_bucket_regional_domain_name = module.storage.bucket_regional_domain_name"
        ));
    }

    #[test]
    fn test_variables_tfvars_and_locals() {
        let project = web_project();
        let files = build(&project);
        let variables = content(&files, "variables.tf");
        assert!(variables.contains("variable \"aws_region\""));
        assert!(variables.contains("default     = \"us-east-1\""));
        assert!(variables.contains(&format!("Project     = \"{}\"", project.name)));

        let tfvars = content(&files, "terraform.tfvars");
        assert!(tfvars.contains(&format!("project_name = \"{}\"", project.name)));
        assert!(tfvars.contains("aws_region   = \"us-east-1\""));
        assert!(tfvars.contains("tags = {\n"));

        assert!(content(&files, "locals.tf").contains("Environment = var.environment"));
        assert!(content(&files, "versions.tf").contains("version = \"~> 5.0\""));
        assert!(content(&files, "outputs.tf").contains("output \"instance_public_ip\""));
    }

    #[test]
    fn test_every_enabled_module_is_called() {
        let mut project = default_project(Provider::Aws);
        for service in ServiceType::ALL {
            project.services.set(crate::defaults::default_config(
                Provider::Aws,
                service,
                &project.name,
            ));
        }
        let generated = generate_project(&project);
        let main = &file_by_path(&generated, "main.tf").unwrap().content;
        for module in &generated.modules {
            assert!(
                main.contains(&format!("module \"{}\" {{", module.name)),
                "{}",
                module.name
            );
        }
    }
}

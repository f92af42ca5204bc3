//! Compiled-in default configs and projects.

use std::collections::BTreeMap;

use crate::config::{DEFAULT_PROJECT_NAME, ENVIRONMENT_TAG, ProjectConfig};
use crate::model::{Provider, ServiceType};
use crate::services::*;

/// Field values conventionally derived from the project name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivedNames {
    pub bucket_prefix: String,
    pub role_name: String,
    pub db_identifier: String,
    pub api_name: String,
    pub cdn_comment: String,
    pub ses_config_set: String,
}

impl DerivedNames {
    pub fn for_project(provider: Provider, name: &str) -> Self {
        let name = name.trim();
        let base = if name.is_empty() { "app" } else { name };
        let (role_suffix, ses_suffix) = match provider {
            Provider::Aws => ("role", "ses-config"),
            Provider::Azure => ("identity", "comm"),
        };

        Self {
            bucket_prefix: if name.is_empty() { "my-app".into() } else { name.into() },
            role_name: format!("{base}-{role_suffix}"),
            db_identifier: format!("{base}-db"),
            api_name: format!("{base}-api"),
            cdn_comment: format!("{base} CDN"),
            ses_config_set: format!("{base}-{ses_suffix}"),
        }
    }

    /// Fill blank name-derived fields of every enabled service
    pub fn fill_blanks(&self, services: &mut ServiceSelection) {
        fn fill(field: &mut String, value: &str) {
            if field.trim().is_empty() {
                *field = value.to_string();
            }
        }

        if let Some(s3) = services.s3.as_mut() {
            fill(&mut s3.bucket_prefix, &self.bucket_prefix);
        }
        if let Some(iam) = services.iam.as_mut() {
            fill(&mut iam.role_name, &self.role_name);
        }
        if let Some(rds) = services.rds.as_mut() {
            fill(&mut rds.identifier, &self.db_identifier);
        }
        if let Some(api) = services.api_gateway.as_mut() {
            fill(&mut api.name, &self.api_name);
        }
        if let Some(cdn) = services.cloudfront.as_mut() {
            fill(&mut cdn.comment, &self.cdn_comment);
        }
        if let Some(ses) = services.ses.as_mut() {
            fill(&mut ses.configuration_set_name, &self.ses_config_set);
        }
    }

    /// Move derived fields from `old` to `self`, keeping manual edits.
    ///
    /// A field is rewritten only when it is blank or still holds the value
    /// `old` would have produced.
    pub fn rederive(&self, old: &DerivedNames, services: &mut ServiceSelection) {
        fn update(field: &mut String, old: &str, new: &str) {
            if field.trim().is_empty() || field == old {
                *field = new.to_string();
            }
        }

        if let Some(s3) = services.s3.as_mut() {
            update(&mut s3.bucket_prefix, &old.bucket_prefix, &self.bucket_prefix);
        }
        if let Some(iam) = services.iam.as_mut() {
            update(&mut iam.role_name, &old.role_name, &self.role_name);
        }
        if let Some(rds) = services.rds.as_mut() {
            update(&mut rds.identifier, &old.db_identifier, &self.db_identifier);
        }
        if let Some(api) = services.api_gateway.as_mut() {
            update(&mut api.name, &old.api_name, &self.api_name);
        }
        if let Some(cdn) = services.cloudfront.as_mut() {
            update(&mut cdn.comment, &old.cdn_comment, &self.cdn_comment);
        }
        if let Some(ses) = services.ses.as_mut() {
            update(&mut ses.configuration_set_name, &old.ses_config_set, &self.ses_config_set);
        }
    }
}

/// Default config for `service`, with name-derived fields filled from `project_name`
pub fn default_config(provider: Provider, service: ServiceType, project_name: &str) -> ServiceConfig {
    let names = DerivedNames::for_project(provider, project_name);
    match provider {
        Provider::Aws => aws_default(service, &names),
        Provider::Azure => azure_default(service, &names),
    }
}

/// Every service at its default config, with name-derived fields blank
pub fn full_selection(provider: Provider) -> ServiceSelection {
    let blank = DerivedNames::default();
    let mut selection = ServiceSelection::default();
    for service in ServiceType::ALL {
        selection.set(match provider {
            Provider::Aws => aws_default(service, &blank),
            Provider::Azure => azure_default(service, &blank),
        });
    }
    selection
}

fn aws_default(service: ServiceType, names: &DerivedNames) -> ServiceConfig {
    match service {
        ServiceType::Vpc => VpcConfig::default().into(),
        ServiceType::Subnets => SubnetConfig::default().into(),
        ServiceType::SecurityGroups => SecurityGroupConfig::default().into(),
        ServiceType::Ec2 => Ec2Config::default().into(),
        ServiceType::Lambda => LambdaConfig::default().into(),
        ServiceType::Rds => RdsConfig {
            identifier: names.db_identifier.clone(),
            ..RdsConfig::default()
        }
        .into(),
        ServiceType::S3 => S3Config {
            bucket_prefix: names.bucket_prefix.clone(),
            ..S3Config::default()
        }
        .into(),
        ServiceType::ApiGateway => ApiGatewayConfig {
            name: names.api_name.clone(),
            ..ApiGatewayConfig::default()
        }
        .into(),
        ServiceType::Sqs => SqsConfig::default().into(),
        ServiceType::Sns => SnsConfig::default().into(),
        ServiceType::Eventbridge => EventBridgeConfig::default().into(),
        ServiceType::Cloudfront => CloudFrontConfig {
            comment: names.cdn_comment.clone(),
            ..CloudFrontConfig::default()
        }
        .into(),
        ServiceType::Ses => SesConfig {
            configuration_set_name: names.ses_config_set.clone(),
            ..SesConfig::default()
        }
        .into(),
        ServiceType::Cloudwatch => CloudWatchConfig::default().into(),
        ServiceType::Iam => IamConfig {
            role_name: names.role_name.clone(),
            ..IamConfig::default()
        }
        .into(),
    }
}

fn azure_default(service: ServiceType, names: &DerivedNames) -> ServiceConfig {
    match service {
        ServiceType::Subnets => SubnetConfig {
            availability_zones: vec!["1".into()],
            ..SubnetConfig::default()
        }
        .into(),
        ServiceType::SecurityGroups => {
            let mut config = SecurityGroupConfig::default();
            for group in &mut config.groups {
                group.description = "Network security group for web servers".into();
            }
            config.into()
        }
        ServiceType::Ec2 => Ec2Config {
            instance_type: "Standard_B1s".into(),
            root_volume_size: 30,
            ..Ec2Config::default()
        }
        .into(),
        ServiceType::Lambda => LambdaConfig {
            functions: vec![LambdaFunctionConfig {
                description: "Azure Function".into(),
                architecture: Architecture::X86,
                ..LambdaFunctionConfig::default()
            }],
        }
        .into(),
        ServiceType::Rds => RdsConfig {
            identifier: names.db_identifier.clone(),
            engine_version: "15".into(),
            instance_class: "B_Standard_B1ms".into(),
            allocated_storage: 32,
            max_allocated_storage: 128,
            ..RdsConfig::default()
        }
        .into(),
        ServiceType::ApiGateway => ApiGatewayConfig {
            name: names.api_name.clone(),
            description: "API Management".into(),
            stage_name: "v1".into(),
            ..ApiGatewayConfig::default()
        }
        .into(),
        ServiceType::Sqs => SqsConfig {
            queues: vec![SqsQueueConfig {
                message_retention_seconds: 1_209_600,
                dlq_max_receive_count: 10,
                ..SqsQueueConfig::default()
            }],
        }
        .into(),
        ServiceType::Cloudfront => CloudFrontConfig {
            comment: names.cdn_comment.clone(),
            price_class: PriceClass::PriceClassAll,
            custom_error_responses: Vec::new(),
            ..CloudFrontConfig::default()
        }
        .into(),
        ServiceType::Iam => IamConfig {
            role_name: names.role_name.clone(),
            create_instance_profile: false,
            ..IamConfig::default()
        }
        .into(),
        // Same shape and values as AWS
        ServiceType::Vpc
        | ServiceType::S3
        | ServiceType::Sns
        | ServiceType::Eventbridge
        | ServiceType::Ses
        | ServiceType::Cloudwatch => aws_default(service, names),
    }
}

/// Fresh project for `provider` with no services enabled
pub fn default_project(provider: Provider) -> ProjectConfig {
    let name = DEFAULT_PROJECT_NAME.to_string();
    let environment = "dev".to_string();
    let tags = BTreeMap::from([
        ("ManagedBy".to_string(), "Terraform".to_string()),
        (ENVIRONMENT_TAG.to_string(), environment.clone()),
    ]);

    ProjectConfig {
        resource_group: (provider == Provider::Azure).then(|| format!("rg-{name}")),
        name,
        provider,
        region: provider.default_region().to_string(),
        environment,
        services: ServiceSelection::default(),
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let aws = DerivedNames::for_project(Provider::Aws, "acme");
        assert_eq!(aws.bucket_prefix, "acme");
        assert_eq!(aws.role_name, "acme-role");
        assert_eq!(aws.ses_config_set, "acme-ses-config");
        assert_eq!(aws.cdn_comment, "acme CDN");

        let azure = DerivedNames::for_project(Provider::Azure, "acme");
        assert_eq!(azure.role_name, "acme-identity");
        assert_eq!(azure.ses_config_set, "acme-comm");

        let blank = DerivedNames::for_project(Provider::Aws, "");
        assert_eq!(blank.bucket_prefix, "my-app");
        assert_eq!(blank.db_identifier, "app-db");
    }

    #[test]
    fn test_default_config_matches_service() {
        for provider in Provider::ALL {
            for service in ServiceType::ALL {
                let config = default_config(provider, service, "demo");
                assert_eq!(config.service_type(), service);
            }
        }
    }

    #[test]
    fn test_provider_specific_defaults() {
        match default_config(Provider::Azure, ServiceType::Ec2, "x") {
            ServiceConfig::Ec2(ec2) => {
                assert_eq!(ec2.instance_type, "Standard_B1s");
                assert_eq!(ec2.root_volume_size, 30);
            }
            other => panic!("unexpected {other:?}"),
        }
        match default_config(Provider::Aws, ServiceType::S3, "acme") {
            ServiceConfig::S3(s3) => assert_eq!(s3.bucket_prefix, "acme"),
            other => panic!("unexpected {other:?}"),
        }
        match default_config(Provider::Azure, ServiceType::Subnets, "x") {
            ServiceConfig::Subnets(subnets) => assert_eq!(subnets.availability_zones, vec!["1"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_project() {
        let aws = default_project(Provider::Aws);
        assert_eq!(aws.region, "us-east-1");
        assert_eq!(aws.resource_group, None);
        assert!(aws.services.is_empty());
        assert_eq!(aws.tags.get("Environment").map(String::as_str), Some("dev"));

        let azure = default_project(Provider::Azure);
        assert_eq!(azure.region, "eastus");
        assert_eq!(azure.resource_group.as_deref(), Some("rg-my-terraform-project"));
    }

    #[test]
    fn test_rederive_keeps_manual_edits() {
        let old = DerivedNames::for_project(Provider::Aws, "acme");
        let new = DerivedNames::for_project(Provider::Aws, "acme2");

        let mut services = ServiceSelection {
            s3: Some(S3Config {
                bucket_prefix: "acme".into(),
                ..S3Config::default()
            }),
            iam: Some(IamConfig {
                role_name: "custom-role".into(),
                ..IamConfig::default()
            }),
            ..ServiceSelection::default()
        };
        new.rederive(&old, &mut services);

        assert_eq!(services.s3.unwrap().bucket_prefix, "acme2");
        assert_eq!(services.iam.unwrap().role_name, "custom-role");
    }
}

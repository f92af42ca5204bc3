//! Partial updates to service configs.
//!
//! A patch carries `Some` for each field to overwrite. Merging is shallow:
//! nested lists and records are replaced wholesale.

use serde::{Deserialize, Serialize};

use crate::model::ServiceType;
use crate::services::*;

macro_rules! config_patch {
    ($patch:ident for $config:ty { $($field:ident: $ty:ty),* $(,)? }) => {
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct $patch {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $patch {
            /// Overwrite the fields this patch sets
            pub fn apply(&self, config: &mut $config) {
                $(
                    if let Some(value) = &self.$field {
                        config.$field = value.clone();
                    }
                )*
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }
        }
    };
}

config_patch!(VpcPatch for VpcConfig {
    cidr_block: String,
    enable_dns_hostnames: bool,
    enable_dns_support: bool,
});

config_patch!(SubnetPatch for SubnetConfig {
    public_subnet_cidrs: Vec<String>,
    private_subnet_cidrs: Vec<String>,
    availability_zones: Vec<String>,
    create_nat_gateway: bool,
});

config_patch!(SecurityGroupPatch for SecurityGroupConfig {
    groups: Vec<SecurityGroupDefinition>,
});

config_patch!(Ec2Patch for Ec2Config {
    instance_type: String,
    ami_id: String,
    key_pair_name: String,
    associate_public_ip: bool,
    root_volume_size: u32,
    security_group_ids: Vec<String>,
});

config_patch!(LambdaPatch for LambdaConfig {
    functions: Vec<LambdaFunctionConfig>,
});

config_patch!(RdsPatch for RdsConfig {
    identifier: String,
    engine: DbEngine,
    engine_version: String,
    instance_class: String,
    allocated_storage: u32,
    max_allocated_storage: u32,
    database_name: String,
    master_username: String,
    multi_az: bool,
    publicly_accessible: bool,
    storage_encrypted: bool,
    backup_retention_period: u32,
    deletion_protection: bool,
    skip_final_snapshot: bool,
    allowed_security_groups: Vec<String>,
});

config_patch!(S3Patch for S3Config {
    bucket_prefix: String,
    versioning_enabled: bool,
    encryption_enabled: bool,
});

config_patch!(ApiGatewayPatch for ApiGatewayConfig {
    name: String,
    description: String,
    protocol_type: ApiProtocol,
    cors_enabled: bool,
    cors_config: CorsConfig,
    routes: Vec<ApiRouteConfig>,
    stage_name: String,
    auto_deploy: bool,
    throttling_burst_limit: u32,
    throttling_rate_limit: u32,
});

config_patch!(SqsPatch for SqsConfig {
    queues: Vec<SqsQueueConfig>,
});

config_patch!(SnsPatch for SnsConfig {
    topics: Vec<SnsTopicConfig>,
});

config_patch!(EventBridgePatch for EventBridgeConfig {
    use_default_bus: bool,
    custom_bus_name: Option<String>,
    rules: Vec<EventRuleConfig>,
});

config_patch!(CloudFrontPatch for CloudFrontConfig {
    comment: String,
    enabled: bool,
    default_root_object: String,
    price_class: PriceClass,
    origin_type: OriginType,
    s3_bucket_name: Option<String>,
    custom_origin_config: Option<CustomOriginConfig>,
    default_cache_behavior: CacheBehavior,
    custom_error_responses: Vec<CustomErrorResponse>,
    geo_restriction: GeoRestriction,
});

config_patch!(SesPatch for SesConfig {
    domain_identity: Option<String>,
    email_identities: Vec<String>,
    configuration_set_name: String,
    create_smtp_credentials: bool,
    enable_sending: bool,
});

config_patch!(CloudWatchPatch for CloudWatchConfig {
    log_groups: Vec<LogGroupConfig>,
    alarms: Vec<AlarmConfig>,
    dashboard_enabled: bool,
    dashboard_name: Option<String>,
});

config_patch!(IamPatch for IamConfig {
    role_name: String,
    create_instance_profile: bool,
    managed_policy_arns: Vec<String>,
    s3_access: bool,
});

macro_rules! service_patch {
    ($($field:ident: $variant:ident($patch:ident)),* $(,)?) => {
        /// Patch for any one service
        #[derive(Clone, Debug, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum ServicePatch {
            $($variant($patch),)*
        }

        impl ServicePatch {
            pub fn service_type(&self) -> ServiceType {
                match self {
                    $(ServicePatch::$variant(_) => ServiceType::$variant,)*
                }
            }

            /// Parse a patch for `service` from YAML
            pub fn from_yaml(service: ServiceType, yaml: &str) -> Result<Self, serde_yaml::Error> {
                Ok(match service {
                    $(ServiceType::$variant => ServicePatch::$variant(serde_yaml::from_str(yaml)?),)*
                })
            }

            /// Merge into `config`; false when the service types differ
            pub fn apply_to(&self, config: &mut ServiceConfig) -> bool {
                match (self, config) {
                    $((ServicePatch::$variant(patch), ServiceConfig::$variant(config)) => {
                        patch.apply(config);
                        true
                    })*
                    _ => false,
                }
            }

            /// Merge into the selection; false when the service is disabled
            pub fn apply_to_selection(&self, selection: &mut ServiceSelection) -> bool {
                match self {
                    $(ServicePatch::$variant(patch) => match selection.$field.as_mut() {
                        Some(config) => {
                            patch.apply(config);
                            true
                        }
                        None => false,
                    },)*
                }
            }

            pub fn is_empty(&self) -> bool {
                match self {
                    $(ServicePatch::$variant(patch) => patch.is_empty(),)*
                }
            }
        }

        $(
            impl From<$patch> for ServicePatch {
                fn from(patch: $patch) -> Self {
                    ServicePatch::$variant(patch)
                }
            }
        )*
    };
}

service_patch! {
    vpc: Vpc(VpcPatch),
    subnets: Subnets(SubnetPatch),
    security_groups: SecurityGroups(SecurityGroupPatch),
    ec2: Ec2(Ec2Patch),
    lambda: Lambda(LambdaPatch),
    rds: Rds(RdsPatch),
    s3: S3(S3Patch),
    api_gateway: ApiGateway(ApiGatewayPatch),
    sqs: Sqs(SqsPatch),
    sns: Sns(SnsPatch),
    eventbridge: Eventbridge(EventBridgePatch),
    cloudfront: Cloudfront(CloudFrontPatch),
    ses: Ses(SesPatch),
    cloudwatch: Cloudwatch(CloudWatchPatch),
    iam: Iam(IamPatch),
}

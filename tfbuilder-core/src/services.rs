//! Per-service configuration records.
//!
//! Both providers share these shapes; generators interpret fields per
//! provider. `Default` for every record is the AWS compiled-in default with
//! name-derived fields left blank, which is also what serde fills in for
//! fields a hand-written project document omits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{ParseEnumError, ServiceType};

/// Closed string enum with the literal spelling used in Terraform
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $first:ident => $first_str:literal
            $(, $variant:ident => $str:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            #[serde(rename = $first_str)]
            $first,
            $(
                #[serde(rename = $str)]
                $variant,
            )*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$name::$first $(, $name::$variant)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::$first => $first_str,
                    $($name::$variant => $str,)*
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$first
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| ParseEnumError::new($kind, s))
            }
        }
    };
}

string_enum! {
    pub enum RuleProtocol ("protocol") {
        Tcp => "tcp",
        Udp => "udp",
        Icmp => "icmp",
        All => "-1",
    }
}

string_enum! {
    pub enum DbEngine ("engine") {
        Postgres => "postgres",
        Mysql => "mysql",
        Mariadb => "mariadb",
    }
}

string_enum! {
    pub enum LambdaRuntime ("runtime") {
        Nodejs20 => "nodejs20.x",
        Nodejs18 => "nodejs18.x",
        Python312 => "python3.12",
        Python311 => "python3.11",
        Java21 => "java21",
        ProvidedAl2023 => "provided.al2023",
    }
}

string_enum! {
    pub enum Architecture ("architecture") {
        Arm64 => "arm64",
        X86 => "x86_64",
    }
}

string_enum! {
    pub enum SubnetKind ("subnet type") {
        Private => "private",
        Public => "public",
    }
}

string_enum! {
    pub enum ApiProtocol ("API protocol") {
        Http => "HTTP",
        Websocket => "WEBSOCKET",
    }
}

string_enum! {
    pub enum HttpMethod ("HTTP method") {
        Get => "GET",
        Post => "POST",
        Put => "PUT",
        Delete => "DELETE",
        Patch => "PATCH",
        Any => "ANY",
    }
}

string_enum! {
    pub enum SubscriptionProtocol ("subscription protocol") {
        Sqs => "sqs",
        Lambda => "lambda",
        Email => "email",
        Https => "https",
    }
}

string_enum! {
    pub enum TargetType ("target type") {
        Lambda => "lambda",
        Sqs => "sqs",
        Sns => "sns",
    }
}

string_enum! {
    pub enum Statistic ("statistic") {
        Average => "Average",
        Sum => "Sum",
        Maximum => "Maximum",
        Minimum => "Minimum",
    }
}

string_enum! {
    pub enum ComparisonOperator ("comparison operator") {
        GreaterThanThreshold => "GreaterThanThreshold",
        LessThanThreshold => "LessThanThreshold",
        GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
        LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
    }
}

string_enum! {
    pub enum PriceClass ("price class") {
        PriceClass100 => "PriceClass_100",
        PriceClass200 => "PriceClass_200",
        PriceClassAll => "PriceClass_All",
    }
}

string_enum! {
    pub enum OriginType ("origin type") {
        S3 => "s3",
        Custom => "custom",
    }
}

string_enum! {
    pub enum OriginProtocolPolicy ("origin protocol policy") {
        HttpsOnly => "https-only",
        HttpOnly => "http-only",
        MatchViewer => "match-viewer",
    }
}

string_enum! {
    pub enum ViewerProtocolPolicy ("viewer protocol policy") {
        RedirectToHttps => "redirect-to-https",
        HttpsOnly => "https-only",
        AllowAll => "allow-all",
    }
}

string_enum! {
    pub enum GeoRestrictionType ("geo restriction") {
        None => "none",
        Whitelist => "whitelist",
        Blacklist => "blacklist",
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Networking
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpcConfig {
    pub cidr_block: String,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

impl Default for VpcConfig {
    fn default() -> Self {
        Self {
            cidr_block: "10.0.0.0/16".into(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubnetConfig {
    pub public_subnet_cidrs: Vec<String>,
    pub private_subnet_cidrs: Vec<String>,
    pub availability_zones: Vec<String>,
    pub create_nat_gateway: bool,
}

impl Default for SubnetConfig {
    fn default() -> Self {
        Self {
            public_subnet_cidrs: strings(&["10.0.1.0/24"]),
            private_subnet_cidrs: strings(&["10.0.10.0/24"]),
            availability_zones: strings(&["us-east-1a"]),
            create_nat_gateway: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityGroupRule {
    pub description: String,
    pub from_port: u32,
    pub to_port: u32,
    pub protocol: RuleProtocol,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cidr_blocks: Vec<String>,
    /// Another group in the same config, by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_security_group: Option<String>,
}

impl SecurityGroupRule {
    pub fn tcp(description: &str, port: u32, cidr: &str) -> Self {
        Self {
            description: description.into(),
            from_port: port,
            to_port: port,
            protocol: RuleProtocol::Tcp,
            cidr_blocks: strings(&[cidr]),
            source_security_group: None,
        }
    }

    pub fn tcp_from_group(description: &str, port: u32, group: &str) -> Self {
        Self {
            description: description.into(),
            from_port: port,
            to_port: port,
            protocol: RuleProtocol::Tcp,
            cidr_blocks: Vec::new(),
            source_security_group: Some(group.into()),
        }
    }

    pub fn all_outbound() -> Self {
        Self {
            description: "All outbound".into(),
            from_port: 0,
            to_port: 0,
            protocol: RuleProtocol::All,
            cidr_blocks: strings(&["0.0.0.0/0"]),
            source_security_group: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityGroupDefinition {
    pub name: String,
    pub description: String,
    pub ingress_rules: Vec<SecurityGroupRule>,
    pub egress_rules: Vec<SecurityGroupRule>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityGroupConfig {
    pub groups: Vec<SecurityGroupDefinition>,
}

impl Default for SecurityGroupConfig {
    fn default() -> Self {
        Self {
            groups: vec![SecurityGroupDefinition {
                name: "web".into(),
                description: "Security group for web servers".into(),
                ingress_rules: vec![
                    SecurityGroupRule::tcp("HTTP", 80, "0.0.0.0/0"),
                    SecurityGroupRule::tcp("HTTPS", 443, "0.0.0.0/0"),
                    SecurityGroupRule::tcp("SSH", 22, "0.0.0.0/0"),
                ],
                egress_rules: vec![SecurityGroupRule::all_outbound()],
            }],
        }
    }
}

// =============================================================================
// Compute
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ec2Config {
    pub instance_type: String,
    /// Blank means "latest Amazon Linux 2023" via a data source
    pub ami_id: String,
    pub key_pair_name: String,
    pub associate_public_ip: bool,
    pub root_volume_size: u32,
    pub security_group_ids: Vec<String>,
}

impl Default for Ec2Config {
    fn default() -> Self {
        Self {
            instance_type: "t3.micro".into(),
            ami_id: String::new(),
            key_pair_name: String::new(),
            associate_public_ip: true,
            root_volume_size: 20,
            security_group_ids: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaFunctionConfig {
    pub name: String,
    pub description: String,
    pub runtime: LambdaRuntime,
    pub handler: String,
    pub memory_size: u32,
    pub timeout: u32,
    pub architecture: Architecture,
    pub environment_variables: BTreeMap<String, String>,
    pub create_function_url: bool,
    pub vpc_enabled: bool,
    pub vpc_subnet_type: SubnetKind,
    pub layers: Vec<String>,
    pub reserved_concurrency: Option<u32>,
}

impl Default for LambdaFunctionConfig {
    fn default() -> Self {
        Self {
            name: "handler".into(),
            description: "Lambda function".into(),
            runtime: LambdaRuntime::Nodejs20,
            handler: "index.handler".into(),
            memory_size: 256,
            timeout: 30,
            architecture: Architecture::Arm64,
            environment_variables: BTreeMap::new(),
            create_function_url: false,
            vpc_enabled: false,
            vpc_subnet_type: SubnetKind::Private,
            layers: Vec::new(),
            reserved_concurrency: None,
        }
    }
}

impl LambdaFunctionConfig {
    pub fn named(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaConfig {
    pub functions: Vec<LambdaFunctionConfig>,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            functions: vec![LambdaFunctionConfig::default()],
        }
    }
}

// =============================================================================
// Data
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdsConfig {
    pub identifier: String,
    pub engine: DbEngine,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub max_allocated_storage: u32,
    pub database_name: String,
    pub master_username: String,
    pub multi_az: bool,
    pub publicly_accessible: bool,
    pub storage_encrypted: bool,
    pub backup_retention_period: u32,
    pub deletion_protection: bool,
    pub skip_final_snapshot: bool,
    pub allowed_security_groups: Vec<String>,
}

impl Default for RdsConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            engine: DbEngine::Postgres,
            engine_version: "15.4".into(),
            instance_class: "db.t3.micro".into(),
            allocated_storage: 20,
            max_allocated_storage: 100,
            database_name: "app".into(),
            master_username: "dbadmin".into(),
            multi_az: false,
            publicly_accessible: false,
            storage_encrypted: true,
            backup_retention_period: 7,
            deletion_protection: false,
            skip_final_snapshot: true,
            allowed_security_groups: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket_prefix: String,
    pub versioning_enabled: bool,
    pub encryption_enabled: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket_prefix: String::new(),
            versioning_enabled: true,
            encryption_enabled: true,
        }
    }
}

// =============================================================================
// API
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: strings(&["*"]),
            allow_methods: strings(&["GET", "POST", "PUT", "DELETE", "OPTIONS"]),
            allow_headers: strings(&["*"]),
            max_age: 300,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiRouteConfig {
    pub path: String,
    pub method: HttpMethod,
    /// Lambda function, by name
    pub lambda_function: String,
}

impl ApiRouteConfig {
    pub fn new(method: HttpMethod, path: &str, lambda_function: &str) -> Self {
        Self {
            path: path.into(),
            method,
            lambda_function: lambda_function.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiGatewayConfig {
    pub name: String,
    pub description: String,
    pub protocol_type: ApiProtocol,
    pub cors_enabled: bool,
    pub cors_config: CorsConfig,
    pub routes: Vec<ApiRouteConfig>,
    pub stage_name: String,
    pub auto_deploy: bool,
    pub throttling_burst_limit: u32,
    pub throttling_rate_limit: u32,
}

impl Default for ApiGatewayConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: "REST API".into(),
            protocol_type: ApiProtocol::Http,
            cors_enabled: true,
            cors_config: CorsConfig::default(),
            routes: vec![ApiRouteConfig::new(HttpMethod::Get, "/health", "handler")],
            stage_name: "$default".into(),
            auto_deploy: true,
            throttling_burst_limit: 100,
            throttling_rate_limit: 50,
        }
    }
}

// =============================================================================
// Messaging
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqsQueueConfig {
    pub name: String,
    pub fifo: bool,
    pub content_based_deduplication: bool,
    pub visibility_timeout_seconds: u32,
    pub message_retention_seconds: u32,
    pub max_message_size: u32,
    pub delay_seconds: u32,
    pub receive_wait_time_seconds: u32,
    pub enable_dlq: bool,
    pub dlq_max_receive_count: u32,
}

impl Default for SqsQueueConfig {
    fn default() -> Self {
        Self {
            name: "queue".into(),
            fifo: false,
            content_based_deduplication: false,
            visibility_timeout_seconds: 30,
            message_retention_seconds: 345_600,
            max_message_size: 262_144,
            delay_seconds: 0,
            receive_wait_time_seconds: 0,
            enable_dlq: true,
            dlq_max_receive_count: 3,
        }
    }
}

impl SqsQueueConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqsConfig {
    pub queues: Vec<SqsQueueConfig>,
}

impl Default for SqsConfig {
    fn default() -> Self {
        Self {
            queues: vec![SqsQueueConfig::default()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnsSubscription {
    pub protocol: SubscriptionProtocol,
    /// Queue name, function name, email address or URL depending on protocol
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_policy: Option<BTreeMap<String, Vec<String>>>,
}

impl SnsSubscription {
    pub fn new(protocol: SubscriptionProtocol, endpoint: &str) -> Self {
        Self {
            protocol,
            endpoint: endpoint.into(),
            filter_policy: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnsTopicConfig {
    pub name: String,
    pub display_name: String,
    pub fifo: bool,
    pub content_based_deduplication: bool,
    pub subscriptions: Vec<SnsSubscription>,
}

impl Default for SnsTopicConfig {
    fn default() -> Self {
        Self {
            name: "notifications".into(),
            display_name: "Notifications".into(),
            fifo: false,
            content_based_deduplication: false,
            subscriptions: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnsConfig {
    pub topics: Vec<SnsTopicConfig>,
}

impl Default for SnsConfig {
    fn default() -> Self {
        Self {
            topics: vec![SnsTopicConfig::default()],
        }
    }
}

// =============================================================================
// Events
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTransformer {
    pub input_paths: BTreeMap<String, String>,
    pub input_template: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTarget {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    /// Function, queue or topic, by name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_transformer: Option<InputTransformer>,
}

impl EventTarget {
    pub fn new(target_type: TargetType, name: &str) -> Self {
        Self {
            target_type,
            name: name.into(),
            input_transformer: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRuleConfig {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_pattern: Option<EventPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_expression: Option<String>,
    pub targets: Vec<EventTarget>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBridgeConfig {
    pub use_default_bus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_bus_name: Option<String>,
    pub rules: Vec<EventRuleConfig>,
}

impl Default for EventBridgeConfig {
    fn default() -> Self {
        Self {
            use_default_bus: true,
            custom_bus_name: None,
            rules: Vec::new(),
        }
    }
}

// =============================================================================
// Observability
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogGroupConfig {
    pub name: String,
    pub retention_days: u32,
}

impl Default for LogGroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            retention_days: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub name: String,
    pub description: String,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: Statistic,
    pub period: u32,
    pub evaluation_periods: u32,
    pub threshold: f64,
    pub comparison_operator: ComparisonOperator,
    pub dimensions: BTreeMap<String, String>,
    pub actions_enabled: bool,
    /// Topic names
    pub alarm_actions: Vec<String>,
    pub ok_actions: Vec<String>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            metric_name: String::new(),
            namespace: String::new(),
            statistic: Statistic::Average,
            period: 300,
            evaluation_periods: 2,
            threshold: 0.0,
            comparison_operator: ComparisonOperator::GreaterThanThreshold,
            dimensions: BTreeMap::new(),
            actions_enabled: true,
            alarm_actions: Vec::new(),
            ok_actions: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudWatchConfig {
    pub log_groups: Vec<LogGroupConfig>,
    pub alarms: Vec<AlarmConfig>,
    pub dashboard_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_name: Option<String>,
}

// =============================================================================
// Delivery
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomOriginConfig {
    pub domain_name: String,
    pub origin_protocol_policy: OriginProtocolPolicy,
    pub http_port: u32,
    pub https_port: u32,
}

impl Default for CustomOriginConfig {
    fn default() -> Self {
        Self {
            domain_name: String::new(),
            origin_protocol_policy: OriginProtocolPolicy::HttpsOnly,
            http_port: 80,
            https_port: 443,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheBehavior {
    pub allowed_methods: Vec<String>,
    pub cached_methods: Vec<String>,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub min_ttl: u32,
    pub default_ttl: u32,
    pub max_ttl: u32,
    pub compress: bool,
}

impl Default for CacheBehavior {
    fn default() -> Self {
        Self {
            allowed_methods: strings(&["GET", "HEAD"]),
            cached_methods: strings(&["GET", "HEAD"]),
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            min_ttl: 0,
            default_ttl: 86_400,
            max_ttl: 31_536_000,
            compress: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomErrorResponse {
    pub error_code: u32,
    pub response_code: u32,
    pub response_page_path: String,
    pub error_caching_min_ttl: u32,
}

impl CustomErrorResponse {
    /// Serve the SPA entry page for `error_code`
    pub fn spa_fallback(error_code: u32) -> Self {
        Self {
            error_code,
            response_code: 200,
            response_page_path: "/index.html".into(),
            error_caching_min_ttl: 300,
        }
    }
}

impl Default for CustomErrorResponse {
    fn default() -> Self {
        Self::spa_fallback(404)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoRestriction {
    pub restriction_type: GeoRestrictionType,
    pub locations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudFrontConfig {
    pub comment: String,
    pub enabled: bool,
    pub default_root_object: String,
    pub price_class: PriceClass,
    pub origin_type: OriginType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_origin_config: Option<CustomOriginConfig>,
    pub default_cache_behavior: CacheBehavior,
    pub custom_error_responses: Vec<CustomErrorResponse>,
    pub geo_restriction: GeoRestriction,
}

impl Default for CloudFrontConfig {
    fn default() -> Self {
        Self {
            comment: String::new(),
            enabled: true,
            default_root_object: "index.html".into(),
            price_class: PriceClass::PriceClass100,
            origin_type: OriginType::S3,
            s3_bucket_name: None,
            custom_origin_config: None,
            default_cache_behavior: CacheBehavior::default(),
            custom_error_responses: vec![
                CustomErrorResponse::spa_fallback(404),
                CustomErrorResponse::spa_fallback(403),
            ],
            geo_restriction: GeoRestriction::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_identity: Option<String>,
    pub email_identities: Vec<String>,
    pub configuration_set_name: String,
    pub create_smtp_credentials: bool,
    pub enable_sending: bool,
}

impl Default for SesConfig {
    fn default() -> Self {
        Self {
            domain_identity: None,
            email_identities: Vec::new(),
            configuration_set_name: String::new(),
            create_smtp_credentials: false,
            enable_sending: true,
        }
    }
}

// =============================================================================
// Identity
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IamConfig {
    pub role_name: String,
    pub create_instance_profile: bool,
    pub managed_policy_arns: Vec<String>,
    pub s3_access: bool,
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            role_name: String::new(),
            create_instance_profile: true,
            managed_policy_arns: Vec::new(),
            s3_access: true,
        }
    }
}

// =============================================================================
// Selection
// =============================================================================

macro_rules! service_selection {
    ($($field:ident: $variant:ident($config:ty)),* $(,)?) => {
        /// Every service mapped to its config, or `None` when disabled
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ServiceSelection {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<$config>,
            )*
        }

        /// Config of any one service
        #[derive(Clone, Debug, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum ServiceConfig {
            $($variant($config),)*
        }

        impl ServiceConfig {
            pub fn service_type(&self) -> ServiceType {
                match self {
                    $(ServiceConfig::$variant(_) => ServiceType::$variant,)*
                }
            }
        }

        $(
            impl From<$config> for ServiceConfig {
                fn from(config: $config) -> Self {
                    ServiceConfig::$variant(config)
                }
            }
        )*

        impl ServiceSelection {
            pub fn is_enabled(&self, service: ServiceType) -> bool {
                match service {
                    $(ServiceType::$variant => self.$field.is_some(),)*
                }
            }

            pub fn get(&self, service: ServiceType) -> Option<ServiceConfig> {
                match service {
                    $(ServiceType::$variant => self.$field.clone().map(ServiceConfig::$variant),)*
                }
            }

            /// Install `config` in the slot of its service type
            pub fn set(&mut self, config: ServiceConfig) {
                match config {
                    $(ServiceConfig::$variant(c) => self.$field = Some(c),)*
                }
            }

            /// Disable `service`; returns whether it was enabled
            pub fn clear(&mut self, service: ServiceType) -> bool {
                match service {
                    $(ServiceType::$variant => self.$field.take().is_some(),)*
                }
            }
        }
    };
}

service_selection! {
    vpc: Vpc(VpcConfig),
    subnets: Subnets(SubnetConfig),
    security_groups: SecurityGroups(SecurityGroupConfig),
    ec2: Ec2(Ec2Config),
    lambda: Lambda(LambdaConfig),
    rds: Rds(RdsConfig),
    s3: S3(S3Config),
    api_gateway: ApiGateway(ApiGatewayConfig),
    sqs: Sqs(SqsConfig),
    sns: Sns(SnsConfig),
    eventbridge: Eventbridge(EventBridgeConfig),
    cloudfront: Cloudfront(CloudFrontConfig),
    ses: Ses(SesConfig),
    cloudwatch: Cloudwatch(CloudWatchConfig),
    iam: Iam(IamConfig),
}

impl ServiceSelection {
    /// Enabled services in canonical order
    pub fn enabled(&self) -> Vec<ServiceType> {
        ServiceType::ALL
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }

    pub fn enabled_set(&self) -> std::collections::BTreeSet<ServiceType> {
        self.enabled().into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        ServiceType::ALL.into_iter().all(|s| !self.is_enabled(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_enums_use_terraform_spelling() {
        assert_eq!(RuleProtocol::All.as_str(), "-1");
        assert_eq!("python3.12".parse::<LambdaRuntime>().unwrap(), LambdaRuntime::Python312);
        assert_eq!(
            serde_yaml::to_string(&PriceClass::PriceClassAll).unwrap().trim(),
            "PriceClass_All"
        );
        assert!("ruby".parse::<LambdaRuntime>().is_err());
    }

    #[test]
    fn test_partial_document_takes_defaults() {
        let yaml = r#"
vpc:
  cidr_block: 172.16.0.0/16
lambda:
  functions:
    - name: worker
      runtime: python3.11
"#;
        let selection: ServiceSelection = serde_yaml::from_str(yaml).unwrap();

        let vpc = selection.vpc.as_ref().unwrap();
        assert_eq!(vpc.cidr_block, "172.16.0.0/16");
        assert!(vpc.enable_dns_support);

        let func = &selection.lambda.as_ref().unwrap().functions[0];
        assert_eq!(func.name, "worker");
        assert_eq!(func.runtime, LambdaRuntime::Python311);
        assert_eq!(func.memory_size, 256);
        assert_eq!(selection.enabled(), vec![ServiceType::Vpc, ServiceType::Lambda]);
    }

    #[test]
    fn test_selection_set_get_clear() {
        let mut selection = ServiceSelection::default();
        assert!(selection.is_empty());

        selection.set(S3Config::default().into());
        assert!(selection.is_enabled(ServiceType::S3));
        assert_eq!(
            selection.get(ServiceType::S3).map(|c| c.service_type()),
            Some(ServiceType::S3)
        );

        assert!(selection.clear(ServiceType::S3));
        assert!(!selection.clear(ServiceType::S3));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_event_target_type_field_name() {
        let yaml = "type: sqs\nname: jobs\n";
        let target: EventTarget = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(target.target_type, TargetType::Sqs);
        assert_eq!(target.name, "jobs");
    }
}

//! Named starting points for a project's service selection.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::defaults::full_selection;
use crate::model::Provider;
use crate::services::*;

/// A provider-tagged preset selection
#[derive(Clone, Debug)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub provider: Provider,
    /// Name-derived fields left blank are filled in at load time
    pub services: ServiceSelection,
}

static AWS_TEMPLATES: LazyLock<Vec<Template>> = LazyLock::new(aws_templates);
static AZURE_TEMPLATES: LazyLock<Vec<Template>> = LazyLock::new(azure_templates);

pub fn templates(provider: Provider) -> &'static [Template] {
    match provider {
        Provider::Aws => &AWS_TEMPLATES,
        Provider::Azure => &AZURE_TEMPLATES,
    }
}

pub fn template(provider: Provider, id: &str) -> Option<&'static Template> {
    templates(provider).iter().find(|t| t.id == id)
}

fn template_entry(
    provider: Provider,
    id: &'static str,
    name: &'static str,
    description: &'static str,
    services: ServiceSelection,
) -> Template {
    Template {
        id,
        name,
        description,
        provider,
        services,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn log_group(name: &str, retention_days: u32) -> LogGroupConfig {
    LogGroupConfig {
        name: name.into(),
        retention_days,
    }
}

fn function(
    name: &str,
    description: &str,
    runtime: LambdaRuntime,
    handler: &str,
    memory_size: u32,
    timeout: u32,
) -> LambdaFunctionConfig {
    LambdaFunctionConfig {
        name: name.into(),
        description: description.into(),
        runtime,
        handler: handler.into(),
        memory_size,
        timeout,
        ..LambdaFunctionConfig::default()
    }
}

fn queue(name: &str, visibility_timeout_seconds: u32, receive_wait_time_seconds: u32) -> SqsQueueConfig {
    SqsQueueConfig {
        name: name.into(),
        visibility_timeout_seconds,
        receive_wait_time_seconds,
        ..SqsQueueConfig::default()
    }
}

fn lambda_logs(functions: &[&str], retention_days: u32) -> CloudWatchConfig {
    CloudWatchConfig {
        log_groups: functions
            .iter()
            .map(|f| log_group(&format!("/aws/lambda/{f}"), retention_days))
            .collect(),
        ..CloudWatchConfig::default()
    }
}

fn two_az_subnets(create_nat_gateway: bool) -> SubnetConfig {
    SubnetConfig {
        public_subnet_cidrs: strings(&["10.0.1.0/24", "10.0.2.0/24"]),
        private_subnet_cidrs: strings(&["10.0.10.0/24", "10.0.11.0/24"]),
        availability_zones: strings(&["us-east-1a", "us-east-1b"]),
        create_nat_gateway,
    }
}

fn public_only_subnets() -> SubnetConfig {
    SubnetConfig {
        private_subnet_cidrs: Vec::new(),
        create_nat_gateway: false,
        ..SubnetConfig::default()
    }
}

fn iam(s3_access: bool) -> IamConfig {
    IamConfig {
        s3_access,
        ..IamConfig::default()
    }
}

fn aws_templates() -> Vec<Template> {
    let aws = Provider::Aws;

    vec![
        template_entry(
            aws,
            "blank",
            "Blank Project",
            "Start from scratch - select services manually",
            ServiceSelection::default(),
        ),
        template_entry(
            aws,
            "simple-web",
            "Simple Web Server",
            "VPC + public subnet + EC2 with security group",
            ServiceSelection {
                vpc: Some(VpcConfig::default()),
                subnets: Some(public_only_subnets()),
                security_groups: Some(SecurityGroupConfig::default()),
                ec2: Some(Ec2Config::default()),
                iam: Some(iam(false)),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "web-with-storage",
            "Web App with Storage",
            "Web server + S3 bucket with EC2 access permissions",
            ServiceSelection {
                vpc: Some(VpcConfig::default()),
                subnets: Some(public_only_subnets()),
                security_groups: Some(SecurityGroupConfig::default()),
                ec2: Some(Ec2Config::default()),
                s3: Some(S3Config::default()),
                iam: Some(iam(true)),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "multi-tier",
            "Multi-Tier Architecture",
            "VPC with public/private subnets, NAT Gateway, EC2, S3",
            ServiceSelection {
                vpc: Some(VpcConfig::default()),
                subnets: Some(two_az_subnets(true)),
                security_groups: Some(SecurityGroupConfig::default()),
                ec2: Some(Ec2Config::default()),
                s3: Some(S3Config::default()),
                iam: Some(iam(true)),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "serverless-api",
            "Serverless REST API",
            "API Gateway + Lambda - fully serverless backend",
            ServiceSelection {
                iam: Some(iam(false)),
                lambda: Some(LambdaConfig {
                    functions: vec![function(
                        "api-handler",
                        "Main API handler",
                        LambdaRuntime::Nodejs20,
                        "index.handler",
                        256,
                        30,
                    )],
                }),
                api_gateway: Some(ApiGatewayConfig {
                    routes: vec![
                        ApiRouteConfig::new(HttpMethod::Get, "/health", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Get, "/items", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Post, "/items", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Get, "/items/{id}", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Put, "/items/{id}", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Delete, "/items/{id}", "api-handler"),
                    ],
                    ..ApiGatewayConfig::default()
                }),
                cloudwatch: Some(lambda_logs(&["api-handler"], 30)),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "event-driven",
            "Event-Driven Architecture",
            "EventBridge + Lambda + SQS + SNS - decoupled microservices",
            ServiceSelection {
                iam: Some(iam(false)),
                lambda: Some(LambdaConfig {
                    functions: vec![
                        function(
                            "event-processor",
                            "Processes incoming events",
                            LambdaRuntime::Python312,
                            "handler.process",
                            256,
                            60,
                        ),
                        function(
                            "notification-sender",
                            "Sends notifications",
                            LambdaRuntime::Python312,
                            "handler.notify",
                            128,
                            30,
                        ),
                    ],
                }),
                sqs: Some(SqsConfig {
                    queues: vec![queue("events-queue", 60, 20)],
                }),
                sns: Some(SnsConfig {
                    topics: vec![SnsTopicConfig {
                        name: "notifications".into(),
                        display_name: "App Notifications".into(),
                        ..SnsTopicConfig::default()
                    }],
                }),
                eventbridge: Some(EventBridgeConfig {
                    use_default_bus: true,
                    custom_bus_name: None,
                    rules: vec![EventRuleConfig {
                        name: "process-events".into(),
                        description: "Route events to processor".into(),
                        event_pattern: Some(EventPattern {
                            source: Some(strings(&["app.events"])),
                            detail_type: Some(strings(&["OrderCreated", "OrderUpdated"])),
                            detail: None,
                        }),
                        schedule_expression: None,
                        targets: vec![EventTarget::new(TargetType::Lambda, "event-processor")],
                    }],
                }),
                cloudwatch: Some(lambda_logs(&["event-processor", "notification-sender"], 14)),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "static-website-cdn",
            "Static Website with CDN",
            "S3 + CloudFront - global static site hosting",
            ServiceSelection {
                iam: Some(iam(false)),
                s3: Some(S3Config {
                    bucket_prefix: "website".into(),
                    versioning_enabled: false,
                    encryption_enabled: true,
                }),
                cloudfront: Some(CloudFrontConfig {
                    comment: "Static website CDN".into(),
                    ..CloudFrontConfig::default()
                }),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "full-stack-serverless",
            "Full-Stack Serverless",
            "VPC + RDS + Lambda + API Gateway + S3 + CloudFront",
            ServiceSelection {
                vpc: Some(VpcConfig::default()),
                subnets: Some(two_az_subnets(true)),
                security_groups: Some(SecurityGroupConfig {
                    groups: vec![
                        SecurityGroupDefinition {
                            name: "lambda".into(),
                            description: "Security group for Lambda functions".into(),
                            ingress_rules: Vec::new(),
                            egress_rules: vec![SecurityGroupRule::all_outbound()],
                        },
                        SecurityGroupDefinition {
                            name: "rds".into(),
                            description: "Security group for RDS".into(),
                            ingress_rules: vec![SecurityGroupRule::tcp_from_group(
                                "PostgreSQL from Lambda",
                                5432,
                                "lambda",
                            )],
                            egress_rules: Vec::new(),
                        },
                    ],
                }),
                iam: Some(iam(true)),
                rds: Some(RdsConfig {
                    allowed_security_groups: strings(&["lambda"]),
                    ..RdsConfig::default()
                }),
                lambda: Some(LambdaConfig {
                    functions: vec![LambdaFunctionConfig {
                        vpc_enabled: true,
                        ..function(
                            "api-handler",
                            "Main API handler with DB access",
                            LambdaRuntime::Nodejs20,
                            "index.handler",
                            512,
                            30,
                        )
                    }],
                }),
                api_gateway: Some(ApiGatewayConfig {
                    routes: vec![ApiRouteConfig::new(HttpMethod::Any, "/api/{proxy+}", "api-handler")],
                    ..ApiGatewayConfig::default()
                }),
                s3: Some(S3Config {
                    bucket_prefix: "frontend".into(),
                    versioning_enabled: false,
                    encryption_enabled: true,
                }),
                cloudfront: Some(CloudFrontConfig {
                    comment: "Frontend CDN".into(),
                    ..CloudFrontConfig::default()
                }),
                cloudwatch: Some(CloudWatchConfig {
                    alarms: vec![AlarmConfig {
                        name: "lambda-errors".into(),
                        description: "Alert on Lambda errors".into(),
                        metric_name: "Errors".into(),
                        namespace: "AWS/Lambda".into(),
                        statistic: Statistic::Sum,
                        threshold: 5.0,
                        dimensions: BTreeMap::from([("FunctionName".into(), "api-handler".into())]),
                        ..AlarmConfig::default()
                    }],
                    ..lambda_logs(&["api-handler"], 30)
                }),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "scheduled-jobs",
            "Scheduled Jobs",
            "EventBridge + Lambda - cron-based background processing",
            ServiceSelection {
                iam: Some(iam(false)),
                lambda: Some(LambdaConfig {
                    functions: vec![
                        LambdaFunctionConfig {
                            reserved_concurrency: Some(1),
                            ..function(
                                "daily-cleanup",
                                "Daily cleanup job",
                                LambdaRuntime::Python312,
                                "handler.cleanup",
                                256,
                                300,
                            )
                        },
                        LambdaFunctionConfig {
                            reserved_concurrency: Some(1),
                            ..function(
                                "hourly-sync",
                                "Hourly data sync",
                                LambdaRuntime::Python312,
                                "handler.sync",
                                512,
                                600,
                            )
                        },
                    ],
                }),
                eventbridge: Some(EventBridgeConfig {
                    use_default_bus: true,
                    custom_bus_name: None,
                    rules: vec![
                        EventRuleConfig {
                            name: "daily-cleanup-schedule".into(),
                            description: "Trigger daily cleanup at midnight UTC".into(),
                            event_pattern: None,
                            schedule_expression: Some("cron(0 0 * * ? *)".into()),
                            targets: vec![EventTarget::new(TargetType::Lambda, "daily-cleanup")],
                        },
                        EventRuleConfig {
                            name: "hourly-sync-schedule".into(),
                            description: "Trigger sync every hour".into(),
                            event_pattern: None,
                            schedule_expression: Some("rate(1 hour)".into()),
                            targets: vec![EventTarget::new(TargetType::Lambda, "hourly-sync")],
                        },
                    ],
                }),
                cloudwatch: Some(lambda_logs(&["daily-cleanup", "hourly-sync"], 14)),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            aws,
            "notification-system",
            "Notification System",
            "SNS + SQS + Lambda + SES - multi-channel notifications",
            ServiceSelection {
                iam: Some(iam(false)),
                sns: Some(SnsConfig {
                    topics: vec![SnsTopicConfig {
                        name: "user-notifications".into(),
                        display_name: "User Notifications".into(),
                        subscriptions: vec![
                            SnsSubscription::new(SubscriptionProtocol::Sqs, "email-queue"),
                            SnsSubscription::new(SubscriptionProtocol::Lambda, "push-sender"),
                        ],
                        ..SnsTopicConfig::default()
                    }],
                }),
                sqs: Some(SqsConfig {
                    queues: vec![queue("email-queue", 60, 20)],
                }),
                lambda: Some(LambdaConfig {
                    functions: vec![
                        LambdaFunctionConfig {
                            reserved_concurrency: Some(5),
                            ..function(
                                "email-sender",
                                "Processes email queue and sends via SES",
                                LambdaRuntime::Nodejs20,
                                "index.handler",
                                256,
                                30,
                            )
                        },
                        LambdaFunctionConfig {
                            reserved_concurrency: Some(10),
                            ..function(
                                "push-sender",
                                "Sends push notifications",
                                LambdaRuntime::Nodejs20,
                                "index.handler",
                                128,
                                10,
                            )
                        },
                    ],
                }),
                ses: Some(SesConfig {
                    email_identities: strings(&["noreply@example.com"]),
                    configuration_set_name: "notifications".into(),
                    ..SesConfig::default()
                }),
                cloudwatch: Some(lambda_logs(&["email-sender", "push-sender"], 14)),
                ..ServiceSelection::default()
            },
        ),
    ]
}

fn azure_function(
    name: &str,
    description: &str,
    runtime: LambdaRuntime,
    handler: &str,
    memory_size: u32,
    timeout: u32,
) -> LambdaFunctionConfig {
    LambdaFunctionConfig {
        architecture: Architecture::X86,
        ..function(name, description, runtime, handler, memory_size, timeout)
    }
}

fn azure_templates() -> Vec<Template> {
    let azure = Provider::Azure;
    let base = full_selection(azure);

    vec![
        template_entry(
            azure,
            "blank",
            "Blank Project",
            "Empty Azure project - start from scratch",
            ServiceSelection::default(),
        ),
        template_entry(
            azure,
            "simple-web",
            "Simple Web Server",
            "VNet + VM with NSG for web hosting",
            ServiceSelection {
                vpc: base.vpc.clone(),
                subnets: base.subnets.clone(),
                security_groups: base.security_groups.clone(),
                ec2: base.ec2.clone().map(|vm| Ec2Config {
                    instance_type: "Standard_B2s".into(),
                    ..vm
                }),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "web-with-storage",
            "Web Server with Storage",
            "VM with Storage Account for file storage",
            ServiceSelection {
                vpc: base.vpc.clone(),
                subnets: base.subnets.clone(),
                security_groups: base.security_groups.clone(),
                ec2: base.ec2.clone(),
                s3: base.s3.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "multi-tier",
            "Multi-Tier Application",
            "VNet, VMs, Database, and Storage",
            ServiceSelection {
                vpc: base.vpc.clone(),
                subnets: base.subnets.clone().map(|subnets| SubnetConfig {
                    public_subnet_cidrs: strings(&["10.0.1.0/24"]),
                    private_subnet_cidrs: strings(&["10.0.10.0/24", "10.0.11.0/24"]),
                    ..subnets
                }),
                security_groups: Some(SecurityGroupConfig {
                    groups: vec![
                        SecurityGroupDefinition {
                            name: "web".into(),
                            description: "Web tier security group".into(),
                            ingress_rules: vec![
                                SecurityGroupRule::tcp("HTTP", 80, "0.0.0.0/0"),
                                SecurityGroupRule::tcp("HTTPS", 443, "0.0.0.0/0"),
                            ],
                            egress_rules: vec![SecurityGroupRule::all_outbound()],
                        },
                        SecurityGroupDefinition {
                            name: "db".into(),
                            description: "Database tier security group".into(),
                            ingress_rules: vec![SecurityGroupRule::tcp_from_group(
                                "PostgreSQL",
                                5432,
                                "web",
                            )],
                            egress_rules: Vec::new(),
                        },
                    ],
                }),
                ec2: base.ec2.clone(),
                rds: base.rds.clone(),
                s3: base.s3.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "serverless-api",
            "Serverless REST API",
            "API Management + Azure Functions",
            ServiceSelection {
                lambda: Some(LambdaConfig {
                    functions: vec![azure_function(
                        "api-handler",
                        "API request handler",
                        LambdaRuntime::Nodejs20,
                        "index.handler",
                        256,
                        30,
                    )],
                }),
                api_gateway: base.api_gateway.clone().map(|apim| ApiGatewayConfig {
                    routes: vec![
                        ApiRouteConfig::new(HttpMethod::Get, "/api/health", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Get, "/api/items", "api-handler"),
                        ApiRouteConfig::new(HttpMethod::Post, "/api/items", "api-handler"),
                    ],
                    ..apim
                }),
                cloudwatch: base.cloudwatch.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "event-driven",
            "Event-Driven Architecture",
            "Event Grid + Functions + Service Bus",
            ServiceSelection {
                lambda: Some(LambdaConfig {
                    functions: vec![azure_function(
                        "event-processor",
                        "Event processing function",
                        LambdaRuntime::Nodejs20,
                        "index.handler",
                        512,
                        60,
                    )],
                }),
                sqs: Some(SqsConfig {
                    queues: vec![SqsQueueConfig {
                        message_retention_seconds: 1_209_600,
                        ..queue("events", 60, 0)
                    }],
                }),
                eventbridge: Some(EventBridgeConfig {
                    use_default_bus: false,
                    custom_bus_name: Some("events".into()),
                    rules: Vec::new(),
                }),
                cloudwatch: base.cloudwatch.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "static-website-cdn",
            "Static Website with CDN",
            "Blob Storage + Azure CDN for static hosting",
            ServiceSelection {
                s3: base.s3.clone().map(|storage| S3Config {
                    versioning_enabled: false,
                    ..storage
                }),
                cloudfront: base.cloudfront.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "full-stack-serverless",
            "Full-Stack Serverless",
            "VNet, Database, Functions, API Management, Storage, CDN",
            ServiceSelection {
                vpc: base.vpc.clone(),
                subnets: base.subnets.clone(),
                security_groups: base.security_groups.clone(),
                rds: base.rds.clone(),
                lambda: Some(LambdaConfig {
                    functions: vec![LambdaFunctionConfig {
                        vpc_enabled: true,
                        ..azure_function(
                            "api",
                            "API handler",
                            LambdaRuntime::Nodejs20,
                            "index.handler",
                            512,
                            30,
                        )
                    }],
                }),
                api_gateway: base.api_gateway.clone(),
                s3: base.s3.clone(),
                cloudfront: base.cloudfront.clone(),
                cloudwatch: base.cloudwatch.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "scheduled-jobs",
            "Scheduled Jobs",
            "Azure Functions with Timer triggers",
            ServiceSelection {
                lambda: Some(LambdaConfig {
                    functions: vec![
                        LambdaFunctionConfig {
                            reserved_concurrency: Some(1),
                            ..azure_function(
                                "daily-job",
                                "Runs daily at midnight",
                                LambdaRuntime::Python312,
                                "main.handler",
                                256,
                                300,
                            )
                        },
                        LambdaFunctionConfig {
                            reserved_concurrency: Some(1),
                            ..azure_function(
                                "hourly-job",
                                "Runs every hour",
                                LambdaRuntime::Python312,
                                "main.handler",
                                256,
                                60,
                            )
                        },
                    ],
                }),
                cloudwatch: base.cloudwatch.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
        template_entry(
            azure,
            "notification-system",
            "Notification System",
            "Service Bus + Functions + Communication Services",
            ServiceSelection {
                lambda: Some(LambdaConfig {
                    functions: vec![azure_function(
                        "notification-handler",
                        "Processes and sends notifications",
                        LambdaRuntime::Nodejs20,
                        "index.handler",
                        256,
                        30,
                    )],
                }),
                sns: Some(SnsConfig {
                    topics: vec![SnsTopicConfig {
                        subscriptions: vec![SnsSubscription::new(
                            SubscriptionProtocol::Lambda,
                            "notification-handler",
                        )],
                        ..SnsTopicConfig::default()
                    }],
                }),
                sqs: base.sqs.clone(),
                ses: base.ses.clone(),
                cloudwatch: base.cloudwatch.clone(),
                iam: base.iam.clone(),
                ..ServiceSelection::default()
            },
        ),
    ]
}

use std::collections::{BTreeMap, BTreeSet};

use super::{base_variables, hcl, placement, unique};
use crate::generate::{ModuleOutput, RefKind, ReferenceMap, ReferenceScope};
use crate::services::{
    SnsConfig, SnsSubscription, SnsTopicConfig, SqsConfig, SqsQueueConfig, SubscriptionProtocol,
};

const SECONDS_PER_DAY: u32 = 86_400;
/// Service Bus caps the peek-lock duration at five minutes
const MAX_LOCK_MINUTES: u32 = 5;
const DEFAULT_MAX_DELIVERY: u32 = 10;
/// Subscription names are limited to 50 characters
const MAX_SUBSCRIPTION_NAME: usize = 50;

/// ISO 8601 duration for a number of seconds
fn iso_duration(seconds: u32) -> String {
    if seconds > 0 && seconds % SECONDS_PER_DAY == 0 {
        format!("P{}D", seconds / SECONDS_PER_DAY)
    } else {
        format!("PT{seconds}S")
    }
}

/// Peek-lock duration covering the visibility timeout, 1 to 5 minutes
fn lock_duration(visibility_timeout_seconds: u32) -> String {
    let minutes = visibility_timeout_seconds.div_ceil(60).clamp(1, MAX_LOCK_MINUTES);
    format!("PT{minutes}M")
}

/// SQL filter equivalent of a message-attribute filter policy
fn sql_filter(policy: &BTreeMap<String, Vec<String>>) -> String {
    policy
        .iter()
        .map(|(key, values)| {
            let key = if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                key.clone()
            } else {
                format!("[{}]", key.replace(']', ""))
            };
            let values: Vec<String> = values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect();
            format!("{key} IN ({})", values.join(", "))
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Service Bus namespace with queues, topics and topic subscriptions.
///
/// Queue subscriptions forward to a queue of this module by name; anything
/// else is kept on the subscription for a Service Bus consumer to read.
pub(super) fn render(
    sqs: Option<&SqsConfig>,
    sns: Option<&SnsConfig>,
    mut scope: ReferenceScope<'_>,
) -> ModuleOutput {
    let queues = sqs.map(|c| c.queues.as_slice()).unwrap_or_default();
    let topics = sns.map(|c| c.topics.as_slice()).unwrap_or_default();

    let mut sections = vec![hcl::section(
        "Azure Service Bus",
        "Namespace shared by every queue and topic.",
        &format!(
            "resource \"azurerm_servicebus_namespace\" \"main\" {{\n{}\n  sku                 = var.servicebus_sku\n\n  tags = var.tags\n}}",
            placement("\"${var.project_name}-sb\"")
        ),
    )];

    if !queues.is_empty() {
        let blocks: Vec<String> = queues.iter().map(queue).collect();
        sections.push(hcl::section(
            "Service Bus Queues",
            "Dead-lettering is built into every queue.",
            &blocks.join("\n\n"),
        ));
    }

    for config in topics {
        sections.push(topic(config, &mut scope));
    }

    let variables = hcl::join_sections([
        base_variables(false),
        hcl::variable(
            "servicebus_sku",
            "SKU for the Service Bus namespace",
            "string",
            Some("\"Standard\""),
        ),
        hcl::variable(
            "queue_max_size_mb",
            "Maximum size of queues in MB",
            "number",
            Some("1024"),
        ),
        hcl::variable(
            "topic_max_size_mb",
            "Maximum size of topics in MB",
            "number",
            Some("1024"),
        ),
    ]);

    scope.finish(
        hcl::join_sections(sections),
        variables,
        outputs(sqs.is_some(), queues, sns.is_some(), topics),
    )
}

fn entity_name(name: &str) -> String {
    format!("\"${{var.project_name}}-{}\"", hcl::escape_string(name))
}

fn queue(queue: &SqsQueueConfig) -> String {
    let id = hcl::to_terraform_id(&queue.name);
    let max_delivery = if queue.enable_dlq {
        queue.dlq_max_receive_count.max(1)
    } else {
        DEFAULT_MAX_DELIVERY
    };
    let pairs = vec![
        ("name", entity_name(&queue.name)),
        ("namespace_id", "azurerm_servicebus_namespace.main.id".to_string()),
        ("max_size_in_megabytes", "var.queue_max_size_mb".to_string()),
        (
            "default_message_ttl",
            hcl::quote(&iso_duration(queue.message_retention_seconds)),
        ),
        (
            "lock_duration",
            hcl::quote(&lock_duration(queue.visibility_timeout_seconds)),
        ),
        ("max_delivery_count", max_delivery.to_string()),
        (
            "dead_lettering_on_message_expiration",
            queue.enable_dlq.to_string(),
        ),
        ("requires_session", queue.fifo.to_string()),
        (
            "requires_duplicate_detection",
            queue.content_based_deduplication.to_string(),
        ),
        ("partitioning_enabled", "false".to_string()),
    ];
    format!(
        "resource \"azurerm_servicebus_queue\" \"{id}\" {{\n{}\n}}",
        hcl::attributes(&pairs, 2)
    )
}

fn topic(topic: &SnsTopicConfig, scope: &mut ReferenceScope<'_>) -> String {
    let id = hcl::to_terraform_id(&topic.name);
    let pairs = vec![
        ("name", entity_name(&topic.name)),
        ("namespace_id", "azurerm_servicebus_namespace.main.id".to_string()),
        ("max_size_in_megabytes", "var.topic_max_size_mb".to_string()),
        ("support_ordering", topic.fifo.to_string()),
        (
            "requires_duplicate_detection",
            topic.content_based_deduplication.to_string(),
        ),
        ("partitioning_enabled", "false".to_string()),
    ];
    let mut blocks = vec![format!(
        "resource \"azurerm_servicebus_topic\" \"{id}\" {{\n{}\n}}",
        hcl::attributes(&pairs, 2)
    )];

    let mut taken = BTreeSet::new();
    for sub in &topic.subscriptions {
        let sub_id = unique(
            &mut taken,
            format!("{id}_{}", hcl::to_terraform_id(&sub.endpoint)),
            "_",
        );
        blocks.push(subscription(&id, &sub_id, sub, scope));
    }

    hcl::join_sections([
        hcl::comment_block(
            &format!("Service Bus Topic: {}", topic.name),
            Some(&topic.display_name),
        ),
        blocks.join("\n\n"),
    ])
}

fn subscription(
    topic_id: &str,
    sub_id: &str,
    sub: &SnsSubscription,
    scope: &mut ReferenceScope<'_>,
) -> String {
    let name: String = format!(
        "{}-{}",
        sub.protocol.as_str(),
        hcl::to_terraform_id(&sub.endpoint).replace('_', "-")
    )
    .chars()
    .take(MAX_SUBSCRIPTION_NAME)
    .collect();

    let mut pairs = vec![
        ("name", hcl::quote(name.trim_end_matches('-'))),
        ("topic_id", format!("azurerm_servicebus_topic.{topic_id}.id")),
        ("max_delivery_count", DEFAULT_MAX_DELIVERY.to_string()),
        ("dead_lettering_on_message_expiration", "true".to_string()),
    ];
    let mut note = None;
    match sub.protocol {
        SubscriptionProtocol::Sqs => {
            let target = if scope.references().contains(RefKind::Queue, &sub.endpoint) {
                format!(
                    "azurerm_servicebus_queue.{}.name",
                    hcl::to_terraform_id(&sub.endpoint)
                )
            } else {
                scope.lookup(ReferenceMap::QueueIds, &sub.endpoint)
            };
            pairs.push(("forward_to", target));
        }
        SubscriptionProtocol::Lambda => {
            note = Some(format!(
                "# Read by function app {} through a Service Bus trigger",
                sub.endpoint
            ));
        }
        SubscriptionProtocol::Email | SubscriptionProtocol::Https => {
            note = Some(format!(
                "# Service Bus does not push to {} endpoints; deliver to {} from a consumer",
                sub.protocol.as_str(),
                sub.endpoint
            ));
        }
    }

    let mut block = format!(
        "resource \"azurerm_servicebus_subscription\" \"{sub_id}\" {{\n{}\n}}",
        hcl::attributes(&pairs, 2)
    );
    if let Some(note) = note {
        block = format!("{note}\n{block}");
    }

    if let Some(policy) = sub.filter_policy.as_ref().filter(|p| !p.is_empty()) {
        block.push_str(&format!(
            "\n\nresource \"azurerm_servicebus_subscription_rule\" \"{sub_id}_filter\" {{\n  name            = \"filter-policy\"\n  subscription_id = azurerm_servicebus_subscription.{sub_id}.id\n  filter_type     = \"SqlFilter\"\n  sql_filter      = {}\n}}",
            hcl::quote(&sql_filter(policy))
        ));
    }
    block
}

fn outputs(
    has_queues: bool,
    queues: &[SqsQueueConfig],
    has_topics: bool,
    topics: &[SnsTopicConfig],
) -> String {
    let mut sections = vec![
        hcl::output(
            "namespace_id",
            "ID of the Service Bus namespace",
            "azurerm_servicebus_namespace.main.id",
        ),
        hcl::output(
            "namespace_name",
            "Name of the Service Bus namespace",
            "azurerm_servicebus_namespace.main.name",
        ),
        hcl::sensitive_output(
            "primary_connection_string",
            "Primary connection string of the namespace",
            "azurerm_servicebus_namespace.main.default_primary_connection_string",
        ),
    ];
    if has_queues {
        let ids: Vec<(String, String)> = queues
            .iter()
            .map(|q| {
                (
                    q.name.clone(),
                    format!("azurerm_servicebus_queue.{}.id", hcl::to_terraform_id(&q.name)),
                )
            })
            .collect();
        sections.push(hcl::output(
            "queue_ids",
            "Map of queue names to IDs",
            &hcl::expr_map(&ids, 2),
        ));
    }
    if has_topics {
        let ids: Vec<(String, String)> = topics
            .iter()
            .map(|t| {
                (
                    t.name.clone(),
                    format!("azurerm_servicebus_topic.{}.id", hcl::to_terraform_id(&t.name)),
                )
            })
            .collect();
        sections.push(hcl::output(
            "topic_ids",
            "Map of topic names to IDs",
            &hcl::expr_map(&ids, 2),
        ));
    }
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::References;

    #[test]
    fn test_durations() {
        assert_eq!(iso_duration(345_600), "P4D");
        assert_eq!(iso_duration(3_600), "PT3600S");
        assert_eq!(lock_duration(30), "PT1M");
        assert_eq!(lock_duration(150), "PT3M");
        assert_eq!(lock_duration(43_200), "PT5M");
        assert_eq!(lock_duration(0), "PT1M");
    }

    #[test]
    fn test_sql_filter() {
        let policy = BTreeMap::from([
            ("event".to_string(), vec!["created".to_string(), "o'clock".to_string()]),
            ("order-type".to_string(), vec!["retail".to_string()]),
        ]);
        assert_eq!(
            sql_filter(&policy),
            "event IN ('created', 'o''clock') AND [order-type] IN ('retail')"
        );
    }

    #[test]
    fn test_queues_and_topics() {
        let sqs = SqsConfig {
            queues: vec![SqsQueueConfig {
                fifo: true,
                ..SqsQueueConfig::named("orders")
            }],
        };
        let mut sub = SnsSubscription::new(SubscriptionProtocol::Sqs, "orders");
        sub.filter_policy = Some(BTreeMap::from([(
            "event".to_string(),
            vec!["created".to_string()],
        )]));
        let sns = SnsConfig {
            topics: vec![SnsTopicConfig {
                name: "events".into(),
                subscriptions: vec![
                    sub,
                    SnsSubscription::new(SubscriptionProtocol::Sqs, "audit"),
                    SnsSubscription::new(SubscriptionProtocol::Email, "ops@example.com"),
                ],
                ..SnsTopicConfig::default()
            }],
        };
        let refs = References {
            queues: vec!["orders".into()],
            topics: vec!["events".into()],
            ..References::default()
        };
        let output = render(Some(&sqs), Some(&sns), ReferenceScope::new(&refs));

        assert!(output
            .main
            .contains("resource \"azurerm_servicebus_queue\" \"orders\""));
        assert!(output.main.contains("requires_session                     = true"));
        assert!(output.main.contains("default_message_ttl                  = \"P4D\""));
        assert!(output.main.contains("max_delivery_count                   = 3"));
        assert!(output
            .main
            .contains("resource \"azurerm_servicebus_subscription\" \"events_orders\""));
        assert!(output
            .main
            .contains("forward_to                           = azurerm_servicebus_queue.orders.name"));
        assert!(output
            .main
            .contains("forward_to                           = var.missing_queue_ids_audit"));
        assert!(output.main.contains("sql_filter      = \"event IN ('created')\""));
        assert!(output.main.contains("name                                 = \"email-ops-example-com\""));
        assert!(output.main.contains("# Service Bus does not push to email endpoints"));

        assert!(output.variables.contains("variable \"missing_queue_ids_audit\""));
        assert!(!output.variables.contains("variable \"queue_ids\""));
        assert!(output
            .outputs
            .contains("\"orders\" = azurerm_servicebus_queue.orders.id"));
        assert!(output
            .outputs
            .contains("\"events\" = azurerm_servicebus_topic.events.id"));
    }

    #[test]
    fn test_topics_only() {
        let refs = References::default();
        let output = render(None, Some(&SnsConfig::default()), ReferenceScope::new(&refs));
        assert!(!output.main.contains("azurerm_servicebus_queue"));
        assert!(!output.outputs.contains("queue_ids"));
        assert!(output.outputs.contains("output \"topic_ids\""));
    }
}

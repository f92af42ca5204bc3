use std::collections::BTreeSet;

use super::{base_variables, hcl, placement, unique};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{EventBridgeConfig, EventPattern, EventRuleConfig, EventTarget, TargetType};

const NO_SUBSCRIPTIONS: &str = r#"# Event Grid system topics are created per publishing resource, e.g.:
#
# resource "azurerm_eventgrid_system_topic" "storage" {
#   name                   = "${var.project_name}-storage-events"
#   resource_group_name    = var.resource_group_name
#   location               = var.location
#   source_arm_resource_id = var.storage_account_id
#   topic_type             = "Microsoft.Storage.StorageAccounts"
# }"#;

const RETRY_POLICY: &str = r#"  retry_policy {
    max_delivery_attempts = 30
    event_time_to_live    = 1440
  }"#;

/// Name of the custom topic, when one is requested
fn custom_topic(config: &EventBridgeConfig) -> Option<&str> {
    if config.use_default_bus {
        return None;
    }
    config
        .custom_bus_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
}

/// Event subscription names allow letters, digits and hyphens
fn subscription_name(rule: &str, target: &str) -> String {
    let id = hcl::to_terraform_id(&format!("{rule}-{target}"));
    id.trim_matches('_').replace('_', "-")
}

/// Optional custom Event Grid topic and one subscription per rule target.
///
/// Without a custom topic subscriptions are scoped to the resource group.
pub(super) fn render(config: &EventBridgeConfig, mut scope: ReferenceScope<'_>) -> ModuleOutput {
    let topic = custom_topic(config);
    let mut sections = Vec::new();

    if let Some(name) = topic {
        sections.push(hcl::section(
            "Azure Event Grid Topic",
            "Custom topic for application events.",
            &format!(
                "resource \"azurerm_eventgrid_topic\" \"main\" {{\n{}\n  input_schema        = \"EventGridSchema\"\n\n  tags = var.tags\n}}",
                placement(&format!(
                    "\"${{var.project_name}}-{}\"",
                    hcl::escape_string(name)
                ))
            ),
        ));
    }

    let scope_expr = if topic.is_some() {
        "azurerm_eventgrid_topic.main.id"
    } else {
        "var.resource_group_id"
    };
    let mut taken = BTreeSet::new();
    let mut subscriptions = Vec::new();
    let mut blocks = Vec::new();
    for rule in &config.rules {
        let mut rule_blocks = Vec::new();
        for target in &rule.targets {
            let id = unique(
                &mut taken,
                format!(
                    "{}_{}",
                    hcl::to_terraform_id(&rule.name),
                    hcl::to_terraform_id(&target.name)
                ),
                "_",
            );
            rule_blocks.push(subscription(&id, scope_expr, rule, target, &mut scope));
            subscriptions.push(id);
        }
        if !rule_blocks.is_empty() {
            blocks.push(hcl::join_sections([
                hcl::comment_block(&format!("Event Rule: {}", rule.name), Some(&rule.description)),
                rule_notes(rule),
                rule_blocks.join("\n\n"),
            ]));
        }
    }

    if blocks.is_empty() {
        if topic.is_none() {
            sections.push(hcl::section(
                "Azure Event Grid",
                "No custom topic or subscriptions configured.",
                NO_SUBSCRIPTIONS,
            ));
        }
    } else {
        sections.push(blocks.join("\n\n"));
    }

    let variables = hcl::join_sections([
        base_variables(false),
        hcl::variable(
            "resource_group_id",
            "ID of the resource group used as subscription scope",
            "string",
            None,
        ),
    ]);

    scope.finish(
        hcl::join_sections(sections),
        variables,
        outputs(topic.is_some(), &subscriptions),
    )
}

/// Comments for rule settings Event Grid has no equivalent for
fn rule_notes(rule: &EventRuleConfig) -> String {
    let mut notes = Vec::new();
    if let Some(schedule) = &rule.schedule_expression {
        notes.push(format!(
            "# Schedule {schedule}: use a timer-triggered function instead"
        ));
    }
    if let Some(sources) = rule.event_pattern.as_ref().and_then(|p| p.source.as_ref()) {
        notes.push(format!(
            "# Event sources: {} (the subscription scope selects the publisher)",
            sources.join(", ")
        ));
    }
    notes.join("\n")
}

fn subscription(
    id: &str,
    scope_expr: &str,
    rule: &EventRuleConfig,
    target: &EventTarget,
    scope: &mut ReferenceScope<'_>,
) -> String {
    let mut body = vec![hcl::attributes(
        &[
            ("name", hcl::quote(&subscription_name(&rule.name, &target.name))),
            ("scope", scope_expr.to_string()),
        ],
        2,
    )];

    body.push(match target.target_type {
        TargetType::Lambda => {
            let app = scope.lookup(ReferenceMap::FunctionIds, &target.name);
            format!(
                "  azure_function_endpoint {{\n    function_id = \"${{{app}}}/functions/{}\"\n  }}",
                hcl::escape_string(&target.name)
            )
        }
        TargetType::Sqs => format!(
            "  service_bus_queue_endpoint_id = {}",
            scope.lookup(ReferenceMap::QueueIds, &target.name)
        ),
        TargetType::Sns => format!(
            "  service_bus_topic_endpoint_id = {}",
            scope.lookup(ReferenceMap::TopicIds, &target.name)
        ),
    });

    if let Some(pattern) = &rule.event_pattern {
        body.extend(filters(pattern));
    }
    if target.input_transformer.is_some() {
        body.push("  # Event Grid delivers events unchanged; reshape them in the handler".to_string());
    }
    body.push(RETRY_POLICY.to_string());

    format!(
        "resource \"azurerm_eventgrid_event_subscription\" \"{id}\" {{\n{}\n}}",
        body.join("\n\n")
    )
}

/// Event type list and `data.*` advanced filters for a pattern
fn filters(pattern: &EventPattern) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(types) = pattern.detail_type.as_ref().filter(|t| !t.is_empty()) {
        out.push(format!("  included_event_types = {}", hcl::string_list(types)));
    }
    if let Some(detail) = pattern.detail.as_ref().filter(|d| !d.is_empty()) {
        let conditions: Vec<String> = detail
            .iter()
            .map(|(key, values)| {
                format!(
                    "    string_in {{\n      key    = {}\n      values = {}\n    }}",
                    hcl::quote(&format!("data.{key}")),
                    hcl::string_list(values)
                )
            })
            .collect();
        out.push(format!(
            "  advanced_filter {{\n{}\n  }}",
            conditions.join("\n\n")
        ));
    }
    out
}

fn outputs(topic: bool, subscriptions: &[String]) -> String {
    let mut sections = Vec::new();
    if topic {
        sections.push(hcl::output(
            "topic_id",
            "ID of the Event Grid topic",
            "azurerm_eventgrid_topic.main.id",
        ));
        sections.push(hcl::output(
            "topic_endpoint",
            "Endpoint of the Event Grid topic",
            "azurerm_eventgrid_topic.main.endpoint",
        ));
        sections.push(hcl::sensitive_output(
            "topic_primary_key",
            "Primary access key of the Event Grid topic",
            "azurerm_eventgrid_topic.main.primary_access_key",
        ));
    }
    let ids: Vec<String> = subscriptions
        .iter()
        .map(|id| format!("azurerm_eventgrid_event_subscription.{id}.id"))
        .collect();
    sections.push(hcl::output(
        "subscription_ids",
        "IDs of the Event Grid subscriptions",
        &hcl::expr_list(&ids),
    ));
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::generate::References;

    fn rule(targets: Vec<EventTarget>) -> EventRuleConfig {
        EventRuleConfig {
            name: "order-created".into(),
            description: "New orders".into(),
            event_pattern: Some(EventPattern {
                source: Some(vec!["shop.orders".into()]),
                detail_type: Some(vec!["OrderCreated".into()]),
                detail: Some(BTreeMap::from([(
                    "status".to_string(),
                    vec!["new".to_string()],
                )])),
            }),
            schedule_expression: None,
            targets,
        }
    }

    #[test]
    fn test_subscription_names() {
        assert_eq!(subscription_name("order-created", "process_order"), "order-created-process-order");
        assert_eq!(subscription_name("1st", "x"), "1st-x");
    }

    #[test]
    fn test_custom_topic_subscriptions() {
        let config = EventBridgeConfig {
            use_default_bus: false,
            custom_bus_name: Some("orders".into()),
            rules: vec![rule(vec![
                EventTarget::new(TargetType::Lambda, "processor"),
                EventTarget::new(TargetType::Sqs, "orders"),
                EventTarget::new(TargetType::Sns, "alerts"),
            ])],
        };
        let refs = References {
            functions: vec!["processor".into()],
            queues: vec!["orders".into()],
            ..References::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));

        assert!(output.main.contains("resource \"azurerm_eventgrid_topic\" \"main\""));
        assert!(output.main.contains("scope = azurerm_eventgrid_topic.main.id"));
        assert!(output.main.contains(
            "function_id = \"${var.function_ids[\"processor\"]}/functions/processor\""
        ));
        assert!(output
            .main
            .contains("service_bus_queue_endpoint_id = var.queue_ids[\"orders\"]"));
        assert!(output
            .main
            .contains("service_bus_topic_endpoint_id = var.missing_topic_ids_alerts"));
        assert!(output.main.contains("included_event_types = [\"OrderCreated\"]"));
        assert!(output.main.contains("key    = \"data.status\""));
        assert!(output.main.contains("# Event sources: shop.orders"));
        assert!(output
            .main
            .contains("resource \"azurerm_eventgrid_event_subscription\" \"order_created_processor\""));

        assert!(output.variables.contains("variable \"function_ids\""));
        assert!(output.variables.contains("variable \"queue_ids\""));
        assert!(output.variables.contains("variable \"missing_topic_ids_alerts\""));
        assert!(output.outputs.contains("output \"topic_endpoint\""));
    }

    #[test]
    fn test_default_bus_uses_resource_group_scope() {
        let config = EventBridgeConfig {
            rules: vec![rule(vec![EventTarget::new(TargetType::Sqs, "orders")])],
            ..EventBridgeConfig::default()
        };
        let refs = References::default();
        let output = render(&config, ReferenceScope::new(&refs));
        assert!(!output.main.contains("azurerm_eventgrid_topic\" \"main\""));
        assert!(output.main.contains("scope = var.resource_group_id"));
        assert!(!output.outputs.contains("topic_id\""));
    }

    #[test]
    fn test_empty_config_renders_guidance() {
        let refs = References::default();
        let output = render(&EventBridgeConfig::default(), ReferenceScope::new(&refs));
        assert!(output.main.contains("azurerm_eventgrid_system_topic"));
        assert!(output.outputs.contains("value       = []"));
        assert!(output.reference_maps.is_empty());
    }
}

use serde_json::{Map, Value};

use super::{base_variables, hcl, name_tag};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{EventBridgeConfig, EventPattern, EventRuleConfig, EventTarget, TargetType};

const EVENTBRIDGE_ROLE: &str = r#"data "aws_iam_policy_document" "eventbridge_assume" {
  statement {
    effect = "Allow"

    principals {
      type        = "Service"
      identifiers = ["events.amazonaws.com"]
    }

    actions = ["sts:AssumeRole"]
  }
}

resource "aws_iam_role" "eventbridge" {
  name               = "${var.project_name}-eventbridge-role"
  assume_role_policy = data.aws_iam_policy_document.eventbridge_assume.json

  tags = merge(var.tags, {
    Name = "${var.project_name}-eventbridge-role"
  })
}"#;

/// Name of the custom bus, when one is requested
fn custom_bus(config: &EventBridgeConfig) -> Option<&str> {
    if config.use_default_bus {
        return None;
    }
    config
        .custom_bus_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
}

/// Event bus, rules and targets
pub(super) fn render(config: &EventBridgeConfig, mut scope: ReferenceScope<'_>) -> ModuleOutput {
    let mut sections = Vec::new();

    let bus_ref = match custom_bus(config) {
        Some(name) => {
            sections.push(hcl::section(
                "Custom Event Bus",
                "Custom EventBridge bus for application events.",
                &format!(
                    "resource \"aws_cloudwatch_event_bus\" \"main\" {{\n  name = \"${{var.project_name}}-{}\"\n\n{}\n}}",
                    hcl::escape_string(name),
                    name_tag(name)
                ),
            ));
            "aws_cloudwatch_event_bus.main.name"
        }
        None => "\"default\"",
    };

    let mut queue_arns = Vec::new();
    for rule in &config.rules {
        sections.push(rule_section(rule, bus_ref, &mut scope, &mut queue_arns));
    }

    if !queue_arns.is_empty() {
        let policy = format!(
            r#"data "aws_iam_policy_document" "eventbridge_sqs" {{
  statement {{
    effect    = "Allow"
    actions   = ["sqs:SendMessage"]
    resources = {resources}
  }}
}}

resource "aws_iam_role_policy" "eventbridge_sqs" {{
  name   = "sqs-send-message"
  role   = aws_iam_role.eventbridge.id
  policy = data.aws_iam_policy_document.eventbridge_sqs.json
}}"#,
            resources = hcl::expr_list(&queue_arns),
        );
        sections.push(hcl::section(
            "EventBridge IAM Role",
            "Role EventBridge assumes to deliver to queue targets.",
            &format!("{EVENTBRIDGE_ROLE}\n\n{policy}"),
        ));
    }

    if sections.is_empty() {
        sections.push("# No custom event bus or rules configured".to_string());
    }

    scope.finish(
        hcl::join_sections(sections),
        base_variables(),
        outputs(config),
    )
}

/// `event_pattern` document with EventBridge's key spelling
fn pattern_json(pattern: &EventPattern) -> Value {
    let mut doc = Map::new();
    if let Some(source) = &pattern.source {
        doc.insert("source".into(), Value::from(source.clone()));
    }
    if let Some(detail_type) = &pattern.detail_type {
        doc.insert("detail-type".into(), Value::from(detail_type.clone()));
    }
    if let Some(detail) = &pattern.detail {
        let detail: Map<String, Value> = detail
            .iter()
            .map(|(key, values)| (key.clone(), Value::from(values.clone())))
            .collect();
        doc.insert("detail".into(), Value::Object(detail));
    }
    Value::Object(doc)
}

fn rule_section(
    rule: &EventRuleConfig,
    bus_ref: &str,
    scope: &mut ReferenceScope<'_>,
    queue_arns: &mut Vec<String>,
) -> String {
    let id = hcl::to_terraform_id(&rule.name);

    let trigger = match (&rule.event_pattern, &rule.schedule_expression) {
        (Some(pattern), _) => format!(
            "\n\n  event_pattern = jsonencode({})",
            hcl::json_expr(&pattern_json(pattern), 2)
        ),
        (None, Some(schedule)) => format!("\n\n  schedule_expression = {}", hcl::quote(schedule)),
        (None, None) => String::new(),
    };

    let mut blocks = vec![
        hcl::comment_block(&format!("EventBridge Rule: {}", rule.name), Some(&rule.description)),
        format!(
            r#"resource "aws_cloudwatch_event_rule" "{id}" {{
  name           = "${{var.project_name}}-{name}"
  description    = {description}
  event_bus_name = {bus_ref}{trigger}

{tags}
}}"#,
            name = hcl::escape_string(&rule.name),
            description = hcl::quote(&rule.description),
            tags = name_tag(&rule.name),
        ),
    ];

    for (index, target) in rule.targets.iter().enumerate() {
        blocks.push(target_block(&id, index, target, bus_ref, scope, queue_arns));
    }

    blocks.join("\n\n")
}

fn target_block(
    rule_id: &str,
    index: usize,
    target: &EventTarget,
    bus_ref: &str,
    scope: &mut ReferenceScope<'_>,
    queue_arns: &mut Vec<String>,
) -> String {
    let resource = format!("{rule_id}_target_{index}");
    let target_id = hcl::to_terraform_id(&target.name);

    let mut pairs = vec![
        ("rule", format!("aws_cloudwatch_event_rule.{rule_id}.name")),
        ("event_bus_name", bus_ref.to_string()),
        ("target_id", hcl::quote(&target_id)),
    ];
    match target.target_type {
        TargetType::Lambda => {
            pairs.push(("arn", scope.lookup(ReferenceMap::LambdaFunctionArns, &target.name)));
        }
        TargetType::Sqs => {
            let arn = scope.lookup(ReferenceMap::SqsQueueArns, &target.name);
            queue_arns.push(arn.clone());
            pairs.push(("arn", arn));
            pairs.push(("role_arn", "aws_iam_role.eventbridge.arn".to_string()));
        }
        TargetType::Sns => {
            pairs.push(("arn", scope.lookup(ReferenceMap::SnsTopicArns, &target.name)));
        }
    }

    let mut body = hcl::attributes(&pairs, 2);
    if let Some(transformer) = &target.input_transformer {
        let inner = [
            ("input_paths", hcl::string_map(&transformer.input_paths, 4)),
            ("input_template", hcl::quote(&transformer.input_template)),
        ];
        body.push_str(&format!(
            "\n\n  input_transformer {{\n{}\n  }}",
            hcl::attributes(&inner, 4)
        ));
    }

    let mut blocks = vec![format!(
        "resource \"aws_cloudwatch_event_target\" \"{resource}\" {{\n{body}\n}}"
    )];

    if target.target_type == TargetType::Lambda {
        let function_name = scope.lookup(ReferenceMap::LambdaFunctionNames, &target.name);
        blocks.push(format!(
            r#"resource "aws_lambda_permission" "{resource}" {{
  statement_id  = "AllowEventBridge-{rule_id}-{target_id}"
  action        = "lambda:InvokeFunction"
  function_name = {function_name}
  principal     = "events.amazonaws.com"
  source_arn    = aws_cloudwatch_event_rule.{rule_id}.arn
}}"#
        ));
    }

    blocks.join("\n\n")
}

fn outputs(config: &EventBridgeConfig) -> String {
    let mut sections = Vec::new();
    if custom_bus(config).is_some() {
        sections.push(hcl::output(
            "event_bus_name",
            "Name of the custom event bus",
            "aws_cloudwatch_event_bus.main.name",
        ));
        sections.push(hcl::output(
            "event_bus_arn",
            "ARN of the custom event bus",
            "aws_cloudwatch_event_bus.main.arn",
        ));
    }
    for rule in &config.rules {
        let id = hcl::to_terraform_id(&rule.name);
        sections.push(hcl::output(
            &format!("{id}_rule_arn"),
            &format!("ARN of the {} rule", rule.name),
            &format!("aws_cloudwatch_event_rule.{id}.arn"),
        ));
    }
    if sections.is_empty() {
        return "# No custom event bus or rules configured".to_string();
    }
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::generate::References;
    use crate::services::InputTransformer;

    fn order_rule() -> EventRuleConfig {
        EventRuleConfig {
            name: "order-created".into(),
            description: "New orders".into(),
            event_pattern: Some(EventPattern {
                source: Some(vec!["shop.orders".into()]),
                detail_type: Some(vec!["OrderCreated".into()]),
                detail: None,
            }),
            schedule_expression: None,
            targets: vec![
                EventTarget::new(TargetType::Lambda, "processor"),
                EventTarget::new(TargetType::Sqs, "orders"),
            ],
        }
    }

    #[test]
    fn test_rule_with_pattern_and_targets() {
        let refs = References {
            functions: vec!["processor".into()],
            queues: vec!["orders".into()],
            ..References::default()
        };
        let config = EventBridgeConfig {
            rules: vec![order_rule()],
            ..EventBridgeConfig::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));

        assert!(output.main.contains("event_bus_name = \"default\""));
        assert!(output.main.contains("\"detail-type\": ["));
        assert!(output.main.contains("\"shop.orders\""));
        assert!(output
            .main
            .contains("arn            = var.lambda_function_arns[\"processor\"]"));
        assert!(output
            .main
            .contains("function_name = var.lambda_function_names[\"processor\"]"));
        assert!(output
            .main
            .contains("resources = [var.sqs_queue_arns[\"orders\"]]"));
        assert!(output.main.contains("role_arn       = aws_iam_role.eventbridge.arn"));
        assert!(output.outputs.contains("output \"order_created_rule_arn\""));
        assert_eq!(output.reference_maps.len(), 3);
    }

    #[test]
    fn test_custom_bus_requires_name() {
        let refs = References::default();
        let unnamed = EventBridgeConfig {
            use_default_bus: false,
            custom_bus_name: None,
            rules: Vec::new(),
        };
        let output = render(&unnamed, ReferenceScope::new(&refs));
        assert!(!output.main.contains("aws_cloudwatch_event_bus"));
        assert!(!output.main.trim().is_empty());

        let named = EventBridgeConfig {
            custom_bus_name: Some("app-events".into()),
            ..unnamed
        };
        let output = render(&named, ReferenceScope::new(&refs));
        assert!(output.main.contains("resource \"aws_cloudwatch_event_bus\" \"main\""));
        assert!(output.outputs.contains("output \"event_bus_arn\""));
    }

    #[test]
    fn test_schedule_and_transformer() {
        let refs = References::default();
        let mut target = EventTarget::new(TargetType::Sns, "alerts");
        target.input_transformer = Some(InputTransformer {
            input_paths: BTreeMap::from([("id".to_string(), "$.detail.id".to_string())]),
            input_template: "\"<id>\"".into(),
        });
        let config = EventBridgeConfig {
            rules: vec![EventRuleConfig {
                name: "nightly".into(),
                schedule_expression: Some("rate(1 day)".into()),
                targets: vec![target],
                ..EventRuleConfig::default()
            }],
            ..EventBridgeConfig::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));

        assert!(output.main.contains("schedule_expression = \"rate(1 day)\""));
        assert!(output.main.contains("input_transformer {"));
        assert!(output.main.contains("id = \"$.detail.id\""));
        assert!(output.main.contains("var.missing_sns_topic_arns_alerts"));
        assert!(!output.main.contains("aws_iam_role"));
    }
}

use super::{base_variables, hcl};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{
    SnsConfig, SnsSubscription, SnsTopicConfig, SqsConfig, SqsQueueConfig, SubscriptionProtocol,
};

/// Dead letter queues keep messages for the SQS maximum of 14 days
const DLQ_RETENTION_SECONDS: u32 = 1_209_600;

/// SQS queues (with optional DLQs) and SNS topics with their subscriptions
pub(super) fn render(
    sqs: Option<&SqsConfig>,
    sns: Option<&SnsConfig>,
    mut scope: ReferenceScope<'_>,
) -> ModuleOutput {
    let queues = sqs.map(|c| c.queues.as_slice()).unwrap_or_default();
    let topics = sns.map(|c| c.topics.as_slice()).unwrap_or_default();

    let mut sections: Vec<String> = queues.iter().map(queue).collect();
    for config in topics {
        sections.push(topic(config, queues, &mut scope));
    }
    if sections.is_empty() {
        sections.push("# No queues or topics configured".to_string());
    }

    scope.finish(
        hcl::join_sections(sections),
        base_variables(),
        outputs(queues, topics),
    )
}

/// `${var.project_name}-<name>[suffix]`, with `.fifo` where required
fn resource_name(name: &str, suffix: &str, fifo: bool) -> String {
    let fifo = if fifo { ".fifo" } else { "" };
    format!(
        "\"${{var.project_name}}-{}{suffix}{fifo}\"",
        hcl::escape_string(name)
    )
}

fn queue(queue: &SqsQueueConfig) -> String {
    let id = hcl::to_terraform_id(&queue.name);
    let name = resource_name(&queue.name, "", queue.fifo);
    let mut blocks = vec![hcl::comment_block(
        &format!("SQS Queue: {}", queue.name),
        Some("Message queue for async processing."),
    )];

    if queue.enable_dlq {
        let dlq_name = resource_name(&queue.name, "-dlq", queue.fifo);
        let mut pairs = vec![("name", dlq_name.clone())];
        if queue.fifo {
            pairs.push(("fifo_queue", "true".to_string()));
        }
        pairs.push(("message_retention_seconds", DLQ_RETENTION_SECONDS.to_string()));
        blocks.push(format!(
            r#"resource "aws_sqs_queue" "{id}_dlq" {{
{attrs}

  tags = merge(var.tags, {{
    Name = {dlq_name}
    Type = "DLQ"
  }})
}}"#,
            attrs = hcl::attributes(&pairs, 2),
        ));
    }

    let mut pairs = vec![("name", name.clone())];
    if queue.fifo {
        pairs.push(("fifo_queue", "true".to_string()));
        pairs.push((
            "content_based_deduplication",
            queue.content_based_deduplication.to_string(),
        ));
    }
    pairs.extend([
        ("visibility_timeout_seconds", queue.visibility_timeout_seconds.to_string()),
        ("message_retention_seconds", queue.message_retention_seconds.to_string()),
        ("max_message_size", queue.max_message_size.to_string()),
        ("delay_seconds", queue.delay_seconds.to_string()),
        ("receive_wait_time_seconds", queue.receive_wait_time_seconds.to_string()),
    ]);

    let redrive = if queue.enable_dlq {
        format!(
            "\n\n  redrive_policy = jsonencode({{\n    deadLetterTargetArn = aws_sqs_queue.{id}_dlq.arn\n    maxReceiveCount     = {}\n  }})",
            queue.dlq_max_receive_count
        )
    } else {
        String::new()
    };

    blocks.push(format!(
        r#"resource "aws_sqs_queue" "{id}" {{
{attrs}{redrive}

  tags = merge(var.tags, {{
    Name = {name}
  }})
}}"#,
        attrs = hcl::attributes(&pairs, 2),
    ));

    blocks.join("\n\n")
}

fn topic(topic: &SnsTopicConfig, queues: &[SqsQueueConfig], scope: &mut ReferenceScope<'_>) -> String {
    let id = hcl::to_terraform_id(&topic.name);
    let name = resource_name(&topic.name, "", topic.fifo);

    let mut pairs = vec![
        ("name", name.clone()),
        ("display_name", hcl::quote(&topic.display_name)),
    ];
    if topic.fifo {
        pairs.push(("fifo_topic", "true".to_string()));
        pairs.push((
            "content_based_deduplication",
            topic.content_based_deduplication.to_string(),
        ));
    }

    let mut blocks = vec![
        hcl::comment_block(&format!("SNS Topic: {}", topic.name), Some(&topic.display_name)),
        format!(
            r#"resource "aws_sns_topic" "{id}" {{
{attrs}

  tags = merge(var.tags, {{
    Name = {name}
  }})
}}"#,
            attrs = hcl::attributes(&pairs, 2),
        ),
    ];

    for (index, subscription) in topic.subscriptions.iter().enumerate() {
        blocks.push(subscription_block(&id, index, subscription, queues, scope));
    }

    blocks.join("\n\n")
}

fn subscription_block(
    topic_id: &str,
    index: usize,
    subscription: &SnsSubscription,
    queues: &[SqsQueueConfig],
    scope: &mut ReferenceScope<'_>,
) -> String {
    let endpoint = match subscription.protocol {
        SubscriptionProtocol::Sqs => {
            if queues.iter().any(|q| q.name == subscription.endpoint) {
                format!(
                    "aws_sqs_queue.{}.arn",
                    hcl::to_terraform_id(&subscription.endpoint)
                )
            } else {
                scope.lookup(ReferenceMap::SqsQueueArns, &subscription.endpoint)
            }
        }
        SubscriptionProtocol::Lambda => {
            scope.lookup(ReferenceMap::LambdaFunctionArns, &subscription.endpoint)
        }
        SubscriptionProtocol::Email | SubscriptionProtocol::Https => {
            hcl::quote(&subscription.endpoint)
        }
    };

    let mut body = hcl::attributes(
        &[
            ("topic_arn", format!("aws_sns_topic.{topic_id}.arn")),
            ("protocol", hcl::quote(subscription.protocol.as_str())),
            ("endpoint", endpoint),
        ],
        2,
    );
    if let Some(policy) = &subscription.filter_policy {
        let value = serde_json::to_value(policy).unwrap_or_default();
        body.push_str(&format!(
            "\n\n  filter_policy = jsonencode({})",
            hcl::json_expr(&value, 2)
        ));
    }

    format!("resource \"aws_sns_topic_subscription\" \"{topic_id}_sub_{index}\" {{\n{body}\n}}")
}

fn outputs(queues: &[SqsQueueConfig], topics: &[SnsTopicConfig]) -> String {
    let mut sections = Vec::new();

    if !queues.is_empty() {
        let mut arns = Vec::new();
        for queue in queues {
            let id = hcl::to_terraform_id(&queue.name);
            sections.push(hcl::output(
                &format!("{id}_queue_url"),
                &format!("URL of the {} queue", queue.name),
                &format!("aws_sqs_queue.{id}.url"),
            ));
            sections.push(hcl::output(
                &format!("{id}_queue_arn"),
                &format!("ARN of the {} queue", queue.name),
                &format!("aws_sqs_queue.{id}.arn"),
            ));
            arns.push((queue.name.clone(), format!("aws_sqs_queue.{id}.arn")));
        }
        sections.push(hcl::output(
            "sqs_queue_arns",
            "Map of queue names to ARNs",
            &hcl::expr_map(&arns, 2),
        ));
    }

    if !topics.is_empty() {
        let mut arns = Vec::new();
        for topic in topics {
            let id = hcl::to_terraform_id(&topic.name);
            sections.push(hcl::output(
                &format!("{id}_topic_arn"),
                &format!("ARN of the {} topic", topic.name),
                &format!("aws_sns_topic.{id}.arn"),
            ));
            arns.push((topic.name.clone(), format!("aws_sns_topic.{id}.arn")));
        }
        sections.push(hcl::output(
            "sns_topic_arns",
            "Map of topic names to ARNs",
            &hcl::expr_map(&arns, 2),
        ));
    }

    if sections.is_empty() {
        return "# No queues or topics configured".to_string();
    }
    hcl::join_sections(sections)
}

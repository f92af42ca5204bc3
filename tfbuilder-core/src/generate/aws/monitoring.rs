use super::{base_variables, hcl, name_tag};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{AlarmConfig, CloudWatchConfig, LogGroupConfig};

const EMPTY: &str = "# No log groups, alarms or dashboard configured";

fn log_group_id(group: &LogGroupConfig) -> String {
    let name = group.name.strip_prefix("/aws/").unwrap_or(&group.name);
    hcl::to_terraform_id(name)
}

fn dashboard_name(config: &CloudWatchConfig) -> Option<&str> {
    if !config.dashboard_enabled {
        return None;
    }
    config
        .dashboard_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
}

/// Log groups, metric alarms and an optional dashboard
pub(super) fn render(config: &CloudWatchConfig, mut scope: ReferenceScope<'_>) -> ModuleOutput {
    let mut sections = Vec::new();

    if !config.log_groups.is_empty() {
        let groups: Vec<String> = config.log_groups.iter().map(log_group).collect();
        sections.push(hcl::section(
            "CloudWatch Log Groups",
            "Log groups for application logging.",
            &groups.join("\n\n"),
        ));
    }

    if !config.alarms.is_empty() {
        let alarms: Vec<String> = config
            .alarms
            .iter()
            .map(|alarm| alarm_block(alarm, &mut scope))
            .collect();
        sections.push(hcl::section(
            "CloudWatch Alarms",
            "Metric alarms for monitoring.",
            &alarms.join("\n\n"),
        ));
    }

    if let Some(name) = dashboard_name(config) {
        sections.push(hcl::section(
            "CloudWatch Dashboard",
            "Operational dashboard for monitoring.",
            &format!(
                r##"resource "aws_cloudwatch_dashboard" "main" {{
  dashboard_name = "${{var.project_name}}-{name}"

  dashboard_body = jsonencode({{
    widgets = [
      {{
        type   = "text"
        x      = 0
        y      = 0
        width  = 24
        height = 1
        properties = {{
          markdown = "# ${{var.project_name}} Dashboard"
        }}
      }}
    ]
  }})
}}"##,
                name = hcl::escape_string(name),
            ),
        ));
    }

    if sections.is_empty() {
        sections.push(EMPTY.to_string());
    }

    scope.finish(
        hcl::join_sections(sections),
        base_variables(),
        outputs(config),
    )
}

fn log_group(group: &LogGroupConfig) -> String {
    format!(
        r#"resource "aws_cloudwatch_log_group" "{id}" {{
  name              = {name}
  retention_in_days = {retention}

  tags = merge(var.tags, {{
    Name = {name}
  }})
}}"#,
        id = log_group_id(group),
        name = hcl::quote(&group.name),
        retention = group.retention_days,
    )
}

fn alarm_block(alarm: &AlarmConfig, scope: &mut ReferenceScope<'_>) -> String {
    let id = hcl::to_terraform_id(&alarm.name);
    let mut pairs = vec![
        (
            "alarm_name",
            format!("\"${{var.project_name}}-{}\"", hcl::escape_string(&alarm.name)),
        ),
        ("alarm_description", hcl::quote(&alarm.description)),
        ("comparison_operator", hcl::quote(alarm.comparison_operator.as_str())),
        ("evaluation_periods", alarm.evaluation_periods.to_string()),
        ("metric_name", hcl::quote(&alarm.metric_name)),
        ("namespace", hcl::quote(&alarm.namespace)),
        ("period", alarm.period.to_string()),
        ("statistic", hcl::quote(alarm.statistic.as_str())),
        ("threshold", alarm.threshold.to_string()),
        ("actions_enabled", alarm.actions_enabled.to_string()),
    ];
    if !alarm.alarm_actions.is_empty() {
        let topics: Vec<String> = alarm
            .alarm_actions
            .iter()
            .map(|topic| scope.lookup(ReferenceMap::SnsTopicArns, topic))
            .collect();
        pairs.push(("alarm_actions", hcl::expr_list(&topics)));
    }
    if !alarm.ok_actions.is_empty() {
        let topics: Vec<String> = alarm
            .ok_actions
            .iter()
            .map(|topic| scope.lookup(ReferenceMap::SnsTopicArns, topic))
            .collect();
        pairs.push(("ok_actions", hcl::expr_list(&topics)));
    }

    let mut body = vec![hcl::attributes(&pairs, 2)];
    if !alarm.dimensions.is_empty() {
        body.push(format!(
            "  dimensions = {}",
            hcl::string_map(&alarm.dimensions, 2)
        ));
    }
    body.push(name_tag(&alarm.name));

    format!(
        "resource \"aws_cloudwatch_metric_alarm\" \"{id}\" {{\n{}\n}}",
        body.join("\n\n")
    )
}

fn outputs(config: &CloudWatchConfig) -> String {
    let mut sections = Vec::new();
    if !config.log_groups.is_empty() {
        let entries: Vec<(String, String)> = config
            .log_groups
            .iter()
            .map(|g| {
                (
                    g.name.clone(),
                    format!("aws_cloudwatch_log_group.{}.arn", log_group_id(g)),
                )
            })
            .collect();
        sections.push(hcl::output(
            "log_group_arns",
            "Map of log group names to ARNs",
            &hcl::expr_map(&entries, 2),
        ));
    }
    if !config.alarms.is_empty() {
        let entries: Vec<(String, String)> = config
            .alarms
            .iter()
            .map(|a| {
                (
                    a.name.clone(),
                    format!(
                        "aws_cloudwatch_metric_alarm.{}.arn",
                        hcl::to_terraform_id(&a.name)
                    ),
                )
            })
            .collect();
        sections.push(hcl::output(
            "alarm_arns",
            "Map of alarm names to ARNs",
            &hcl::expr_map(&entries, 2),
        ));
    }
    if dashboard_name(config).is_some() {
        sections.push(hcl::output(
            "dashboard_arn",
            "ARN of the CloudWatch dashboard",
            "aws_cloudwatch_dashboard.main.dashboard_arn",
        ));
    }
    if sections.is_empty() {
        return EMPTY.to_string();
    }
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::generate::References;
    use crate::services::{ComparisonOperator, Statistic};

    fn cpu_alarm() -> AlarmConfig {
        AlarmConfig {
            name: "high-cpu".into(),
            description: "CPU above 80%".into(),
            metric_name: "CPUUtilization".into(),
            namespace: "AWS/EC2".into(),
            statistic: Statistic::Maximum,
            threshold: 80.0,
            comparison_operator: ComparisonOperator::GreaterThanOrEqualToThreshold,
            dimensions: BTreeMap::from([("InstanceId".to_string(), "i-123".to_string())]),
            alarm_actions: vec!["alerts".into()],
            ..AlarmConfig::default()
        }
    }

    #[test]
    fn test_log_group_ids() {
        let group = LogGroupConfig {
            name: "/aws/app/api".into(),
            retention_days: 14,
        };
        assert_eq!(log_group_id(&group), "app_api");

        let refs = References::default();
        let config = CloudWatchConfig {
            log_groups: vec![group],
            ..CloudWatchConfig::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));
        assert!(output
            .main
            .contains("resource \"aws_cloudwatch_log_group\" \"app_api\""));
        assert!(output.main.contains("retention_in_days = 14"));
        assert!(output
            .outputs
            .contains("\"/aws/app/api\" = aws_cloudwatch_log_group.app_api.arn"));
    }

    #[test]
    fn test_alarm_actions_resolve_topics() {
        let refs = References {
            topics: vec!["alerts".into()],
            ..References::default()
        };
        let config = CloudWatchConfig {
            alarms: vec![cpu_alarm()],
            ..CloudWatchConfig::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));
        assert!(output.main.contains("threshold           = 80\n"));
        assert!(output
            .main
            .contains("alarm_actions       = [var.sns_topic_arns[\"alerts\"]]"));
        assert!(output.main.contains("InstanceId = \"i-123\""));
        assert!(output.reference_maps.contains(&ReferenceMap::SnsTopicArns));
        assert!(!output.main.contains("ok_actions"));
    }

    #[test]
    fn test_empty_config_placeholder() {
        let refs = References::default();
        let config = CloudWatchConfig {
            dashboard_enabled: true,
            ..CloudWatchConfig::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));
        assert_eq!(output.main, EMPTY);
        assert_eq!(output.outputs, EMPTY);

        let named = CloudWatchConfig {
            dashboard_enabled: true,
            dashboard_name: Some("ops".into()),
            ..CloudWatchConfig::default()
        };
        let output = render(&named, ReferenceScope::new(&refs));
        assert!(output.main.contains("dashboard_name = \"${var.project_name}-ops\""));
    }

    #[test]
    fn test_dashboard_renders_with_output() {
        let refs = References::default();
        let config = CloudWatchConfig {
            dashboard_enabled: true,
            dashboard_name: Some("ops".into()),
            ..CloudWatchConfig::default()
        };
        let output = render(&config, ReferenceScope::new(&refs));
        assert!(output
            .main
            .contains("resource \"aws_cloudwatch_dashboard\" \"main\""));
        assert!(output
            .main
            .contains("markdown = \"# ${var.project_name} Dashboard\""));
        assert!(output.outputs.contains("aws_cloudwatch_dashboard.main.dashboard_arn"));

        let disabled = CloudWatchConfig {
            dashboard_enabled: false,
            ..config
        };
        let output = render(&disabled, ReferenceScope::new(&refs));
        assert!(!output.main.contains("aws_cloudwatch_dashboard"));
    }
}

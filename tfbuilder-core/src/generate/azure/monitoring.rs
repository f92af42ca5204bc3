use super::{base_variables, hcl, placement};
use crate::generate::ModuleOutput;
use crate::services::{AlarmConfig, CloudWatchConfig, ComparisonOperator, Statistic};

const WORKSPACE: &str = r#"resource "azurerm_log_analytics_workspace" "main" {
  name                = "${var.project_name}-law"
  location            = var.location
  resource_group_name = var.resource_group_name
  sku                 = "PerGB2018"
  retention_in_days   = var.log_retention_days

  tags = var.tags
}

resource "azurerm_application_insights" "main" {
  name                = "${var.project_name}-appins"
  location            = var.location
  resource_group_name = var.resource_group_name
  workspace_id        = azurerm_log_analytics_workspace.main.id
  application_type    = "web"

  tags = var.tags
}"#;

const ACTION_GROUP: &str = r#"resource "azurerm_monitor_action_group" "main" {
  name                = "${var.project_name}-ag"
  resource_group_name = var.resource_group_name
  short_name          = substr(replace(var.project_name, "-", ""), 0, 12)

  dynamic "email_receiver" {
    for_each = var.alert_email_addresses
    content {
      name          = email_receiver.value
      email_address = email_receiver.value
    }
  }

  tags = var.tags
}"#;

/// PerGB2018 workspaces retain data for 30 to 730 days
const MIN_RETENTION_DAYS: u32 = 30;
const MAX_RETENTION_DAYS: u32 = 730;

/// Evaluation frequencies Azure accepts, in minutes
const FREQUENCIES: [u32; 5] = [1, 5, 15, 30, 60];
/// Window sizes Azure accepts, in minutes
const WINDOWS: [u32; 8] = [1, 5, 15, 30, 60, 360, 720, 1440];

/// Azure metric namespace and name for well-known AWS metrics
const METRICS: &[(&str, &str, &str, &str)] = &[
    (
        "AWS/EC2",
        "CPUUtilization",
        "Microsoft.Compute/virtualMachines",
        "Percentage CPU",
    ),
    (
        "AWS/RDS",
        "CPUUtilization",
        "Microsoft.DBforPostgreSQL/flexibleServers",
        "cpu_percent",
    ),
    ("AWS/Lambda", "Errors", "Microsoft.Web/sites", "Http5xx"),
    ("AWS/Lambda", "Invocations", "Microsoft.Web/sites", "Requests"),
    (
        "AWS/SQS",
        "ApproximateNumberOfMessagesVisible",
        "Microsoft.ServiceBus/namespaces",
        "ActiveMessages",
    ),
];

fn metric(namespace: &str, name: &str) -> (String, String) {
    METRICS
        .iter()
        .find(|(ns, metric, _, _)| *ns == namespace && *metric == name)
        .map(|(_, _, ns, metric)| (ns.to_string(), metric.to_string()))
        .unwrap_or_else(|| (namespace.to_string(), name.to_string()))
}

/// Smallest allowed duration covering `minutes`, as ISO 8601
fn snap(allowed: &[u32], minutes: u32) -> String {
    let value = allowed
        .iter()
        .copied()
        .find(|m| *m >= minutes)
        .or_else(|| allowed.last().copied())
        .unwrap_or(minutes);
    match value {
        1440 => "P1D".to_string(),
        m if m >= 60 => format!("PT{}H", m / 60),
        m => format!("PT{m}M"),
    }
}

fn aggregation(statistic: Statistic) -> &'static str {
    match statistic {
        Statistic::Average => "Average",
        Statistic::Sum => "Total",
        Statistic::Maximum => "Maximum",
        Statistic::Minimum => "Minimum",
    }
}

fn operator(comparison: ComparisonOperator) -> &'static str {
    match comparison {
        ComparisonOperator::GreaterThanThreshold => "GreaterThan",
        ComparisonOperator::LessThanThreshold => "LessThan",
        ComparisonOperator::GreaterThanOrEqualToThreshold => "GreaterThanOrEqual",
        ComparisonOperator::LessThanOrEqualToThreshold => "LessThanOrEqual",
    }
}

/// 1 (Error) for upper bounds, 2 (Warning) for lower bounds
fn severity(comparison: ComparisonOperator) -> u8 {
    match comparison {
        ComparisonOperator::GreaterThanThreshold
        | ComparisonOperator::GreaterThanOrEqualToThreshold => 1,
        ComparisonOperator::LessThanThreshold | ComparisonOperator::LessThanOrEqualToThreshold => 2,
    }
}

fn retention_days(config: &CloudWatchConfig) -> u32 {
    config
        .log_groups
        .iter()
        .map(|g| g.retention_days)
        .max()
        .unwrap_or(MIN_RETENTION_DAYS)
        .clamp(MIN_RETENTION_DAYS, MAX_RETENTION_DAYS)
}

/// Log Analytics workspace, Application Insights, metric alerts and an
/// optional portal dashboard
pub(super) fn render(config: &CloudWatchConfig) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "Azure Monitor",
        "Log Analytics workspace and Application Insights.",
        WORKSPACE,
    )];

    if !config.log_groups.is_empty() {
        let lines: Vec<String> = config
            .log_groups
            .iter()
            .map(|g| format!("# - {} ({} days)", g.name, g.retention_days))
            .collect();
        sections.push(hcl::section(
            "Log Groups",
            "Collected in the workspace; its retention covers the longest group.",
            &lines.join("\n"),
        ));
    }

    if !config.alarms.is_empty() {
        let alerts: Vec<String> = config.alarms.iter().map(alert).collect();
        sections.push(hcl::section(
            "Alerts",
            "Action group and metric alerts on the monitored resources.",
            &format!("{ACTION_GROUP}\n\n{}", alerts.join("\n\n")),
        ));
    }

    if config.dashboard_enabled {
        sections.push(hcl::section(
            "Azure Dashboard",
            "Portal dashboard for the project.",
            &dashboard(config),
        ));
    }

    let mut variables = vec![
        base_variables(false),
        hcl::variable(
            "log_retention_days",
            "Log retention period in days",
            "number",
            Some(&retention_days(config).to_string()),
        ),
    ];
    if !config.alarms.is_empty() {
        variables.push(hcl::variable(
            "alert_email_addresses",
            "Email addresses for alert notifications",
            "list(string)",
            Some("[]"),
        ));
        variables.push(hcl::variable(
            "monitored_resource_ids",
            "Resource IDs the metric alerts watch",
            "list(string)",
            Some("[]"),
        ));
    }

    ModuleOutput::new(
        hcl::join_sections(sections),
        hcl::join_sections(variables),
        outputs(config),
    )
}

fn alert(alarm: &AlarmConfig) -> String {
    let id = hcl::to_terraform_id(&alarm.name);
    let (namespace, metric_name) = metric(&alarm.namespace, &alarm.metric_name);
    let period_minutes = alarm.period.div_ceil(60);
    let window_minutes = alarm
        .period
        .saturating_mul(alarm.evaluation_periods.max(1))
        .div_ceil(60);

    let head = hcl::attributes(
        &[
            ("count", "length(var.monitored_resource_ids) > 0 ? 1 : 0".to_string()),
            (
                "name",
                format!("\"${{var.project_name}}-{}\"", hcl::escape_string(&alarm.name)),
            ),
            ("resource_group_name", "var.resource_group_name".to_string()),
            ("scopes", "var.monitored_resource_ids".to_string()),
            ("description", hcl::quote(&alarm.description)),
            ("severity", severity(alarm.comparison_operator).to_string()),
            ("frequency", hcl::quote(&snap(&FREQUENCIES, period_minutes))),
            (
                "window_size",
                hcl::quote(&snap(&WINDOWS, window_minutes.max(period_minutes))),
            ),
            ("enabled", alarm.actions_enabled.to_string()),
        ],
        2,
    );

    let mut criteria = vec![hcl::attributes(
        &[
            ("metric_namespace", hcl::quote(&namespace)),
            ("metric_name", hcl::quote(&metric_name)),
            ("aggregation", hcl::quote(aggregation(alarm.statistic))),
            ("operator", hcl::quote(operator(alarm.comparison_operator))),
            ("threshold", alarm.threshold.to_string()),
        ],
        4,
    )];
    for (name, value) in &alarm.dimensions {
        criteria.push(format!(
            "    dimension {{\n      name     = {}\n      operator = \"Include\"\n      values   = [{}]\n    }}",
            hcl::quote(name),
            hcl::quote(value)
        ));
    }

    let mut body = vec![head, format!("  criteria {{\n{}\n  }}", criteria.join("\n\n"))];
    if alarm.actions_enabled {
        body.push(
            "  action {\n    action_group_id = azurerm_monitor_action_group.main.id\n  }".to_string(),
        );
    }
    body.push("  tags = var.tags".to_string());

    format!(
        "resource \"azurerm_monitor_metric_alert\" \"{id}\" {{\n{}\n}}",
        body.join("\n\n")
    )
}

fn dashboard(config: &CloudWatchConfig) -> String {
    let suffix = config
        .dashboard_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("dashboard");
    let body = serde_json::json!({
        "lenses": {
            "0": {
                "order": 0,
                "parts": {
                    "0": {
                        "position": { "x": 0, "y": 0, "colSpan": 6, "rowSpan": 4 },
                        "metadata": {
                            "type": "Extension/Microsoft_Azure_Monitoring/PartType/MetricsExplorerPart"
                        }
                    }
                }
            }
        }
    });
    format!(
        "resource \"azurerm_portal_dashboard\" \"main\" {{\n{}\n\n  dashboard_properties = jsonencode({})\n\n  tags = var.tags\n}}",
        placement(&format!(
            "\"${{var.project_name}}-{}\"",
            hcl::escape_string(suffix)
        )),
        hcl::json_expr(&body, 2)
    )
}

fn outputs(config: &CloudWatchConfig) -> String {
    let mut sections = vec![
        hcl::output(
            "log_analytics_workspace_id",
            "ID of the Log Analytics workspace",
            "azurerm_log_analytics_workspace.main.id",
        ),
        hcl::output(
            "log_analytics_workspace_name",
            "Name of the Log Analytics workspace",
            "azurerm_log_analytics_workspace.main.name",
        ),
        hcl::output(
            "log_analytics_customer_id",
            "Workspace (customer) ID of the Log Analytics workspace",
            "azurerm_log_analytics_workspace.main.workspace_id",
        ),
        hcl::sensitive_output(
            "app_insights_instrumentation_key",
            "Application Insights instrumentation key",
            "azurerm_application_insights.main.instrumentation_key",
        ),
        hcl::sensitive_output(
            "app_insights_connection_string",
            "Application Insights connection string",
            "azurerm_application_insights.main.connection_string",
        ),
        hcl::output(
            "app_insights_app_id",
            "Application Insights application ID",
            "azurerm_application_insights.main.app_id",
        ),
    ];
    if !config.alarms.is_empty() {
        sections.push(hcl::output(
            "action_group_id",
            "ID of the alert action group",
            "azurerm_monitor_action_group.main.id",
        ));
    }
    if config.dashboard_enabled {
        sections.push(hcl::output(
            "dashboard_id",
            "ID of the portal dashboard",
            "azurerm_portal_dashboard.main.id",
        ));
    }
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::services::LogGroupConfig;

    fn cpu_alarm() -> AlarmConfig {
        AlarmConfig {
            name: "high-cpu".into(),
            description: "CPU above 80%".into(),
            metric_name: "CPUUtilization".into(),
            namespace: "AWS/EC2".into(),
            statistic: Statistic::Sum,
            period: 300,
            evaluation_periods: 3,
            threshold: 80.0,
            dimensions: BTreeMap::from([("InstanceId".to_string(), "i-123".to_string())]),
            ..AlarmConfig::default()
        }
    }

    #[test]
    fn test_snapping() {
        assert_eq!(snap(&FREQUENCIES, 5), "PT5M");
        assert_eq!(snap(&FREQUENCIES, 7), "PT15M");
        assert_eq!(snap(&FREQUENCIES, 500), "PT1H");
        assert_eq!(snap(&WINDOWS, 15), "PT15M");
        assert_eq!(snap(&WINDOWS, 200), "PT6H");
        assert_eq!(snap(&WINDOWS, 5000), "P1D");
    }

    #[test]
    fn test_metric_mapping() {
        assert_eq!(
            metric("AWS/EC2", "CPUUtilization"),
            (
                "Microsoft.Compute/virtualMachines".to_string(),
                "Percentage CPU".to_string()
            )
        );
        assert_eq!(
            metric("Custom/App", "Latency"),
            ("Custom/App".to_string(), "Latency".to_string())
        );
    }

    #[test]
    fn test_alerts_and_dashboard() {
        let config = CloudWatchConfig {
            log_groups: vec![
                LogGroupConfig {
                    name: "/app/api".into(),
                    retention_days: 14,
                },
                LogGroupConfig {
                    name: "/app/audit".into(),
                    retention_days: 90,
                },
            ],
            alarms: vec![cpu_alarm()],
            dashboard_enabled: true,
            dashboard_name: Some("ops".into()),
        };
        let output = render(&config);

        assert!(output
            .main
            .contains("resource \"azurerm_monitor_metric_alert\" \"high_cpu\""));
        assert!(output.main.contains("aggregation      = \"Total\""));
        assert!(output.main.contains("metric_name      = \"Percentage CPU\""));
        assert!(output.main.contains("threshold        = 80\n"));
        assert!(output.main.contains("window_size         = \"PT15M\""));
        assert!(output.main.contains("severity            = 1"));
        assert!(output.main.contains("values   = [\"i-123\"]"));
        assert!(output.main.contains("action_group_id = azurerm_monitor_action_group.main.id"));
        assert!(output.main.contains("resource \"azurerm_portal_dashboard\" \"main\""));
        assert!(output.main.contains("\"${var.project_name}-ops\""));
        assert!(output.main.contains("# - /app/audit (90 days)"));

        assert!(output.variables.contains("default     = 90"));
        assert!(output.variables.contains("variable \"monitored_resource_ids\""));
        assert!(output.outputs.contains("output \"action_group_id\""));
        assert!(output.outputs.contains("output \"dashboard_id\""));
    }

    #[test]
    fn test_workspace_only() {
        let output = render(&CloudWatchConfig::default());
        assert!(output.main.contains("azurerm_log_analytics_workspace"));
        assert!(!output.main.contains("azurerm_monitor_action_group"));
        assert!(!output.variables.contains("alert_email_addresses"));
        assert!(output.variables.contains("default     = 30"));
        assert!(!output.outputs.contains("dashboard_id"));
    }

    #[test]
    fn test_retention_is_clamped() {
        let config = CloudWatchConfig {
            log_groups: vec![LogGroupConfig {
                name: "/app/short".into(),
                retention_days: 7,
            }],
            ..CloudWatchConfig::default()
        };
        assert_eq!(retention_days(&config), 30);
    }
}

use super::{base_variables, hcl, placement};
use crate::generate::ModuleOutput;
use crate::services::{LambdaConfig, LambdaFunctionConfig, LambdaRuntime};

const HOSTING: &str = r#"resource "azurerm_storage_account" "functions" {
  name                     = "${substr(replace(lower(var.project_name), "/[^a-z0-9]/", ""), 0, 20)}func"
  resource_group_name      = var.resource_group_name
  location                 = var.location
  account_tier             = "Standard"
  account_replication_type = "LRS"

  tags = var.tags
}

resource "azurerm_service_plan" "functions" {
  name                = "${var.project_name}-asp"
  resource_group_name = var.resource_group_name
  location            = var.location
  os_type             = "Linux"
  sku_name            = var.sku_name

  tags = var.tags
}"#;

const USER_ASSIGNED: &str = r#"  identity {
    type         = "SystemAssigned, UserAssigned"
    identity_ids = [var.managed_identity_id]
  }"#;

const SYSTEM_ASSIGNED: &str = r#"  identity {
    type = "SystemAssigned"
  }"#;

/// `application_stack` setting and `FUNCTIONS_WORKER_RUNTIME` for a runtime
fn stack(runtime: LambdaRuntime) -> (&'static str, &'static str) {
    match runtime {
        LambdaRuntime::Nodejs20 => ("node_version = \"20\"", "node"),
        LambdaRuntime::Nodejs18 => ("node_version = \"18\"", "node"),
        LambdaRuntime::Python312 => ("python_version = \"3.12\"", "python"),
        LambdaRuntime::Python311 => ("python_version = \"3.11\"", "python"),
        LambdaRuntime::Java21 => ("java_version = \"21\"", "java"),
        LambdaRuntime::ProvidedAl2023 => ("use_custom_runtime = true", "custom"),
    }
}

/// Consumption plan plus one Linux Function App per configured function.
///
/// `user_identity` attaches the identity module's managed identity next to
/// the system-assigned one.
pub(super) fn render(lambda: &LambdaConfig, user_identity: bool) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "Azure Functions Hosting",
        "Storage account and App Service plan shared by every function app.",
        HOSTING,
    )];
    sections.extend(
        lambda
            .functions
            .iter()
            .map(|func| function_app(func, user_identity)),
    );

    let mut variables = vec![
        base_variables(false),
        hcl::variable(
            "sku_name",
            "SKU for the App Service plan",
            "string",
            Some("\"Y1\""),
        ),
    ];
    if user_identity {
        variables.push(hcl::variable(
            "managed_identity_id",
            "ID of the user-assigned identity to attach",
            "string",
            None,
        ));
    }
    if lambda.functions.iter().any(|f| f.vpc_enabled) {
        variables.push(hcl::variable(
            "subnet_id",
            "Subnet ID for VNet integration",
            "string",
            Some("\"\""),
        ));
    }
    for func in &lambda.functions {
        variables.push(hcl::variable(
            &format!("{}_app_settings", hcl::to_terraform_id(&func.name)),
            &format!("App settings for the {} function", func.name),
            "map(string)",
            Some(&hcl::string_map(&func.environment_variables, 2)),
        ));
    }

    ModuleOutput::new(
        hcl::join_sections(sections),
        hcl::join_sections(variables),
        outputs(lambda),
    )
}

fn function_app(func: &LambdaFunctionConfig, user_identity: bool) -> String {
    let id = hcl::to_terraform_id(&func.name);
    let (stack, worker) = stack(func.runtime);

    let mut hosting = vec![
        (
            "storage_account_name",
            "azurerm_storage_account.functions.name",
        ),
        (
            "storage_account_access_key",
            "azurerm_storage_account.functions.primary_access_key",
        ),
        ("service_plan_id", "azurerm_service_plan.functions.id"),
    ];
    if func.vpc_enabled {
        hosting.push((
            "virtual_network_subnet_id",
            "var.subnet_id != \"\" ? var.subnet_id : null",
        ));
    }

    let mut site = Vec::new();
    if func.vpc_enabled {
        site.push("    vnet_route_all_enabled = var.subnet_id != \"\"".to_string());
    }
    if let Some(limit) = func.reserved_concurrency {
        site.push(format!("    app_scale_limit = {limit}"));
    }
    site.push(format!(
        "    application_stack {{\n      {stack}\n    }}"
    ));

    let body = [
        placement(&format!(
            "\"${{var.project_name}}-{}\"",
            hcl::escape_string(&func.name)
        )),
        hcl::attributes(&hosting, 2),
        format!("  site_config {{\n{}\n  }}", site.join("\n\n")),
        format!(
            "  app_settings = merge({{\n    FUNCTIONS_WORKER_RUNTIME = \"{worker}\"\n  }}, var.{id}_app_settings)"
        ),
        if user_identity {
            USER_ASSIGNED.to_string()
        } else {
            SYSTEM_ASSIGNED.to_string()
        },
        "  tags = var.tags".to_string(),
    ];

    hcl::join_sections([
        hcl::comment_block(&format!("Function App: {}", func.name), Some(&func.description)),
        format!(
            "resource \"azurerm_linux_function_app\" \"{id}\" {{\n{}\n}}",
            body.join("\n\n")
        ),
    ])
}

fn outputs(lambda: &LambdaConfig) -> String {
    let mut sections = Vec::new();
    let mut ids = Vec::new();
    let mut hostnames = Vec::new();

    for func in &lambda.functions {
        let id = hcl::to_terraform_id(&func.name);
        let resource = format!("azurerm_linux_function_app.{id}");
        sections.push(hcl::output(
            &format!("{id}_id"),
            &format!("ID of the {} function app", func.name),
            &format!("{resource}.id"),
        ));
        sections.push(hcl::output(
            &format!("{id}_hostname"),
            &format!("Default hostname of the {} function app", func.name),
            &format!("{resource}.default_hostname"),
        ));
        sections.push(hcl::output(
            &format!("{id}_principal_id"),
            &format!("Principal ID of the {} function app identity", func.name),
            &format!("{resource}.identity[0].principal_id"),
        ));
        if func.create_function_url {
            sections.push(hcl::output(
                &format!("{id}_url"),
                &format!("HTTP trigger base URL of the {} function app", func.name),
                &format!("\"https://${{{resource}.default_hostname}}/api\""),
            ));
        }
        ids.push((func.name.clone(), format!("{resource}.id")));
        hostnames.push((func.name.clone(), format!("{resource}.default_hostname")));
    }

    sections.push(hcl::output(
        "function_ids",
        "Map of function names to function app IDs",
        &hcl::expr_map(&ids, 2),
    ));
    sections.push(hcl::output(
        "function_hostnames",
        "Map of function names to default hostnames",
        &hcl::expr_map(&hostnames, 2),
    ));
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_runtime_stacks() {
        assert_eq!(stack(LambdaRuntime::Nodejs18), ("node_version = \"18\"", "node"));
        assert_eq!(
            stack(LambdaRuntime::Python312),
            ("python_version = \"3.12\"", "python")
        );
        assert_eq!(stack(LambdaRuntime::Java21).1, "java");
        assert_eq!(
            stack(LambdaRuntime::ProvidedAl2023),
            ("use_custom_runtime = true", "custom")
        );
    }

    #[test]
    fn test_function_apps() {
        let mut api = LambdaFunctionConfig::named("api-handler", "Serves the API");
        api.environment_variables =
            BTreeMap::from([("LOG_LEVEL".to_string(), "info".to_string())]);
        api.create_function_url = true;
        let worker = LambdaFunctionConfig {
            runtime: LambdaRuntime::Python311,
            reserved_concurrency: Some(5),
            ..LambdaFunctionConfig::named("worker", "Background jobs")
        };
        let lambda = LambdaConfig {
            functions: vec![api, worker],
        };

        let output = render(&lambda, false);
        assert!(output
            .main
            .contains("resource \"azurerm_linux_function_app\" \"api_handler\""));
        assert!(output.main.contains("name                = \"${var.project_name}-api-handler\""));
        assert!(output.main.contains("node_version = \"20\""));
        assert!(output.main.contains("python_version = \"3.11\""));
        assert!(output.main.contains("app_scale_limit = 5"));
        assert!(output.main.contains("}, var.worker_app_settings)"));
        assert!(output.main.contains("type = \"SystemAssigned\""));
        assert!(!output.main.contains("virtual_network_subnet_id"));

        assert!(output.variables.contains("variable \"api_handler_app_settings\""));
        assert!(output.variables.contains("LOG_LEVEL = \"info\""));
        assert!(!output.variables.contains("managed_identity_id"));

        assert!(output.outputs.contains("output \"api_handler_url\""));
        assert!(!output.outputs.contains("output \"worker_url\""));
        assert!(output
            .outputs
            .contains("\"api-handler\" = azurerm_linux_function_app.api_handler.default_hostname"));
        assert!(output
            .outputs
            .contains("\"worker\" = azurerm_linux_function_app.worker.id"));
    }

    #[test]
    fn test_vnet_integration_and_user_identity() {
        let func = LambdaFunctionConfig {
            vpc_enabled: true,
            ..LambdaFunctionConfig::default()
        };
        let lambda = LambdaConfig {
            functions: vec![func],
        };
        let output = render(&lambda, true);
        assert!(output
            .main
            .contains("virtual_network_subnet_id  = var.subnet_id != \"\" ? var.subnet_id : null"));
        assert!(output.main.contains("vnet_route_all_enabled = var.subnet_id != \"\""));
        assert!(output.main.contains("identity_ids = [var.managed_identity_id]"));
        assert!(output.variables.contains("variable \"subnet_id\""));
        assert!(output.variables.contains("variable \"managed_identity_id\""));
    }
}

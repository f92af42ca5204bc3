use std::collections::BTreeSet;

use super::{base_variables, hcl, unique};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{ApiGatewayConfig, ApiRouteConfig, CorsConfig, HttpMethod};

const APIM: &str = r#"resource "azurerm_api_management" "main" {
  name                = "${var.project_name}-apim"
  location            = var.location
  resource_group_name = var.resource_group_name
  publisher_name      = var.publisher_name
  publisher_email     = var.publisher_email
  sku_name            = var.sku_name

  identity {
    type = "SystemAssigned"
  }

  tags = var.tags
}"#;

const API_SCOPE: &str = r#"  api_name            = azurerm_api_management_api.main.name
  api_management_name = azurerm_api_management.main.name
  resource_group_name = var.resource_group_name"#;

const DEFAULT_DISPLAY_NAME: &str = "Main API";

/// Escape text for an XML attribute or element inside a heredoc
fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace("${", "$${")
        .replace("%{", "%%{")
}

/// APIM method for a route; `ANY` becomes the wildcard operation
fn method(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Any => "*",
        other => other.as_str(),
    }
}

/// URL template and its parameter names. Greedy `{name+}` segments become
/// APIM wildcards `{*name}`.
fn url_template(path: &str) -> (String, Vec<String>) {
    let mut params = Vec::new();
    let segments: Vec<String> = path
        .split('/')
        .map(|segment| {
            let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
                return segment.to_string();
            };
            if let Some(name) = inner.strip_suffix('+') {
                params.push(name.to_string());
                format!("{{*{name}}}")
            } else {
                params.push(inner.to_string());
                segment.to_string()
            }
        })
        .collect();
    let template = segments.join("/");
    if template.starts_with('/') {
        (template, params)
    } else {
        (format!("/{template}"), params)
    }
}

fn operation_id(route: &ApiRouteConfig) -> String {
    let path = route.path.trim_matches('/');
    let path = if path.is_empty() { "root" } else { path };
    hcl::to_terraform_id(&format!("{}_{path}", route.method.as_str().to_lowercase()))
}

/// API Management instance with one operation per route.
///
/// Each route's function is reached through an APIM backend pointing at the
/// function app's hostname.
pub(super) fn render(api: &ApiGatewayConfig, mut scope: ReferenceScope<'_>) -> ModuleOutput {
    let display_name = if api.name.trim().is_empty() {
        DEFAULT_DISPLAY_NAME
    } else {
        api.name.as_str()
    };
    let definition = format!(
        "resource \"azurerm_api_management_api\" \"main\" {{\n{}\n}}",
        hcl::attributes(
            &[
                ("name", "\"${var.project_name}-api\"".to_string()),
                ("resource_group_name", "var.resource_group_name".to_string()),
                ("api_management_name", "azurerm_api_management.main.name".to_string()),
                ("revision", "\"1\"".to_string()),
                ("display_name", hcl::quote(display_name)),
                ("description", hcl::quote(&api.description)),
                ("path", "var.api_path".to_string()),
                ("protocols", "[\"https\"]".to_string()),
                ("subscription_required", "false".to_string()),
            ],
            2
        )
    );

    let mut sections = vec![hcl::section(
        "Azure API Management",
        "Gateway instance and API definition.",
        &format!("{APIM}\n\n{definition}"),
    )];

    let mut backends = Vec::new();
    let mut seen = BTreeSet::new();
    for function in api.routes.iter().map(|r| r.lambda_function.as_str()) {
        if function.trim().is_empty() || !seen.insert(function) {
            continue;
        }
        let hostname = scope.lookup(ReferenceMap::FunctionHostnames, function);
        backends.push(backend(function, &hostname));
    }
    if !backends.is_empty() {
        sections.push(hcl::section(
            "Backends",
            "One backend per function app behind the API.",
            &backends.join("\n\n"),
        ));
    }

    let mut operation_ids = BTreeSet::new();
    let operations: Vec<String> = api
        .routes
        .iter()
        .map(|route| {
            let id = unique(&mut operation_ids, operation_id(route), "_");
            operation(route, &id)
        })
        .collect();
    if !operations.is_empty() {
        sections.push(hcl::section(
            "API Operations",
            "Route definitions and their backend policies.",
            &operations.join("\n\n"),
        ));
    }

    if api.cors_enabled || api.throttling_rate_limit > 0 {
        sections.push(hcl::section(
            "API Policy",
            "CORS and rate limiting applied to every operation.",
            &api_policy(api),
        ));
    }

    let variables = hcl::join_sections([
        base_variables(false),
        hcl::variable(
            "sku_name",
            "SKU for API Management",
            "string",
            Some("\"Consumption_0\""),
        ),
        hcl::variable(
            "publisher_name",
            "Publisher name for API Management",
            "string",
            Some("\"Organization\""),
        ),
        hcl::variable(
            "publisher_email",
            "Publisher email for API Management",
            "string",
            None,
        ),
        hcl::variable(
            "api_path",
            "Path prefix of the API on the gateway",
            "string",
            Some("\"api\""),
        ),
    ]);

    scope.finish(hcl::join_sections(sections), variables, outputs())
}

fn backend(function: &str, hostname: &str) -> String {
    let id = hcl::to_terraform_id(function);
    let pairs = [
        (
            "name",
            format!("\"${{var.project_name}}-{}\"", hcl::escape_string(function)),
        ),
        ("resource_group_name", "var.resource_group_name".to_string()),
        ("api_management_name", "azurerm_api_management.main.name".to_string()),
        ("protocol", "\"http\"".to_string()),
        ("url", format!("\"https://${{{hostname}}}/api\"")),
    ];
    format!(
        "resource \"azurerm_api_management_backend\" \"{id}\" {{\n{}\n}}",
        hcl::attributes(&pairs, 2)
    )
}

fn operation(route: &ApiRouteConfig, id: &str) -> String {
    let (template, params) = url_template(&route.path);
    let head = hcl::attributes(
        &[
            ("operation_id", hcl::quote(id)),
            ("api_name", "azurerm_api_management_api.main.name".to_string()),
            ("api_management_name", "azurerm_api_management.main.name".to_string()),
            ("resource_group_name", "var.resource_group_name".to_string()),
            (
                "display_name",
                hcl::quote(&format!("{} {}", route.method.as_str(), route.path)),
            ),
            ("method", hcl::quote(method(route.method))),
            ("url_template", hcl::quote(&template)),
        ],
        2,
    );
    let mut body = vec![head];
    for param in &params {
        body.push(format!(
            "  template_parameter {{\n    name     = {}\n    required = true\n    type     = \"string\"\n  }}",
            hcl::quote(param)
        ));
    }
    body.push("  response {\n    status_code = 200\n  }".to_string());

    let mut blocks = vec![format!(
        "resource \"azurerm_api_management_api_operation\" \"{id}\" {{\n{}\n}}",
        body.join("\n\n")
    )];

    if !route.lambda_function.trim().is_empty() {
        let backend = hcl::to_terraform_id(&route.lambda_function);
        let inbound = format!(
            "    <base />\n    <set-backend-service backend-id=\"${{azurerm_api_management_backend.{backend}.name}}\" />"
        );
        blocks.push(format!(
            "resource \"azurerm_api_management_api_operation_policy\" \"{id}\" {{\n{API_SCOPE}\n  operation_id        = azurerm_api_management_api_operation.{id}.operation_id\n\n  xml_content = {}\n}}",
            policy_xml(&inbound)
        ));
    }

    blocks.join("\n\n")
}

fn cors_xml(cors: &CorsConfig) -> String {
    let list = |tag: &str, values: &[String]| {
        values
            .iter()
            .map(|v| format!("        <{tag}>{}</{tag}>", xml_escape(v)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    // APIM rejects credentials together with a wildcard origin
    let credentials = !cors.allow_origins.iter().any(|o| o == "*");
    format!(
        "    <cors allow-credentials=\"{credentials}\">\n      <allowed-origins>\n{}\n      </allowed-origins>\n      <allowed-methods preflight-result-max-age=\"{}\">\n{}\n      </allowed-methods>\n      <allowed-headers>\n{}\n      </allowed-headers>\n    </cors>",
        list("origin", &cors.allow_origins),
        cors.max_age,
        list("method", &cors.allow_methods),
        list("header", &cors.allow_headers),
    )
}

fn api_policy(api: &ApiGatewayConfig) -> String {
    let mut inbound = vec!["    <base />".to_string()];
    if api.cors_enabled {
        inbound.push(cors_xml(&api.cors_config));
    }
    if api.throttling_rate_limit > 0 {
        inbound.push(format!(
            "    <rate-limit calls=\"{}\" renewal-period=\"1\" />",
            api.throttling_rate_limit
        ));
    }
    format!(
        "resource \"azurerm_api_management_api_policy\" \"main\" {{\n{API_SCOPE}\n\n  xml_content = {}\n}}",
        policy_xml(&inbound.join("\n"))
    )
}

/// Policy document heredoc with `inbound` after the inherited policies
fn policy_xml(inbound: &str) -> String {
    format!(
        "<<XML\n<policies>\n  <inbound>\n{inbound}\n  </inbound>\n  <backend>\n    <base />\n  </backend>\n  <outbound>\n    <base />\n  </outbound>\n  <on-error>\n    <base />\n  </on-error>\n</policies>\nXML"
    )
}

fn outputs() -> String {
    hcl::join_sections([
        hcl::output(
            "apim_id",
            "ID of the API Management instance",
            "azurerm_api_management.main.id",
        ),
        hcl::output(
            "apim_name",
            "Name of the API Management instance",
            "azurerm_api_management.main.name",
        ),
        hcl::output(
            "gateway_url",
            "Gateway URL of the API Management instance",
            "azurerm_api_management.main.gateway_url",
        ),
        hcl::output("api_id", "ID of the API", "azurerm_api_management_api.main.id"),
        hcl::output(
            "api_url",
            "Base URL of the API",
            "\"${azurerm_api_management.main.gateway_url}/${azurerm_api_management_api.main.path}\"",
        ),
        hcl::output(
            "identity_principal_id",
            "Principal ID of the API Management identity",
            "azurerm_api_management.main.identity[0].principal_id",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::References;

    fn refs() -> References {
        References {
            functions: vec!["users".into()],
            ..References::default()
        }
    }

    #[test]
    fn test_url_templates() {
        assert_eq!(
            url_template("/users/{id}"),
            ("/users/{id}".to_string(), vec!["id".to_string()])
        );
        assert_eq!(
            url_template("files/{proxy+}"),
            ("/files/{*proxy}".to_string(), vec!["proxy".to_string()])
        );
        assert_eq!(url_template("/").0, "/");
    }

    #[test]
    fn test_operation_ids() {
        let route = ApiRouteConfig::new(HttpMethod::Get, "/users/{id}", "users");
        assert_eq!(operation_id(&route), "get_users__id_");
        let root = ApiRouteConfig::new(HttpMethod::Any, "/", "users");
        assert_eq!(operation_id(&root), "any_root");
        assert_eq!(method(HttpMethod::Any), "*");
    }

    #[test]
    fn test_routes_and_backends() {
        let api = ApiGatewayConfig {
            name: "Shop".into(),
            routes: vec![
                ApiRouteConfig::new(HttpMethod::Get, "/users/{id}", "users"),
                ApiRouteConfig::new(HttpMethod::Post, "/users", "users"),
                ApiRouteConfig::new(HttpMethod::Get, "/orders", "orders"),
            ],
            ..ApiGatewayConfig::default()
        };
        let refs = refs();
        let output = render(&api, ReferenceScope::new(&refs));

        assert!(output.main.contains("display_name          = \"Shop\""));
        assert_eq!(
            output
                .main
                .matches("resource \"azurerm_api_management_backend\" \"users\"")
                .count(),
            1
        );
        assert!(output
            .main
            .contains("url                 = \"https://${var.function_hostnames[\"users\"]}/api\""));
        assert!(output
            .main
            .contains("url                 = \"https://${var.missing_function_hostnames_orders}/api\""));
        assert!(output.main.contains("name     = \"id\""));
        assert!(output.main.contains(
            "<set-backend-service backend-id=\"${azurerm_api_management_backend.users.name}\" />"
        ));
        assert!(output.main.contains("<cors allow-credentials=\"false\">"));
        assert!(output.main.contains("<rate-limit calls=\"50\" renewal-period=\"1\" />"));
        assert!(output.variables.contains("variable \"function_hostnames\""));
        assert!(output
            .variables
            .contains("variable \"missing_function_hostnames_orders\""));
        assert!(output.reference_maps.contains(&ReferenceMap::FunctionHostnames));
    }

    #[test]
    fn test_duplicate_routes_get_unique_operations() {
        let api = ApiGatewayConfig {
            cors_enabled: false,
            throttling_rate_limit: 0,
            routes: vec![
                ApiRouteConfig::new(HttpMethod::Get, "/items", "users"),
                ApiRouteConfig::new(HttpMethod::Get, "/items", "users"),
            ],
            ..ApiGatewayConfig::default()
        };
        let refs = refs();
        let output = render(&api, ReferenceScope::new(&refs));
        assert!(output
            .main
            .contains("resource \"azurerm_api_management_api_operation\" \"get_items_2\""));
        assert!(!output.main.contains("azurerm_api_management_api_policy"));
    }

    #[test]
    fn test_xml_escaping() {
        assert_eq!(xml_escape("a&b<\"${x}\">"), "a&amp;b&lt;&quot;$${x}&quot;&gt;");
    }
}

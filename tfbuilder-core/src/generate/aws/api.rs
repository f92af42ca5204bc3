use super::{base_variables, hcl};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{ApiGatewayConfig, ApiProtocol};

const DEFAULT_API_NAME: &str = "api";

/// HTTP API with a stage, one Lambda integration per routed function, and routes
pub(super) fn render(api: &ApiGatewayConfig, mut scope: ReferenceScope<'_>) -> ModuleOutput {
    let cors = if api.cors_enabled && api.protocol_type == ApiProtocol::Http {
        let cors = &api.cors_config;
        let pairs = [
            ("allow_origins", hcl::string_list(&cors.allow_origins)),
            ("allow_methods", hcl::string_list(&cors.allow_methods)),
            ("allow_headers", hcl::string_list(&cors.allow_headers)),
            ("max_age", cors.max_age.to_string()),
            ("allow_credentials", "false".to_string()),
        ];
        format!(
            "\n\n  cors_configuration {{\n{}\n  }}",
            hcl::attributes(&pairs, 4)
        )
    } else {
        String::new()
    };

    let mut sections = vec![
        hcl::section(
            "API Gateway",
            "API endpoint for the serverless backend.",
            &format!(
                r#"resource "aws_apigatewayv2_api" "main" {{
  name          = var.api_name
  description   = {description}
  protocol_type = {protocol}{cors}

  tags = merge(var.tags, {{
    Name = var.api_name
  }})
}}"#,
                description = hcl::quote(&api.description),
                protocol = hcl::quote(api.protocol_type.as_str()),
            ),
        ),
        hcl::section(
            "API Stage",
            "Deployment stage for the API.",
            &format!(
                r#"resource "aws_apigatewayv2_stage" "main" {{
  api_id      = aws_apigatewayv2_api.main.id
  name        = {stage}
  auto_deploy = {auto_deploy}

  default_route_settings {{
    throttling_burst_limit = {burst}
    throttling_rate_limit  = {rate}
  }}

  tags = merge(var.tags, {{
    Name = "${{var.api_name}}-stage"
  }})
}}"#,
                stage = hcl::quote(&api.stage_name),
                auto_deploy = api.auto_deploy,
                burst = api.throttling_burst_limit,
                rate = api.throttling_rate_limit,
            ),
        ),
    ];

    let mut functions: Vec<&str> = Vec::new();
    for route in &api.routes {
        if !functions.contains(&route.lambda_function.as_str()) {
            functions.push(&route.lambda_function);
        }
    }

    for function in &functions {
        let id = hcl::to_terraform_id(function);
        let invoke_arn = scope.lookup(ReferenceMap::LambdaInvokeArns, function);
        let function_name = scope.lookup(ReferenceMap::LambdaFunctionNames, function);
        sections.push(hcl::section(
            &format!("Integration: {function}"),
            "Lambda proxy integration and invoke permission.",
            &format!(
                r#"resource "aws_apigatewayv2_integration" "{id}" {{
  api_id                 = aws_apigatewayv2_api.main.id
  integration_type       = "AWS_PROXY"
  integration_method     = "POST"
  integration_uri        = {invoke_arn}
  payload_format_version = "2.0"
}}

resource "aws_lambda_permission" "{id}" {{
  statement_id  = "AllowAPIGateway-{id}"
  action        = "lambda:InvokeFunction"
  function_name = {function_name}
  principal     = "apigateway.amazonaws.com"
  source_arn    = "${{aws_apigatewayv2_api.main.execution_arn}}/*/*"
}}"#
            ),
        ));
    }

    let routes: Vec<String> = api
        .routes
        .iter()
        .enumerate()
        .map(|(index, route)| {
            let route_key = format!("{} {}", route.method.as_str(), route.path);
            format!(
                r#"resource "aws_apigatewayv2_route" "route_{index}" {{
  api_id    = aws_apigatewayv2_api.main.id
  route_key = {key}
  target    = "integrations/${{aws_apigatewayv2_integration.{integration}.id}}"
}}"#,
                key = hcl::quote(&route_key),
                integration = hcl::to_terraform_id(&route.lambda_function),
            )
        })
        .collect();
    if !routes.is_empty() {
        sections.push(hcl::section(
            "Routes",
            "Route keys mapped to their Lambda integrations.",
            &routes.join("\n\n"),
        ));
    }

    let api_name = if api.name.trim().is_empty() {
        DEFAULT_API_NAME
    } else {
        api.name.as_str()
    };
    let variables = hcl::join_sections([
        base_variables(),
        hcl::variable(
            "api_name",
            "Name of the API Gateway",
            "string",
            Some(&hcl::quote(api_name)),
        ),
    ]);

    scope.finish(hcl::join_sections(sections), variables, outputs())
}

fn outputs() -> String {
    hcl::join_sections([
        hcl::output("api_id", "ID of the API Gateway", "aws_apigatewayv2_api.main.id"),
        hcl::output(
            "api_endpoint",
            "Endpoint URL of the API Gateway",
            "aws_apigatewayv2_api.main.api_endpoint",
        ),
        hcl::output(
            "api_execution_arn",
            "Execution ARN of the API Gateway",
            "aws_apigatewayv2_api.main.execution_arn",
        ),
        hcl::output("stage_id", "ID of the API Gateway stage", "aws_apigatewayv2_stage.main.id"),
        hcl::output(
            "invoke_url",
            "Invoke URL for the API",
            "aws_apigatewayv2_stage.main.invoke_url",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::References;
    use crate::services::{ApiRouteConfig, HttpMethod};

    fn refs() -> References {
        References {
            functions: vec!["api".into()],
            ..References::default()
        }
    }

    #[test]
    fn test_routes_share_one_integration() {
        let api = ApiGatewayConfig {
            routes: vec![
                ApiRouteConfig::new(HttpMethod::Get, "/items", "api"),
                ApiRouteConfig::new(HttpMethod::Post, "/items", "api"),
            ],
            ..ApiGatewayConfig::default()
        };
        let refs = refs();
        let output = render(&api, ReferenceScope::new(&refs));

        assert_eq!(
            output
                .main
                .matches("resource \"aws_apigatewayv2_integration\"")
                .count(),
            1
        );
        assert!(output.main.contains("route_key = \"GET /items\""));
        assert!(output.main.contains("route_key = \"POST /items\""));
        assert!(output
            .main
            .contains("integration_uri        = var.lambda_invoke_arns[\"api\"]"));
        assert!(output.main.contains("cors_configuration {"));
        assert!(output.reference_maps.contains(&ReferenceMap::LambdaInvokeArns));
        assert!(output.reference_maps.contains(&ReferenceMap::LambdaFunctionNames));
    }

    #[test]
    fn test_unknown_function_gets_placeholder() {
        let refs = refs();
        let output = render(&ApiGatewayConfig::default(), ReferenceScope::new(&refs));
        // default route targets "handler", which is not defined here
        assert!(output
            .main
            .contains("integration_uri        = var.missing_lambda_invoke_arns_handler"));
        assert!(output
            .variables
            .contains("variable \"missing_lambda_function_names_handler\""));
        assert!(output.reference_maps.is_empty());
    }

    #[test]
    fn test_no_routes() {
        let refs = refs();
        let api = ApiGatewayConfig {
            routes: Vec::new(),
            cors_enabled: false,
            ..ApiGatewayConfig::default()
        };
        let output = render(&api, ReferenceScope::new(&refs));
        assert!(!output.main.contains("aws_apigatewayv2_route"));
        assert!(!output.main.contains("cors_configuration"));
        assert!(output.main.contains("resource \"aws_apigatewayv2_stage\" \"main\""));
    }
}

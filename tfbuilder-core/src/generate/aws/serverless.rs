use super::{base_variables, hcl, name_tag};
use crate::generate::ModuleOutput;
use crate::services::{LambdaConfig, LambdaFunctionConfig};

const EXECUTION_ROLE: &str = r#"data "aws_iam_policy_document" "lambda_assume_role" {
  statement {
    effect = "Allow"

    principals {
      type        = "Service"
      identifiers = ["lambda.amazonaws.com"]
    }

    actions = ["sts:AssumeRole"]
  }
}

resource "aws_iam_role" "lambda" {
  name               = "${var.project_name}-lambda-role"
  assume_role_policy = data.aws_iam_policy_document.lambda_assume_role.json

  tags = merge(var.tags, {
    Name = "${var.project_name}-lambda-role"
  })
}

resource "aws_iam_role_policy_attachment" "lambda_basic" {
  role       = aws_iam_role.lambda.name
  policy_arn = "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
}"#;

const VPC_ACCESS: &str = r#"resource "aws_iam_role_policy_attachment" "lambda_vpc" {
  role       = aws_iam_role.lambda.name
  policy_arn = "arn:aws:iam::aws:policy/service-role/AWSLambdaVPCAccessExecutionRole"
}"#;

const LOG_RETENTION_DAYS: u32 = 30;

/// Execution role plus one log group and function per configured function.
///
/// `in_vpc` is set when the project has a VPC and some function asks for
/// placement in it.
pub(super) fn render(lambda: &LambdaConfig, in_vpc: bool) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "Lambda Execution Role",
        "IAM role that Lambda functions assume during execution.",
        EXECUTION_ROLE,
    )];
    if in_vpc {
        sections.push(hcl::section(
            "Lambda VPC Access",
            "Lets functions create network interfaces in the VPC.",
            VPC_ACCESS,
        ));
    }
    for func in &lambda.functions {
        sections.push(function(func, in_vpc));
    }

    let mut variables = vec![base_variables()];
    if in_vpc {
        variables.push(hcl::variable(
            "public_subnet_ids",
            "Public subnet IDs for Lambda VPC configuration",
            "list(string)",
            Some("[]"),
        ));
        variables.push(hcl::variable(
            "private_subnet_ids",
            "Private subnet IDs for Lambda VPC configuration",
            "list(string)",
            Some("[]"),
        ));
        variables.push(hcl::variable(
            "lambda_security_group_ids",
            "Security group IDs for Lambda functions",
            "list(string)",
            Some("[]"),
        ));
    }

    ModuleOutput::new(
        hcl::join_sections(sections),
        hcl::join_sections(variables),
        outputs(lambda),
    )
}

fn function(func: &LambdaFunctionConfig, in_vpc: bool) -> String {
    let id = hcl::to_terraform_id(&func.name);
    let name = hcl::escape_string(&func.name);

    let log_group = format!(
        r#"resource "aws_cloudwatch_log_group" "{id}" {{
  name              = "/aws/lambda/${{var.project_name}}-{name}"
  retention_in_days = {LOG_RETENTION_DAYS}

{tags}
}}"#,
        tags = name_tag(&format!("{}-logs", func.name)),
    );

    let identity = [
        ("function_name", format!("\"${{var.project_name}}-{name}\"")),
        ("description", hcl::quote(&func.description)),
        ("role", "aws_iam_role.lambda.arn".to_string()),
    ];
    let package = [
        ("filename", "\"lambda_placeholder.zip\"".to_string()),
        (
            "source_code_hash",
            "filebase64sha256(\"lambda_placeholder.zip\")".to_string(),
        ),
    ];
    let mut runtime = vec![
        ("runtime", hcl::quote(func.runtime.as_str())),
        ("handler", hcl::quote(&func.handler)),
        ("architectures", hcl::string_list(&[func.architecture.as_str()])),
        ("memory_size", func.memory_size.to_string()),
        ("timeout", func.timeout.to_string()),
    ];
    if let Some(limit) = func.reserved_concurrency {
        runtime.push(("reserved_concurrent_executions", limit.to_string()));
    }
    if !func.layers.is_empty() {
        runtime.push(("layers", hcl::string_list(&func.layers)));
    }

    let mut body = vec![
        hcl::attributes(&identity, 2),
        format!(
            "  # Placeholder package; replace with the real deployment artifact\n{}",
            hcl::attributes(&package, 2)
        ),
        hcl::attributes(&runtime, 2),
    ];
    if in_vpc && func.vpc_enabled {
        body.push(format!(
            "  vpc_config {{\n    subnet_ids         = var.{}_subnet_ids\n    security_group_ids = var.lambda_security_group_ids\n  }}",
            func.vpc_subnet_type.as_str()
        ));
    }
    if !func.environment_variables.is_empty() {
        body.push(format!(
            "  environment {{\n    variables = {}\n  }}",
            hcl::string_map(&func.environment_variables, 4)
        ));
    }
    body.push(format!("  depends_on = [aws_cloudwatch_log_group.{id}]"));
    body.push(name_tag(&func.name));

    let mut blocks = vec![
        hcl::comment_block(&format!("Lambda Function: {}", func.name), Some(&func.description)),
        log_group,
        format!(
            "resource \"aws_lambda_function\" \"{id}\" {{\n{}\n}}",
            body.join("\n\n")
        ),
    ];

    if func.create_function_url {
        blocks.push(format!(
            r#"resource "aws_lambda_function_url" "{id}" {{
  function_name      = aws_lambda_function.{id}.function_name
  authorization_type = "NONE"

  cors {{
    allow_origins = ["*"]
    allow_methods = ["*"]
    allow_headers = ["*"]
    max_age       = 86400
  }}
}}"#
        ));
    }

    blocks.join("\n\n")
}

fn outputs(lambda: &LambdaConfig) -> String {
    let mut sections = Vec::new();
    let mut arns = Vec::new();
    let mut invoke_arns = Vec::new();
    let mut names = Vec::new();

    for func in &lambda.functions {
        let id = hcl::to_terraform_id(&func.name);
        let resource = format!("aws_lambda_function.{id}");
        sections.push(hcl::output(
            &format!("{id}_function_arn"),
            &format!("ARN of the {} Lambda function", func.name),
            &format!("{resource}.arn"),
        ));
        sections.push(hcl::output(
            &format!("{id}_function_name"),
            &format!("Name of the {} Lambda function", func.name),
            &format!("{resource}.function_name"),
        ));
        sections.push(hcl::output(
            &format!("{id}_invoke_arn"),
            &format!("Invoke ARN of the {} Lambda function", func.name),
            &format!("{resource}.invoke_arn"),
        ));
        if func.create_function_url {
            sections.push(hcl::output(
                &format!("{id}_function_url"),
                &format!("URL of the {} Lambda function", func.name),
                &format!("aws_lambda_function_url.{id}.function_url"),
            ));
        }
        arns.push((func.name.clone(), format!("{resource}.arn")));
        invoke_arns.push((func.name.clone(), format!("{resource}.invoke_arn")));
        names.push((func.name.clone(), format!("{resource}.function_name")));
    }

    sections.push(hcl::output(
        "lambda_role_arn",
        "ARN of the Lambda execution role",
        "aws_iam_role.lambda.arn",
    ));
    sections.push(hcl::output(
        "lambda_role_name",
        "Name of the Lambda execution role",
        "aws_iam_role.lambda.name",
    ));
    sections.push(hcl::output(
        "function_arns",
        "Map of function names to ARNs",
        &hcl::expr_map(&arns, 2),
    ));
    sections.push(hcl::output(
        "invoke_arns",
        "Map of function names to invoke ARNs",
        &hcl::expr_map(&invoke_arns, 2),
    ));
    sections.push(hcl::output(
        "function_names",
        "Map of function names to deployed function names",
        &hcl::expr_map(&names, 2),
    ));

    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::services::SubnetKind;

    #[test]
    fn test_function_resources() {
        let mut func = LambdaFunctionConfig::named("order-processor", "Processes orders");
        func.environment_variables =
            BTreeMap::from([("TABLE".to_string(), "orders".to_string())]);
        func.reserved_concurrency = Some(5);
        func.create_function_url = true;
        let output = render(
            &LambdaConfig {
                functions: vec![func],
            },
            false,
        );

        assert!(output
            .main
            .contains("resource \"aws_lambda_function\" \"order_processor\""));
        assert!(output
            .main
            .contains("name              = \"/aws/lambda/${var.project_name}-order-processor\""));
        assert!(output.main.contains("architectures                  = [\"arm64\"]"));
        assert!(output.main.contains("reserved_concurrent_executions = 5"));
        assert!(output.main.contains("TABLE = \"orders\""));
        assert!(output
            .main
            .contains("resource \"aws_lambda_function_url\" \"order_processor\""));
        assert!(!output.main.contains("vpc_config"));
        assert!(output.outputs.contains("output \"order_processor_function_url\""));
        assert!(output
            .outputs
            .contains("\"order-processor\" = aws_lambda_function.order_processor.invoke_arn"));
    }

    #[test]
    fn test_vpc_placement() {
        let func = LambdaFunctionConfig {
            vpc_enabled: true,
            vpc_subnet_type: SubnetKind::Public,
            ..LambdaFunctionConfig::default()
        };
        let lambda = LambdaConfig {
            functions: vec![func],
        };

        let placed = render(&lambda, true);
        assert!(placed.main.contains("AWSLambdaVPCAccessExecutionRole"));
        assert!(placed.main.contains("subnet_ids         = var.public_subnet_ids"));
        assert!(placed.variables.contains("variable \"lambda_security_group_ids\""));

        let detached = render(&lambda, false);
        assert!(!detached.main.contains("vpc_config"));
        assert!(!detached.variables.contains("lambda_security_group_ids"));
    }

    #[test]
    fn test_reference_map_outputs_exist() {
        let output = render(&LambdaConfig::default(), false);
        for name in ["function_arns", "invoke_arns", "function_names"] {
            assert!(output.outputs.contains(&format!("output \"{name}\"")));
        }
    }
}

use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::IamConfig;

const EC2_ROLE: &str = r#"data "aws_iam_policy_document" "ec2_assume_role" {
  statement {
    effect = "Allow"

    principals {
      type        = "Service"
      identifiers = ["ec2.amazonaws.com"]
    }

    actions = ["sts:AssumeRole"]
  }
}

resource "aws_iam_role" "ec2" {
  name               = var.role_name
  assume_role_policy = data.aws_iam_policy_document.ec2_assume_role.json

  tags = merge(var.tags, {
    Name = var.role_name
  })
}"#;

const S3_ACCESS: &str = r#"data "aws_iam_policy_document" "s3_access" {
  statement {
    effect = "Allow"
    actions = [
      "s3:GetObject",
      "s3:PutObject",
      "s3:DeleteObject",
      "s3:ListBucket",
    ]
    resources = [
      var.s3_bucket_arn,
      "${var.s3_bucket_arn}/*",
    ]
  }
}

resource "aws_iam_policy" "s3_access" {
  name        = "${var.project_name}-s3-access"
  description = "Allows EC2 instances to access the S3 bucket"
  policy      = data.aws_iam_policy_document.s3_access.json

  tags = merge(var.tags, {
    Name = "${var.project_name}-s3-access-policy"
  })
}

resource "aws_iam_role_policy_attachment" "s3_access" {
  role       = aws_iam_role.ec2.name
  policy_arn = aws_iam_policy.s3_access.arn
}"#;

const SSM_ACCESS: &str = r#"resource "aws_iam_role_policy_attachment" "ssm" {
  role       = aws_iam_role.ec2.name
  policy_arn = "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore"
}"#;

const MANAGED_POLICIES: &str = r#"resource "aws_iam_role_policy_attachment" "managed" {
  count = length(var.managed_policy_arns)

  role       = aws_iam_role.ec2.name
  policy_arn = var.managed_policy_arns[count.index]
}"#;

const INSTANCE_PROFILE: &str = r#"resource "aws_iam_instance_profile" "ec2" {
  name = "${var.project_name}-ec2-profile"
  role = aws_iam_role.ec2.name

  tags = merge(var.tags, {
    Name = "${var.project_name}-ec2-profile"
  })
}"#;

const DEFAULT_ROLE_NAME: &str = "ec2-role";

/// Instance role, optional bucket access and instance profile
pub(super) fn render(iam: &IamConfig, s3_access: bool) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "IAM Role for EC2",
        "Allows EC2 instances to assume this role and access AWS services.",
        EC2_ROLE,
    )];
    if s3_access {
        sections.push(hcl::section(
            "S3 Access Policy",
            "Grants read/write access to the S3 bucket for EC2 instances.",
            S3_ACCESS,
        ));
    }
    sections.push(hcl::section(
        "SSM Access Policy",
        "Enables Session Manager for shell access without SSH keys.",
        SSM_ACCESS,
    ));
    if !iam.managed_policy_arns.is_empty() {
        sections.push(hcl::section(
            "Managed Policy Attachments",
            "Attaches additional AWS managed policies to the role.",
            MANAGED_POLICIES,
        ));
    }
    if iam.create_instance_profile {
        sections.push(hcl::section(
            "Instance Profile",
            "Allows the IAM role to be attached to EC2 instances.",
            INSTANCE_PROFILE,
        ));
    }

    ModuleOutput::new(
        hcl::join_sections(sections),
        variables(iam, s3_access),
        outputs(iam),
    )
}

fn variables(iam: &IamConfig, s3_access: bool) -> String {
    let role_name = if iam.role_name.trim().is_empty() {
        DEFAULT_ROLE_NAME
    } else {
        iam.role_name.as_str()
    };
    let mut sections = vec![
        base_variables(),
        hcl::variable(
            "role_name",
            "Name of the IAM role",
            "string",
            Some(&hcl::quote(role_name)),
        ),
        hcl::variable(
            "managed_policy_arns",
            "List of managed policy ARNs to attach to the role",
            "list(string)",
            Some(&hcl::string_list(&iam.managed_policy_arns)),
        ),
    ];
    if s3_access {
        sections.push(hcl::variable(
            "s3_bucket_arn",
            "ARN of the S3 bucket to grant access to",
            "string",
            None,
        ));
    }
    hcl::join_sections(sections)
}

fn outputs(iam: &IamConfig) -> String {
    let mut sections = vec![
        hcl::output("role_arn", "ARN of the IAM role", "aws_iam_role.ec2.arn"),
        hcl::output("role_name", "Name of the IAM role", "aws_iam_role.ec2.name"),
    ];
    if iam.create_instance_profile {
        sections.push(hcl::output(
            "instance_profile_name",
            "Name of the IAM instance profile",
            "aws_iam_instance_profile.ec2.name",
        ));
        sections.push(hcl::output(
            "instance_profile_arn",
            "ARN of the IAM instance profile",
            "aws_iam_instance_profile.ec2.arn",
        ));
    }
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_render_profile_and_ssm() {
        let output = render(&IamConfig::default(), false);
        assert!(output.main.contains("resource \"aws_iam_role\" \"ec2\""));
        assert!(output.main.contains("AmazonSSMManagedInstanceCore"));
        assert!(output.main.contains("resource \"aws_iam_instance_profile\" \"ec2\""));
        assert!(!output.main.contains("s3_access"));
        assert!(!output.main.contains("\"managed\""));
        assert!(output.variables.contains("default     = \"ec2-role\""));
        assert!(output.outputs.contains("output \"instance_profile_name\""));
    }

    #[test]
    fn test_bucket_access_and_managed_policies() {
        let iam = IamConfig {
            role_name: "shop-role".into(),
            create_instance_profile: false,
            managed_policy_arns: vec!["arn:aws:iam::aws:policy/ReadOnlyAccess".into()],
            s3_access: true,
        };
        let output = render(&iam, true);
        assert!(output.main.contains("resource \"aws_iam_policy\" \"s3_access\""));
        assert!(output.main.contains("count = length(var.managed_policy_arns)"));
        assert!(!output.main.contains("aws_iam_instance_profile"));
        assert!(output.variables.contains("variable \"s3_bucket_arn\""));
        assert!(output.variables.contains("\"shop-role\""));
        assert!(!output.outputs.contains("instance_profile"));
    }
}

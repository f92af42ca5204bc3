use super::{base_variables, hcl};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::Ec2Config;

const AMAZON_LINUX_AMI: &str = r#"data "aws_ami" "amazon_linux" {
  most_recent = true
  owners      = ["amazon"]

  filter {
    name   = "name"
    values = ["al2023-ami-*-x86_64"]
  }

  filter {
    name   = "virtualization-type"
    values = ["hvm"]
  }

  filter {
    name   = "root-device-type"
    values = ["ebs"]
  }
}"#;

const SECURITY_GROUP: &str = r#"resource "aws_security_group" "main" {
  name        = "${var.project_name}-ec2-sg"
  description = "Security group for EC2 instance"
  vpc_id      = var.vpc_id

  # Restrict SSH to known ranges in production
  ingress {
    description = "SSH access"
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  ingress {
    description = "HTTP access"
    from_port   = 80
    to_port     = 80
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  ingress {
    description = "HTTPS access"
    from_port   = 443
    to_port     = 443
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  egress {
    description = "Allow all outbound traffic"
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }

  tags = merge(var.tags, {
    Name = "${var.project_name}-ec2-sg"
  })
}"#;

const KEY_PAIR: &str = r#"data "aws_key_pair" "main" {
  key_name = var.key_pair_name
}"#;

const INSTANCE_TAIL: &str = r#"  root_block_device {
    volume_size           = var.root_volume_size
    volume_type           = "gp3"
    encrypted             = true
    delete_on_termination = true
  }

  monitoring = false

  user_data = <<-EOF
    #!/bin/bash
    dnf update -y
    echo "Instance initialized by Terraform" > /tmp/terraform-init.txt
  EOF

  tags = merge(var.tags, {
    Name = "${var.project_name}-ec2"
  })
}"#;

fn custom_ami(ec2: &Ec2Config) -> bool {
    !ec2.ami_id.trim().is_empty()
}

fn has_key_pair(ec2: &Ec2Config) -> bool {
    !ec2.key_pair_name.trim().is_empty()
}

/// EC2 instance with its own security group.
///
/// `instance_profile` is set when the identity module creates a profile.
pub(super) fn render(
    ec2: &Ec2Config,
    instance_profile: bool,
    mut scope: ReferenceScope<'_>,
) -> ModuleOutput {
    let mut sections = Vec::new();
    if !custom_ami(ec2) {
        sections.push(hcl::section(
            "AMI Data Source",
            "Finds the latest Amazon Linux 2023 AMI for the current region.",
            AMAZON_LINUX_AMI,
        ));
    }
    sections.push(hcl::section(
        "Security Group",
        "Controls inbound and outbound traffic for the EC2 instance.",
        SECURITY_GROUP,
    ));
    if has_key_pair(ec2) {
        sections.push(hcl::section(
            "Key Pair",
            "References an existing EC2 key pair for SSH access.",
            KEY_PAIR,
        ));
    }

    let mut security_groups = vec!["aws_security_group.main.id".to_string()];
    security_groups.extend(
        ec2.security_group_ids
            .iter()
            .map(|name| scope.lookup(ReferenceMap::SecurityGroupIds, name)),
    );

    let ami = if custom_ami(ec2) {
        "var.ami_id"
    } else {
        "data.aws_ami.amazon_linux.id"
    };
    let mut pairs = vec![
        ("ami", ami.to_string()),
        ("instance_type", "var.instance_type".to_string()),
        ("subnet_id", "var.subnet_id".to_string()),
        ("vpc_security_group_ids", hcl::expr_list(&security_groups)),
        ("associate_public_ip_address", "var.associate_public_ip".to_string()),
    ];
    if instance_profile {
        pairs.push(("iam_instance_profile", "var.instance_profile_name".to_string()));
    }
    if has_key_pair(ec2) {
        pairs.push(("key_name", "data.aws_key_pair.main.key_name".to_string()));
    }

    sections.push(hcl::section(
        "EC2 Instance",
        "Main compute instance.",
        &format!(
            "resource \"aws_instance\" \"main\" {{\n{}\n\n{INSTANCE_TAIL}",
            hcl::attributes(&pairs, 2)
        ),
    ));

    scope.finish(
        hcl::join_sections(sections),
        variables(ec2, instance_profile),
        outputs(),
    )
}

fn variables(ec2: &Ec2Config, instance_profile: bool) -> String {
    let mut sections = vec![
        base_variables(),
        hcl::variable("vpc_id", "ID of the VPC", "string", None),
        hcl::variable(
            "subnet_id",
            "ID of the subnet to launch the instance in",
            "string",
            None,
        ),
        hcl::variable(
            "instance_type",
            "EC2 instance type",
            "string",
            Some(&hcl::quote(&ec2.instance_type)),
        ),
        hcl::variable(
            "associate_public_ip",
            "Whether to associate a public IP address",
            "bool",
            Some(&ec2.associate_public_ip.to_string()),
        ),
        hcl::variable(
            "root_volume_size",
            "Size of the root EBS volume in GB",
            "number",
            Some(&ec2.root_volume_size.to_string()),
        ),
    ];
    if custom_ami(ec2) {
        sections.push(hcl::variable(
            "ami_id",
            "AMI to launch",
            "string",
            Some(&hcl::quote(ec2.ami_id.trim())),
        ));
    }
    if has_key_pair(ec2) {
        sections.push(hcl::variable(
            "key_pair_name",
            "Name of the EC2 key pair for SSH access",
            "string",
            Some(&hcl::quote(&ec2.key_pair_name)),
        ));
    }
    if instance_profile {
        sections.push(hcl::variable(
            "instance_profile_name",
            "Name of the IAM instance profile to attach",
            "string",
            None,
        ));
    }
    hcl::join_sections(sections)
}

fn outputs() -> String {
    hcl::join_sections([
        hcl::output("instance_id", "ID of the EC2 instance", "aws_instance.main.id"),
        hcl::output(
            "instance_public_ip",
            "Public IP address of the EC2 instance",
            "aws_instance.main.public_ip",
        ),
        hcl::output(
            "instance_private_ip",
            "Private IP address of the EC2 instance",
            "aws_instance.main.private_ip",
        ),
        hcl::output(
            "security_group_id",
            "ID of the instance security group",
            "aws_security_group.main.id",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::References;

    #[test]
    fn test_default_instance() {
        let refs = References::default();
        let output = render(&Ec2Config::default(), true, ReferenceScope::new(&refs));
        assert!(output.main.contains("data \"aws_ami\" \"amazon_linux\""));
        assert!(output
            .main
            .contains("ami                         = data.aws_ami.amazon_linux.id"));
        assert!(output
            .main
            .contains("iam_instance_profile        = var.instance_profile_name"));
        assert!(!output.main.contains("aws_key_pair"));
        assert!(output.variables.contains("variable \"instance_profile_name\""));
        assert!(output.variables.contains("default     = \"t3.micro\""));
    }

    #[test]
    fn test_custom_ami_key_pair_and_groups() {
        let refs = References {
            security_groups: vec!["web".into()],
            ..References::default()
        };
        let ec2 = Ec2Config {
            ami_id: "ami-0abc".into(),
            key_pair_name: "deploy".into(),
            security_group_ids: vec!["web".into()],
            ..Ec2Config::default()
        };
        let output = render(&ec2, false, ReferenceScope::new(&refs));
        assert!(!output.main.contains("data \"aws_ami\""));
        assert!(output.main.contains("= var.ami_id"));
        assert!(output.main.contains("data \"aws_key_pair\" \"main\""));
        assert!(output.main.contains(
            "vpc_security_group_ids      = [aws_security_group.main.id, var.security_group_ids[\"web\"]]"
        ));
        assert!(!output.main.contains("iam_instance_profile"));
        assert!(output.variables.contains("\"ami-0abc\""));
        assert!(output.reference_maps.contains(&ReferenceMap::SecurityGroupIds));
    }
}

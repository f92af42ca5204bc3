use std::collections::BTreeSet;

use super::{base_variables, hcl, name_tag};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{
    RuleProtocol, SecurityGroupConfig, SecurityGroupDefinition, SecurityGroupRule, SubnetConfig,
    VpcConfig,
};

const INTERNET_GATEWAY: &str = r#"resource "aws_internet_gateway" "main" {
  vpc_id = aws_vpc.main.id

  tags = merge(var.tags, {
    Name = "${var.project_name}-igw"
  })
}"#;

const PUBLIC_ROUTE_TABLE: &str = r#"resource "aws_route_table" "public" {
  vpc_id = aws_vpc.main.id

  route {
    cidr_block = "0.0.0.0/0"
    gateway_id = aws_internet_gateway.main.id
  }

  tags = merge(var.tags, {
    Name = "${var.project_name}-public-rt"
  })
}"#;

const PUBLIC_SUBNETS: &str = r#"resource "aws_subnet" "public" {
  count = length(var.public_subnet_cidrs)

  vpc_id                  = aws_vpc.main.id
  cidr_block              = var.public_subnet_cidrs[count.index]
  availability_zone       = var.availability_zones[count.index % length(var.availability_zones)]
  map_public_ip_on_launch = true

  tags = merge(var.tags, {
    Name = "${var.project_name}-public-subnet-${count.index + 1}"
    Type = "Public"
  })
}

resource "aws_route_table_association" "public" {
  count = length(aws_subnet.public)

  subnet_id      = aws_subnet.public[count.index].id
  route_table_id = aws_route_table.public.id
}"#;

const PRIVATE_SUBNETS: &str = r#"resource "aws_subnet" "private" {
  count = length(var.private_subnet_cidrs)

  vpc_id            = aws_vpc.main.id
  cidr_block        = var.private_subnet_cidrs[count.index]
  availability_zone = var.availability_zones[count.index % length(var.availability_zones)]

  tags = merge(var.tags, {
    Name = "${var.project_name}-private-subnet-${count.index + 1}"
    Type = "Private"
  })
}"#;

const NAT_GATEWAY: &str = r#"resource "aws_eip" "nat" {
  domain = "vpc"

  tags = merge(var.tags, {
    Name = "${var.project_name}-nat-eip"
  })

  depends_on = [aws_internet_gateway.main]
}

resource "aws_nat_gateway" "main" {
  allocation_id = aws_eip.nat.id
  subnet_id     = aws_subnet.public[0].id

  tags = merge(var.tags, {
    Name = "${var.project_name}-nat-gw"
  })

  depends_on = [aws_internet_gateway.main]
}

resource "aws_route_table" "private" {
  vpc_id = aws_vpc.main.id

  route {
    cidr_block     = "0.0.0.0/0"
    nat_gateway_id = aws_nat_gateway.main.id
  }

  tags = merge(var.tags, {
    Name = "${var.project_name}-private-rt"
  })
}

resource "aws_route_table_association" "private" {
  count = length(aws_subnet.private)

  subnet_id      = aws_subnet.private[count.index].id
  route_table_id = aws_route_table.private.id
}"#;

/// VPC, subnets, NAT and security groups
pub(super) fn render(
    vpc: &VpcConfig,
    subnets: Option<&SubnetConfig>,
    groups: Option<&SecurityGroupConfig>,
    mut scope: ReferenceScope<'_>,
) -> ModuleOutput {
    let main = main(vpc, subnets, groups, &mut scope);
    scope.finish(main, variables(vpc, subnets), outputs(subnets, groups))
}

fn has_public(subnets: Option<&SubnetConfig>) -> bool {
    subnets.is_some_and(|s| !s.public_subnet_cidrs.is_empty())
}

fn has_private(subnets: Option<&SubnetConfig>) -> bool {
    subnets.is_some_and(|s| !s.private_subnet_cidrs.is_empty())
}

/// NAT sits in the first public subnet and serves the private ones
fn has_nat(subnets: Option<&SubnetConfig>) -> bool {
    subnets.is_some_and(|s| s.create_nat_gateway) && has_public(subnets) && has_private(subnets)
}

fn main(
    vpc: &VpcConfig,
    subnets: Option<&SubnetConfig>,
    groups: Option<&SecurityGroupConfig>,
    scope: &mut ReferenceScope<'_>,
) -> String {
    let mut sections = vec![
        hcl::section(
            "VPC - Main Virtual Private Cloud",
            "Creates an isolated network environment for your AWS resources.",
            &format!(
                r#"resource "aws_vpc" "main" {{
  cidr_block           = var.vpc_cidr
  enable_dns_hostnames = {}
  enable_dns_support   = {}

{}
}}"#,
                vpc.enable_dns_hostnames,
                vpc.enable_dns_support,
                name_tag("vpc"),
            ),
        ),
        hcl::section(
            "Internet Gateway",
            "Enables internet access for resources in public subnets.",
            INTERNET_GATEWAY,
        ),
        hcl::section(
            "Public Route Table",
            "Routes traffic from public subnets to the internet gateway.",
            PUBLIC_ROUTE_TABLE,
        ),
    ];

    if has_public(subnets) {
        sections.push(hcl::section(
            "Public Subnets",
            "Subnets with direct internet access via the Internet Gateway.",
            PUBLIC_SUBNETS,
        ));
    }
    if has_private(subnets) {
        sections.push(hcl::section(
            "Private Subnets",
            "Subnets without direct internet access. Use NAT Gateway for outbound traffic.",
            PRIVATE_SUBNETS,
        ));
    }
    if has_nat(subnets) {
        sections.push(hcl::section(
            "NAT Gateway",
            "Allows private subnet resources to reach the internet for updates.",
            NAT_GATEWAY,
        ));
    }

    if let Some(config) = groups {
        let known: BTreeSet<&str> = config.groups.iter().map(|g| g.name.as_str()).collect();
        for group in &config.groups {
            sections.push(security_group(group, &known, scope));
        }
    }

    hcl::join_sections(sections)
}

fn security_group(
    group: &SecurityGroupDefinition,
    known: &BTreeSet<&str>,
    scope: &mut ReferenceScope<'_>,
) -> String {
    let id = hcl::to_terraform_id(&group.name);
    let description = if group.description.trim().is_empty() {
        format!("Security group {}", group.name)
    } else {
        group.description.clone()
    };

    let mut blocks = vec![format!(
        r#"{header}

resource "aws_security_group" "{id}" {{
  name        = "${{var.project_name}}-{name}-sg"
  description = {description}
  vpc_id      = aws_vpc.main.id

{tags}
}}"#,
        header = hcl::comment_block(
            &format!("Security Group: {}", group.name),
            Some(&group.description)
        ),
        name = hcl::escape_string(&group.name),
        description = hcl::quote(&description),
        tags = name_tag(&format!("{}-sg", group.name)),
    )];

    for (direction, rules) in [("ingress", &group.ingress_rules), ("egress", &group.egress_rules)] {
        for (index, rule) in rules.iter().enumerate() {
            blocks.push(rule_block(&id, direction, index, rule, known, scope));
        }
    }

    blocks.join("\n\n")
}

/// One `aws_vpc_security_group_*_rule`; several CIDRs fan out with `for_each`
fn rule_block(
    group_id: &str,
    direction: &str,
    index: usize,
    rule: &SecurityGroupRule,
    known: &BTreeSet<&str>,
    scope: &mut ReferenceScope<'_>,
) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("security_group_id", format!("aws_security_group.{group_id}.id")),
        ("description", hcl::quote(&rule.description)),
        ("ip_protocol", hcl::quote(rule.protocol.as_str())),
    ];
    if rule.protocol != RuleProtocol::All {
        pairs.push(("from_port", rule.from_port.to_string()));
        pairs.push(("to_port", rule.to_port.to_string()));
    }

    let mut for_each = None;
    match rule.cidr_blocks.as_slice() {
        [] => {}
        [single] => pairs.push(("cidr_ipv4", hcl::quote(single))),
        many => {
            for_each = Some(format!("toset({})", hcl::string_list(many)));
            pairs.push(("cidr_ipv4", "each.value".to_string()));
        }
    }

    if let Some(source) = &rule.source_security_group {
        let target = if known.contains(source.as_str()) {
            format!("aws_security_group.{}.id", hcl::to_terraform_id(source))
        } else {
            scope.lookup(ReferenceMap::SecurityGroupIds, source)
        };
        pairs.push(("referenced_security_group_id", target));
    }

    let mut body = String::new();
    if let Some(set) = for_each {
        body.push_str(&format!("  for_each = {set}\n\n"));
    }
    body.push_str(&hcl::attributes(&pairs, 2));

    format!(
        "resource \"aws_vpc_security_group_{direction}_rule\" \"{group_id}_{direction}_{index}\" {{\n{body}\n}}"
    )
}

fn variables(vpc: &VpcConfig, subnets: Option<&SubnetConfig>) -> String {
    let mut sections = vec![
        base_variables(),
        hcl::variable(
            "vpc_cidr",
            "CIDR block for the VPC",
            "string",
            Some(&hcl::quote(&vpc.cidr_block)),
        ),
    ];
    if let Some(subnets) = subnets {
        sections.push(hcl::variable(
            "public_subnet_cidrs",
            "CIDR blocks for public subnets",
            "list(string)",
            Some(&hcl::string_list(&subnets.public_subnet_cidrs)),
        ));
        sections.push(hcl::variable(
            "private_subnet_cidrs",
            "CIDR blocks for private subnets",
            "list(string)",
            Some(&hcl::string_list(&subnets.private_subnet_cidrs)),
        ));
        sections.push(hcl::variable(
            "availability_zones",
            "Availability zones to use for subnets",
            "list(string)",
            Some(&hcl::string_list(&subnets.availability_zones)),
        ));
    }
    hcl::join_sections(sections)
}

fn outputs(subnets: Option<&SubnetConfig>, groups: Option<&SecurityGroupConfig>) -> String {
    let mut sections = vec![
        hcl::output("vpc_id", "ID of the VPC", "aws_vpc.main.id"),
        hcl::output("vpc_cidr", "CIDR block of the VPC", "aws_vpc.main.cidr_block"),
        hcl::output(
            "internet_gateway_id",
            "ID of the Internet Gateway",
            "aws_internet_gateway.main.id",
        ),
    ];

    if has_public(subnets) {
        sections.push(hcl::output(
            "public_subnet_ids",
            "IDs of the public subnets",
            "aws_subnet.public[*].id",
        ));
        sections.push(hcl::output(
            "public_subnet_cidrs",
            "CIDR blocks of the public subnets",
            "aws_subnet.public[*].cidr_block",
        ));
    }
    if has_private(subnets) {
        sections.push(hcl::output(
            "private_subnet_ids",
            "IDs of the private subnets",
            "aws_subnet.private[*].id",
        ));
        sections.push(hcl::output(
            "private_subnet_cidrs",
            "CIDR blocks of the private subnets",
            "aws_subnet.private[*].cidr_block",
        ));
    }
    if has_nat(subnets) {
        sections.push(hcl::output(
            "nat_gateway_id",
            "ID of the NAT Gateway",
            "aws_nat_gateway.main.id",
        ));
        sections.push(hcl::output(
            "nat_gateway_public_ip",
            "Public IP of the NAT Gateway",
            "aws_eip.nat.public_ip",
        ));
    }

    if let Some(config) = groups {
        let mut entries = Vec::new();
        for group in &config.groups {
            let id = hcl::to_terraform_id(&group.name);
            let value = format!("aws_security_group.{id}.id");
            sections.push(hcl::output(
                &format!("{id}_security_group_id"),
                &format!("ID of the {} security group", group.name),
                &value,
            ));
            entries.push((group.name.clone(), value));
        }
        sections.push(hcl::output(
            "security_group_ids",
            "Map of security group names to IDs",
            &hcl::expr_map(&entries, 2),
        ));
    }

    hcl::join_sections(sections)
}

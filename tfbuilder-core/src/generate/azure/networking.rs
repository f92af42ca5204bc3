use std::collections::BTreeSet;

use super::{base_variables, hcl, placement, unique};
use crate::generate::ModuleOutput;
use crate::services::{
    RuleProtocol, SecurityGroupConfig, SecurityGroupDefinition, SecurityGroupRule, SubnetConfig,
    VpcConfig,
};

const NAT_GATEWAY: &str = r#"resource "azurerm_public_ip" "nat" {
  name                = "${var.project_name}-nat-pip"
  location            = var.location
  resource_group_name = var.resource_group_name
  allocation_method   = "Static"
  sku                 = "Standard"
  zones               = ["1"]

  tags = var.tags
}

resource "azurerm_nat_gateway" "main" {
  name                    = "${var.project_name}-nat"
  location                = var.location
  resource_group_name     = var.resource_group_name
  sku_name                = "Standard"
  idle_timeout_in_minutes = 10

  tags = var.tags
}

resource "azurerm_nat_gateway_public_ip_association" "main" {
  nat_gateway_id       = azurerm_nat_gateway.main.id
  public_ip_address_id = azurerm_public_ip.nat.id
}"#;

const FIRST_PRIORITY: u32 = 100;
const PRIORITY_STEP: u32 = 10;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "Inbound",
            Direction::Outbound => "Outbound",
        }
    }

    fn short(self) -> &'static str {
        match self {
            Direction::Inbound => "in",
            Direction::Outbound => "out",
        }
    }
}

fn protocol(protocol: RuleProtocol) -> &'static str {
    match protocol {
        RuleProtocol::Tcp => "Tcp",
        RuleProtocol::Udp => "Udp",
        RuleProtocol::Icmp => "Icmp",
        RuleProtocol::All => "*",
    }
}

fn port_range(rule: &SecurityGroupRule) -> String {
    if rule.protocol == RuleProtocol::All || (rule.from_port == 0 && rule.to_port == 0) {
        "*".to_string()
    } else if rule.from_port == rule.to_port {
        rule.from_port.to_string()
    } else {
        format!("{}-{}", rule.from_port, rule.to_port)
    }
}

/// Address attribute for the remote side of a rule, as a `(key, value)` pair
fn remote_prefix(rule: &SecurityGroupRule, side: &str) -> (String, String) {
    match rule.cidr_blocks.as_slice() {
        [single] => (format!("{side}_address_prefix"), hcl::quote(single)),
        [] if rule.source_security_group.is_some() => {
            (format!("{side}_address_prefix"), hcl::quote("VirtualNetwork"))
        }
        [] => (format!("{side}_address_prefix"), hcl::quote("*")),
        many => (format!("{side}_address_prefixes"), hcl::string_list(many)),
    }
}

/// VNet with subnets, optional NAT gateway and NSGs
pub(super) fn render(
    vpc: &VpcConfig,
    subnets: Option<&SubnetConfig>,
    groups: Option<&SecurityGroupConfig>,
) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "Azure Virtual Network",
        "Address space shared by every subnet in the project.",
        &format!(
            "resource \"azurerm_virtual_network\" \"main\" {{\n{}\n  address_space       = [var.address_space]\n\n  tags = var.tags\n}}",
            placement("\"${var.project_name}-vnet\"")
        ),
    )];

    let public = subnets
        .map(|s| s.public_subnet_cidrs.as_slice())
        .unwrap_or_default();
    let private = subnets
        .map(|s| s.private_subnet_cidrs.as_slice())
        .unwrap_or_default();

    if !public.is_empty() || !private.is_empty() {
        let blocks: Vec<String> = public
            .iter()
            .enumerate()
            .map(|(i, cidr)| subnet("public", i + 1, cidr))
            .chain(
                private
                    .iter()
                    .enumerate()
                    .map(|(i, cidr)| subnet("private", i + 1, cidr)),
            )
            .collect();
        sections.push(hcl::section(
            "Subnets",
            "Public and private address ranges inside the VNet.",
            &blocks.join("\n\n"),
        ));
    }

    let nat = subnets.is_some_and(|s| s.create_nat_gateway) && !private.is_empty();
    if nat {
        let associations: Vec<String> = (1..=private.len())
            .map(|n| {
                format!(
                    "resource \"azurerm_subnet_nat_gateway_association\" \"private_{n}\" {{\n  subnet_id      = azurerm_subnet.private_{n}.id\n  nat_gateway_id = azurerm_nat_gateway.main.id\n}}"
                )
            })
            .collect();
        sections.push(hcl::section(
            "NAT Gateway",
            "Outbound internet access for the private subnets.",
            &format!("{NAT_GATEWAY}\n\n{}", associations.join("\n\n")),
        ));
    }

    if let Some(config) = groups {
        let blocks: Vec<String> = config.groups.iter().map(security_group).collect();
        if !blocks.is_empty() {
            sections.push(hcl::section(
                "Network Security Groups",
                "NSGs with priority-ordered allow rules.",
                &blocks.join("\n\n"),
            ));
        }
    }

    let variables = hcl::join_sections([
        base_variables(false),
        hcl::variable(
            "address_space",
            "Address space for the virtual network",
            "string",
            Some(&hcl::quote(&vpc.cidr_block)),
        ),
    ]);

    ModuleOutput::new(
        hcl::join_sections(sections),
        variables,
        outputs(public.len(), private.len(), nat, groups),
    )
}

fn subnet(kind: &str, n: usize, cidr: &str) -> String {
    format!(
        r#"resource "azurerm_subnet" "{kind}_{n}" {{
  name                 = "${{var.project_name}}-{kind}-{n}"
  resource_group_name  = var.resource_group_name
  virtual_network_name = azurerm_virtual_network.main.name
  address_prefixes     = [{cidr}]
}}"#,
        cidr = hcl::quote(cidr),
    )
}

fn security_group(group: &SecurityGroupDefinition) -> String {
    let id = hcl::to_terraform_id(&group.name);
    let mut blocks = vec![format!(
        "resource \"azurerm_network_security_group\" \"{id}\" {{\n{}\n\n  tags = var.tags\n}}",
        placement(&format!(
            "\"${{var.project_name}}-{}-nsg\"",
            hcl::escape_string(&group.name)
        ))
    )];

    let mut resource_ids = BTreeSet::new();
    let mut rule_names = BTreeSet::new();
    for (direction, rules) in [
        (Direction::Inbound, &group.ingress_rules),
        (Direction::Outbound, &group.egress_rules),
    ] {
        for (index, rule) in rules.iter().enumerate() {
            let label = if rule.description.trim().is_empty() {
                format!("{}-{}", direction.short(), index + 1)
            } else {
                rule.description.replace('"', "")
            };
            let resource = unique(
                &mut resource_ids,
                format!("{id}_{}_{}", direction.short(), hcl::to_terraform_id(&label)),
                "_",
            );
            let name = unique(&mut rule_names, label, "-");
            let priority = FIRST_PRIORITY + PRIORITY_STEP * index as u32;
            blocks.push(rule_block(&id, &resource, &name, priority, direction, rule));
        }
    }

    blocks.join("\n\n")
}

fn rule_block(
    nsg_id: &str,
    resource: &str,
    name: &str,
    priority: u32,
    direction: Direction,
    rule: &SecurityGroupRule,
) -> String {
    let (source, destination) = match direction {
        Direction::Inbound => (
            remote_prefix(rule, "source"),
            ("destination_address_prefix".to_string(), hcl::quote("*")),
        ),
        Direction::Outbound => (
            ("source_address_prefix".to_string(), hcl::quote("*")),
            remote_prefix(rule, "destination"),
        ),
    };
    let pairs = vec![
        ("name".to_string(), hcl::quote(name)),
        ("priority".to_string(), priority.to_string()),
        ("direction".to_string(), hcl::quote(direction.as_str())),
        ("access".to_string(), hcl::quote("Allow")),
        ("protocol".to_string(), hcl::quote(protocol(rule.protocol))),
        ("source_port_range".to_string(), hcl::quote("*")),
        ("destination_port_range".to_string(), hcl::quote(&port_range(rule))),
        source,
        destination,
        ("resource_group_name".to_string(), "var.resource_group_name".to_string()),
        (
            "network_security_group_name".to_string(),
            format!("azurerm_network_security_group.{nsg_id}.name"),
        ),
    ];
    format!(
        "resource \"azurerm_network_security_rule\" \"{resource}\" {{\n{}\n}}",
        hcl::attributes(&pairs, 2)
    )
}

fn outputs(
    public: usize,
    private: usize,
    nat: bool,
    groups: Option<&SecurityGroupConfig>,
) -> String {
    let mut sections = vec![
        hcl::output(
            "vnet_id",
            "ID of the virtual network",
            "azurerm_virtual_network.main.id",
        ),
        hcl::output(
            "vnet_name",
            "Name of the virtual network",
            "azurerm_virtual_network.main.name",
        ),
    ];

    let ids = |kind: &str, count: usize| -> Vec<String> {
        (1..=count)
            .map(|n| format!("azurerm_subnet.{kind}_{n}.id"))
            .collect()
    };
    if public > 0 {
        sections.push(hcl::output(
            "public_subnet_ids",
            "IDs of the public subnets",
            &hcl::expr_list(&ids("public", public)),
        ));
    }
    if private > 0 {
        sections.push(hcl::output(
            "private_subnet_ids",
            "IDs of the private subnets",
            &hcl::expr_list(&ids("private", private)),
        ));
    }
    if nat {
        sections.push(hcl::output(
            "nat_gateway_id",
            "ID of the NAT gateway",
            "azurerm_nat_gateway.main.id",
        ));
        sections.push(hcl::output(
            "nat_public_ip",
            "Public IP of the NAT gateway",
            "azurerm_public_ip.nat.ip_address",
        ));
    }
    if let Some(config) = groups {
        let entries: Vec<(String, String)> = config
            .groups
            .iter()
            .map(|g| {
                (
                    g.name.clone(),
                    format!(
                        "azurerm_network_security_group.{}.id",
                        hcl::to_terraform_id(&g.name)
                    ),
                )
            })
            .collect();
        sections.push(hcl::output(
            "nsg_ids",
            "Map of NSG names to IDs",
            &hcl::expr_map(&entries, 2),
        ));
    }

    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(description: &str, protocol: RuleProtocol, from: u32, to: u32) -> SecurityGroupRule {
        SecurityGroupRule {
            description: description.into(),
            from_port: from,
            to_port: to,
            protocol,
            cidr_blocks: vec!["0.0.0.0/0".into()],
            source_security_group: None,
        }
    }

    #[test]
    fn test_vnet_and_subnets() {
        let subnets = SubnetConfig {
            public_subnet_cidrs: vec!["10.0.1.0/24".into(), "10.0.2.0/24".into()],
            private_subnet_cidrs: vec!["10.0.10.0/24".into()],
            availability_zones: vec!["1".into()],
            create_nat_gateway: true,
        };
        let output = render(&VpcConfig::default(), Some(&subnets), None);
        assert!(output.main.contains("resource \"azurerm_virtual_network\" \"main\""));
        assert!(output.main.contains("resource \"azurerm_subnet\" \"public_2\""));
        assert!(output.main.contains("name                 = \"${var.project_name}-private-1\""));
        assert!(output
            .main
            .contains("resource \"azurerm_subnet_nat_gateway_association\" \"private_1\""));
        assert!(output.outputs.contains(
            "value       = [azurerm_subnet.public_1.id, azurerm_subnet.public_2.id]"
        ));
        assert!(output.outputs.contains("output \"nat_gateway_id\""));
        assert!(!output.outputs.contains("nsg_ids"));
    }

    #[test]
    fn test_nat_needs_private_subnets() {
        let subnets = SubnetConfig {
            private_subnet_cidrs: Vec::new(),
            create_nat_gateway: true,
            ..SubnetConfig::default()
        };
        let output = render(&VpcConfig::default(), Some(&subnets), None);
        assert!(!output.main.contains("azurerm_nat_gateway"));
    }

    #[test]
    fn test_nsg_rules() {
        let mut group = SecurityGroupDefinition {
            name: "web".into(),
            description: "Web".into(),
            ingress_rules: vec![
                rule("SSH", RuleProtocol::Tcp, 22, 22),
                rule("App", RuleProtocol::Tcp, 8000, 8080),
                rule("SSH", RuleProtocol::Tcp, 2222, 2222),
            ],
            egress_rules: vec![rule("All out", RuleProtocol::All, 0, 0)],
        };
        group.ingress_rules[1].cidr_blocks = vec!["10.0.0.0/16".into(), "10.1.0.0/16".into()];
        let config = SecurityGroupConfig {
            groups: vec![group],
        };
        let output = render(&VpcConfig::default(), None, Some(&config));

        assert!(output
            .main
            .contains("resource \"azurerm_network_security_group\" \"web\""));
        assert!(output
            .main
            .contains("resource \"azurerm_network_security_rule\" \"web_in_ssh\""));
        assert!(output
            .main
            .contains("resource \"azurerm_network_security_rule\" \"web_in_ssh_2\""));
        assert!(output.main.contains("name                        = \"SSH-2\""));
        assert!(output.main.contains("priority                    = 120"));
        assert!(output.main.contains("destination_port_range      = \"8000-8080\""));
        assert!(output
            .main
            .contains("source_address_prefixes     = [\"10.0.0.0/16\", \"10.1.0.0/16\"]"));
        assert!(output.main.contains("protocol                    = \"*\""));
        assert!(output.main.contains("direction                   = \"Outbound\""));
        assert!(output
            .outputs
            .contains("\"web\" = azurerm_network_security_group.web.id"));
    }

    #[test]
    fn test_rule_from_source_group() {
        let mut from_group = rule("From app", RuleProtocol::Tcp, 5432, 5432);
        from_group.cidr_blocks.clear();
        from_group.source_security_group = Some("app".into());
        assert_eq!(
            remote_prefix(&from_group, "source"),
            (
                "source_address_prefix".to_string(),
                "\"VirtualNetwork\"".to_string()
            )
        );
    }
}

use super::{base_variables, hcl, placement};
use crate::generate::{ModuleOutput, ReferenceScope};
use crate::services::Ec2Config;

const PUBLIC_IP: &str = r#"resource "azurerm_public_ip" "vm" {
  name                = "${var.project_name}-vm-pip"
  location            = var.location
  resource_group_name = var.resource_group_name
  allocation_method   = "Static"
  sku                 = "Standard"

  tags = var.tags
}"#;

const VM_TAIL: &str = r#"  network_interface_ids = [azurerm_network_interface.vm.id]

  admin_ssh_key {
    username   = var.admin_username
    public_key = var.ssh_public_key
  }

  os_disk {
    caching              = "ReadWrite"
    storage_account_type = var.os_disk_type
    disk_size_gb         = var.os_disk_size_gb
  }

  source_image_reference {
    publisher = var.image_publisher
    offer     = var.image_offer
    sku       = var.image_sku
    version   = var.image_version
  }"#;

const USER_ASSIGNED: &str = r#"  identity {
    type         = "SystemAssigned, UserAssigned"
    identity_ids = [var.managed_identity_id]
  }"#;

const SYSTEM_ASSIGNED: &str = r#"  identity {
    type = "SystemAssigned"
  }"#;

/// Azure sizes look like `Standard_B1s`; EC2 types do not carry over
fn vm_size(instance_type: &str) -> &str {
    if instance_type.starts_with("Standard_") || instance_type.starts_with("Basic_") {
        instance_type
    } else {
        "Standard_B1s"
    }
}

/// Linux VM with NIC, optional public IP and NSG association.
///
/// `user_identity` attaches the identity module's managed identity;
/// `nsg` is the NSG expression for the NIC, if any.
pub(super) fn render(
    ec2: &Ec2Config,
    user_identity: bool,
    nsg: Option<String>,
    scope: ReferenceScope<'_>,
) -> ModuleOutput {
    let mut sections = Vec::new();
    if ec2.associate_public_ip {
        sections.push(hcl::section(
            "Public IP",
            "Static public address for the VM.",
            PUBLIC_IP,
        ));
    }

    let mut ip_config = vec![
        ("name", "\"internal\""),
        ("subnet_id", "var.subnet_id"),
        ("private_ip_address_allocation", "\"Dynamic\""),
    ];
    if ec2.associate_public_ip {
        ip_config.push(("public_ip_address_id", "azurerm_public_ip.vm.id"));
    }
    let mut nic = format!(
        "resource \"azurerm_network_interface\" \"vm\" {{\n{}\n\n  ip_configuration {{\n{}\n  }}\n\n  tags = var.tags\n}}",
        placement("\"${var.project_name}-vm-nic\""),
        hcl::attributes(&ip_config, 4)
    );
    if let Some(nsg) = &nsg {
        nic.push_str(&format!(
            "\n\nresource \"azurerm_network_interface_security_group_association\" \"vm\" {{\n  network_interface_id      = azurerm_network_interface.vm.id\n  network_security_group_id = {nsg}\n}}"
        ));
    }
    sections.push(hcl::section(
        "Network Interface",
        "NIC in the configured subnet.",
        &nic,
    ));

    let head = hcl::attributes(
        &[
            ("name", "\"${var.project_name}-vm\""),
            ("resource_group_name", "var.resource_group_name"),
            ("location", "var.location"),
            ("size", "var.vm_size"),
            ("admin_username", "var.admin_username"),
        ],
        2,
    );
    let identity = if user_identity {
        USER_ASSIGNED
    } else {
        SYSTEM_ASSIGNED
    };
    sections.push(hcl::section(
        "Azure Virtual Machine",
        "Ubuntu LTS VM with SSH key authentication.",
        &format!(
            "resource \"azurerm_linux_virtual_machine\" \"main\" {{\n{head}\n\n{VM_TAIL}\n\n{identity}\n\n  tags = var.tags\n}}"
        ),
    ));

    scope.finish(
        hcl::join_sections(sections),
        variables(ec2, user_identity),
        outputs(ec2),
    )
}

fn variables(ec2: &Ec2Config, user_identity: bool) -> String {
    let mut sections = vec![
        base_variables(false),
        hcl::variable("subnet_id", "ID of the subnet for the VM", "string", None),
        hcl::variable(
            "vm_size",
            "Azure VM size",
            "string",
            Some(&hcl::quote(vm_size(&ec2.instance_type))),
        ),
        hcl::variable(
            "admin_username",
            "Admin username for the VM",
            "string",
            Some("\"azureuser\""),
        ),
        hcl::variable(
            "ssh_public_key",
            "SSH public key for the admin user",
            "string",
            None,
        ),
        hcl::variable(
            "os_disk_size_gb",
            "Size of the OS disk in GB",
            "number",
            Some(&ec2.root_volume_size.to_string()),
        ),
        hcl::variable(
            "os_disk_type",
            "Storage account type for the OS disk",
            "string",
            Some("\"StandardSSD_LRS\""),
        ),
        hcl::variable(
            "image_publisher",
            "VM image publisher",
            "string",
            Some("\"Canonical\""),
        ),
        hcl::variable(
            "image_offer",
            "VM image offer",
            "string",
            Some("\"0001-com-ubuntu-server-jammy\""),
        ),
        hcl::variable("image_sku", "VM image SKU", "string", Some("\"22_04-lts-gen2\"")),
        hcl::variable("image_version", "VM image version", "string", Some("\"latest\"")),
    ];
    if user_identity {
        sections.push(hcl::variable(
            "managed_identity_id",
            "ID of the user-assigned identity to attach",
            "string",
            None,
        ));
    }
    hcl::join_sections(sections)
}

fn outputs(ec2: &Ec2Config) -> String {
    let mut sections = vec![
        hcl::output(
            "vm_id",
            "ID of the virtual machine",
            "azurerm_linux_virtual_machine.main.id",
        ),
        hcl::output(
            "vm_name",
            "Name of the virtual machine",
            "azurerm_linux_virtual_machine.main.name",
        ),
        hcl::output(
            "private_ip",
            "Private IP address of the VM",
            "azurerm_network_interface.vm.private_ip_address",
        ),
    ];
    if ec2.associate_public_ip {
        sections.push(hcl::output(
            "public_ip",
            "Public IP address of the VM",
            "azurerm_public_ip.vm.ip_address",
        ));
    }
    sections.push(hcl::output(
        "identity_principal_id",
        "Principal ID of the VM's managed identity",
        "azurerm_linux_virtual_machine.main.identity[0].principal_id",
    ));
    hcl::join_sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{ReferenceMap, References};

    fn azure_vm() -> Ec2Config {
        Ec2Config {
            instance_type: "Standard_B2s".into(),
            root_volume_size: 30,
            ..Ec2Config::default()
        }
    }

    #[test]
    fn test_vm_with_public_ip_and_system_identity() {
        let refs = References::default();
        let output = render(&azure_vm(), false, None, ReferenceScope::new(&refs));
        assert!(output.main.contains("resource \"azurerm_public_ip\" \"vm\""));
        assert!(output
            .main
            .contains("public_ip_address_id          = azurerm_public_ip.vm.id"));
        assert!(output.main.contains("type = \"SystemAssigned\""));
        assert!(!output.main.contains("security_group_association"));
        assert!(output.variables.contains("default     = \"Standard_B2s\""));
        assert!(output.variables.contains("default     = 30"));
        assert!(!output.variables.contains("managed_identity_id"));
        assert!(output.outputs.contains("output \"public_ip\""));
    }

    #[test]
    fn test_private_vm_with_identity_and_nsg() {
        let refs = References {
            security_groups: vec!["web".into()],
            ..References::default()
        };
        let mut scope = ReferenceScope::new(&refs);
        let nsg = scope.lookup(ReferenceMap::NsgIds, "web");
        let ec2 = Ec2Config {
            associate_public_ip: false,
            ..azure_vm()
        };
        let output = render(&ec2, true, Some(nsg), scope);
        assert!(!output.main.contains("azurerm_public_ip"));
        assert!(output
            .main
            .contains("network_security_group_id = var.nsg_ids[\"web\"]"));
        assert!(output.main.contains("identity_ids = [var.managed_identity_id]"));
        assert!(output.variables.contains("variable \"nsg_ids\""));
        assert!(output.reference_maps.contains(&ReferenceMap::NsgIds));
        assert!(!output.outputs.contains("output \"public_ip\""));
    }

    #[test]
    fn test_ec2_instance_types_fall_back() {
        assert_eq!(vm_size("t3.micro"), "Standard_B1s");
        assert_eq!(vm_size("Standard_D2s_v5"), "Standard_D2s_v5");
    }
}

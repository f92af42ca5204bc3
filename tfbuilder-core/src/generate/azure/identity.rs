use super::{base_variables, hcl, placement};
use crate::generate::ModuleOutput;
use crate::services::IamConfig;

const STORAGE_ROLE: &str = r#"resource "azurerm_role_assignment" "storage_blob" {
  scope                = var.storage_account_id
  role_definition_name = "Storage Blob Data Contributor"
  principal_id         = azurerm_user_assigned_identity.main.principal_id
}"#;

const GROUP_ROLES: &str = r#"resource "azurerm_role_assignment" "contributor" {
  count                = var.enable_contributor_role ? 1 : 0
  scope                = var.resource_group_id
  role_definition_name = "Contributor"
  principal_id         = azurerm_user_assigned_identity.main.principal_id
}

resource "azurerm_role_assignment" "reader" {
  count                = var.enable_reader_role ? 1 : 0
  scope                = var.resource_group_id
  role_definition_name = "Reader"
  principal_id         = azurerm_user_assigned_identity.main.principal_id
}

resource "azurerm_role_assignment" "keyvault" {
  count                = var.key_vault_id != "" ? 1 : 0
  scope                = var.key_vault_id
  role_definition_name = "Key Vault Secrets User"
  principal_id         = azurerm_user_assigned_identity.main.principal_id
}"#;

const DEFAULT_IDENTITY_NAME: &str = "identity";

/// User-assigned managed identity with role assignments.
///
/// AWS managed policy ARNs have no Azure meaning and are not rendered.
pub(super) fn render(iam: &IamConfig, storage_access: bool) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "Azure User-Assigned Managed Identity",
        "Identity shared by the VM and Function Apps.",
        &format!(
            "resource \"azurerm_user_assigned_identity\" \"main\" {{\n{}\n\n  tags = var.tags\n}}",
            placement("var.identity_name")
        ),
    )];
    if storage_access {
        sections.push(hcl::section(
            "Storage Access",
            "Blob data access on the project storage account.",
            STORAGE_ROLE,
        ));
    }
    sections.push(hcl::section(
        "Resource Group Roles",
        "Optional Contributor, Reader and Key Vault roles.",
        GROUP_ROLES,
    ));

    let name = if iam.role_name.trim().is_empty() {
        DEFAULT_IDENTITY_NAME
    } else {
        iam.role_name.as_str()
    };
    let mut variables = vec![
        base_variables(false),
        hcl::variable(
            "identity_name",
            "Name of the managed identity",
            "string",
            Some(&hcl::quote(name)),
        ),
        hcl::variable(
            "resource_group_id",
            "ID of the resource group for role assignments",
            "string",
            None,
        ),
    ];
    if storage_access {
        variables.push(hcl::variable(
            "storage_account_id",
            "Storage account for the blob access role",
            "string",
            None,
        ));
    }
    variables.extend([
        hcl::variable(
            "key_vault_id",
            "Key Vault for the secrets access role",
            "string",
            Some("\"\""),
        ),
        hcl::variable(
            "enable_contributor_role",
            "Grant Contributor on the resource group",
            "bool",
            Some("false"),
        ),
        hcl::variable(
            "enable_reader_role",
            "Grant Reader on the resource group",
            "bool",
            Some("true"),
        ),
    ]);

    ModuleOutput::new(
        hcl::join_sections(sections),
        hcl::join_sections(variables),
        outputs(),
    )
}

fn outputs() -> String {
    let attr = |name: &str, description: &str| {
        hcl::output(
            name,
            description,
            &format!("azurerm_user_assigned_identity.main.{name}"),
        )
    };
    hcl::join_sections([
        hcl::output(
            "identity_id",
            "ID of the managed identity",
            "azurerm_user_assigned_identity.main.id",
        ),
        hcl::output(
            "identity_name",
            "Name of the managed identity",
            "azurerm_user_assigned_identity.main.name",
        ),
        attr("principal_id", "Principal ID of the managed identity"),
        attr("client_id", "Client ID of the managed identity"),
        attr("tenant_id", "Tenant ID of the managed identity"),
    ])
}

use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::S3Config;

const DEFAULT_PREFIX: &str = "storage";
/// Account names are 3-24 characters; six are taken by the random suffix
const MAX_PREFIX_LEN: usize = 18;

const SUFFIX: &str = r#"resource "random_string" "suffix" {
  length  = 6
  special = false
  upper   = false
}"#;

const CONTAINER_AND_WEBSITE: &str = r#"resource "azurerm_storage_container" "main" {
  name                  = "data"
  storage_account_id    = azurerm_storage_account.main.id
  container_access_type = "private"
}

resource "azurerm_storage_account_static_website" "main" {
  count              = var.enable_static_website ? 1 : 0
  storage_account_id = azurerm_storage_account.main.id
  index_document     = var.static_website_index
  error_404_document = var.static_website_error
}"#;

const BLOB_PROPERTIES: &str = r#"  blob_properties {
    versioning_enabled = true

    delete_retention_policy {
      days = 7
    }

    container_delete_retention_policy {
      days = 7
    }
  }"#;

/// Lowercase alphanumeric account-name prefix derived from the bucket prefix
fn account_prefix(config: &S3Config) -> String {
    let prefix: String = config
        .bucket_prefix
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_PREFIX_LEN)
        .collect();
    if prefix.len() < 3 {
        DEFAULT_PREFIX.to_string()
    } else {
        prefix
    }
}

/// Storage account with a private container and optional static website
pub(super) fn render(config: &S3Config) -> ModuleOutput {
    let mut account = vec![
        hcl::attributes(
            &[
                ("name", "\"${var.storage_account_prefix}${random_string.suffix.result}\""),
                ("resource_group_name", "var.resource_group_name"),
                ("location", "var.location"),
                ("account_tier", "var.account_tier"),
                ("account_replication_type", "var.account_replication_type"),
            ],
            2,
        ),
        hcl::attributes(
            &[
                ("min_tls_version", "\"TLS1_2\""),
                ("https_traffic_only_enabled", "true"),
                ("allow_nested_items_to_be_public", "false"),
            ],
            2,
        ),
    ];
    if config.encryption_enabled {
        account.push("  infrastructure_encryption_enabled = true".to_string());
    }
    if config.versioning_enabled {
        account.push(BLOB_PROPERTIES.to_string());
    }
    account.push("  tags = var.tags".to_string());

    let main = hcl::join_sections([
        hcl::section(
            "Azure Storage Account",
            "Account names are globally unique, so a random suffix is appended.",
            &format!(
                "{SUFFIX}\n\nresource \"azurerm_storage_account\" \"main\" {{\n{}\n}}",
                account.join("\n\n")
            ),
        ),
        hcl::section(
            "Containers",
            "Default private container and optional static website.",
            CONTAINER_AND_WEBSITE,
        ),
    ]);

    let variables = hcl::join_sections([
        base_variables(false),
        hcl::variable(
            "storage_account_prefix",
            "Lowercase alphanumeric prefix of the storage account name",
            "string",
            Some(&hcl::quote(&account_prefix(config))),
        ),
        hcl::variable(
            "account_tier",
            "Storage account tier",
            "string",
            Some("\"Standard\""),
        ),
        hcl::variable(
            "account_replication_type",
            "Storage account replication type",
            "string",
            Some("\"LRS\""),
        ),
        hcl::variable(
            "enable_static_website",
            "Enable static website hosting",
            "bool",
            Some("false"),
        ),
        hcl::variable(
            "static_website_index",
            "Index document for the static website",
            "string",
            Some("\"index.html\""),
        ),
        hcl::variable(
            "static_website_error",
            "Error document for the static website",
            "string",
            Some("\"404.html\""),
        ),
    ]);

    ModuleOutput::new(main, variables, outputs())
}

fn outputs() -> String {
    let account = |name: &str, description: &str| {
        hcl::output(
            name,
            description,
            &format!("azurerm_storage_account.main.{name}"),
        )
    };
    hcl::join_sections([
        hcl::output(
            "storage_account_id",
            "ID of the storage account",
            "azurerm_storage_account.main.id",
        ),
        hcl::output(
            "storage_account_name",
            "Name of the storage account",
            "azurerm_storage_account.main.name",
        ),
        account("primary_blob_endpoint", "Primary blob endpoint"),
        account("primary_web_endpoint", "Primary static website endpoint"),
        account("primary_web_host", "Hostname of the static website"),
        hcl::sensitive_output(
            "primary_access_key",
            "Primary access key",
            "azurerm_storage_account.main.primary_access_key",
        ),
        hcl::output(
            "container_name",
            "Name of the default container",
            "azurerm_storage_container.main.name",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_prefix() {
        let config = |prefix: &str| S3Config {
            bucket_prefix: prefix.into(),
            ..S3Config::default()
        };
        assert_eq!(account_prefix(&config("My-App")), "myapp");
        assert_eq!(account_prefix(&config("a-")), "storage");
        assert_eq!(
            account_prefix(&config("a-very-long-project-name-indeed")),
            "averylongprojectna"
        );
    }

    #[test]
    fn test_versioning_and_encryption() {
        let config = S3Config {
            bucket_prefix: "shop".into(),
            versioning_enabled: true,
            encryption_enabled: true,
        };
        let output = render(&config);
        assert!(output.main.contains("resource \"azurerm_storage_account\" \"main\""));
        assert!(output.main.contains("versioning_enabled = true"));
        assert!(output.main.contains("infrastructure_encryption_enabled = true"));
        assert!(output
            .main
            .contains("count              = var.enable_static_website ? 1 : 0"));
        assert!(output.variables.contains("default     = \"shop\""));
        assert!(output.outputs.contains("output \"primary_web_host\""));
    }

    #[test]
    fn test_plain_account() {
        let config = S3Config {
            bucket_prefix: "shop".into(),
            versioning_enabled: false,
            encryption_enabled: false,
        };
        let output = render(&config);
        assert!(!output.main.contains("blob_properties"));
        assert!(!output.main.contains("infrastructure_encryption_enabled"));
    }
}

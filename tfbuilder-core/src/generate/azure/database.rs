use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::{DbEngine, RdsConfig};

const PASSWORD: &str = r#"resource "random_password" "db_password" {
  length           = 32
  special          = true
  override_special = "!#$%&*()-_=+[]{}<>:?"
}

resource "azurerm_key_vault_secret" "db_password" {
  name         = "${var.project_name}-db-password"
  value        = random_password.db_password.result
  key_vault_id = var.key_vault_id
}"#;

const HIGH_AVAILABILITY: &str = r#"  high_availability {
    mode = "ZoneRedundant"
  }"#;

const DEFAULT_SERVER_NAME: &str = "db";
const DEFAULT_SKU: &str = "B_Standard_B1ms";

/// Flexible-server flavour for an engine
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flavor {
    Postgresql,
    Mysql,
}

impl Flavor {
    fn of(engine: DbEngine) -> Self {
        match engine {
            DbEngine::Postgres => Flavor::Postgresql,
            DbEngine::Mysql | DbEngine::Mariadb => Flavor::Mysql,
        }
    }

    fn server(self) -> &'static str {
        match self {
            Flavor::Postgresql => "azurerm_postgresql_flexible_server",
            Flavor::Mysql => "azurerm_mysql_flexible_server",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Flavor::Postgresql => "Azure Database for PostgreSQL",
            Flavor::Mysql => "Azure Database for MySQL",
        }
    }
}

/// Server version Azure accepts for the configured engine version
fn server_version(flavor: Flavor, version: &str) -> String {
    match flavor {
        Flavor::Postgresql => {
            let major = version.split('.').next().unwrap_or_default().trim();
            if major.is_empty() {
                "16".to_string()
            } else {
                major.to_string()
            }
        }
        Flavor::Mysql if version.starts_with("5.7") => "5.7".to_string(),
        Flavor::Mysql => "8.0.21".to_string(),
    }
}

/// AWS instance classes (`db.*`) have no Azure counterpart
fn sku(instance_class: &str) -> &str {
    if instance_class.trim().is_empty() || instance_class.starts_with("db.") {
        DEFAULT_SKU
    } else {
        instance_class
    }
}

/// PostgreSQL or MySQL flexible server with its admin password in Key Vault
pub(super) fn render(rds: &RdsConfig) -> ModuleOutput {
    let flavor = Flavor::of(rds.engine);
    let server = flavor.server();

    let mut pairs = vec![
        ("name", "var.server_name"),
        ("resource_group_name", "var.resource_group_name"),
        ("location", "var.location"),
        ("version", "var.engine_version"),
        (
            "delegated_subnet_id",
            "var.public_network_access || var.subnet_id == \"\" ? null : var.subnet_id",
        ),
        (
            "private_dns_zone_id",
            "var.private_dns_zone_id == \"\" ? null : var.private_dns_zone_id",
        ),
        ("administrator_login", "var.administrator_login"),
        ("administrator_password", "random_password.db_password.result"),
        ("zone", "\"1\""),
        ("sku_name", "var.sku_name"),
    ];
    if flavor == Flavor::Postgresql {
        pairs.push(("storage_mb", "var.storage_mb"));
        pairs.push(("public_network_access_enabled", "var.public_network_access"));
    }

    let mut body = vec![hcl::attributes(&pairs, 2)];
    if flavor == Flavor::Mysql {
        body.push("  storage {\n    size_gb = var.storage_mb / 1024\n  }".to_string());
    }
    if rds.multi_az {
        body.push(HIGH_AVAILABILITY.to_string());
    }
    body.push(hcl::attributes(
        &[
            ("backup_retention_days", "var.backup_retention_days"),
            ("geo_redundant_backup_enabled", "var.geo_redundant_backup"),
        ],
        2,
    ));
    body.push("  tags = var.tags".to_string());

    let server_block = format!(
        "resource \"{server}\" \"main\" {{\n{}\n}}",
        body.join("\n\n")
    );

    let database = match flavor {
        Flavor::Postgresql => r#"resource "azurerm_postgresql_flexible_server_database" "main" {
  name      = var.database_name
  server_id = azurerm_postgresql_flexible_server.main.id
  collation = "en_US.utf8"
  charset   = "UTF8"
}"#
        .to_string(),
        Flavor::Mysql => r#"resource "azurerm_mysql_flexible_database" "main" {
  name                = var.database_name
  resource_group_name = var.resource_group_name
  server_name         = azurerm_mysql_flexible_server.main.name
  charset             = "utf8mb4"
  collation           = "utf8mb4_unicode_ci"
}"#
        .to_string(),
    };

    let mut sections = vec![
        hcl::section(
            "Administrator Password",
            "Generated password, stored in Key Vault.",
            PASSWORD,
        ),
        hcl::section(
            flavor.title(),
            "Flexible server and application database.",
            &format!("{server_block}\n\n{database}"),
        ),
    ];

    if rds.publicly_accessible {
        let rule = match flavor {
            Flavor::Postgresql => "azurerm_postgresql_flexible_server_firewall_rule",
            Flavor::Mysql => "azurerm_mysql_flexible_server_firewall_rule",
        };
        let mut pairs = vec![("name", "\"AllowAzureServices\"")];
        match flavor {
            Flavor::Postgresql => {
                pairs.push(("server_id", "azurerm_postgresql_flexible_server.main.id"));
            }
            Flavor::Mysql => {
                pairs.push(("resource_group_name", "var.resource_group_name"));
                pairs.push(("server_name", "azurerm_mysql_flexible_server.main.name"));
            }
        }
        pairs.push(("start_ip_address", "\"0.0.0.0\""));
        pairs.push(("end_ip_address", "\"0.0.0.0\""));
        sections.push(hcl::section(
            "Firewall",
            "Allows connections from Azure services.",
            &format!(
                "resource \"{rule}\" \"azure_services\" {{\n{}\n}}",
                hcl::attributes(&pairs, 2)
            ),
        ));
    }

    ModuleOutput::new(hcl::join_sections(sections), variables(rds, flavor), outputs(server))
}

fn variables(rds: &RdsConfig, flavor: Flavor) -> String {
    let server_name = if rds.identifier.trim().is_empty() {
        DEFAULT_SERVER_NAME
    } else {
        rds.identifier.as_str()
    };
    hcl::join_sections([
        base_variables(false),
        hcl::variable(
            "server_name",
            "Name of the database server",
            "string",
            Some(&hcl::quote(server_name)),
        ),
        hcl::variable(
            "engine_version",
            "Database engine version",
            "string",
            Some(&hcl::quote(&server_version(flavor, &rds.engine_version))),
        ),
        hcl::variable(
            "sku_name",
            "SKU for the database server",
            "string",
            Some(&hcl::quote(sku(&rds.instance_class))),
        ),
        hcl::variable(
            "storage_mb",
            "Storage size in MB",
            "number",
            Some(&(u64::from(rds.allocated_storage) * 1024).to_string()),
        ),
        hcl::variable(
            "administrator_login",
            "Database administrator login",
            "string",
            Some(&hcl::quote(&rds.master_username)),
        ),
        hcl::variable(
            "database_name",
            "Name of the database to create",
            "string",
            Some(&hcl::quote(&rds.database_name)),
        ),
        hcl::variable(
            "backup_retention_days",
            "Backup retention period in days",
            "number",
            Some(&rds.backup_retention_period.to_string()),
        ),
        hcl::variable(
            "geo_redundant_backup",
            "Enable geo-redundant backups",
            "bool",
            Some("false"),
        ),
        hcl::variable(
            "public_network_access",
            "Enable public network access",
            "bool",
            Some(&rds.publicly_accessible.to_string()),
        ),
        hcl::variable(
            "subnet_id",
            "Delegated subnet for private access",
            "string",
            Some("\"\""),
        ),
        hcl::variable(
            "private_dns_zone_id",
            "Private DNS zone for private access",
            "string",
            Some("\"\""),
        ),
        hcl::variable(
            "key_vault_id",
            "Key Vault that stores the administrator password",
            "string",
            None,
        ),
    ])
}

fn outputs(server: &str) -> String {
    hcl::join_sections([
        hcl::output("server_id", "ID of the database server", &format!("{server}.main.id")),
        hcl::output(
            "server_fqdn",
            "FQDN of the database server",
            &format!("{server}.main.fqdn"),
        ),
        hcl::output(
            "server_name",
            "Name of the database server",
            &format!("{server}.main.name"),
        ),
        hcl::output("database_name", "Name of the database", "var.database_name"),
        hcl::output(
            "administrator_login",
            "Administrator login",
            "var.administrator_login",
        ),
        hcl::sensitive_output(
            "password_secret_id",
            "Key Vault secret ID of the administrator password",
            "azurerm_key_vault_secret.db_password.id",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_rds() -> RdsConfig {
        RdsConfig {
            identifier: "shop-db".into(),
            engine_version: "15".into(),
            instance_class: "B_Standard_B1ms".into(),
            allocated_storage: 32,
            ..RdsConfig::default()
        }
    }

    #[test]
    fn test_versions_and_skus() {
        assert_eq!(server_version(Flavor::Postgresql, "15.4"), "15");
        assert_eq!(server_version(Flavor::Postgresql, ""), "16");
        assert_eq!(server_version(Flavor::Mysql, "5.7.44"), "5.7");
        assert_eq!(server_version(Flavor::Mysql, "8.0.35"), "8.0.21");
        assert_eq!(sku("db.t3.micro"), DEFAULT_SKU);
        assert_eq!(sku("GP_Standard_D2s_v3"), "GP_Standard_D2s_v3");
    }

    #[test]
    fn test_postgres_server() {
        let rds = RdsConfig {
            multi_az: true,
            ..azure_rds()
        };
        let output = render(&rds);
        assert!(output
            .main
            .contains("resource \"azurerm_postgresql_flexible_server\" \"main\""));
        assert!(output.main.contains("mode = \"ZoneRedundant\""));
        assert!(output.main.contains("azurerm_postgresql_flexible_server_database"));
        assert!(output.variables.contains("default     = 32768"));
        assert!(output.variables.contains("default     = \"shop-db\""));
        assert!(output
            .outputs
            .contains("value       = azurerm_postgresql_flexible_server.main.fqdn"));
    }

    #[test]
    fn test_mysql_family_uses_mysql_server() {
        for engine in [DbEngine::Mysql, DbEngine::Mariadb] {
            let rds = RdsConfig {
                engine,
                engine_version: "8.0.35".into(),
                publicly_accessible: true,
                ..azure_rds()
            };
            let output = render(&rds);
            assert!(output
                .main
                .contains("resource \"azurerm_mysql_flexible_server\" \"main\""));
            assert!(output.main.contains("size_gb = var.storage_mb / 1024"));
            assert!(output
                .main
                .contains("resource \"azurerm_mysql_flexible_server_firewall_rule\" \"azure_services\""));
            assert!(!output.main.contains("high_availability"));
            assert!(output.variables.contains("\"8.0.21\""));
        }
    }
}

use super::{base_variables, hcl};
use crate::generate::{ModuleOutput, ReferenceMap, ReferenceScope};
use crate::services::{DbEngine, RdsConfig};

const SUBNET_GROUP: &str = r#"resource "aws_db_subnet_group" "main" {
  name       = "${var.project_name}-db-subnet-group"
  subnet_ids = var.subnet_ids

  tags = merge(var.tags, {
    Name = "${var.project_name}-db-subnet-group"
  })
}"#;

const PASSWORD: &str = r#"resource "random_password" "master" {
  length           = 32
  special          = true
  override_special = "!#%&*()-_=+[]<>:?"
}"#;

const SECRET: &str = r#"resource "aws_secretsmanager_secret" "db_credentials" {
  name        = "${var.project_name}/database/credentials"
  description = "Database credentials for ${var.project_name}"

  tags = merge(var.tags, {
    Name = "${var.project_name}-db-credentials"
  })
}

resource "aws_secretsmanager_secret_version" "db_credentials" {
  secret_id = aws_secretsmanager_secret.db_credentials.id
  secret_string = jsonencode({
    username = aws_db_instance.main.username
    password = random_password.master.result
    host     = aws_db_instance.main.address
    port     = aws_db_instance.main.port
    database = aws_db_instance.main.db_name
    engine   = aws_db_instance.main.engine
  })
}"#;

const DEFAULT_IDENTIFIER: &str = "app-db";

pub(super) fn port(engine: DbEngine) -> u16 {
    match engine {
        DbEngine::Postgres => 5432,
        DbEngine::Mysql | DbEngine::Mariadb => 3306,
    }
}

/// Parameter group family: major version for PostgreSQL, major.minor otherwise
pub(super) fn parameter_family(engine: DbEngine, version: &str) -> String {
    let mut parts = version.split('.');
    let major = parts.next().unwrap_or_default();
    match engine {
        DbEngine::Postgres => format!("postgres{major}"),
        DbEngine::Mysql | DbEngine::Mariadb => match parts.next() {
            Some(minor) => format!("{}{major}.{minor}", engine.as_str()),
            None => format!("{}{major}", engine.as_str()),
        },
    }
}

/// RDS instance with its subnet group, security group and credentials secret
pub(super) fn render(rds: &RdsConfig, mut scope: ReferenceScope<'_>) -> ModuleOutput {
    let allowed: Vec<String> = rds
        .allowed_security_groups
        .iter()
        .map(|name| scope.lookup(ReferenceMap::SecurityGroupIds, name))
        .collect();
    let port = port(rds.engine);

    let security_group = format!(
        r#"locals {{
  allowed_security_group_ids = {allowed}
}}

resource "aws_security_group" "rds" {{
  name        = "${{var.project_name}}-rds-sg"
  description = "Security group for RDS instance"
  vpc_id      = var.vpc_id

  tags = merge(var.tags, {{
    Name = "${{var.project_name}}-rds-sg"
  }})
}}

resource "aws_vpc_security_group_ingress_rule" "rds_ingress" {{
  count = length(local.allowed_security_group_ids)

  security_group_id            = aws_security_group.rds.id
  description                  = "Allow database access from allowed security groups"
  from_port                    = {port}
  to_port                      = {port}
  ip_protocol                  = "tcp"
  referenced_security_group_id = local.allowed_security_group_ids[count.index]
}}"#,
        allowed = hcl::expr_list(&allowed),
    );

    let parameter_group = format!(
        r#"resource "aws_db_parameter_group" "main" {{
  name   = "${{var.project_name}}-db-params"
  family = {family}

  tags = merge(var.tags, {{
    Name = "${{var.project_name}}-db-params"
  }})
}}"#,
        family = hcl::quote(&parameter_family(rds.engine, &rds.engine_version)),
    );

    let final_snapshot = if rds.skip_final_snapshot {
        String::new()
    } else {
        "\n  final_snapshot_identifier = \"${var.project_name}-db-final-snapshot\"".to_string()
    };

    let instance = format!(
        r#"resource "aws_db_instance" "main" {{
  identifier = var.db_identifier

  engine         = {engine}
  engine_version = {version}
  instance_class = var.instance_class

  allocated_storage     = var.allocated_storage
  max_allocated_storage = var.max_allocated_storage
  storage_type          = "gp3"
  storage_encrypted     = {encrypted}

  db_name  = var.database_name
  username = var.master_username
  password = random_password.master.result

  db_subnet_group_name   = aws_db_subnet_group.main.name
  vpc_security_group_ids = [aws_security_group.rds.id]
  publicly_accessible    = {public}
  multi_az               = {multi_az}

  parameter_group_name = aws_db_parameter_group.main.name

  backup_retention_period = {retention}
  backup_window           = "03:00-04:00"
  maintenance_window      = "Mon:04:00-Mon:05:00"

  deletion_protection = {protection}
  skip_final_snapshot = {skip}{final_snapshot}

  tags = merge(var.tags, {{
    Name = "${{var.project_name}}-db"
  }})
}}"#,
        engine = hcl::quote(rds.engine.as_str()),
        version = hcl::quote(&rds.engine_version),
        encrypted = rds.storage_encrypted,
        public = rds.publicly_accessible,
        multi_az = rds.multi_az,
        retention = rds.backup_retention_period,
        protection = rds.deletion_protection,
        skip = rds.skip_final_snapshot,
    );

    let main = hcl::join_sections([
        hcl::section(
            "DB Subnet Group",
            "Defines which subnets the RDS instance can be placed in.",
            SUBNET_GROUP,
        ),
        hcl::section(
            "RDS Security Group",
            "Controls access to the database instance.",
            &security_group,
        ),
        hcl::section(
            "DB Parameter Group",
            "Custom parameter group for database configuration.",
            &parameter_group,
        ),
        hcl::section(
            "Database Password",
            "Generates a random password for the master user.",
            PASSWORD,
        ),
        hcl::section("RDS Instance", "The main database instance.", &instance),
        hcl::section(
            "Secrets Manager",
            "Stores the database credentials.",
            SECRET,
        ),
    ]);

    scope.finish(main, variables(rds), outputs())
}

fn variables(rds: &RdsConfig) -> String {
    let identifier = if rds.identifier.trim().is_empty() {
        DEFAULT_IDENTIFIER
    } else {
        rds.identifier.as_str()
    };
    hcl::join_sections([
        base_variables(),
        hcl::variable("vpc_id", "ID of the VPC", "string", None),
        hcl::variable(
            "subnet_ids",
            "List of subnet IDs for the DB subnet group",
            "list(string)",
            None,
        ),
        hcl::variable(
            "db_identifier",
            "Identifier for the RDS instance",
            "string",
            Some(&hcl::quote(identifier)),
        ),
        hcl::variable(
            "instance_class",
            "RDS instance class",
            "string",
            Some(&hcl::quote(&rds.instance_class)),
        ),
        hcl::variable(
            "allocated_storage",
            "Initial allocated storage in GB",
            "number",
            Some(&rds.allocated_storage.to_string()),
        ),
        hcl::variable(
            "max_allocated_storage",
            "Maximum storage for autoscaling in GB",
            "number",
            Some(&rds.max_allocated_storage.to_string()),
        ),
        hcl::variable(
            "database_name",
            "Name of the initial database",
            "string",
            Some(&hcl::quote(&rds.database_name)),
        ),
        hcl::variable(
            "master_username",
            "Master username for the database",
            "string",
            Some(&hcl::quote(&rds.master_username)),
        ),
    ])
}

fn outputs() -> String {
    hcl::join_sections([
        hcl::output("db_instance_id", "ID of the RDS instance", "aws_db_instance.main.id"),
        hcl::output(
            "db_instance_address",
            "Address of the RDS instance",
            "aws_db_instance.main.address",
        ),
        hcl::output("db_instance_port", "Port of the RDS instance", "aws_db_instance.main.port"),
        hcl::output(
            "db_instance_endpoint",
            "Connection endpoint for the RDS instance",
            "aws_db_instance.main.endpoint",
        ),
        hcl::output("db_name", "Name of the database", "aws_db_instance.main.db_name"),
        hcl::output(
            "db_security_group_id",
            "ID of the RDS security group",
            "aws_security_group.rds.id",
        ),
        hcl::output(
            "db_credentials_secret_arn",
            "ARN of the Secrets Manager secret holding the DB credentials",
            "aws_secretsmanager_secret.db_credentials.arn",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::References;

    #[test]
    fn test_parameter_family() {
        assert_eq!(parameter_family(DbEngine::Postgres, "15.4"), "postgres15");
        assert_eq!(parameter_family(DbEngine::Mysql, "8.0.35"), "mysql8.0");
        assert_eq!(parameter_family(DbEngine::Mariadb, "10.11"), "mariadb10.11");
        assert_eq!(parameter_family(DbEngine::Mysql, "8"), "mysql8");
    }

    #[test]
    fn test_engine_port() {
        let refs = References::default();
        let postgres = render(&RdsConfig::default(), ReferenceScope::new(&refs));
        assert!(postgres.main.contains("from_port                    = 5432"));
        assert!(postgres.main.contains("family = \"postgres15\""));

        let mysql = RdsConfig {
            engine: DbEngine::Mysql,
            engine_version: "8.0.35".into(),
            ..RdsConfig::default()
        };
        let mysql = render(&mysql, ReferenceScope::new(&refs));
        assert!(mysql.main.contains("from_port                    = 3306"));
        assert!(mysql.main.contains("engine         = \"mysql\""));
    }

    #[test]
    fn test_final_snapshot_only_when_kept() {
        let refs = References::default();
        let skip = render(&RdsConfig::default(), ReferenceScope::new(&refs));
        assert!(!skip.main.contains("final_snapshot_identifier"));

        let keep = RdsConfig {
            skip_final_snapshot: false,
            ..RdsConfig::default()
        };
        let keep = render(&keep, ReferenceScope::new(&refs));
        assert!(keep.main.contains("final_snapshot_identifier"));
    }

    #[test]
    fn test_allowed_groups_resolve_by_name() {
        let refs = References {
            security_groups: vec!["web".into()],
            ..References::default()
        };
        let rds = RdsConfig {
            allowed_security_groups: vec!["web".into()],
            ..RdsConfig::default()
        };
        let output = render(&rds, ReferenceScope::new(&refs));
        assert!(output
            .main
            .contains("allowed_security_group_ids = [var.security_group_ids[\"web\"]]"));
        assert!(output.variables.contains("variable \"security_group_ids\""));
        assert!(output.reference_maps.contains(&ReferenceMap::SecurityGroupIds));
        assert!(output.variables.contains("default     = \"app-db\""));
    }
}

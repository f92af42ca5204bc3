use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::SesConfig;

const SERVICES: &str = r#"resource "azurerm_communication_service" "main" {
  name                = var.communication_service_name != "" ? var.communication_service_name : "${var.project_name}-comm"
  resource_group_name = var.resource_group_name
  data_location       = var.data_location

  tags = var.tags
}

resource "azurerm_email_communication_service" "main" {
  name                = "${var.project_name}-email"
  resource_group_name = var.resource_group_name
  data_location       = var.data_location

  tags = var.tags
}"#;

const MANAGED_DOMAIN: &str = r#"resource "azurerm_email_communication_service_domain" "managed" {
  name              = "AzureManagedDomain"
  email_service_id  = azurerm_email_communication_service.main.id
  domain_management = "AzureManaged"
}

resource "azurerm_communication_service_email_domain_association" "managed" {
  communication_service_id = azurerm_communication_service.main.id
  email_service_domain_id  = azurerm_email_communication_service_domain.managed.id
}"#;

const SMTP_NOTE: &str = "# Communication Services authenticates with connection strings rather than\n# SMTP credentials; the connection string is exported as a sensitive output.";

fn custom_domain(config: &SesConfig) -> Option<&str> {
    config
        .domain_identity
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
}

/// Communication Services with an Azure-managed domain, an optional customer
/// domain and sender usernames for the configured addresses
pub(super) fn render(config: &SesConfig) -> ModuleOutput {
    let domain = custom_domain(config);
    let mut sections = vec![
        hcl::section(
            "Azure Communication Services",
            "Communication and email services.",
            SERVICES,
        ),
        hcl::section(
            "Managed Domain",
            "Azure-managed sending domain, ready without DNS changes.",
            MANAGED_DOMAIN,
        ),
    ];

    if let Some(domain) = domain {
        sections.push(hcl::section(
            "Custom Domain",
            "Requires the DNS verification records from the outputs.",
            &format!(
                r#"resource "azurerm_email_communication_service_domain" "custom" {{
  name              = {name}
  email_service_id  = azurerm_email_communication_service.main.id
  domain_management = "CustomerManaged"
}}

resource "azurerm_communication_service_email_domain_association" "custom" {{
  communication_service_id = azurerm_communication_service.main.id
  email_service_domain_id  = azurerm_email_communication_service_domain.custom.id
}}"#,
                name = hcl::quote(domain),
            ),
        ));
    }

    let senders: Vec<String> = config
        .email_identities
        .iter()
        .filter_map(|address| sender(address, domain))
        .collect();
    if !senders.is_empty() {
        sections.push(hcl::section(
            "Sender Addresses",
            "Usernames allowed to send from the project domains.",
            &senders.join("\n\n"),
        ));
    }

    if config.create_smtp_credentials {
        sections.push(SMTP_NOTE.to_string());
    }

    let variables = hcl::join_sections([
        base_variables(true),
        hcl::variable(
            "communication_service_name",
            "Name of the Communication Service (empty derives one from the project name)",
            "string",
            Some(&hcl::quote(&config.configuration_set_name)),
        ),
        hcl::variable(
            "data_location",
            "Data location for Communication Services",
            "string",
            Some("\"United States\""),
        ),
    ]);

    ModuleOutput::new(hcl::join_sections(sections), variables, outputs(domain.is_some()))
}

/// Sender username resource for `address`. Addresses on the custom domain
/// use it; everything else sends from the managed domain.
fn sender(address: &str, domain: Option<&str>) -> Option<String> {
    let (user, host) = address.trim().split_once('@')?;
    if user.is_empty() {
        return None;
    }
    let on_custom = domain.is_some_and(|d| d.eq_ignore_ascii_case(host));
    let domain_ref = if on_custom { "custom" } else { "managed" };
    let id = hcl::to_terraform_id(&format!("{domain_ref}_{user}"));
    Some(format!(
        r#"resource "azurerm_email_communication_service_domain_sender_username" "{id}" {{
  name                    = {name}
  email_service_domain_id = azurerm_email_communication_service_domain.{domain_ref}.id
  display_name            = {name}
}}"#,
        name = hcl::quote(user),
    ))
}

fn outputs(custom: bool) -> String {
    let mut sections = vec![
        hcl::output(
            "communication_service_id",
            "ID of the Communication Service",
            "azurerm_communication_service.main.id",
        ),
        hcl::sensitive_output(
            "primary_connection_string",
            "Primary connection string of the Communication Service",
            "azurerm_communication_service.main.primary_connection_string",
        ),
        hcl::output(
            "email_service_id",
            "ID of the Email Communication Service",
            "azurerm_email_communication_service.main.id",
        ),
        hcl::output(
            "managed_sender_domain",
            "Sender domain of the Azure-managed domain",
            "azurerm_email_communication_service_domain.managed.from_sender_domain",
        ),
    ];
    if custom {
        sections.push(hcl::output(
            "custom_domain_verification_records",
            "DNS records that verify the custom domain",
            "azurerm_email_communication_service_domain.custom.verification_records",
        ));
    }
    hcl::join_sections(sections)
}

use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::SesConfig;

const DOMAIN_RECORDS: &str = r#"# Add a TXT record with aws_ses_domain_identity.main.verification_token
# to the domain's DNS before this completes
resource "aws_ses_domain_identity_verification" "main" {
  domain = aws_ses_domain_identity.main.id

  depends_on = [aws_ses_domain_identity.main]
}

resource "aws_ses_domain_dkim" "main" {
  domain = aws_ses_domain_identity.main.domain
}

resource "aws_ses_domain_mail_from" "main" {
  domain           = aws_ses_domain_identity.main.domain
  mail_from_domain = "mail.${aws_ses_domain_identity.main.domain}"
}"#;

const SEND_POLICY: &str = r#"data "aws_iam_policy_document" "ses_send" {
  statement {
    effect = "Allow"
    actions = [
      "ses:SendEmail",
      "ses:SendRawEmail",
      "ses:SendTemplatedEmail",
    ]
    resources = ["*"]

    condition {
      test     = "StringEquals"
      variable = "ses:ConfigurationSetName"
      values   = [aws_ses_configuration_set.main.name]
    }
  }
}

resource "aws_iam_policy" "ses_send" {
  name        = "${var.project_name}-ses-send"
  description = "Allows sending emails via SES"
  policy      = data.aws_iam_policy_document.ses_send.json

  tags = merge(var.tags, {
    Name = "${var.project_name}-ses-send-policy"
  })
}"#;

const SMTP_CREDENTIALS: &str = r#"data "aws_region" "current" {}

resource "aws_iam_user" "ses_smtp" {
  name = "${var.project_name}-ses-smtp"

  tags = merge(var.tags, {
    Name = "${var.project_name}-ses-smtp-user"
  })
}

resource "aws_iam_user_policy_attachment" "ses_smtp" {
  user       = aws_iam_user.ses_smtp.name
  policy_arn = aws_iam_policy.ses_send.arn
}

resource "aws_iam_access_key" "ses_smtp" {
  user = aws_iam_user.ses_smtp.name
}

resource "aws_secretsmanager_secret" "ses_smtp" {
  name        = "${var.project_name}/ses/smtp-credentials"
  description = "SES SMTP credentials for ${var.project_name}"

  tags = merge(var.tags, {
    Name = "${var.project_name}-ses-smtp-credentials"
  })
}

resource "aws_secretsmanager_secret_version" "ses_smtp" {
  secret_id = aws_secretsmanager_secret.ses_smtp.id
  secret_string = jsonencode({
    username = aws_iam_access_key.ses_smtp.id
    password = aws_iam_access_key.ses_smtp.ses_smtp_password_v4
    host     = "email-smtp.${data.aws_region.current.name}.amazonaws.com"
    port     = 587
  })
}"#;

const DEFAULT_CONFIGURATION_SET: &str = "default";

/// Non-blank domain to verify
fn domain(config: &SesConfig) -> Option<&str> {
    config
        .domain_identity
        .as_deref()
        .filter(|d| !d.trim().is_empty())
}

/// SES identities, configuration set, send policy and optional SMTP user
pub(super) fn render(config: &SesConfig) -> ModuleOutput {
    let mut sections = Vec::new();

    if let Some(domain) = domain(config) {
        sections.push(hcl::section(
            "SES Domain Identity",
            "Verifies domain ownership for sending emails.",
            &format!(
                "resource \"aws_ses_domain_identity\" \"main\" {{\n  domain = {}\n}}\n\n{DOMAIN_RECORDS}",
                hcl::quote(domain)
            ),
        ));
    }

    if !config.email_identities.is_empty() {
        let identities: Vec<String> = config
            .email_identities
            .iter()
            .enumerate()
            .map(|(index, email)| {
                format!(
                    "resource \"aws_ses_email_identity\" \"email_{index}\" {{\n  email = {}\n}}",
                    hcl::quote(email)
                )
            })
            .collect();
        sections.push(hcl::section(
            "SES Email Identities",
            "Individual email addresses verified for sending.",
            &identities.join("\n\n"),
        ));
    }

    sections.push(hcl::section(
        "SES Configuration Set",
        "Tracks email sending metrics and events.",
        &format!(
            r#"resource "aws_ses_configuration_set" "main" {{
  name = var.configuration_set_name

  reputation_metrics_enabled = true
  sending_enabled            = {}

  delivery_options {{
    tls_policy = "Require"
  }}
}}"#,
            config.enable_sending
        ),
    ));
    sections.push(hcl::section(
        "SES IAM Policy",
        "Policy allowing applications to send emails.",
        SEND_POLICY,
    ));
    if config.create_smtp_credentials {
        sections.push(hcl::section(
            "SES SMTP Credentials",
            "IAM user for SMTP authentication, with credentials kept in Secrets Manager.",
            SMTP_CREDENTIALS,
        ));
    }

    let set_name = if config.configuration_set_name.trim().is_empty() {
        DEFAULT_CONFIGURATION_SET
    } else {
        config.configuration_set_name.as_str()
    };
    let variables = hcl::join_sections([
        base_variables(),
        hcl::variable(
            "configuration_set_name",
            "Name of the SES configuration set",
            "string",
            Some(&hcl::quote(set_name)),
        ),
    ]);

    ModuleOutput::new(hcl::join_sections(sections), variables, outputs(config))
}

fn outputs(config: &SesConfig) -> String {
    let mut sections = Vec::new();
    if domain(config).is_some() {
        sections.push(hcl::output(
            "domain_identity_arn",
            "ARN of the SES domain identity",
            "aws_ses_domain_identity.main.arn",
        ));
        sections.push(hcl::sensitive_output(
            "domain_verification_token",
            "Verification token for the DNS TXT record",
            "aws_ses_domain_identity.main.verification_token",
        ));
        sections.push(hcl::output(
            "dkim_tokens",
            "DKIM tokens for DNS CNAME records",
            "aws_ses_domain_dkim.main.dkim_tokens",
        ));
    }
    sections.push(hcl::output(
        "configuration_set_name",
        "Name of the SES configuration set",
        "aws_ses_configuration_set.main.name",
    ));
    sections.push(hcl::output(
        "ses_send_policy_arn",
        "ARN of the IAM policy for sending emails",
        "aws_iam_policy.ses_send.arn",
    ));
    if config.create_smtp_credentials {
        sections.push(hcl::output(
            "smtp_credentials_secret_arn",
            "ARN of the Secrets Manager secret holding the SMTP credentials",
            "aws_secretsmanager_secret.ses_smtp.arn",
        ));
    }
    hcl::join_sections(sections)
}

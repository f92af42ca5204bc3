use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::{CloudFrontConfig, GeoRestrictionType, OriginType, ViewerProtocolPolicy};

const PROFILE: &str = r#"resource "azurerm_cdn_profile" "main" {
  name                = "${var.project_name}-cdn"
  location            = "global"
  resource_group_name = var.resource_group_name
  sku                 = var.cdn_sku

  tags = var.tags
}"#;

const COMPRESSION: &str = r#"  is_compression_enabled = true
  content_types_to_compress = [
    "application/javascript",
    "application/json",
    "application/xml",
    "text/css",
    "text/html",
    "text/javascript",
    "text/plain",
  ]"#;

const HTTPS_REDIRECT: &str = r#"  delivery_rule {
    name  = "HttpsRedirect"
    order = 1

    request_scheme_condition {
      operator     = "Equal"
      match_values = ["HTTP"]
    }

    url_redirect_action {
      redirect_type = "Found"
      protocol      = "Https"
    }
  }"#;

const DEFAULT_ORIGIN: &str = "example.com";

/// `[d.]hh:mm:ss` cache duration
fn cache_duration(seconds: u32) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    }
}

/// Origin hostname used when the root module does not wire one in
fn default_origin(config: &CloudFrontConfig) -> &str {
    match (config.origin_type, &config.custom_origin_config) {
        (OriginType::Custom, Some(custom)) if !custom.domain_name.trim().is_empty() => {
            custom.domain_name.as_str()
        }
        _ => DEFAULT_ORIGIN,
    }
}

/// CDN profile and endpoint in front of the storage website or a custom origin
pub(super) fn render(config: &CloudFrontConfig) -> ModuleOutput {
    let behavior = &config.default_cache_behavior;
    let (http_port, https_port) = config
        .custom_origin_config
        .as_ref()
        .filter(|_| config.origin_type == OriginType::Custom)
        .map_or((80, 443), |c| (c.http_port, c.https_port));

    let mut body = vec![
        hcl::attributes(
            &[
                ("name", "\"${var.project_name}-endpoint\""),
                ("profile_name", "azurerm_cdn_profile.main.name"),
                ("location", "azurerm_cdn_profile.main.location"),
                ("resource_group_name", "var.resource_group_name"),
            ],
            2,
        ),
        hcl::attributes(
            &[
                (
                    "is_http_allowed",
                    (behavior.viewer_protocol_policy == ViewerProtocolPolicy::AllowAll)
                        .to_string(),
                ),
                ("is_https_allowed", "true".to_string()),
                ("origin_host_header", "var.origin_hostname".to_string()),
                (
                    "querystring_caching_behaviour",
                    "\"IgnoreQueryString\"".to_string(),
                ),
            ],
            2,
        ),
        format!(
            "  origin {{\n    name       = \"primary\"\n    host_name  = var.origin_hostname\n    http_port  = {http_port}\n    https_port = {https_port}\n  }}"
        ),
    ];
    if behavior.compress {
        body.push(COMPRESSION.to_string());
    }
    body.push(format!(
        "  global_delivery_rule {{\n    cache_expiration_action {{\n      behavior = \"Override\"\n      duration = \"{}\"\n    }}\n  }}",
        cache_duration(behavior.default_ttl)
    ));
    if behavior.viewer_protocol_policy == ViewerProtocolPolicy::RedirectToHttps {
        body.push(HTTPS_REDIRECT.to_string());
    }
    let geo = &config.geo_restriction;
    if geo.restriction_type != GeoRestrictionType::None && !geo.locations.is_empty() {
        let action = if geo.restriction_type == GeoRestrictionType::Whitelist {
            "Allow"
        } else {
            "Block"
        };
        body.push(format!(
            "  geo_filter {{\n    relative_path = \"/\"\n    action        = \"{action}\"\n    country_codes = {}\n  }}",
            hcl::string_list(&geo.locations)
        ));
    }
    body.push("  tags = var.tags".to_string());

    let mut endpoint = format!(
        "resource \"azurerm_cdn_endpoint\" \"main\" {{\n{}\n}}",
        body.join("\n\n")
    );
    if !config.custom_error_responses.is_empty() {
        endpoint = format!(
            "# Custom error pages are served by the origin (e.g. the static website's error document)\n{endpoint}"
        );
    }

    let main = hcl::join_sections([
        hcl::section(
            "Azure CDN Profile",
            "Classic Microsoft CDN profile.",
            PROFILE,
        ),
        hcl::section(
            "CDN Endpoint",
            "Edge endpoint with caching and protocol rules.",
            &endpoint,
        ),
    ]);

    let variables = hcl::join_sections([
        base_variables(true),
        hcl::variable(
            "cdn_sku",
            "SKU for the CDN profile",
            "string",
            Some("\"Standard_Microsoft\""),
        ),
        hcl::variable(
            "origin_hostname",
            "Hostname of the origin server",
            "string",
            Some(&hcl::quote(default_origin(config))),
        ),
    ]);

    let outputs = hcl::join_sections([
        hcl::output(
            "cdn_profile_id",
            "ID of the CDN profile",
            "azurerm_cdn_profile.main.id",
        ),
        hcl::output(
            "cdn_endpoint_id",
            "ID of the CDN endpoint",
            "azurerm_cdn_endpoint.main.id",
        ),
        hcl::output(
            "cdn_endpoint_hostname",
            "Hostname of the CDN endpoint",
            "azurerm_cdn_endpoint.main.fqdn",
        ),
        hcl::output(
            "cdn_url",
            "HTTPS URL of the CDN endpoint",
            "\"https://${azurerm_cdn_endpoint.main.fqdn}\"",
        ),
    ]);

    ModuleOutput::new(main, variables, outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CustomOriginConfig, GeoRestriction};

    #[test]
    fn test_cache_duration() {
        assert_eq!(cache_duration(3_600), "01:00:00");
        assert_eq!(cache_duration(86_400), "1.00:00:00");
        assert_eq!(cache_duration(90_061), "1.01:01:01");
        assert_eq!(cache_duration(0), "00:00:00");
    }

    #[test]
    fn test_storage_origin_endpoint() {
        let config = CloudFrontConfig::default();
        let output = render(&config);
        assert!(output.main.contains("resource \"azurerm_cdn_endpoint\" \"main\""));
        assert!(output.main.contains("is_http_allowed               = false"));
        assert!(output.main.contains("duration = \"1.00:00:00\""));
        assert!(output.main.contains("name  = \"HttpsRedirect\""));
        assert!(output.main.contains("is_compression_enabled = true"));
        assert!(output.main.contains("# Custom error pages are served by the origin"));
        assert!(!output.main.contains("geo_filter"));
        assert!(!output.variables.contains("variable \"location\""));
        assert!(output.variables.contains("default     = \"example.com\""));
        assert!(output.outputs.contains("output \"cdn_url\""));
    }

    #[test]
    fn test_custom_origin_with_geo_filter() {
        let mut config = CloudFrontConfig {
            origin_type: OriginType::Custom,
            custom_origin_config: Some(CustomOriginConfig {
                domain_name: "app.example.org".into(),
                http_port: 8080,
                ..CustomOriginConfig::default()
            }),
            custom_error_responses: Vec::new(),
            geo_restriction: GeoRestriction {
                restriction_type: GeoRestrictionType::Whitelist,
                locations: vec!["US".into(), "CA".into()],
            },
            ..CloudFrontConfig::default()
        };
        config.default_cache_behavior.viewer_protocol_policy = ViewerProtocolPolicy::AllowAll;
        config.default_cache_behavior.compress = false;

        let output = render(&config);
        assert!(output.main.contains("http_port  = 8080"));
        assert!(output.main.contains("is_http_allowed               = true"));
        assert!(output.main.contains("action        = \"Allow\""));
        assert!(output.main.contains("country_codes = [\"US\", \"CA\"]"));
        assert!(!output.main.contains("HttpsRedirect"));
        assert!(!output.main.contains("is_compression_enabled"));
        assert!(!output.main.contains("Custom error pages"));
        assert!(output.variables.contains("default     = \"app.example.org\""));
    }
}

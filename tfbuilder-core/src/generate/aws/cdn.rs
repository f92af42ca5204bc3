use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::{CloudFrontConfig, GeoRestrictionType, OriginType};

const ORIGIN_ACCESS_CONTROL: &str = r#"resource "aws_cloudfront_origin_access_control" "main" {
  name                              = "${var.project_name}-oac"
  description                       = "OAC for ${var.project_name} S3 origin"
  origin_access_control_origin_type = "s3"
  signing_behavior                  = "always"
  signing_protocol                  = "sigv4"
}"#;

const CACHE_POLICY: &str = r#"data "aws_cloudfront_cache_policy" "caching_optimized" {
  name = "Managed-CachingOptimized"
}"#;

const S3_REQUEST_POLICY: &str = r#"data "aws_cloudfront_origin_request_policy" "cors_s3" {
  name = "Managed-CORS-S3Origin"
}"#;

const BUCKET_POLICY: &str = r#"data "aws_iam_policy_document" "s3_policy" {
  statement {
    sid    = "AllowCloudFrontOAC"
    effect = "Allow"

    principals {
      type        = "Service"
      identifiers = ["cloudfront.amazonaws.com"]
    }

    actions   = ["s3:GetObject"]
    resources = ["${var.s3_bucket_arn}/*"]

    condition {
      test     = "StringEquals"
      variable = "AWS:SourceArn"
      values   = [aws_cloudfront_distribution.main.arn]
    }
  }
}

resource "aws_s3_bucket_policy" "cdn" {
  bucket = var.s3_bucket_id
  policy = data.aws_iam_policy_document.s3_policy.json
}"#;

const DEFAULT_COMMENT: &str = "CDN Distribution";
const DEFAULT_ORIGIN_DOMAIN: &str = "example.com";

/// CloudFront distribution in front of the bucket or a custom origin
pub(super) fn render(config: &CloudFrontConfig) -> ModuleOutput {
    let s3_origin = config.origin_type == OriginType::S3;
    let mut sections = Vec::new();

    if s3_origin {
        sections.push(hcl::section(
            "Origin Access Control",
            "Restricts S3 bucket access to CloudFront only.",
            ORIGIN_ACCESS_CONTROL,
        ));
    }
    let policies = if s3_origin {
        format!("{CACHE_POLICY}\n\n{S3_REQUEST_POLICY}")
    } else {
        CACHE_POLICY.to_string()
    };
    sections.push(hcl::section(
        "Cache Policy",
        "Managed caching behavior for CloudFront.",
        &policies,
    ));
    sections.push(hcl::section(
        "CloudFront Distribution",
        "CDN distribution for content delivery.",
        &distribution(config),
    ));
    if s3_origin {
        sections.push(hcl::section(
            "S3 Bucket Policy",
            "Allows CloudFront to read from the S3 bucket.",
            BUCKET_POLICY,
        ));
    }

    let comment = if config.comment.trim().is_empty() {
        DEFAULT_COMMENT
    } else {
        config.comment.as_str()
    };
    let mut variables = vec![
        base_variables(),
        hcl::variable(
            "distribution_comment",
            "Comment for the CloudFront distribution",
            "string",
            Some(&hcl::quote(comment)),
        ),
    ];
    if s3_origin {
        variables.push(hcl::variable(
            "s3_bucket_id",
            "ID of the S3 bucket for the origin",
            "string",
            None,
        ));
        variables.push(hcl::variable(
            "s3_bucket_arn",
            "ARN of the S3 bucket for the origin",
            "string",
            None,
        ));
        variables.push(hcl::variable(
            "s3_bucket_regional_domain_name",
            "Regional domain name of the S3 bucket",
            "string",
            None,
        ));
    }

    ModuleOutput::new(
        hcl::join_sections(sections),
        hcl::join_sections(variables),
        outputs(),
    )
}

fn distribution(config: &CloudFrontConfig) -> String {
    let (origin_id, origin) = match config.origin_type {
        OriginType::S3 => (
            "S3Origin",
            r#"    origin_id                = "S3Origin"
    domain_name              = var.s3_bucket_regional_domain_name
    origin_access_control_id = aws_cloudfront_origin_access_control.main.id"#
                .to_string(),
        ),
        OriginType::Custom => {
            let custom = config.custom_origin_config.clone().unwrap_or_default();
            let domain = if custom.domain_name.trim().is_empty() {
                DEFAULT_ORIGIN_DOMAIN.to_string()
            } else {
                custom.domain_name.clone()
            };
            (
                "CustomOrigin",
                format!(
                    r#"    origin_id   = "CustomOrigin"
    domain_name = {domain}

    custom_origin_config {{
      http_port              = {http}
      https_port             = {https}
      origin_protocol_policy = {policy}
      origin_ssl_protocols   = ["TLSv1.2"]
    }}"#,
                    domain = hcl::quote(&domain),
                    http = custom.http_port,
                    https = custom.https_port,
                    policy = hcl::quote(custom.origin_protocol_policy.as_str()),
                ),
            )
        }
    };

    let behavior = &config.default_cache_behavior;
    let mut cache = vec![
        ("target_origin_id", hcl::quote(origin_id)),
        ("viewer_protocol_policy", hcl::quote(behavior.viewer_protocol_policy.as_str())),
        ("allowed_methods", hcl::string_list(&behavior.allowed_methods)),
        ("cached_methods", hcl::string_list(&behavior.cached_methods)),
        ("compress", behavior.compress.to_string()),
        (
            "cache_policy_id",
            "data.aws_cloudfront_cache_policy.caching_optimized.id".to_string(),
        ),
    ];
    if config.origin_type == OriginType::S3 {
        cache.push((
            "origin_request_policy_id",
            "data.aws_cloudfront_origin_request_policy.cors_s3.id".to_string(),
        ));
    }

    let errors: String = config
        .custom_error_responses
        .iter()
        .map(|err| {
            let pairs = [
                ("error_code", err.error_code.to_string()),
                ("response_code", err.response_code.to_string()),
                ("response_page_path", hcl::quote(&err.response_page_path)),
                ("error_caching_min_ttl", err.error_caching_min_ttl.to_string()),
            ];
            format!(
                "\n\n  custom_error_response {{\n{}\n  }}",
                hcl::attributes(&pairs, 4)
            )
        })
        .collect();

    let geo = &config.geo_restriction;
    let geo_body = match geo.restriction_type {
        GeoRestrictionType::None => "      restriction_type = \"none\"".to_string(),
        kind => hcl::attributes(
            &[
                ("restriction_type", hcl::quote(kind.as_str())),
                ("locations", hcl::string_list(&geo.locations)),
            ],
            6,
        ),
    };

    let head = [
        ("enabled", config.enabled.to_string()),
        ("is_ipv6_enabled", "true".to_string()),
        ("comment", "var.distribution_comment".to_string()),
        ("default_root_object", hcl::quote(&config.default_root_object)),
        ("price_class", hcl::quote(config.price_class.as_str())),
    ];

    format!(
        r#"resource "aws_cloudfront_distribution" "main" {{
{head}

  origin {{
{origin}
  }}

  default_cache_behavior {{
{cache}
  }}{errors}

  restrictions {{
    geo_restriction {{
{geo_body}
    }}
  }}

  viewer_certificate {{
    cloudfront_default_certificate = true
  }}

  tags = merge(var.tags, {{
    Name = "${{var.project_name}}-cdn"
  }})
}}"#,
        head = hcl::attributes(&head, 2),
        cache = hcl::attributes(&cache, 4),
    )
}

fn outputs() -> String {
    hcl::join_sections([
        hcl::output(
            "distribution_id",
            "ID of the CloudFront distribution",
            "aws_cloudfront_distribution.main.id",
        ),
        hcl::output(
            "distribution_arn",
            "ARN of the CloudFront distribution",
            "aws_cloudfront_distribution.main.arn",
        ),
        hcl::output(
            "distribution_domain_name",
            "Domain name of the CloudFront distribution",
            "aws_cloudfront_distribution.main.domain_name",
        ),
        hcl::output(
            "distribution_hosted_zone_id",
            "Hosted zone ID of the CloudFront distribution",
            "aws_cloudfront_distribution.main.hosted_zone_id",
        ),
    ])
}

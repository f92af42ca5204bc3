use super::{base_variables, hcl};
use crate::generate::ModuleOutput;
use crate::services::S3Config;

const BUCKET: &str = r#"resource "random_id" "bucket_suffix" {
  byte_length = 4
}

resource "aws_s3_bucket" "main" {
  bucket = "${var.bucket_prefix}-${random_id.bucket_suffix.hex}"

  tags = merge(var.tags, {
    Name = "${var.project_name}-bucket"
  })
}"#;

const VERSIONING: &str = r#"resource "aws_s3_bucket_versioning" "main" {
  bucket = aws_s3_bucket.main.id

  versioning_configuration {
    status = "Enabled"
  }
}"#;

const ENCRYPTION: &str = r#"resource "aws_s3_bucket_server_side_encryption_configuration" "main" {
  bucket = aws_s3_bucket.main.id

  rule {
    apply_server_side_encryption_by_default {
      sse_algorithm = "AES256"
    }
    bucket_key_enabled = true
  }
}"#;

const PUBLIC_ACCESS_BLOCK: &str = r#"resource "aws_s3_bucket_public_access_block" "main" {
  bucket = aws_s3_bucket.main.id

  block_public_acls       = true
  block_public_policy     = true
  ignore_public_acls      = true
  restrict_public_buckets = true
}"#;

const DEFAULT_BUCKET_PREFIX: &str = "my-app";

pub(super) fn render(s3: &S3Config) -> ModuleOutput {
    let mut sections = vec![hcl::section(
        "S3 Bucket",
        "Main storage bucket, suffixed with a random ID for a globally unique name.",
        BUCKET,
    )];
    if s3.versioning_enabled {
        sections.push(hcl::section(
            "Bucket Versioning",
            "Keeps multiple versions of objects for data protection and recovery.",
            VERSIONING,
        ));
    }
    if s3.encryption_enabled {
        sections.push(hcl::section(
            "Server-Side Encryption",
            "Encrypts all objects stored in the bucket using AES-256.",
            ENCRYPTION,
        ));
    }
    sections.push(hcl::section(
        "Public Access Block",
        "Blocks all public access to the bucket.",
        PUBLIC_ACCESS_BLOCK,
    ));

    let prefix = if s3.bucket_prefix.trim().is_empty() {
        DEFAULT_BUCKET_PREFIX
    } else {
        s3.bucket_prefix.as_str()
    };
    let variables = hcl::join_sections([
        base_variables(),
        hcl::variable(
            "bucket_prefix",
            "Prefix for the S3 bucket name, suffixed with a random ID",
            "string",
            Some(&hcl::quote(prefix)),
        ),
    ]);

    ModuleOutput::new(hcl::join_sections(sections), variables, outputs())
}

fn outputs() -> String {
    hcl::join_sections([
        hcl::output("bucket_id", "ID of the S3 bucket", "aws_s3_bucket.main.id"),
        hcl::output("bucket_arn", "ARN of the S3 bucket", "aws_s3_bucket.main.arn"),
        hcl::output("bucket_name", "Name of the S3 bucket", "aws_s3_bucket.main.bucket"),
        hcl::output(
            "bucket_domain_name",
            "Domain name of the S3 bucket",
            "aws_s3_bucket.main.bucket_domain_name",
        ),
        hcl::output(
            "bucket_regional_domain_name",
            "Regional domain name of the S3 bucket",
            "aws_s3_bucket.main.bucket_regional_domain_name",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_prefix_default() {
        let output = render(&S3Config {
            bucket_prefix: "shop-assets".into(),
            ..S3Config::default()
        });
        assert!(output.variables.contains("default     = \"shop-assets\""));
        assert!(output.main.contains("aws_s3_bucket_versioning"));
        assert!(output.main.contains("sse_algorithm = \"AES256\""));

        let blank = render(&S3Config::default());
        assert!(blank.variables.contains("default     = \"my-app\""));
    }

    #[test]
    fn test_optional_sections() {
        let output = render(&S3Config {
            bucket_prefix: String::new(),
            versioning_enabled: false,
            encryption_enabled: false,
        });
        assert!(!output.main.contains("aws_s3_bucket_versioning"));
        assert!(!output.main.contains("server_side_encryption"));
        assert!(output.main.contains("aws_s3_bucket_public_access_block"));
        assert!(output.outputs.contains("bucket_regional_domain_name"));
    }
}

//! Edit-boundary checks for free-text fields.
//!
//! Generators never call these; they render whatever they are given.

use std::sync::LazyLock;

use regex::Regex;

static PROJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{3,32}$").unwrap_or_else(|e| panic!("{e}")));
static CIDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$")
        .unwrap_or_else(|e| panic!("{e}"))
});
static BUCKET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{3,37}$").unwrap_or_else(|e| panic!("{e}")));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "invalid project name '{0}': use 3-32 lowercase letters, digits, or hyphens"
    )]
    InvalidProjectName(String),
    #[error("invalid CIDR block '{0}': expected a.b.c.d/n with octets <= 255 and n <= 32")]
    InvalidCidr(String),
    #[error(
        "invalid bucket prefix '{0}': use 3-37 lowercase letters, digits, or hyphens"
    )]
    InvalidBucketPrefix(String),
}

pub fn project_name(name: &str) -> Result<(), ValidationError> {
    if PROJECT_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidProjectName(name.to_string()))
    }
}

pub fn cidr(block: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidCidr(block.to_string());
    let caps = CIDR.captures(block).ok_or_else(invalid)?;

    for i in 1..=4 {
        let octet: u32 = caps[i].parse().map_err(|_| invalid())?;
        if octet > 255 {
            return Err(invalid());
        }
    }
    let prefix: u32 = caps[5].parse().map_err(|_| invalid())?;
    if prefix > 32 {
        return Err(invalid());
    }

    Ok(())
}

pub fn bucket_prefix(prefix: &str) -> Result<(), ValidationError> {
    if BUCKET_PREFIX.is_match(prefix) {
        Ok(())
    } else {
        Err(ValidationError::InvalidBucketPrefix(prefix.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name() {
        assert!(project_name("my-app").is_ok());
        assert!(project_name("ab").is_err());
        assert!(project_name("My-App").is_err());
        assert!(project_name(&"a".repeat(33)).is_err());
        assert!(project_name(&"a".repeat(32)).is_ok());
    }

    #[test]
    fn test_cidr() {
        assert!(cidr("10.0.0.0/16").is_ok());
        assert!(cidr("0.0.0.0/0").is_ok());
        assert!(cidr("10.0.0/16").is_err());
        assert!(cidr("10.0.0.256/24").is_err());
        assert!(cidr("10.0.0.0/33").is_err());
        assert_eq!(
            cidr("nope"),
            Err(ValidationError::InvalidCidr("nope".to_string()))
        );
    }

    #[test]
    fn test_bucket_prefix() {
        assert!(bucket_prefix("assets-2024").is_ok());
        assert!(bucket_prefix("a_b").is_err());
        assert!(bucket_prefix(&"b".repeat(38)).is_err());
    }
}

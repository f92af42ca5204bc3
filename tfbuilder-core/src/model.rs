use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cloud provider a project targets
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Aws,
    Azure,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Aws, Provider::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
        }
    }

    /// Human-readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aws => "Amazon Web Services",
            Provider::Azure => "Microsoft Azure",
        }
    }

    /// Region a fresh project starts in
    pub fn default_region(&self) -> &'static str {
        match self {
            Provider::Aws => "us-east-1",
            Provider::Azure => "eastus",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "azure" => Ok(Provider::Azure),
            _ => Err(ParseEnumError::new("provider", s)),
        }
    }
}

/// Identifier of a service the user can enable.
///
/// The same closed set is used for both providers; provider-specific meaning
/// comes from the catalog and the generator tables. Declaration order is the
/// canonical listing order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Vpc,
    Subnets,
    SecurityGroups,
    Ec2,
    Lambda,
    Rds,
    S3,
    ApiGateway,
    Sqs,
    Sns,
    Eventbridge,
    Cloudfront,
    Ses,
    Cloudwatch,
    Iam,
}

impl ServiceType {
    pub const ALL: [ServiceType; 15] = [
        ServiceType::Vpc,
        ServiceType::Subnets,
        ServiceType::SecurityGroups,
        ServiceType::Ec2,
        ServiceType::Lambda,
        ServiceType::Rds,
        ServiceType::S3,
        ServiceType::ApiGateway,
        ServiceType::Sqs,
        ServiceType::Sns,
        ServiceType::Eventbridge,
        ServiceType::Cloudfront,
        ServiceType::Ses,
        ServiceType::Cloudwatch,
        ServiceType::Iam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Vpc => "vpc",
            ServiceType::Subnets => "subnets",
            ServiceType::SecurityGroups => "security_groups",
            ServiceType::Ec2 => "ec2",
            ServiceType::Lambda => "lambda",
            ServiceType::Rds => "rds",
            ServiceType::S3 => "s3",
            ServiceType::ApiGateway => "api_gateway",
            ServiceType::Sqs => "sqs",
            ServiceType::Sns => "sns",
            ServiceType::Eventbridge => "eventbridge",
            ServiceType::Cloudfront => "cloudfront",
            ServiceType::Ses => "ses",
            ServiceType::Cloudwatch => "cloudwatch",
            ServiceType::Iam => "iam",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ServiceType::ALL
            .into_iter()
            .find(|svc| svc.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("service", s))
    }
}

/// Failed to parse a closed enum from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Display data for one service, colocated with its direct dependencies
#[derive(Clone, Debug, Serialize)]
pub struct ServiceMetadata {
    pub id: ServiceType,
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub dependencies: Vec<ServiceType>,
}

/// Named group of services for listing purposes
#[derive(Clone, Debug, Serialize)]
pub struct ServiceCategory {
    pub name: &'static str,
    pub services: Vec<ServiceType>,
}

/// A deployable region and its availability zones
#[derive(Clone, Debug, Serialize)]
pub struct Region {
    pub id: &'static str,
    pub label: &'static str,
    pub zones: &'static [&'static str],
}

/// `from` requires `to`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub from: ServiceType,
    pub to: ServiceType,
}

/// Directed "requires" graph over services.
///
/// The dependents table is derived from the forward edges when the graph is
/// built, so the two can never drift apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyGraph {
    forward: BTreeMap<ServiceType, Vec<ServiceType>>,
    reverse: BTreeMap<ServiceType, Vec<ServiceType>>,
}

impl DependencyGraph {
    pub fn new(forward: BTreeMap<ServiceType, Vec<ServiceType>>) -> Self {
        let mut reverse: BTreeMap<ServiceType, Vec<ServiceType>> =
            forward.keys().map(|svc| (*svc, Vec::new())).collect();

        for (svc, deps) in &forward {
            for dep in deps {
                let dependents = reverse.entry(*dep).or_default();
                if !dependents.contains(svc) {
                    dependents.push(*svc);
                }
            }
        }

        Self { forward, reverse }
    }

    /// Build from `(service, direct dependencies)` rows
    pub fn from_rows(rows: &[(ServiceType, &[ServiceType])]) -> Self {
        Self::new(rows.iter().map(|(svc, deps)| (*svc, deps.to_vec())).collect())
    }

    /// Direct dependencies, in declared order
    pub fn dependencies(&self, service: ServiceType) -> &[ServiceType] {
        self.forward.get(&service).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct dependents, in canonical order
    pub fn dependents(&self, service: ServiceType) -> &[ServiceType] {
        self.reverse.get(&service).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Services that appear as graph nodes
    pub fn services(&self) -> impl Iterator<Item = ServiceType> + '_ {
        self.forward.keys().copied()
    }

    pub fn contains(&self, service: ServiceType) -> bool {
        self.forward.contains_key(&service)
    }

    pub fn edges(&self) -> BTreeSet<Edge> {
        self.forward
            .iter()
            .flat_map(|(from, deps)| deps.iter().map(|to| Edge { from: *from, to: *to }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_round_trips_through_str() {
        for svc in ServiceType::ALL {
            assert_eq!(svc.as_str().parse::<ServiceType>().unwrap(), svc);
        }
        assert_eq!("api-gateway".parse::<ServiceType>().unwrap(), ServiceType::ApiGateway);
        assert!("kinesis".parse::<ServiceType>().is_err());
    }

    #[test]
    fn test_service_type_serde_names() {
        let yaml = serde_yaml::to_string(&ServiceType::SecurityGroups).unwrap();
        assert_eq!(yaml.trim(), "security_groups");
        let parsed: ServiceType = serde_yaml::from_str("api_gateway").unwrap();
        assert_eq!(parsed, ServiceType::ApiGateway);
    }

    #[test]
    fn test_provider_parse_and_defaults() {
        assert_eq!("AWS".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!("azure".parse::<Provider>().unwrap(), Provider::Azure);
        assert!("gcp".parse::<Provider>().is_err());
        assert_eq!(Provider::Azure.default_region(), "eastus");
    }

    #[test]
    fn test_dependents_are_derived_from_forward_edges() {
        let graph = DependencyGraph::from_rows(&[
            (ServiceType::Vpc, &[]),
            (ServiceType::Subnets, &[ServiceType::Vpc]),
            (ServiceType::Ec2, &[ServiceType::Vpc, ServiceType::Subnets]),
        ]);

        assert_eq!(
            graph.dependents(ServiceType::Vpc),
            &[ServiceType::Subnets, ServiceType::Ec2]
        );
        assert_eq!(graph.dependents(ServiceType::Ec2), &[] as &[ServiceType]);
        assert_eq!(graph.edges().len(), 3);
    }
}

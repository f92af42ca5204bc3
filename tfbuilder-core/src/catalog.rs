//! Compiled-in service catalogs, one per provider.
//!
//! A catalog bundles the dependency graph, display metadata, category
//! groupings and region table for a provider. Catalogs are validated the first
//! time they are touched; an invalid compiled-in table is a programming error.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::model::{
    DependencyGraph, Provider, Region, ServiceCategory, ServiceMetadata, ServiceType,
};

use ServiceType::*;

/// Catalog validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("{provider} catalog has a cyclic dependency: {}", format_cycle(.cycle))]
    CyclicDependency {
        provider: Provider,
        cycle: Vec<ServiceType>,
    },
    #[error("{provider} catalog has no metadata for service '{service}'")]
    MissingMetadata {
        provider: Provider,
        service: ServiceType,
    },
    #[error("{provider} catalog has no dependency entry for service '{service}'")]
    MissingGraphEntry {
        provider: Provider,
        service: ServiceType,
    },
    #[error("{provider} catalog lists service '{service}' in more than one category")]
    DuplicateCategoryMember {
        provider: Provider,
        service: ServiceType,
    },
    #[error("{provider} catalog does not categorize service '{service}'")]
    UncategorizedService {
        provider: Provider,
        service: ServiceType,
    },
}

fn format_cycle(cycle: &[ServiceType]) -> String {
    cycle
        .iter()
        .map(ServiceType::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// (service, name, description, color, icon)
type MetadataRow = (ServiceType, &'static str, &'static str, &'static str, &'static str);

/// Raw compiled-in tables for one provider, before validation
#[derive(Clone, Copy, Debug)]
pub struct CatalogTables {
    pub provider: Provider,
    pub dependencies: &'static [(ServiceType, &'static [ServiceType])],
    pub metadata: &'static [MetadataRow],
    pub categories: &'static [(&'static str, &'static [ServiceType])],
    pub regions: &'static [Region],
}

/// Validated catalog for one provider
#[derive(Clone, Debug)]
pub struct Catalog {
    pub provider: Provider,
    pub graph: DependencyGraph,
    pub categories: Vec<ServiceCategory>,
    pub regions: &'static [Region],
    metadata: BTreeMap<ServiceType, ServiceMetadata>,
}

impl Catalog {
    /// Build and validate the compiled-in catalog for `provider`
    pub fn build(provider: Provider) -> Result<Self, CatalogError> {
        Self::from_tables(&tables(provider))
    }

    /// Validate raw tables and assemble a catalog
    pub fn from_tables(tables: &CatalogTables) -> Result<Self, CatalogError> {
        let provider = tables.provider;
        let graph = DependencyGraph::from_rows(tables.dependencies);

        for service in ServiceType::ALL {
            if !graph.contains(service) {
                return Err(CatalogError::MissingGraphEntry { provider, service });
            }
        }

        let mut metadata = BTreeMap::new();
        for &(id, name, description, color, icon) in tables.metadata {
            metadata.insert(
                id,
                ServiceMetadata {
                    id,
                    name,
                    description,
                    color,
                    icon,
                    dependencies: graph.dependencies(id).to_vec(),
                },
            );
        }
        // Every node the graph mentions, including dependency targets
        for edge in graph.edges() {
            for service in [edge.from, edge.to] {
                if !metadata.contains_key(&service) {
                    return Err(CatalogError::MissingMetadata { provider, service });
                }
            }
        }
        for service in graph.services() {
            if !metadata.contains_key(&service) {
                return Err(CatalogError::MissingMetadata { provider, service });
            }
        }

        let mut categorized = BTreeSet::new();
        let mut categories = Vec::new();
        for &(name, services) in tables.categories {
            for service in services {
                if !categorized.insert(*service) {
                    return Err(CatalogError::DuplicateCategoryMember {
                        provider,
                        service: *service,
                    });
                }
            }
            categories.push(ServiceCategory {
                name,
                services: services.to_vec(),
            });
        }
        if let Some(service) = ServiceType::ALL.into_iter().find(|s| !categorized.contains(s)) {
            return Err(CatalogError::UncategorizedService { provider, service });
        }

        check_cycles(&graph).map_err(|cycle| CatalogError::CyclicDependency { provider, cycle })?;

        Ok(Self {
            provider,
            graph,
            categories,
            regions: tables.regions,
            metadata,
        })
    }

    pub fn metadata(&self, service: ServiceType) -> Option<&ServiceMetadata> {
        self.metadata.get(&service)
    }

    /// Display name, falling back to the identifier
    pub fn display_name(&self, service: ServiceType) -> &'static str {
        self.metadata
            .get(&service)
            .map(|m| m.name)
            .unwrap_or(service.as_str())
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Availability zones of `region`; empty for an unknown region
    pub fn zones(&self, region: &str) -> &'static [&'static str] {
        self.regions
            .iter()
            .find(|r| r.id == region)
            .map(|r| r.zones)
            .unwrap_or(&[])
    }

    /// Services in dependency order (dependencies first).
    /// Ties are broken by canonical service order.
    pub fn topological_order(&self) -> Vec<ServiceType> {
        let mut result = Vec::new();
        let mut visited = BTreeSet::new();

        fn visit(
            service: ServiceType,
            graph: &DependencyGraph,
            visited: &mut BTreeSet<ServiceType>,
            result: &mut Vec<ServiceType>,
        ) {
            if !visited.insert(service) {
                return;
            }
            for dep in graph.dependencies(service) {
                visit(*dep, graph, visited, result);
            }
            result.push(service);
        }

        for service in self.graph.services() {
            visit(service, &self.graph, &mut visited, &mut result);
        }

        result
    }
}

/// Detect a cycle with DFS, returning the offending path
pub fn check_cycles(graph: &DependencyGraph) -> Result<(), Vec<ServiceType>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        Visiting,
        Visited,
    }

    let mut states: BTreeMap<ServiceType, State> =
        graph.services().map(|s| (s, State::Unvisited)).collect();

    fn dfs(
        node: ServiceType,
        graph: &DependencyGraph,
        states: &mut BTreeMap<ServiceType, State>,
        path: &mut Vec<ServiceType>,
    ) -> Result<(), Vec<ServiceType>> {
        states.insert(node, State::Visiting);
        path.push(node);

        for dep in graph.dependencies(node) {
            match states.get(dep).copied() {
                Some(State::Visiting) => {
                    let start = path.iter().position(|n| n == dep).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(*dep);
                    return Err(cycle);
                }
                Some(State::Unvisited) | None => dfs(*dep, graph, states, path)?,
                Some(State::Visited) => {}
            }
        }

        path.pop();
        states.insert(node, State::Visited);
        Ok(())
    }

    for service in graph.services() {
        if states.get(&service) == Some(&State::Unvisited) {
            let mut path = Vec::new();
            dfs(service, graph, &mut states, &mut path)?;
        }
    }

    Ok(())
}

static AWS_CATALOG: LazyLock<Catalog> = LazyLock::new(|| load_builtin(Provider::Aws));
static AZURE_CATALOG: LazyLock<Catalog> = LazyLock::new(|| load_builtin(Provider::Azure));

fn load_builtin(provider: Provider) -> Catalog {
    match Catalog::build(provider) {
        Ok(catalog) => catalog,
        Err(e) => panic!("built-in catalog is invalid: {e}"),
    }
}

/// The validated compiled-in catalog for `provider`
pub fn catalog(provider: Provider) -> &'static Catalog {
    match provider {
        Provider::Aws => &AWS_CATALOG,
        Provider::Azure => &AZURE_CATALOG,
    }
}

/// Raw tables for `provider`
pub fn tables(provider: Provider) -> CatalogTables {
    match provider {
        Provider::Aws => CatalogTables {
            provider,
            dependencies: AWS_DEPENDENCIES,
            metadata: AWS_METADATA,
            categories: AWS_CATEGORIES,
            regions: AWS_REGIONS,
        },
        Provider::Azure => CatalogTables {
            provider,
            dependencies: AZURE_DEPENDENCIES,
            metadata: AZURE_METADATA,
            categories: AZURE_CATEGORIES,
            regions: AZURE_REGIONS,
        },
    }
}

// =============================================================================
// AWS
// =============================================================================

const AWS_DEPENDENCIES: &[(ServiceType, &[ServiceType])] = &[
    (Vpc, &[]),
    (Subnets, &[Vpc]),
    (SecurityGroups, &[Vpc]),
    (Ec2, &[Vpc, Subnets, Iam, SecurityGroups]),
    (Lambda, &[Iam]),
    (Rds, &[Vpc, Subnets, SecurityGroups]),
    (S3, &[]),
    (ApiGateway, &[Lambda, Iam]),
    (Sqs, &[Iam]),
    (Sns, &[Iam]),
    (Eventbridge, &[]),
    (Cloudfront, &[S3]),
    (Ses, &[Iam]),
    (Cloudwatch, &[]),
    (Iam, &[]),
];

const AWS_METADATA: &[MetadataRow] = &[
    (Vpc, "VPC", "Virtual Private Cloud - Isolated network environment", "#FF9900", "vpc"),
    (Subnets, "Subnets", "Public and private network segments within VPC", "#3F8624", "subnet"),
    (SecurityGroups, "Security Groups", "Virtual firewalls for network traffic control", "#DD344C", "security"),
    (Ec2, "EC2", "Elastic Compute Cloud - Virtual server instances", "#FF9900", "ec2"),
    (Lambda, "Lambda", "Serverless compute - Run code without servers", "#FF9900", "lambda"),
    (Rds, "RDS", "Relational Database Service - Managed databases", "#3B48CC", "rds"),
    (S3, "S3", "Simple Storage Service - Object storage", "#569A31", "s3"),
    (ApiGateway, "API Gateway", "HTTP API - RESTful API endpoint management", "#E7157B", "api"),
    (Sqs, "SQS", "Simple Queue Service - Message queuing", "#FF4F8B", "sqs"),
    (Sns, "SNS", "Simple Notification Service - Pub/sub messaging", "#FF4F8B", "sns"),
    (Eventbridge, "EventBridge", "Serverless event bus for application integration", "#FF4F8B", "eventbridge"),
    (Cloudfront, "CloudFront", "Content Delivery Network - Global edge caching", "#8C4FFF", "cloudfront"),
    (Ses, "SES", "Simple Email Service - Transactional email", "#DD344C", "ses"),
    (Cloudwatch, "CloudWatch", "Monitoring, logging, and alerting", "#FF4F8B", "cloudwatch"),
    (Iam, "IAM", "Identity and Access Management - Roles and policies", "#DD344C", "iam"),
];

const AWS_CATEGORIES: &[(&str, &[ServiceType])] = &[
    ("Networking", &[Vpc, Subnets, SecurityGroups]),
    ("Compute", &[Ec2, Lambda]),
    ("Database", &[Rds]),
    ("Storage", &[S3]),
    ("API", &[ApiGateway]),
    ("Messaging", &[Sqs, Sns]),
    ("Events", &[Eventbridge]),
    ("Delivery", &[Cloudfront, Ses]),
    ("Observability", &[Cloudwatch]),
    ("Identity", &[Iam]),
];

const AWS_REGIONS: &[Region] = &[
    Region {
        id: "us-east-1",
        label: "US East (N. Virginia)",
        zones: &["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1d"],
    },
    Region {
        id: "us-east-2",
        label: "US East (Ohio)",
        zones: &["us-east-2a", "us-east-2b", "us-east-2c"],
    },
    Region {
        id: "us-west-1",
        label: "US West (N. California)",
        zones: &["us-west-1a", "us-west-1b"],
    },
    Region {
        id: "us-west-2",
        label: "US West (Oregon)",
        zones: &["us-west-2a", "us-west-2b", "us-west-2c", "us-west-2d"],
    },
    Region {
        id: "eu-west-1",
        label: "EU (Ireland)",
        zones: &["eu-west-1a", "eu-west-1b", "eu-west-1c"],
    },
    Region {
        id: "eu-west-2",
        label: "EU (London)",
        zones: &["eu-west-2a", "eu-west-2b", "eu-west-2c"],
    },
    Region {
        id: "eu-central-1",
        label: "EU (Frankfurt)",
        zones: &["eu-central-1a", "eu-central-1b", "eu-central-1c"],
    },
    Region {
        id: "ap-northeast-1",
        label: "Asia Pacific (Tokyo)",
        zones: &["ap-northeast-1a", "ap-northeast-1c", "ap-northeast-1d"],
    },
    Region {
        id: "ap-southeast-1",
        label: "Asia Pacific (Singapore)",
        zones: &["ap-southeast-1a", "ap-southeast-1b", "ap-southeast-1c"],
    },
    Region {
        id: "ap-southeast-2",
        label: "Asia Pacific (Sydney)",
        zones: &["ap-southeast-2a", "ap-southeast-2b", "ap-southeast-2c"],
    },
];

// =============================================================================
// Azure
// =============================================================================

const AZURE_DEPENDENCIES: &[(ServiceType, &[ServiceType])] = &[
    (Vpc, &[]),
    (Subnets, &[Vpc]),
    (SecurityGroups, &[Vpc]),
    (Ec2, &[Vpc, Subnets, SecurityGroups]),
    (Lambda, &[Iam]),
    (Rds, &[Vpc, Subnets, SecurityGroups]),
    (S3, &[]),
    (ApiGateway, &[Iam]),
    (Sqs, &[]),
    (Sns, &[]),
    (Eventbridge, &[]),
    (Cloudfront, &[S3]),
    (Ses, &[]),
    (Cloudwatch, &[]),
    (Iam, &[]),
];

const AZURE_METADATA: &[MetadataRow] = &[
    (Vpc, "Virtual Network", "Azure Virtual Network for network isolation", "#0078D4", "network"),
    (Subnets, "Subnets", "Subnet segmentation within VNet", "#50E6FF", "subnet"),
    (SecurityGroups, "Network Security Groups", "NSG rules for traffic filtering", "#E74856", "security"),
    (Ec2, "Virtual Machines", "Azure VMs for compute workloads", "#008272", "compute"),
    (Lambda, "Azure Functions", "Serverless compute service", "#FFCC00", "function"),
    (Rds, "Azure Database", "Managed PostgreSQL, MySQL, MariaDB", "#0063B1", "database"),
    (S3, "Storage Account", "Blob, File, Queue, Table storage", "#FF8C00", "storage"),
    (ApiGateway, "API Management", "API gateway and management", "#68217A", "api"),
    (Sqs, "Service Bus Queue", "Message queuing service", "#C239B3", "queue"),
    (Sns, "Service Bus Topic", "Pub/sub messaging with topics", "#E81123", "topic"),
    (Eventbridge, "Event Grid", "Event-driven architecture", "#00BCF2", "event"),
    (Cloudfront, "Azure CDN", "Content delivery network", "#773ADC", "cdn"),
    (Ses, "Communication Services", "Email and SMS services", "#00A4EF", "email"),
    (Cloudwatch, "Azure Monitor", "Monitoring and alerting", "#107C10", "monitor"),
    (Iam, "Managed Identity", "Identity and access management", "#FFB900", "identity"),
];

const AZURE_CATEGORIES: &[(&str, &[ServiceType])] = &[
    ("Networking", &[Vpc, Subnets, SecurityGroups]),
    ("Compute", &[Ec2, Lambda]),
    ("Database", &[Rds]),
    ("Storage", &[S3]),
    ("API", &[ApiGateway]),
    ("Messaging", &[Sqs, Sns, Eventbridge]),
    ("Delivery", &[Cloudfront, Ses]),
    ("Observability", &[Cloudwatch]),
    ("Identity", &[Iam]),
];

const AZURE_ZONES: &[&str] = &["1", "2", "3"];

const AZURE_REGIONS: &[Region] = &[
    Region { id: "eastus", label: "East US", zones: AZURE_ZONES },
    Region { id: "eastus2", label: "East US 2", zones: AZURE_ZONES },
    Region { id: "westus", label: "West US", zones: AZURE_ZONES },
    Region { id: "westus2", label: "West US 2", zones: AZURE_ZONES },
    Region { id: "westus3", label: "West US 3", zones: AZURE_ZONES },
    Region { id: "centralus", label: "Central US", zones: AZURE_ZONES },
    Region { id: "northeurope", label: "North Europe (Ireland)", zones: AZURE_ZONES },
    Region { id: "westeurope", label: "West Europe (Netherlands)", zones: AZURE_ZONES },
    Region { id: "uksouth", label: "UK South", zones: AZURE_ZONES },
    Region { id: "ukwest", label: "UK West", zones: AZURE_ZONES },
    Region { id: "germanywestcentral", label: "Germany West Central", zones: AZURE_ZONES },
    Region { id: "francecentral", label: "France Central", zones: AZURE_ZONES },
    Region { id: "japaneast", label: "Japan East", zones: AZURE_ZONES },
    Region { id: "japanwest", label: "Japan West", zones: AZURE_ZONES },
    Region { id: "southeastasia", label: "Southeast Asia (Singapore)", zones: AZURE_ZONES },
    Region { id: "australiaeast", label: "Australia East", zones: AZURE_ZONES },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogs_are_valid() {
        for provider in Provider::ALL {
            let catalog = Catalog::build(provider).unwrap();
            assert_eq!(catalog.provider, provider);
            for service in ServiceType::ALL {
                assert!(catalog.metadata(service).is_some(), "{provider}: {service}");
            }
        }
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        for provider in Provider::ALL {
            let catalog = catalog(provider);
            let order = catalog.topological_order();
            assert_eq!(order.len(), ServiceType::ALL.len());

            for (pos, service) in order.iter().enumerate() {
                for dep in catalog.graph.dependencies(*service) {
                    let dep_pos = order.iter().position(|s| s == dep).unwrap();
                    assert!(dep_pos < pos, "{provider}: {dep} must precede {service}");
                }
            }
        }
    }

    #[test]
    fn test_cyclic_dependency_detection() {
        const CYCLIC: &[(ServiceType, &[ServiceType])] = &[
            (Vpc, &[Iam]),
            (Subnets, &[Vpc]),
            (SecurityGroups, &[Vpc]),
            (Ec2, &[]),
            (Lambda, &[]),
            (Rds, &[]),
            (S3, &[]),
            (ApiGateway, &[]),
            (Sqs, &[]),
            (Sns, &[]),
            (Eventbridge, &[]),
            (Cloudfront, &[]),
            (Ses, &[]),
            (Cloudwatch, &[]),
            (Iam, &[Subnets]),
        ];
        let tables = CatalogTables {
            dependencies: CYCLIC,
            ..tables(Provider::Aws)
        };

        match Catalog::from_tables(&tables) {
            Err(CatalogError::CyclicDependency { cycle, .. }) => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&Iam));
                assert!(cycle.contains(&Subnets));
            }
            other => panic!("expected cycle, got {:?}", other.map(|c| c.provider)),
        }
    }

    #[test]
    fn test_missing_metadata_is_rejected() {
        let tables = CatalogTables {
            metadata: &AWS_METADATA[..14],
            ..tables(Provider::Aws)
        };
        assert!(matches!(
            Catalog::from_tables(&tables),
            Err(CatalogError::MissingMetadata { service: Iam, .. })
        ));
    }

    #[test]
    fn test_uncategorized_service_is_rejected() {
        let tables = CatalogTables {
            categories: &AWS_CATEGORIES[..9],
            ..tables(Provider::Aws)
        };
        assert!(matches!(
            Catalog::from_tables(&tables),
            Err(CatalogError::UncategorizedService { service: Iam, .. })
        ));
    }

    #[test]
    fn test_provider_specific_edges() {
        let aws = catalog(Provider::Aws);
        let azure = catalog(Provider::Azure);

        assert!(aws.graph.dependencies(Ec2).contains(&Iam));
        assert!(!azure.graph.dependencies(Ec2).contains(&Iam));
        assert_eq!(aws.graph.dependencies(ApiGateway), &[Lambda, Iam]);
        assert_eq!(azure.graph.dependencies(ApiGateway), &[Iam]);
        assert!(azure.graph.dependencies(Sqs).is_empty());
    }

    #[test]
    fn test_metadata_dependencies_match_graph() {
        let aws = catalog(Provider::Aws);
        let meta = aws.metadata(Rds).unwrap();
        assert_eq!(meta.name, "RDS");
        assert_eq!(meta.dependencies, vec![Vpc, Subnets, SecurityGroups]);
    }

    #[test]
    fn test_region_zones() {
        let aws = catalog(Provider::Aws);
        assert_eq!(aws.zones("us-west-1"), &["us-west-1a", "us-west-1b"]);
        assert!(aws.zones("mars-1").is_empty());

        let azure = catalog(Provider::Azure);
        assert_eq!(azure.zones("westeurope"), &["1", "2", "3"]);
        assert!(azure.region(Provider::Azure.default_region()).is_some());
    }
}

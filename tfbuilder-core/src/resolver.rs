//! Closure queries over a provider's dependency graph.
//!
//! All functions are pure. The graph is acyclic once it has passed catalog
//! validation, so every closure terminates.

use std::collections::{BTreeSet, VecDeque};

use crate::model::{DependencyGraph, ServiceType};

/// Breadth-first closure following `next` from `start`, excluding `start`
fn closure<'g, F>(start: ServiceType, next: F) -> BTreeSet<ServiceType>
where
    F: Fn(ServiceType) -> &'g [ServiceType],
{
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<ServiceType> = next(start).iter().copied().collect();

    while let Some(service) = queue.pop_front() {
        if service == start || !seen.insert(service) {
            continue;
        }
        queue.extend(next(service).iter().copied());
    }

    seen
}

/// Everything `service` needs, directly or indirectly
pub fn transitive_dependencies(graph: &DependencyGraph, service: ServiceType) -> BTreeSet<ServiceType> {
    closure(service, |s| graph.dependencies(s))
}

/// Everything that needs `service`, directly or indirectly
pub fn transitive_dependents(graph: &DependencyGraph, service: ServiceType) -> BTreeSet<ServiceType> {
    closure(service, |s| graph.dependents(s))
}

/// True iff every direct dependency of `service` is enabled
pub fn dependencies_satisfied(
    graph: &DependencyGraph,
    service: ServiceType,
    enabled: &BTreeSet<ServiceType>,
) -> bool {
    graph
        .dependencies(service)
        .iter()
        .all(|dep| enabled.contains(dep))
}

/// Transitive dependencies of `service` that are not enabled
pub fn missing_dependencies(
    graph: &DependencyGraph,
    service: ServiceType,
    enabled: &BTreeSet<ServiceType>,
) -> BTreeSet<ServiceType> {
    transitive_dependencies(graph, service)
        .difference(enabled)
        .copied()
        .collect()
}

/// Enabled services that would be cascaded away by disabling `service`
pub fn affected_by_disabling(
    graph: &DependencyGraph,
    service: ServiceType,
    enabled: &BTreeSet<ServiceType>,
) -> BTreeSet<ServiceType> {
    transitive_dependents(graph, service)
        .intersection(enabled)
        .copied()
        .collect()
}

/// `services` together with all of their transitive dependencies
pub fn dependency_closure<I>(graph: &DependencyGraph, services: I) -> BTreeSet<ServiceType>
where
    I: IntoIterator<Item = ServiceType>,
{
    let mut result = BTreeSet::new();
    for service in services {
        if result.insert(service) {
            result.extend(transitive_dependencies(graph, service));
        }
    }
    result
}

/// First enabled service whose dependencies are not all enabled, with what it lacks
pub fn first_unsatisfied(
    graph: &DependencyGraph,
    enabled: &BTreeSet<ServiceType>,
) -> Option<(ServiceType, BTreeSet<ServiceType>)> {
    enabled.iter().find_map(|service| {
        let missing = missing_dependencies(graph, *service, enabled);
        (!missing.is_empty()).then_some((*service, missing))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::model::Provider;
    use proptest::prelude::*;
    use ServiceType::*;

    fn set(services: &[ServiceType]) -> BTreeSet<ServiceType> {
        services.iter().copied().collect()
    }

    #[test]
    fn test_ec2_transitive_dependencies_on_aws() {
        let graph = &catalog(Provider::Aws).graph;
        assert_eq!(
            transitive_dependencies(graph, Ec2),
            set(&[Vpc, Subnets, SecurityGroups, Iam])
        );
        assert!(transitive_dependencies(graph, Vpc).is_empty());
    }

    #[test]
    fn test_iam_dependents_differ_by_provider() {
        let aws = transitive_dependents(&catalog(Provider::Aws).graph, Iam);
        assert_eq!(aws, set(&[Ec2, Lambda, ApiGateway, Sqs, Sns, Ses]));

        let azure = transitive_dependents(&catalog(Provider::Azure).graph, Iam);
        assert_eq!(azure, set(&[Lambda, ApiGateway]));
    }

    #[test]
    fn test_satisfied_and_missing() {
        let graph = &catalog(Provider::Aws).graph;
        let enabled = set(&[Vpc, Subnets, Iam]);

        assert!(!dependencies_satisfied(graph, Ec2, &enabled));
        assert_eq!(missing_dependencies(graph, Ec2, &enabled), set(&[SecurityGroups]));
        assert!(dependencies_satisfied(graph, Lambda, &enabled));
        assert!(dependencies_satisfied(graph, S3, &BTreeSet::new()));
    }

    #[test]
    fn test_affected_by_disabling_only_reports_enabled() {
        let graph = &catalog(Provider::Aws).graph;
        let enabled = set(&[Iam, Lambda, ApiGateway, S3]);

        assert_eq!(affected_by_disabling(graph, Lambda, &enabled), set(&[ApiGateway]));
        assert_eq!(affected_by_disabling(graph, Iam, &enabled), set(&[Lambda, ApiGateway]));
        assert!(affected_by_disabling(graph, S3, &enabled).is_empty());
    }

    #[test]
    fn test_first_unsatisfied() {
        let graph = &catalog(Provider::Aws).graph;
        assert_eq!(first_unsatisfied(graph, &set(&[Vpc, Subnets])), None);
        assert_eq!(
            first_unsatisfied(graph, &set(&[Cloudfront])),
            Some((Cloudfront, set(&[S3])))
        );
    }

    fn provider_strategy() -> impl Strategy<Value = Provider> {
        prop_oneof![Just(Provider::Aws), Just(Provider::Azure)]
    }

    fn services_strategy() -> impl Strategy<Value = Vec<ServiceType>> {
        prop::collection::vec(prop::sample::select(ServiceType::ALL.to_vec()), 0..8)
    }

    proptest! {
        #[test]
        fn test_dependency_closure_is_closed(provider in provider_strategy(), services in services_strategy()) {
            let graph = &catalog(provider).graph;
            let closed = dependency_closure(graph, services.iter().copied());

            for service in &services {
                prop_assert!(closed.contains(service));
            }
            for service in &closed {
                prop_assert!(dependencies_satisfied(graph, *service, &closed));
            }
            prop_assert_eq!(first_unsatisfied(graph, &closed), None);
        }

        #[test]
        fn test_dependents_mirror_dependencies(provider in provider_strategy(), service in prop::sample::select(ServiceType::ALL.to_vec())) {
            let graph = &catalog(provider).graph;
            for dep in transitive_dependencies(graph, service) {
                prop_assert!(transitive_dependents(graph, dep).contains(&service));
            }
            prop_assert!(!transitive_dependencies(graph, service).contains(&service));
        }
    }
}

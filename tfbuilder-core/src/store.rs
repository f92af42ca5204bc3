use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::catalog;
use crate::config::{ProjectConfig, ProjectFile};
use crate::generate::{GeneratedProject, MemoizedGenerator};
use crate::model::{DependencyGraph, Provider, ServiceType};
use crate::patch::ServicePatch;
use crate::reducer::{ProjectEvent, reduce};
use crate::resolver;
use crate::services::ServiceConfig;
use crate::state::ProjectState;

/// Single owner of the project being edited.
///
/// Every mutation goes through [`reduce`], so the service selection stays
/// closed under the provider's dependency graph after each call.
#[derive(Debug, Default)]
pub struct ProjectStore {
    state: ProjectState,
    generator: MemoizedGenerator,
}

impl ProjectStore {
    pub fn new(provider: Provider) -> Self {
        Self::from_state(ProjectState::new(provider))
    }

    pub fn from_state(state: ProjectState) -> Self {
        Self {
            state,
            generator: MemoizedGenerator::new(),
        }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.state.project
    }

    pub fn selected_template(&self) -> Option<&str> {
        self.state.selected_template.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    pub fn to_file(&self) -> ProjectFile {
        self.state.to_file()
    }

    /// Apply one event; returns whether the state changed
    pub fn dispatch(&mut self, event: ProjectEvent) -> bool {
        reduce(&mut self.state, &event)
    }

    pub fn set_provider(&mut self, provider: Provider) -> bool {
        self.dispatch(ProjectEvent::SetProvider { provider })
    }

    pub fn update_project_name(&mut self, name: impl Into<String>) -> bool {
        self.dispatch(ProjectEvent::UpdateProjectName { name: name.into() })
    }

    pub fn update_region(&mut self, region: impl Into<String>) -> bool {
        self.dispatch(ProjectEvent::UpdateRegion {
            region: region.into(),
        })
    }

    pub fn update_environment(&mut self, environment: impl Into<String>) -> bool {
        self.dispatch(ProjectEvent::UpdateEnvironment {
            environment: environment.into(),
        })
    }

    pub fn update_tags(&mut self, tags: BTreeMap<String, String>) -> bool {
        self.dispatch(ProjectEvent::UpdateTags { tags })
    }

    pub fn set_resource_group(&mut self, resource_group: Option<String>) -> bool {
        self.dispatch(ProjectEvent::SetResourceGroup { resource_group })
    }

    /// Enable `service` with its dependencies, or disable it with its dependents
    pub fn toggle_service(&mut self, service: ServiceType, enabled: bool) -> bool {
        self.dispatch(ProjectEvent::ToggleService { service, enabled })
    }

    /// Merge `patch` into its service's config. No-op when that service is disabled.
    pub fn update_service_config(&mut self, patch: ServicePatch) -> bool {
        self.dispatch(ProjectEvent::UpdateServiceConfig { patch })
    }

    pub fn load_template(&mut self, id: impl Into<String>) -> bool {
        self.dispatch(ProjectEvent::LoadTemplate { id: id.into() })
    }

    pub fn reset_project(&mut self) -> bool {
        self.dispatch(ProjectEvent::ResetProject)
    }

    pub fn is_service_enabled(&self, service: ServiceType) -> bool {
        self.state.project.services.is_enabled(service)
    }

    pub fn service_config(&self, service: ServiceType) -> Option<ServiceConfig> {
        self.state.project.services.get(service)
    }

    pub fn enabled_services(&self) -> Vec<ServiceType> {
        self.state.project.enabled_services()
    }

    /// Enabled services that disabling `service` would remove
    pub fn service_dependents(&self, service: ServiceType) -> BTreeSet<ServiceType> {
        resolver::affected_by_disabling(self.graph(), service, &self.enabled_set())
    }

    /// Dependencies enabling `service` would pull in
    pub fn missing_dependencies(&self, service: ServiceType) -> BTreeSet<ServiceType> {
        resolver::missing_dependencies(self.graph(), service, &self.enabled_set())
    }

    /// Generated file tree for the current project, rebuilt only after changes
    pub fn generated(&mut self) -> &GeneratedProject {
        self.generator.generate(&self.state.project)
    }

    fn graph(&self) -> &'static DependencyGraph {
        &catalog(self.state.project.provider).graph
    }

    fn enabled_set(&self) -> BTreeSet<ServiceType> {
        self.enabled_services().into_iter().collect()
    }
}

impl From<ProjectFile> for ProjectStore {
    fn from(file: ProjectFile) -> Self {
        Self::from_state(file.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::file_by_path;
    use crate::resolver::first_unsatisfied;
    use proptest::prelude::*;
    use ServiceType::*;

    #[test]
    fn test_enable_reports_dependencies_first() {
        let mut store = ProjectStore::new(Provider::Aws);
        assert_eq!(
            store.missing_dependencies(Ec2),
            BTreeSet::from([Vpc, Subnets, SecurityGroups, Iam])
        );
        assert!(store.toggle_service(Ec2, true));
        assert!(store.missing_dependencies(Ec2).is_empty());
        assert!(store.is_service_enabled(Iam));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_dependents_preview_matches_disable() {
        let mut store = ProjectStore::new(Provider::Aws);
        store.toggle_service(ApiGateway, true);
        let dependents = store.service_dependents(Iam);
        assert!(dependents.contains(&Lambda));
        assert!(dependents.contains(&ApiGateway));

        store.toggle_service(Iam, false);
        for service in dependents {
            assert!(!store.is_service_enabled(service));
        }
        assert!(!store.toggle_service(Iam, false));
    }

    #[test]
    fn test_generated_is_memoized_until_change() {
        let mut store = ProjectStore::new(Provider::Aws);
        store.toggle_service(S3, true);
        let first = store.generated().clone();
        assert!(file_by_path(&first, "modules/storage/main.tf").is_some());
        assert_eq!(store.generated(), &first);

        store.update_project_name("shop");
        let second = store.generated();
        assert_ne!(second, &first);
        assert!(file_by_path(second, "variables.tf")
            .is_some_and(|f| f.content.contains("\"shop\"")));
    }

    #[test]
    fn test_template_then_edit_clears_marker() {
        let mut store = ProjectStore::new(Provider::Aws);
        assert!(store.load_template("serverless-api"));
        assert_eq!(store.selected_template(), Some("serverless-api"));

        let patch = ServicePatch::from_yaml(Lambda, "functions: []").unwrap();
        assert!(store.update_service_config(patch));
        assert_eq!(store.selected_template(), None);

        store.reset_project();
        assert!(store.enabled_services().is_empty());
    }

    #[test]
    fn test_round_trip_through_project_file() {
        let mut store = ProjectStore::new(Provider::Azure);
        store.load_template("simple-web");
        let yaml = store.to_file().to_yaml().unwrap();
        let restored = ProjectStore::from(ProjectFile::from_str(&yaml).unwrap());
        assert_eq!(restored.project(), store.project());
        assert_eq!(restored.selected_template(), store.selected_template());
    }

    fn action_strategy() -> impl Strategy<Value = (ServiceType, bool)> {
        (prop::sample::select(ServiceType::ALL.to_vec()), any::<bool>())
    }

    proptest! {
        #[test]
        fn test_toggle_sequences_stay_closed(
            azure in any::<bool>(),
            actions in prop::collection::vec(action_strategy(), 0..24),
        ) {
            let provider = if azure { Provider::Azure } else { Provider::Aws };
            let mut store = ProjectStore::new(provider);
            let graph = &catalog(provider).graph;

            for (service, enabled) in actions {
                store.toggle_service(service, enabled);
                prop_assert_eq!(store.is_service_enabled(service), enabled);
                let enabled_set: BTreeSet<_> = store.enabled_services().into_iter().collect();
                prop_assert_eq!(first_unsatisfied(graph, &enabled_set), None);
            }
        }
    }
}

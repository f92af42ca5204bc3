use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::catalog::catalog;
use crate::config::ENVIRONMENT_TAG;
use crate::defaults::{DerivedNames, default_config, default_project};
use crate::model::{Provider, ServiceType};
use crate::patch::ServicePatch;
use crate::resolver;
use crate::services::{OriginType, ServiceSelection};
use crate::state::ProjectState;
use crate::templates::template;

/// One mutation of the project
#[derive(Clone, Debug)]
pub enum ProjectEvent {
    SetProvider { provider: Provider },
    UpdateProjectName { name: String },
    UpdateRegion { region: String },
    UpdateEnvironment { environment: String },
    UpdateTags { tags: BTreeMap<String, String> },
    SetResourceGroup { resource_group: Option<String> },
    ToggleService { service: ServiceType, enabled: bool },
    UpdateServiceConfig { patch: ServicePatch },
    LoadTemplate { id: String },
    ResetProject,
}

/// Apply `event` to `state`. Returns whether anything changed.
pub fn reduce(state: &mut ProjectState, event: &ProjectEvent) -> bool {
    let before = (state.project.clone(), state.selected_template.clone());

    match event {
        ProjectEvent::SetProvider { provider } => set_provider(state, *provider),
        ProjectEvent::UpdateProjectName { name } => update_project_name(state, name),
        ProjectEvent::UpdateRegion { region } => update_region(state, region),
        ProjectEvent::UpdateEnvironment { environment } => {
            state.project.environment = environment.clone();
            state
                .project
                .tags
                .insert(ENVIRONMENT_TAG.to_string(), environment.clone());
        }
        ProjectEvent::UpdateTags { tags } => state.project.tags = tags.clone(),
        ProjectEvent::SetResourceGroup { resource_group } => {
            state.project.resource_group = resource_group.clone();
        }
        ProjectEvent::ToggleService { service, enabled } => {
            if *enabled {
                enable_service(state, *service);
            } else {
                disable_service(state, *service);
            }
        }
        ProjectEvent::UpdateServiceConfig { patch } => {
            if patch.apply_to_selection(&mut state.project.services) {
                state.selected_template = None;
            } else {
                debug!(service = %patch.service_type(), "config update skipped, service disabled");
            }
        }
        ProjectEvent::LoadTemplate { id } => load_template(state, id),
        ProjectEvent::ResetProject => {
            state.project = default_project(state.project.provider);
            state.selected_template = None;
        }
    }

    let changed = before.0 != state.project || before.1 != state.selected_template;
    if changed {
        state.revision += 1;
    }
    changed
}

fn set_provider(state: &mut ProjectState, provider: Provider) {
    let project = &mut state.project;
    project.provider = provider;
    project.region = provider.default_region().to_string();
    project.resource_group = match provider {
        Provider::Azure => Some(format!("rg-{}", project.name)),
        Provider::Aws => None,
    };
    project.services = ServiceSelection::default();
    state.selected_template = None;
    info!(%provider, "switched provider, services reset");
}

fn update_project_name(state: &mut ProjectState, name: &str) {
    let provider = state.project.provider;
    let old = DerivedNames::for_project(provider, &state.project.name);
    let new = DerivedNames::for_project(provider, name);

    state.project.name = name.to_string();
    new.rederive(&old, &mut state.project.services);
}

fn update_region(state: &mut ProjectState, region: &str) {
    let project = &mut state.project;
    project.region = region.to_string();

    let zones = catalog(project.provider).zones(region);
    let Some(subnets) = project.services.subnets.as_mut() else {
        return;
    };
    if zones.is_empty() {
        debug!(region, "no zone table for region, keeping availability zones");
        return;
    }

    subnets
        .availability_zones
        .retain(|az| zones.contains(&az.as_str()));
    if subnets.availability_zones.is_empty() {
        subnets.availability_zones.push(zones[0].to_string());
    }
}

fn enable_service(state: &mut ProjectState, service: ServiceType) {
    let project = &mut state.project;
    if project.services.is_enabled(service) {
        debug!(%service, "already enabled");
        return;
    }

    let provider = project.provider;
    let graph = &catalog(provider).graph;
    let services = &mut project.services;

    services.set(default_config(provider, service, &project.name));
    for dep in resolver::transitive_dependencies(graph, service) {
        if !services.is_enabled(dep) {
            debug!(%service, dependency = %dep, "cascade enable");
            services.set(default_config(provider, dep, &project.name));
        }
    }

    if service == ServiceType::S3 && (services.ec2.is_some() || services.lambda.is_some()) {
        if let Some(iam) = services.iam.as_mut() {
            iam.s3_access = true;
        }
    }

    let storage_origin = services
        .cloudfront
        .as_ref()
        .is_some_and(|cdn| cdn.origin_type == OriginType::S3);
    if service == ServiceType::Cloudfront && storage_origin && services.s3.is_none() {
        services.set(default_config(provider, ServiceType::S3, &project.name));
    }

    state.selected_template = None;
}

fn disable_service(state: &mut ProjectState, service: ServiceType) {
    let project = &mut state.project;
    if !project.services.is_enabled(service) {
        debug!(%service, "already disabled");
        return;
    }

    let graph = &catalog(project.provider).graph;
    let services = &mut project.services;

    services.clear(service);
    for dependent in resolver::transitive_dependents(graph, service) {
        if services.clear(dependent) {
            debug!(%service, %dependent, "cascade disable");
        }
    }

    match service {
        ServiceType::S3 => {
            if let Some(iam) = services.iam.as_mut() {
                iam.s3_access = false;
            }
            services.cloudfront = None;
        }
        ServiceType::Lambda => {
            services.api_gateway = None;
        }
        _ => {}
    }

    state.selected_template = None;
}

fn load_template(state: &mut ProjectState, id: &str) {
    let provider = state.project.provider;
    let Some(template) = template(provider, id) else {
        debug!(%provider, id, "unknown template, ignoring");
        return;
    };

    let project = &mut state.project;
    let mut services = template.services.clone();

    let graph = &catalog(provider).graph;
    let enabled = services.enabled_set();
    for service in resolver::dependency_closure(graph, enabled.iter().copied()) {
        if !services.is_enabled(service) {
            debug!(template = id, %service, "filling missing template dependency");
            services.set(default_config(provider, service, &project.name));
        }
    }

    DerivedNames::for_project(provider, &project.name).fill_blanks(&mut services);
    project.services = services;
    state.selected_template = Some(id.to_string());
    info!(%provider, template = id, "loaded template");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{Ec2Patch, S3Patch};

    fn toggle(state: &mut ProjectState, service: ServiceType, enabled: bool) -> bool {
        reduce(state, &ProjectEvent::ToggleService { service, enabled })
    }

    #[test]
    fn test_enable_cascades_dependencies() {
        let mut state = ProjectState::new(Provider::Aws);
        assert!(toggle(&mut state, ServiceType::Ec2, true));

        assert_eq!(
            state.project.services.enabled(),
            vec![
                ServiceType::Vpc,
                ServiceType::Subnets,
                ServiceType::SecurityGroups,
                ServiceType::Ec2,
                ServiceType::Iam,
            ]
        );
        assert_eq!(state.project.services.ec2.as_ref().unwrap().instance_type, "t3.micro");
        assert_eq!(state.revision, 1);
    }

    #[test]
    fn test_disable_cascades_dependents() {
        let mut state = ProjectState::new(Provider::Aws);
        toggle(&mut state, ServiceType::ApiGateway, true);
        assert!(state.project.services.is_enabled(ServiceType::Lambda));
        assert!(state.project.services.is_enabled(ServiceType::Iam));

        toggle(&mut state, ServiceType::Lambda, false);
        assert!(state.project.services.api_gateway.is_none());
        assert!(state.project.services.lambda.is_none());
        assert!(state.project.services.iam.is_some());
    }

    #[test]
    fn test_disabling_lambda_drops_api_on_azure() {
        let mut state = ProjectState::new(Provider::Azure);
        toggle(&mut state, ServiceType::Lambda, true);
        toggle(&mut state, ServiceType::ApiGateway, true);

        toggle(&mut state, ServiceType::Lambda, false);
        assert!(state.project.services.api_gateway.is_none());
        assert!(state.project.services.iam.is_some());
    }

    #[test]
    fn test_disable_noop_when_absent() {
        let mut state = ProjectState::new(Provider::Aws);
        state.selected_template = Some("blank".into());
        assert!(!toggle(&mut state, ServiceType::Rds, false));
        assert_eq!(state.revision, 0);
        assert_eq!(state.selected_template.as_deref(), Some("blank"));
    }

    #[test]
    fn test_storage_coupling_rules() {
        let mut state = ProjectState::new(Provider::Aws);
        toggle(&mut state, ServiceType::Lambda, true);
        reduce(
            &mut state,
            &ProjectEvent::UpdateServiceConfig {
                patch: crate::patch::IamPatch {
                    s3_access: Some(false),
                    ..Default::default()
                }
                .into(),
            },
        );
        toggle(&mut state, ServiceType::Cloudfront, true);
        assert!(state.project.services.s3.is_some());

        toggle(&mut state, ServiceType::S3, false);
        assert!(state.project.services.cloudfront.is_none());
        assert!(!state.project.services.iam.as_ref().unwrap().s3_access);

        toggle(&mut state, ServiceType::S3, true);
        assert!(state.project.services.iam.as_ref().unwrap().s3_access);
    }

    #[test]
    fn test_provider_switch_resets_services() {
        let mut state = ProjectState::new(Provider::Aws);
        reduce(&mut state, &ProjectEvent::LoadTemplate { id: "multi-tier".into() });
        assert!(!state.project.services.is_empty());

        reduce(&mut state, &ProjectEvent::SetProvider { provider: Provider::Azure });
        assert!(state.project.services.is_empty());
        assert_eq!(state.project.region, "eastus");
        assert_eq!(
            state.project.resource_group.as_deref(),
            Some("rg-my-terraform-project")
        );
        assert_eq!(state.selected_template, None);

        reduce(&mut state, &ProjectEvent::SetProvider { provider: Provider::Aws });
        assert_eq!(state.project.resource_group, None);
    }

    #[test]
    fn test_region_change_repairs_zones() {
        let mut state = ProjectState::new(Provider::Aws);
        toggle(&mut state, ServiceType::Subnets, true);
        reduce(
            &mut state,
            &ProjectEvent::UpdateServiceConfig {
                patch: crate::patch::SubnetPatch {
                    availability_zones: Some(vec!["us-east-1a".into(), "us-east-1b".into()]),
                    ..Default::default()
                }
                .into(),
            },
        );

        reduce(&mut state, &ProjectEvent::UpdateRegion { region: "eu-west-2".into() });
        assert_eq!(state.project.region, "eu-west-2");
        assert_eq!(
            state.project.services.subnets.as_ref().unwrap().availability_zones,
            vec!["eu-west-2a"]
        );
    }

    #[test]
    fn test_name_change_rederives_unless_edited() {
        let mut state = ProjectState::new(Provider::Aws);
        reduce(&mut state, &ProjectEvent::UpdateProjectName { name: "acme".into() });
        toggle(&mut state, ServiceType::S3, true);
        toggle(&mut state, ServiceType::Iam, true);
        assert_eq!(state.project.services.s3.as_ref().unwrap().bucket_prefix, "acme");

        reduce(
            &mut state,
            &ProjectEvent::UpdateServiceConfig {
                patch: crate::patch::IamPatch {
                    role_name: Some("ops-role".into()),
                    ..Default::default()
                }
                .into(),
            },
        );
        reduce(&mut state, &ProjectEvent::UpdateProjectName { name: "acme2".into() });

        assert_eq!(state.project.services.s3.as_ref().unwrap().bucket_prefix, "acme2");
        assert_eq!(state.project.services.iam.as_ref().unwrap().role_name, "ops-role");
    }

    #[test]
    fn test_load_template_sets_marker_and_names() {
        let mut state = ProjectState::new(Provider::Aws);
        reduce(&mut state, &ProjectEvent::UpdateProjectName { name: "shop".into() });
        assert!(reduce(&mut state, &ProjectEvent::LoadTemplate { id: "simple-web".into() }));

        assert_eq!(state.selected_template.as_deref(), Some("simple-web"));
        assert_eq!(state.project.services.enabled().len(), 5);
        assert_eq!(state.project.services.iam.as_ref().unwrap().role_name, "shop-role");

        assert!(!reduce(&mut state, &ProjectEvent::LoadTemplate { id: "missing".into() }));
        assert_eq!(state.selected_template.as_deref(), Some("simple-web"));
    }

    #[test]
    fn test_reenable_keeps_edits_and_marker() {
        let mut state = ProjectState::new(Provider::Aws);
        reduce(&mut state, &ProjectEvent::LoadTemplate { id: "simple-web".into() });
        state.project.services.ec2.as_mut().unwrap().instance_type = "t3.large".into();
        let revision = state.revision;

        assert!(!toggle(&mut state, ServiceType::Ec2, true));
        assert_eq!(state.project.services.ec2.as_ref().unwrap().instance_type, "t3.large");
        assert_eq!(state.selected_template.as_deref(), Some("simple-web"));
        assert_eq!(state.revision, revision);
    }

    #[test]
    fn test_load_template_fills_names_from_fallback() {
        let mut state = ProjectState::new(Provider::Azure);
        state.project.name = String::new();
        assert!(reduce(
            &mut state,
            &ProjectEvent::LoadTemplate { id: "notification-system".into() }
        ));

        let services = &state.project.services;
        assert_eq!(services.iam.as_ref().unwrap().role_name, "app-identity");
        assert_eq!(services.ses.as_ref().unwrap().configuration_set_name, "app-comm");
    }

    #[test]
    fn test_update_config_clears_marker_only_when_applied() {
        let mut state = ProjectState::new(Provider::Aws);
        reduce(&mut state, &ProjectEvent::LoadTemplate { id: "serverless-api".into() });

        let s3_patch = ProjectEvent::UpdateServiceConfig {
            patch: S3Patch {
                versioning_enabled: Some(false),
                ..Default::default()
            }
            .into(),
        };
        assert!(!reduce(&mut state, &s3_patch));
        assert_eq!(state.selected_template.as_deref(), Some("serverless-api"));

        toggle(&mut state, ServiceType::Ec2, true);
        let ec2_patch = ProjectEvent::UpdateServiceConfig {
            patch: Ec2Patch {
                instance_type: Some("t3.small".into()),
                ..Default::default()
            }
            .into(),
        };
        assert!(reduce(&mut state, &ec2_patch));
        assert_eq!(state.project.services.ec2.as_ref().unwrap().instance_type, "t3.small");
    }

    #[test]
    fn test_environment_mirrors_into_tags() {
        let mut state = ProjectState::new(Provider::Aws);
        reduce(&mut state, &ProjectEvent::UpdateEnvironment { environment: "prod".into() });
        assert_eq!(state.project.environment, "prod");
        assert_eq!(state.project.tags.get("Environment").map(String::as_str), Some("prod"));
        assert_eq!(state.project.tags.get("ManagedBy").map(String::as_str), Some("Terraform"));
    }

    #[test]
    fn test_reset_restores_provider_default() {
        let mut state = ProjectState::new(Provider::Azure);
        reduce(&mut state, &ProjectEvent::LoadTemplate { id: "multi-tier".into() });
        reduce(&mut state, &ProjectEvent::ResetProject);
        assert_eq!(state.project, default_project(Provider::Azure));
        assert_eq!(state.selected_template, None);
    }
}

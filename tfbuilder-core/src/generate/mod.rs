//! Terraform generation.
//!
//! [`generate_project`] runs one generator unit per enabled group of services,
//! in a fixed dependency-respecting order, and assembles the module files plus
//! the root files into a virtual file tree. Generation is pure: the same
//! [`ProjectConfig`] always yields byte-identical output.

pub mod hcl;

mod aws;
mod azure;
mod project;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::model::{Provider, ServiceType};
use crate::services::ServiceSelection;

pub use aws::AwsGenerator;
pub use azure::AzureGenerator;

/// One generated text file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Forward-slash virtual path
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut content = content.into();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        Self {
            path: path.into(),
            content,
        }
    }
}

/// Files produced by one generator unit
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedModule {
    pub name: String,
    pub files: Vec<GeneratedFile>,
}

/// The complete virtual file tree for a project
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedProject {
    pub root_files: Vec<GeneratedFile>,
    pub modules: Vec<GeneratedModule>,
}

impl GeneratedProject {
    pub fn is_empty(&self) -> bool {
        self.root_files.is_empty() && self.modules.is_empty()
    }
}

/// The three text blocks one generator unit produces
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleOutput {
    pub main: String,
    pub variables: String,
    pub outputs: String,
    /// Reference maps the module takes as inputs, wired by the root module
    pub reference_maps: BTreeSet<ReferenceMap>,
}

impl ModuleOutput {
    /// Output of a module that takes no reference maps
    pub fn new(main: String, variables: String, outputs: String) -> Self {
        Self {
            main,
            variables,
            outputs,
            reference_maps: BTreeSet::new(),
        }
    }

    fn into_module(self, name: &str) -> GeneratedModule {
        let path = |file: &str| format!("modules/{name}/{file}");
        GeneratedModule {
            name: name.to_string(),
            files: vec![
                GeneratedFile::new(path("main.tf"), self.main),
                GeneratedFile::new(path("variables.tf"), self.variables),
                GeneratedFile::new(path("outputs.tf"), self.outputs),
            ],
        }
    }
}

/// Generator units, in the order they run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeneratorUnit {
    Networking,
    Identity,
    Storage,
    Database,
    Serverless,
    Api,
    Messaging,
    Events,
    Monitoring,
    Cdn,
    Email,
    Compute,
}

impl GeneratorUnit {
    pub const ALL: [GeneratorUnit; 12] = [
        GeneratorUnit::Networking,
        GeneratorUnit::Identity,
        GeneratorUnit::Storage,
        GeneratorUnit::Database,
        GeneratorUnit::Serverless,
        GeneratorUnit::Api,
        GeneratorUnit::Messaging,
        GeneratorUnit::Events,
        GeneratorUnit::Monitoring,
        GeneratorUnit::Cdn,
        GeneratorUnit::Email,
        GeneratorUnit::Compute,
    ];

    pub fn module_name(&self) -> &'static str {
        match self {
            GeneratorUnit::Networking => "networking",
            GeneratorUnit::Identity => "identity",
            GeneratorUnit::Storage => "storage",
            GeneratorUnit::Database => "database",
            GeneratorUnit::Serverless => "serverless",
            GeneratorUnit::Api => "api",
            GeneratorUnit::Messaging => "messaging",
            GeneratorUnit::Events => "events",
            GeneratorUnit::Monitoring => "monitoring",
            GeneratorUnit::Cdn => "cdn",
            GeneratorUnit::Email => "email",
            GeneratorUnit::Compute => "compute",
        }
    }

    /// Services rendered by this unit
    pub fn services(&self) -> &'static [ServiceType] {
        match self {
            GeneratorUnit::Networking => &[
                ServiceType::Vpc,
                ServiceType::Subnets,
                ServiceType::SecurityGroups,
            ],
            GeneratorUnit::Identity => &[ServiceType::Iam],
            GeneratorUnit::Storage => &[ServiceType::S3],
            GeneratorUnit::Database => &[ServiceType::Rds],
            GeneratorUnit::Serverless => &[ServiceType::Lambda],
            GeneratorUnit::Api => &[ServiceType::ApiGateway],
            GeneratorUnit::Messaging => &[ServiceType::Sqs, ServiceType::Sns],
            GeneratorUnit::Events => &[ServiceType::Eventbridge],
            GeneratorUnit::Monitoring => &[ServiceType::Cloudwatch],
            GeneratorUnit::Cdn => &[ServiceType::Cloudfront],
            GeneratorUnit::Email => &[ServiceType::Ses],
            GeneratorUnit::Compute => &[ServiceType::Ec2],
        }
    }

    /// Unit that renders `service`
    pub fn for_service(service: ServiceType) -> GeneratorUnit {
        GeneratorUnit::ALL
            .into_iter()
            .find(|unit| unit.services().contains(&service))
            .unwrap_or(GeneratorUnit::Networking)
    }

    pub fn is_active(&self, services: &ServiceSelection) -> bool {
        self.services().iter().any(|s| services.is_enabled(*s))
    }
}

impl fmt::Display for GeneratorUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module_name())
    }
}

// =============================================================================
// Cross-service references
// =============================================================================

/// What kind of named thing a reference points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefKind {
    Function,
    Queue,
    Topic,
    SecurityGroup,
}

impl RefKind {
    fn label(&self) -> &'static str {
        match self {
            RefKind::Function => "function",
            RefKind::Queue => "queue",
            RefKind::Topic => "topic",
            RefKind::SecurityGroup => "security group",
        }
    }
}

/// Name-indexed maps a module can take as input.
///
/// Each map is an output of the module that owns the named resources; the
/// root module passes it through to every module that consumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceMap {
    LambdaInvokeArns,
    LambdaFunctionNames,
    LambdaFunctionArns,
    SqsQueueArns,
    SnsTopicArns,
    SecurityGroupIds,
    FunctionIds,
    FunctionHostnames,
    QueueIds,
    TopicIds,
    NsgIds,
}

impl ReferenceMap {
    pub fn var_name(&self) -> &'static str {
        match self {
            ReferenceMap::LambdaInvokeArns => "lambda_invoke_arns",
            ReferenceMap::LambdaFunctionNames => "lambda_function_names",
            ReferenceMap::LambdaFunctionArns => "lambda_function_arns",
            ReferenceMap::SqsQueueArns => "sqs_queue_arns",
            ReferenceMap::SnsTopicArns => "sns_topic_arns",
            ReferenceMap::SecurityGroupIds => "security_group_ids",
            ReferenceMap::FunctionIds => "function_ids",
            ReferenceMap::FunctionHostnames => "function_hostnames",
            ReferenceMap::QueueIds => "queue_ids",
            ReferenceMap::TopicIds => "topic_ids",
            ReferenceMap::NsgIds => "nsg_ids",
        }
    }

    pub fn kind(&self) -> RefKind {
        match self {
            ReferenceMap::LambdaInvokeArns
            | ReferenceMap::LambdaFunctionNames
            | ReferenceMap::LambdaFunctionArns
            | ReferenceMap::FunctionIds
            | ReferenceMap::FunctionHostnames => RefKind::Function,
            ReferenceMap::SqsQueueArns | ReferenceMap::QueueIds => RefKind::Queue,
            ReferenceMap::SnsTopicArns | ReferenceMap::TopicIds => RefKind::Topic,
            ReferenceMap::SecurityGroupIds | ReferenceMap::NsgIds => RefKind::SecurityGroup,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ReferenceMap::LambdaInvokeArns => "Map of Lambda function names to invoke ARNs",
            ReferenceMap::LambdaFunctionNames => "Map of Lambda function names to function names",
            ReferenceMap::LambdaFunctionArns => "Map of Lambda function names to ARNs",
            ReferenceMap::SqsQueueArns => "Map of SQS queue names to ARNs",
            ReferenceMap::SnsTopicArns => "Map of SNS topic names to ARNs",
            ReferenceMap::SecurityGroupIds => "Map of security group names to IDs",
            ReferenceMap::FunctionIds => "Map of function names to their resource IDs",
            ReferenceMap::FunctionHostnames => "Map of function names to their default hostnames",
            ReferenceMap::QueueIds => "Map of queue names to their resource IDs",
            ReferenceMap::TopicIds => "Map of topic names to their resource IDs",
            ReferenceMap::NsgIds => "Map of NSG names to IDs",
        }
    }

    /// Unit whose outputs include this map
    pub fn owner(&self) -> GeneratorUnit {
        match self {
            ReferenceMap::LambdaInvokeArns
            | ReferenceMap::LambdaFunctionNames
            | ReferenceMap::LambdaFunctionArns
            | ReferenceMap::FunctionIds
            | ReferenceMap::FunctionHostnames => GeneratorUnit::Serverless,
            ReferenceMap::SqsQueueArns
            | ReferenceMap::SnsTopicArns
            | ReferenceMap::QueueIds
            | ReferenceMap::TopicIds => GeneratorUnit::Messaging,
            ReferenceMap::SecurityGroupIds | ReferenceMap::NsgIds => GeneratorUnit::Networking,
        }
    }

    /// Root-module expression producing this map
    pub fn source(&self) -> &'static str {
        match self {
            ReferenceMap::LambdaInvokeArns => "module.serverless.invoke_arns",
            ReferenceMap::LambdaFunctionNames => "module.serverless.function_names",
            ReferenceMap::LambdaFunctionArns => "module.serverless.function_arns",
            ReferenceMap::SqsQueueArns => "module.messaging.sqs_queue_arns",
            ReferenceMap::SnsTopicArns => "module.messaging.sns_topic_arns",
            ReferenceMap::SecurityGroupIds => "module.networking.security_group_ids",
            ReferenceMap::FunctionIds => "module.serverless.function_ids",
            ReferenceMap::FunctionHostnames => "module.serverless.function_hostnames",
            ReferenceMap::QueueIds => "module.messaging.queue_ids",
            ReferenceMap::TopicIds => "module.messaging.topic_ids",
            ReferenceMap::NsgIds => "module.networking.nsg_ids",
        }
    }
}

/// Names defined by the enabled services, used to resolve by-name references
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct References {
    pub functions: Vec<String>,
    pub queues: Vec<String>,
    pub topics: Vec<String>,
    pub security_groups: Vec<String>,
}

impl References {
    pub fn from_selection(services: &ServiceSelection) -> Self {
        Self {
            functions: services
                .lambda
                .iter()
                .flat_map(|l| l.functions.iter().map(|f| f.name.clone()))
                .collect(),
            queues: services
                .sqs
                .iter()
                .flat_map(|s| s.queues.iter().map(|q| q.name.clone()))
                .collect(),
            topics: services
                .sns
                .iter()
                .flat_map(|s| s.topics.iter().map(|t| t.name.clone()))
                .collect(),
            security_groups: services
                .security_groups
                .iter()
                .flat_map(|s| s.groups.iter().map(|g| g.name.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, kind: RefKind, name: &str) -> bool {
        let table = match kind {
            RefKind::Function => &self.functions,
            RefKind::Queue => &self.queues,
            RefKind::Topic => &self.topics,
            RefKind::SecurityGroup => &self.security_groups,
        };
        table.iter().any(|n| n == name)
    }
}

/// Per-module reference resolution.
///
/// Known names render as lookups into an input map; unknown names render as a
/// placeholder input variable with an empty default so the module stays valid.
#[derive(Debug)]
pub struct ReferenceScope<'a> {
    refs: &'a References,
    maps: BTreeSet<ReferenceMap>,
    placeholders: BTreeMap<String, String>,
}

impl<'a> ReferenceScope<'a> {
    pub fn new(refs: &'a References) -> Self {
        Self {
            refs,
            maps: BTreeSet::new(),
            placeholders: BTreeMap::new(),
        }
    }

    pub fn references(&self) -> &'a References {
        self.refs
    }

    /// Expression for `name` in `map`
    pub fn lookup(&mut self, map: ReferenceMap, name: &str) -> String {
        if self.refs.contains(map.kind(), name) {
            self.maps.insert(map);
            return format!("var.{}[{}]", map.var_name(), hcl::quote(name));
        }

        let var = format!("missing_{}_{}", map.var_name(), hcl::to_terraform_id(name));
        debug!(map = map.var_name(), name, "unresolved reference, using placeholder");
        self.placeholders.entry(var.clone()).or_insert_with(|| {
            format!(
                "Placeholder for {} '{}', which is not defined in this project",
                map.kind().label(),
                name
            )
        });
        format!("var.{var}")
    }

    pub fn has_placeholders(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Declarations for every map and placeholder used so far
    pub fn variables(&self) -> String {
        let maps = self.maps.iter().map(|map| {
            hcl::variable(map.var_name(), map.description(), "map(string)", Some("{}"))
        });
        let placeholders = self
            .placeholders
            .iter()
            .map(|(name, desc)| hcl::variable(name, desc, "string", Some("\"\"")));
        hcl::join_sections(maps.chain(placeholders))
    }

    /// Bundle the module texts, appending reference declarations to `variables`
    pub fn finish(self, main: String, variables: String, outputs: String) -> ModuleOutput {
        let variables = hcl::join_sections([variables, self.variables()]);
        ModuleOutput {
            main,
            variables,
            outputs,
            reference_maps: self.maps,
        }
    }
}

// =============================================================================
// Providers
// =============================================================================

/// One cloud provider's generator table
pub trait TerraformProvider {
    fn provider(&self) -> Provider;

    /// Render `unit`, or `None` when the services it needs are not enabled
    fn module(
        &self,
        unit: GeneratorUnit,
        project: &ProjectConfig,
        refs: &References,
    ) -> Option<ModuleOutput>;

    /// Root files wiring together the generated modules
    fn root_files(
        &self,
        project: &ProjectConfig,
        modules: &[(GeneratorUnit, ModuleOutput)],
    ) -> Vec<GeneratedFile>;
}

/// Generator table for `provider`
pub fn generator_for(provider: Provider) -> &'static dyn TerraformProvider {
    match provider {
        Provider::Aws => &AwsGenerator,
        Provider::Azure => &AzureGenerator,
    }
}

/// Render every enabled service of `project` into a file tree.
///
/// A project with no enabled services yields an empty tree.
pub fn generate_project(project: &ProjectConfig) -> GeneratedProject {
    if project.services.is_empty() {
        debug!("no services enabled, nothing to generate");
        return GeneratedProject::default();
    }

    let generator = generator_for(project.provider);
    let refs = References::from_selection(&project.services);

    let mut built = Vec::new();
    for unit in GeneratorUnit::ALL {
        if !unit.is_active(&project.services) {
            continue;
        }
        match generator.module(unit, project, &refs) {
            Some(output) => built.push((unit, output)),
            None => debug!(%unit, "unit skipped, required service disabled"),
        }
    }

    let root_files = generator.root_files(project, &built);
    let modules = built
        .into_iter()
        .map(|(unit, output)| output.into_module(unit.module_name()))
        .collect();

    GeneratedProject {
        root_files,
        modules,
    }
}

/// Root files followed by module files, in generation order
pub fn all_files(project: &GeneratedProject) -> Vec<&GeneratedFile> {
    project
        .root_files
        .iter()
        .chain(project.modules.iter().flat_map(|m| m.files.iter()))
        .collect()
}

/// Every path in the tree, sorted
pub fn file_tree(project: &GeneratedProject) -> Vec<String> {
    let mut paths: Vec<String> = all_files(project).into_iter().map(|f| f.path.clone()).collect();
    paths.sort();
    paths
}

pub fn file_by_path<'a>(project: &'a GeneratedProject, path: &str) -> Option<&'a GeneratedFile> {
    all_files(project).into_iter().find(|f| f.path == path)
}

/// Caches the last generated tree and regenerates only when the input changes
#[derive(Debug, Default)]
pub struct MemoizedGenerator {
    last: Option<(ProjectConfig, GeneratedProject)>,
}

impl MemoizedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, project: &ProjectConfig) -> &GeneratedProject {
        let entry = match self.last.take() {
            Some((input, generated)) if input == *project => {
                debug!("project unchanged, reusing generated files");
                (input, generated)
            }
            _ => {
                let generated = generate_project(project);
                info!(
                    provider = %project.provider,
                    modules = generated.modules.len(),
                    files = all_files(&generated).len(),
                    "generated terraform project"
                );
                (project.clone(), generated)
            }
        };
        &self.last.insert(entry).1
    }

    /// Drop the cached tree
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{default_config, default_project};
    use crate::templates::template;

    fn project_with(provider: Provider, services: &[ServiceType]) -> ProjectConfig {
        let mut project = default_project(provider);
        for service in services {
            project
                .services
                .set(default_config(provider, *service, &project.name));
        }
        project
    }

    fn from_template(provider: Provider, id: &str) -> ProjectConfig {
        let mut project = default_project(provider);
        project.services = template(provider, id).unwrap().services.clone();
        crate::defaults::DerivedNames::for_project(provider, &project.name)
            .fill_blanks(&mut project.services);
        project
    }

    #[test]
    fn test_empty_selection_generates_nothing() {
        for provider in Provider::ALL {
            let generated = generate_project(&default_project(provider));
            assert!(generated.is_empty());
            assert!(file_tree(&generated).is_empty());
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        for provider in Provider::ALL {
            let project = project_with(provider, &ServiceType::ALL);
            assert_eq!(generate_project(&project), generate_project(&project));
        }
    }

    #[test]
    fn test_list_fields_render_in_input_order() {
        use crate::services::{LambdaConfig, LambdaFunctionConfig, SqsConfig, SqsQueueConfig};

        let names = ["zeta", "alpha", "Mid Q"];
        for provider in Provider::ALL {
            let mut project = project_with(provider, &[ServiceType::Sqs, ServiceType::Lambda]);
            project.services.set(
                SqsConfig {
                    queues: names
                        .iter()
                        .map(|name| SqsQueueConfig {
                            name: name.to_string(),
                            ..SqsQueueConfig::default()
                        })
                        .collect(),
                }
                .into(),
            );
            project.services.set(
                LambdaConfig {
                    functions: names
                        .iter()
                        .map(|name| LambdaFunctionConfig {
                            name: name.to_string(),
                            ..LambdaFunctionConfig::default()
                        })
                        .collect(),
                }
                .into(),
            );

            let generated = generate_project(&project);
            for path in ["modules/messaging/main.tf", "modules/serverless/main.tf"] {
                let content = &file_by_path(&generated, path).unwrap().content;
                let positions: Vec<usize> = ["\"zeta\"", "\"alpha\"", "\"mid_q\""]
                    .iter()
                    .map(|label| content.find(label).unwrap())
                    .collect();
                assert!(
                    positions.windows(2).all(|w| w[0] < w[1]),
                    "{provider} {path}: {positions:?}"
                );
            }
        }
    }

    #[test]
    fn test_module_order_and_paths() {
        let project = project_with(Provider::Aws, &ServiceType::ALL);
        let generated = generate_project(&project);
        let names: Vec<&str> = generated.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "networking", "identity", "storage", "database", "serverless", "api",
                "messaging", "events", "monitoring", "cdn", "email", "compute",
            ]
        );

        for module in &generated.modules {
            let paths: Vec<&str> = module.files.iter().map(|f| f.path.as_str()).collect();
            assert_eq!(
                paths,
                vec![
                    format!("modules/{}/main.tf", module.name),
                    format!("modules/{}/variables.tf", module.name),
                    format!("modules/{}/outputs.tf", module.name),
                ]
            );
        }
    }

    #[test]
    fn test_aws_root_files() {
        let generated = generate_project(&from_template(Provider::Aws, "simple-web"));
        let roots: Vec<&str> = generated.root_files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            roots,
            vec![
                "main.tf", "variables.tf", "outputs.tf", "versions.tf",
                "terraform.tfvars", "locals.tf", "README.md", ".gitignore",
            ]
        );
        let modules: Vec<&str> = generated.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(modules, vec!["networking", "identity", "compute"]);
    }

    #[test]
    fn test_azure_root_files() {
        let generated = generate_project(&from_template(Provider::Azure, "simple-web"));
        let roots: Vec<&str> = generated.root_files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            roots,
            vec![
                "main.tf", "variables.tf", "outputs.tf", "versions.tf",
                "terraform.tfvars", "README.md", ".gitignore",
            ]
        );
        let main = file_by_path(&generated, "main.tf").unwrap();
        assert!(main.content.contains("resource \"azurerm_resource_group\" \"main\""));
    }

    #[test]
    fn test_messaging_unit_covers_either_service() {
        let project = project_with(Provider::Aws, &[ServiceType::Sns]);
        let generated = generate_project(&project);
        assert_eq!(generated.modules.len(), 1);
        assert_eq!(generated.modules[0].name, "messaging");
        assert_eq!(GeneratorUnit::for_service(ServiceType::Sqs), GeneratorUnit::Messaging);
        assert_eq!(GeneratorUnit::for_service(ServiceType::Iam), GeneratorUnit::Identity);
    }

    #[test]
    fn test_every_file_ends_with_newline() {
        for provider in Provider::ALL {
            let generated = generate_project(&project_with(provider, &ServiceType::ALL));
            for file in all_files(&generated) {
                assert!(file.content.ends_with('\n'), "{}", file.path);
                assert!(!file.content.trim().is_empty(), "{}", file.path);
            }
        }
    }

    #[test]
    fn test_file_lookup() {
        let generated = generate_project(&project_with(Provider::Aws, &[ServiceType::S3]));
        assert!(file_by_path(&generated, "modules/storage/main.tf").is_some());
        assert!(file_by_path(&generated, "modules/compute/main.tf").is_none());
        let tree = file_tree(&generated);
        let mut sorted = tree.clone();
        sorted.sort();
        assert_eq!(tree, sorted);
    }

    #[test]
    fn test_reference_scope_placeholders() {
        let refs = References {
            functions: vec!["api".into()],
            ..References::default()
        };
        let mut scope = ReferenceScope::new(&refs);
        assert_eq!(
            scope.lookup(ReferenceMap::LambdaInvokeArns, "api"),
            "var.lambda_invoke_arns[\"api\"]"
        );
        assert_eq!(
            scope.lookup(ReferenceMap::LambdaInvokeArns, "Ghost Fn"),
            "var.missing_lambda_invoke_arns_ghost_fn"
        );
        assert!(scope.has_placeholders());

        let output = scope.finish(String::new(), String::new(), String::new());
        assert!(output.variables.contains("variable \"lambda_invoke_arns\""));
        assert!(output.variables.contains("variable \"missing_lambda_invoke_arns_ghost_fn\""));
        assert_eq!(
            output.reference_maps,
            BTreeSet::from([ReferenceMap::LambdaInvokeArns])
        );
    }

    #[test]
    fn test_memoized_generator_reuses_output() {
        let mut project = project_with(Provider::Aws, &[ServiceType::S3]);
        let mut memo = MemoizedGenerator::new();

        let first = memo.generate(&project).clone();
        assert_eq!(memo.generate(&project), &first);

        project.name = "renamed".into();
        let second = memo.generate(&project).clone();
        assert_ne!(second, first);

        memo.invalidate();
        assert_eq!(memo.generate(&project), &second);
    }
}

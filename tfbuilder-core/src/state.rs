use crate::config::{ProjectConfig, ProjectFile};
use crate::defaults::default_project;
use crate::model::Provider;

/// Everything the store owns
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectState {
    pub project: ProjectConfig,
    /// Template the selection was loaded from; cleared by manual edits
    pub selected_template: Option<String>,
    /// Bumped on every applied change
    pub revision: u64,
}

impl ProjectState {
    pub fn new(provider: Provider) -> Self {
        Self::from_project(default_project(provider), None)
    }

    pub fn from_project(project: ProjectConfig, selected_template: Option<String>) -> Self {
        Self {
            project,
            selected_template,
            revision: 0,
        }
    }

    pub fn to_file(&self) -> ProjectFile {
        ProjectFile::new(self.project.clone(), self.selected_template.clone())
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new(Provider::default())
    }
}

impl From<ProjectFile> for ProjectState {
    fn from(file: ProjectFile) -> Self {
        Self::from_project(file.project, file.selected_template)
    }
}

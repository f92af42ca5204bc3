use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use tfbuilder_core::generate::{GeneratedProject, all_files, file_by_path, file_tree};

use super::open;

pub fn run_generate(project: Option<&Path>, out: &Path, list: bool, json: bool) -> Result<()> {
    let (_, mut store) = open(project)?;
    let generated = store.generated();

    if generated.is_empty() {
        println!("No services enabled, nothing to generate");
        return Ok(());
    }

    if list {
        for path in file_tree(generated) {
            println!("{path}");
        }
    } else if json {
        let text = serde_json::to_string_pretty(generated)
            .context("Failed to serialize generated project")?;
        println!("{text}");
    } else {
        let written = write_project(generated, out)?;
        println!("Wrote {written} files to {}", out.display());
        println!();
        println!("Next steps:");
        println!("  cd {}", out.display());
        println!("  terraform init && terraform plan");
    }
    Ok(())
}

pub fn run_show(project: Option<&Path>, path: &str) -> Result<()> {
    let (_, mut store) = open(project)?;
    let generated = store.generated();
    let file = file_by_path(generated, path)
        .ok_or_else(|| anyhow!("No generated file '{path}'. Run `tfbuilder generate --list`."))?;
    print!("{}", file.content);
    if !file.content.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Write every file of `project` under `dir`; returns the file count
pub fn write_project(project: &GeneratedProject, dir: &Path) -> Result<usize> {
    let files = all_files(project);
    for file in &files {
        let target = dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target, &file.content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        debug!(path = %target.display(), bytes = file.content.len(), "wrote file");
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfbuilder_core::generate::generate_project;
    use tfbuilder_core::model::{Provider, ServiceType};
    use tfbuilder_core::store::ProjectStore;

    #[test]
    fn test_write_project_creates_module_dirs() {
        let mut store = ProjectStore::new(Provider::Aws);
        store.toggle_service(ServiceType::S3, true);
        let generated = generate_project(store.project());

        let dir = tempfile::tempdir().unwrap();
        let count = write_project(&generated, dir.path()).unwrap();

        assert_eq!(count, all_files(&generated).len());
        assert!(dir.path().join("main.tf").is_file());
        assert!(dir.path().join("modules/storage/main.tf").is_file());
    }
}

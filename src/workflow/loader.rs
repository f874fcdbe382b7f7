//! Workflow and batch file loader
//!
//! Load workflow definitions and batch request lists from YAML files.

use std::path::Path;

use serde::de::DeserializeOwned;

use super::{TaskRequest, WorkflowDefinition};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

pub struct WorkflowLoader;

impl WorkflowLoader {
    /// Load every `.yaml`/`.yml` workflow in a directory, sorted by name
    pub fn load_directory(dir: &Path) -> Result<Vec<WorkflowDefinition>, LoadError> {
        let mut workflows = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                let ext = path.extension().and_then(|e| e.to_str());
                if ext == Some("yaml") || ext == Some("yml") {
                    workflows.push(Self::load_file(&path)?);
                }
            }
        }

        workflows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workflows)
    }

    pub fn load_file(path: &Path) -> Result<WorkflowDefinition, LoadError> {
        load_yaml(path)
    }

    /// Load a batch file: a YAML list of task requests
    pub fn load_batch(path: &Path) -> Result<Vec<TaskRequest>, LoadError> {
        load_yaml(path)
    }
}

pub(crate) fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
        file: path.display().to_string(),
        error: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_directory() {
        let dir = tempdir().unwrap();

        fs::write(
            dir.path().join("b.yaml"),
            r#"
name: workflow-b
steps:
  - agent_type: docs
    task: write docs
"#,
        )
        .unwrap();

        fs::write(
            dir.path().join("a.yml"),
            r#"
name: workflow-a
steps:
  - agent_type: reviewer
    task: review
"#,
        )
        .unwrap();

        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let workflows = WorkflowLoader::load_directory(dir.path()).unwrap();
        let names: Vec<_> = workflows.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["workflow-a", "workflow-b"]);
    }

    #[test]
    fn test_load_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.yaml");

        fs::write(
            &path,
            r#"
- agent_type: reviewer
  task: review auth module
  project_id: web
- agentType: docs
  task: write readme
  context:
    audience: developers
"#,
        )
        .unwrap();

        let requests = WorkflowLoader::load_batch(&path).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].project_id.as_deref(), Some("web"));
        assert_eq!(
            requests[1].context.as_ref().unwrap()["audience"],
            "developers"
        );
    }

    #[test]
    fn test_yaml_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "name: [unclosed").unwrap();

        let err = WorkflowLoader::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}

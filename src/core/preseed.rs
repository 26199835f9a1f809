//! Answer file injection
//!
//! Copies the operator-authored preseed file verbatim to the image root,
//! where the installer finds it as `/cdrom/preseed.cfg`.

use std::path::Path;

use super::workspace::Workspace;
use crate::error::{PipelineError, Stage};
use crate::infra::filesystem;

/// Copy the answer file into the workspace, replacing any earlier copy
pub fn inject_answer_file(source: &Path, workspace: &Workspace) -> Result<(), PipelineError> {
    if !source.is_file() {
        return Err(PipelineError::MissingInput {
            stage: Stage::AnswerFile,
            what: "preseed answer file",
            path: source.to_path_buf(),
        });
    }

    let destination = workspace.preseed();
    filesystem::copy_file(source, &destination)
        .map_err(|e| PipelineError::filesystem(Stage::AnswerFile, e))?;
    // The copy inherits the source mode; keep it writable for later runs.
    filesystem::set_mode(&destination, 0o644)
        .map_err(|e| PipelineError::filesystem(Stage::AnswerFile, e))?;

    tracing::info!("Injected {} as {}", source.display(), destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_copies_verbatim() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("preseed.cfg");
        let content = "d-i debian-installer/locale string en_US\n";
        fs::write(&source, content).unwrap();
        let ws = Workspace::new(temp.path().join("ws"));
        fs::create_dir_all(ws.root()).unwrap();

        inject_answer_file(&source, &ws).unwrap();

        assert_eq!(fs::read_to_string(ws.preseed()).unwrap(), content);
    }

    #[test]
    fn test_overwrites_previous_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("preseed.cfg");
        fs::write(&source, "new").unwrap();
        let ws = Workspace::new(temp.path().join("ws"));
        fs::create_dir_all(ws.root()).unwrap();
        fs::write(ws.preseed(), "old").unwrap();

        inject_answer_file(&source, &ws).unwrap();

        assert_eq!(fs::read_to_string(ws.preseed()).unwrap(), "new");
    }

    #[test]
    fn test_missing_source_is_distinct_error() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path());

        let err = inject_answer_file(&temp.path().join("nope.cfg"), &ws).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MissingInput {
                stage: Stage::AnswerFile,
                ..
            }
        ));
        assert!(err.to_string().contains("nope.cfg"));
    }
}

//! Atomic, write-if-changed output helpers.
//!
//! Content goes to a temporary file beside the target and is persisted over
//! it in one rename. A target whose content digest already matches is left
//! alone so its timestamp does not trigger rebuilds.

use std::fs;
use std::io::Write;

use camino::Utf8Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::CoordinatorError;
use crate::hasher::ContentHasher;

/// What happened to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New content was persisted.
    Written,
    /// Existing content already matched.
    Unchanged,
}

fn io_error(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> CoordinatorError + '_ {
    move |source| CoordinatorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `content` to `path` unless it already holds exactly that content.
///
/// # Errors
///
/// Returns [`CoordinatorError::Io`] when the parent directory cannot be
/// created or the temporary file cannot be written or persisted.
pub fn write_if_changed(path: &Utf8Path, content: &str) -> Result<WriteOutcome, CoordinatorError> {
    if let Ok(existing) = fs::read(path) {
        if ContentHasher::digest(&existing) == ContentHasher::digest(content.as_bytes()) {
            debug!(%path, "content unchanged");
            return Ok(WriteOutcome::Unchanged);
        }
    }
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent).map_err(io_error(parent))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(io_error(path))?;
    {
        let handle = tmp.as_file_mut();
        handle.write_all(content.as_bytes()).map_err(io_error(path))?;
        handle.flush().map_err(io_error(path))?;
        handle.sync_all().map_err(io_error(path))?;
    }
    tmp.persist(path).map_err(|e| io_error(path)(e.error))?;
    info!(%path, "wrote file");
    Ok(WriteOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use camino::Utf8PathBuf;
    use rstest::rstest;

    #[rstest]
    fn writes_then_leaves_unchanged() -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .map_err(|_| anyhow::anyhow!("temp dir is not UTF-8"))?;
        let path = root.join("nested/dir/Makefile");

        assert_eq!(write_if_changed(&path, "all:\n")?, WriteOutcome::Written);
        assert_eq!(write_if_changed(&path, "all:\n")?, WriteOutcome::Unchanged);
        assert_eq!(write_if_changed(&path, "all: x\n")?, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&path)?, "all: x\n");
        Ok(())
    }
}

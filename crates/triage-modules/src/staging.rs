//! Scoped temporary storage for re-uploaded attachments

use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

const STAGING_PREFIX: &str = "triage-redaction-upload";

/// A fresh temporary directory, removed when dropped.
pub struct StagingDir {
    dir: TempDir,
    root: PathBuf,
}

impl StagingDir {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        let root = dir.path().canonicalize()?;
        Ok(Self { dir, root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path for `file_name` directly inside the staging directory.
    ///
    /// Returns `None` for names that would resolve anywhere else: separators,
    /// `.`/`..`, absolute paths, drive prefixes, NUL bytes or an empty name.
    pub fn child_path(&self, file_name: &str) -> Option<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\', '\0']) {
            return None;
        }

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }

        let candidate = self.root.join(file_name);
        (candidate.parent() == Some(self.root.as_path())).then_some(candidate)
    }

    /// Remove the directory now, reporting errors instead of ignoring them on drop.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

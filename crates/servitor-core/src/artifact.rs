//! Control artifacts: rendered text bound to a path and a mode.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{Result, ServiceError};

/// A rendered unit file or init script, ready to be written once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlArtifact {
    path: PathBuf,
    contents: String,
    mode: u32,
}

impl ControlArtifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            mode,
        }
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rendered text.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Permission bits applied after writing.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Writes the artifact, replacing any existing file.
    ///
    /// The mode is set explicitly after the write so the process umask does
    /// not strip the execute bits. A failure part-way leaves whatever was
    /// written on disk.
    pub async fn write(&self) -> Result<()> {
        let to_err = |source| ServiceError::FileWrite {
            path: self.path.clone(),
            source,
        };

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(self.mode);

        let mut file = options.open(&self.path).await.map_err(to_err)?;
        file.write_all(self.contents.as_bytes()).await.map_err(to_err)?;
        file.flush().await.map_err(to_err)?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(self.mode))
                .await
                .map_err(to_err)?;
        }

        tracing::debug!(
            path = %self.path.display(),
            mode = %format!("{:o}", self.mode),
            "wrote control artifact"
        );
        Ok(())
    }
}

/// Deletes `path`, treating an already-absent file as success.
///
/// Returns true if a file was deleted.
pub async fn remove_if_present(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed control artifact");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ServiceError::FileRemove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-svc");
        let artifact = ControlArtifact::new(&path, "#!/bin/sh\n", 0o755);

        artifact.write().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#!/bin/sh\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-svc");
        ControlArtifact::new(&path, "x", 0o750).write().await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o750);
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-svc");
        std::fs::write(&path, "old contents that are longer").unwrap();

        ControlArtifact::new(&path, "new", 0o755).write().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_write_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("demo-svc");
        let err = ControlArtifact::new(&path, "x", 0o755).write().await.unwrap_err();
        assert!(matches!(err, ServiceError::FileWrite { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_remove_if_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-svc");
        std::fs::write(&path, "x").unwrap();

        assert!(remove_if_present(&path).await.unwrap());
        assert!(!remove_if_present(&path).await.unwrap());
        assert!(!path.exists());
    }
}

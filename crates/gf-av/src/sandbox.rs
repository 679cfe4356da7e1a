//! Private scratch directory backing an engine's virtual filesystem.
//!
//! A [`Sandbox`] owns a temporary directory and maps flat virtual file names
//! onto it. The directory and everything in it is removed when the sandbox
//! is dropped.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::TempDir;

const SANDBOX_PREFIX: &str = "gifforge-engine-";

pub struct Sandbox {
    temp_dir: TempDir,
}

impl Sandbox {
    /// Create a sandbox under `parent`, or the system temp dir.
    pub fn new(parent: Option<&Path>) -> gf_core::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SANDBOX_PREFIX);
        let temp_dir = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|e| gf_core::Error::tool("sandbox", format!("failed to create temp dir: {e}")))?;

        Ok(Self { temp_dir })
    }

    /// Host path of the sandbox root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Map a virtual name to its host path.
    ///
    /// Names must be flat: no separators, no `.`/`..`, not empty.
    pub fn resolve(&self, name: &str) -> gf_core::Result<PathBuf> {
        validate_name(name)?;
        Ok(self.temp_dir.path().join(name))
    }

    pub async fn write(&self, name: &str, data: &[u8]) -> gf_core::Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> gf_core::Result<Bytes> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(gf_core::Error::not_found("file", name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `name`; a missing entry is not an error.
    pub async fn delete(&self, name: &str) -> gf_core::Result<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sorted names of the regular files in the sandbox.
    pub async fn list(&self) -> gf_core::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.temp_dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> gf_core::Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(gf_core::Error::Validation(format!(
            "invalid virtual file name '{name}'"
        )));
    }
    Ok(())
}

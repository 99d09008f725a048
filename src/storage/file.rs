#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::path::{Path, PathBuf};

use eyre::{Context, Result};

use super::BlobStore;

/// Keeps every key in its own `<key>.json` file under a directory.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .wrap_err(format!("creating directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_of(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).wrap_err(format!("reading {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_of(key);
        // Write next to the target and rename over it so a crash mid-write
        // leaves the previous blob intact.
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value).wrap_err(format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).wrap_err(format!("replacing {}", path.display()))?;
        Ok(())
    }
}

use std::path::{Component, Path, PathBuf};

use clean_path::Clean;
use log::{debug, error};
use tokio::fs::{create_dir_all, write};

use crate::error::Error;
use crate::sanitize::sanitize;

/// Persists extracted files under `<root>/<sanitized reference>/<entry path>`.
#[derive(Debug, Clone)]
pub struct Writer
{
    root: PathBuf,
}

impl Writer
{
    pub fn init(root: impl AsRef<Path>) -> Self
    {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Output location of `entry_name` extracted from `reference`.
    ///
    /// Subdirectories of the entry are kept. Root and prefix components are
    /// dropped, and an entry that climbs out of the reference directory is
    /// rejected.
    pub fn destination(&self, reference: &str, entry_name: &str) -> Result<PathBuf, Error>
    {
        let relative = Path::new(entry_name)
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect::<PathBuf>()
            .clean();

        let escapes = relative.components().next().map_or(true, |first| {
            matches!(first, Component::ParentDir | Component::CurDir)
        });

        if escapes {
            error!("Archive entry \"{}\" does not name a file inside the output directory", entry_name);
            return Err(Error::InvalidEntryPath(entry_name.to_string()));
        }

        Ok(self.root.join(sanitize(reference)).join(relative))
    }

    /// Writes `content`, creating missing directories and replacing an existing file.
    pub async fn write(&self, reference: &str, entry_name: &str, content: &[u8]) -> Result<PathBuf, Error>
    {
        let path = self.destination(reference, entry_name)?;

        if let Some(parent) = path.parent() {
            debug!("Creating directory {}", parent.display());
            create_dir_all(parent).await.map_err(|source| Error::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        write(&path, content).await.map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

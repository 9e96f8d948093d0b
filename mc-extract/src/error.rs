use std::path::PathBuf;

use mc_registry::Error as RegistryError;

#[derive(Debug)]
pub enum Error
{
    /// The reference could not be turned into a manifest
    Resolution(RegistryError),
    /// A manifest or blob could not be retrieved after resolution
    Fetch(RegistryError),
    Decompression(std::io::Error),
    ArchiveParse(std::io::Error),
    Write
    {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidEntryPath(String),
    Dispatch(String),
    TaskPanicked(String),
}

impl Error
{
    /// Short name of the phase the error originated from, used in log lines.
    pub fn phase(&self) -> &'static str
    {
        match self {
            Error::Resolution(_) => "resolve",
            Error::Fetch(_) => "fetch",
            Error::Decompression(_) => "decompress",
            Error::ArchiveParse(_) => "scan",
            Error::Write { .. } | Error::InvalidEntryPath(_) => "write",
            Error::Dispatch(_) | Error::TaskPanicked(_) => "dispatch",
        }
    }
}

impl std::error::Error for Error
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {
        match self {
            Error::Resolution(e) | Error::Fetch(e) => Some(e),
            Error::Decompression(e) | Error::ArchiveParse(e) => Some(e),
            Error::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self {
            Error::Resolution(e) => write!(f, "failed to resolve reference: {}", e),
            Error::Fetch(e) => write!(f, "failed to fetch from registry: {}", e),
            Error::Decompression(e) => write!(f, "failed to decompress layer: {}", e),
            Error::ArchiveParse(e) => write!(f, "failed to read layer archive: {}", e),
            Error::Write { path, source } => write!(f, "failed to write {}: {}", path.display(), source),
            Error::InvalidEntryPath(s) => write!(f, "archive entry escapes output directory: {}", s),
            Error::Dispatch(s) => write!(f, "failed to schedule task: {}", s),
            Error::TaskPanicked(s) => write!(f, "task panicked: {}", s),
        }
    }
}

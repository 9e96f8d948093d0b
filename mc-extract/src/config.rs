use std::path::PathBuf;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_ANNOTATION_KEY: &str = "io.opendatahub.modelcar.layer.type";
pub const DEFAULT_ANNOTATION_VALUE: &str = "modelcard";
pub const DEFAULT_FILE_SUFFIX: &str = ".md";
pub const DEFAULT_GZIP_MARKER: &str = "+gzip";
pub const DEFAULT_ZSTD_MARKER: &str = "+zstd";
pub const DEFAULT_OUTPUT_ROOT: &str = "output";

/// Settings shared read-only by every extraction task.
#[derive(Debug, Clone)]
pub struct ExtractConfig
{
    /// Upper bound of references processed at the same time, must be positive
    pub concurrency: usize,
    /// Annotation marking the layer that carries the model card
    pub annotation_key: String,
    pub annotation_value: String,
    /// Suffix an archive entry name must end with to be extracted
    pub file_suffix: String,
    /// Media type substrings selecting the layer decompressor
    pub gzip_marker: String,
    pub zstd_marker: String,
    pub output_root: PathBuf,
}

impl Default for ExtractConfig
{
    fn default() -> Self
    {
        ExtractConfig {
            concurrency: DEFAULT_CONCURRENCY,
            annotation_key: DEFAULT_ANNOTATION_KEY.to_string(),
            annotation_value: DEFAULT_ANNOTATION_VALUE.to_string(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            gzip_marker: DEFAULT_GZIP_MARKER.to_string(),
            zstd_marker: DEFAULT_ZSTD_MARKER.to_string(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
        }
    }
}

/// Reads a reference list: one reference per line, blank lines and `#` comments skipped.
pub fn parse_reference_list(content: &str) -> Vec<String>
{
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

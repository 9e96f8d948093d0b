use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use mc_extract::config::{
    parse_reference_list, ExtractConfig, DEFAULT_ANNOTATION_KEY, DEFAULT_ANNOTATION_VALUE,
    DEFAULT_CONCURRENCY, DEFAULT_FILE_SUFFIX, DEFAULT_OUTPUT_ROOT,
};
use mc_extract::dispatcher;
use mc_extract::report::{LayerOutcome, ReferenceReport, Status};
use mc_extract::source::RegistrySource;
use mc_registry::config::ConnectionMode;

const DEFAULT_JOBS: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CONCURRENCY) {
    Some(jobs) => jobs,
    None => panic!("default concurrency must be positive"),
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli
{
    /// image references to process
    references: Vec<String>,

    /// file with one image reference per line, '#' starts a comment
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// number of references processed in parallel
    #[arg(short = 'j', long, default_value_t = DEFAULT_JOBS)]
    concurrency: NonZeroUsize,

    /// directory the extracted files are written to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,

    /// layer annotation key marking the model card layer
    #[arg(long, default_value = DEFAULT_ANNOTATION_KEY)]
    annotation_key: String,

    /// layer annotation value marking the model card layer
    #[arg(long, default_value = DEFAULT_ANNOTATION_VALUE)]
    annotation_value: String,

    /// suffix of the archive entry to extract
    #[arg(long, default_value = DEFAULT_FILE_SUFFIX)]
    suffix: String,

    /// talk plain HTTP to the registries
    #[arg(long)]
    insecure: bool,

    /// PEM bundle of root certificates, none to use the bundled roots
    #[arg(long, conflicts_with = "insecure")]
    root_ca: Option<PathBuf>,
}

fn connection_mode(cli: &Cli) -> Result<ConnectionMode, mc_registry::Error>
{
    if cli.insecure {
        warn!("TLS disabled, registries are contacted over plain HTTP");
        return Ok(ConnectionMode::None);
    }

    match &cli.root_ca {
        Some(path) => ConnectionMode::with_root_ca(path),
        None => Ok(ConnectionMode::RusTLS),
    }
}

fn log_report(report: &ReferenceReport)
{
    match (&report.status, &report.error) {
        (Status::Failed, Some(e)) => error!("{}: {} ({} failed: {})", report.reference, report.status, e.phase(), e),
        _ => info!("{}: {}", report.reference, report.status),
    }

    for layer in &report.layers {
        match &layer.outcome {
            LayerOutcome::Written(path) => info!("  {} -> {}", layer.digest, path.display()),
            LayerOutcome::Failed(e) => error!("  {}: {} failed: {}", layer.digest, e.phase(), e),
            LayerOutcome::Ambiguous => warn!("  {}: ambiguous", layer.digest),
            LayerOutcome::NotFound => info!("  {}: not found", layer.digest),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode
{
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    let mut references = cli.references.clone();
    if let Some(file) = &cli.file {
        match tokio::fs::read_to_string(file).await {
            Ok(content) => references.extend(parse_reference_list(&content)),
            Err(e) => {
                error!("Cannot read reference list {}: {}", file.display(), e);
                return ExitCode::FAILURE;
            },
        }
    }

    if references.is_empty() {
        error!("No image references given, pass them as arguments or with --file");
        return ExitCode::FAILURE;
    }

    let mode = match connection_mode(&cli) {
        Ok(mode) => mode,
        Err(e) => {
            error!("Cannot set up TLS: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let config = ExtractConfig {
        concurrency: cli.concurrency.get(),
        annotation_key: cli.annotation_key,
        annotation_value: cli.annotation_value,
        file_suffix: cli.suffix,
        output_root: cli.output,
        ..Default::default()
    };

    info!("Processing {} references, {} at a time, into {}",
          references.len(), config.concurrency, config.output_root.display());

    let summary = dispatcher::run(Arc::new(RegistrySource::new(mode)), references, Arc::new(config)).await;

    for report in summary.reports() {
        log_report(report);
    }
    info!("{}", summary);

    if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_follow_library()
    {
        let cli = Cli::try_parse_from(["modelcard-extract", "quay.io/org/model:1.0"]).unwrap();
        let defaults = ExtractConfig::default();

        assert_eq!(cli.concurrency.get(), defaults.concurrency);
        assert_eq!(cli.output, defaults.output_root);
        assert_eq!(cli.annotation_key, defaults.annotation_key);
        assert_eq!(cli.annotation_value, defaults.annotation_value);
        assert_eq!(cli.suffix, defaults.file_suffix);
    }

    #[test]
    fn zero_concurrency_is_rejected()
    {
        assert!(Cli::try_parse_from(["modelcard-extract", "-j", "0", "ref"]).is_err());
        assert_eq!(Cli::try_parse_from(["modelcard-extract", "-j", "2", "ref"]).unwrap().concurrency.get(), 2);
    }

    #[test]
    fn insecure_conflicts_with_root_ca()
    {
        assert!(Cli::try_parse_from(["modelcard-extract", "--insecure", "--root-ca", "ca.pem", "ref"]).is_err());
    }
}

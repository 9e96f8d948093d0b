use std::sync::Arc;

use log::{error, info};
use tokio::sync::Semaphore;

use crate::config::ExtractConfig;
use crate::error::Error;
use crate::pipeline::process_reference;
use crate::report::{ReferenceReport, Summary};
use crate::source::ImageSource;
use crate::writer::Writer;

/// Runs one pipeline task per reference with at most `config.concurrency`
/// of them in flight, and waits for all of them.
///
/// A slot is taken before a task is spawned and held by the task until it
/// returns, panics included. Failures stay in their own report.
pub async fn run<S: ImageSource + 'static>(
    source: Arc<S>,
    references: Vec<String>,
    config: Arc<ExtractConfig>,
) -> Summary
{
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let writer = Arc::new(Writer::init(&config.output_root));

    let mut tasks = Vec::with_capacity(references.len());
    let mut early = Vec::new();

    for (index, reference) in references.into_iter().enumerate() {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("[{}] Could not acquire a slot: {}", reference, e);
                early.push((index, ReferenceReport::failed(&reference, Error::Dispatch(e.to_string()))));
                continue;
            },
        };

        let source = source.clone();
        let config = config.clone();
        let writer = writer.clone();
        let task_reference = reference.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let reference = task_reference;

            info!("Starting processing for: {}", reference);
            let report = process_reference(source.as_ref(), &reference, &config, &writer).await;
            info!("Completed processing for: {} ({})", reference, report.status);

            report
        });

        tasks.push((index, reference, handle));
    }

    let mut reports = early;
    for (index, reference, handle) in tasks {
        match handle.await {
            Ok(report) => reports.push((index, report)),
            Err(e) => {
                error!("[{}] Task did not complete: {}", reference, e);
                reports.push((index, ReferenceReport::failed(&reference, Error::TaskPanicked(e.to_string()))));
            },
        }
    }

    reports.sort_by_key(|(index, _)| *index);
    let summary = Summary::from_reports(reports.into_iter().map(|(_, report)| report).collect());

    info!("All references processed");
    summary
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::layer::LayerDescriptor;
    use crate::report::Status;
    use crate::source::BlobStream;
    use crate::test_utils::{FakeImage, FakeSource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn references(n: usize) -> Vec<String>
    {
        (0..n).map(|i| format!("reg.example/model-{i}:1.0")).collect()
    }

    fn config(tmp: &TempDir, concurrency: usize) -> Arc<ExtractConfig>
    {
        Arc::new(ExtractConfig {
            concurrency,
            output_root: tmp.path().to_path_buf(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn concurrency_is_bounded()
    {
        let tmp = TempDir::new().unwrap();
        let refs = references(20);

        let mut source = FakeSource::new(
            refs.iter()
                .map(|r| (r.clone(), FakeImage::with_model_card(&[("README.md", b"card")])))
                .collect()
        );
        source.delay = Duration::from_millis(20);
        let source = Arc::new(source);

        let summary = run(source.clone(), refs, config(&tmp, 5)).await;

        // a reference counts as active from resolve until its file is written
        assert_eq!(summary.extracted, 20);
        assert!(source.peak() <= 5, "peak concurrency {}", source.peak());
        assert!(source.peak() > 1, "references were not processed in parallel");
        assert_eq!(source.active(), 0);
    }

    #[tokio::test]
    async fn serial_when_limit_is_one()
    {
        let tmp = TempDir::new().unwrap();
        let refs = references(4);

        let mut source = FakeSource::new(
            refs.iter().map(|r| (r.clone(), FakeImage::default())).collect()
        );
        source.delay = Duration::from_millis(5);
        let source = Arc::new(source);

        run(source.clone(), refs, config(&tmp, 1)).await;

        assert_eq!(source.peak(), 1);
    }

    #[tokio::test]
    async fn failures_are_isolated()
    {
        let tmp = TempDir::new().unwrap();
        let refs = references(20);

        // every image but the eighth resolves
        let images: HashMap<_, _> = refs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 7)
            .map(|(_, r)| (r.clone(), FakeImage::with_model_card(&[("README.md", r.as_bytes())])))
            .collect();

        let summary = run(Arc::new(FakeSource::new(images)), refs.clone(), config(&tmp, 5)).await;

        assert_eq!(summary.reports().len(), 20);
        assert_eq!(summary.extracted, 19);
        assert_eq!(summary.failed, 1);
        assert!(summary.has_failures());

        for (report, reference) in summary.reports().iter().zip(&refs) {
            assert_eq!(&report.reference, reference);
        }
        assert_eq!(summary.reports()[7].status, Status::Failed);

        let written = tmp.path().join("reg.example_model-3_1.0/README.md");
        assert_eq!(std::fs::read(written).unwrap(), b"reg.example/model-3:1.0");
    }

    struct PanickingSource;

    #[async_trait]
    impl ImageSource for PanickingSource
    {
        type Handle = ();

        async fn resolve(&self, reference: &str) -> Result<(), Error>
        {
            if reference == "boom" {
                panic!("resolver blew up");
            }
            Ok(())
        }

        async fn layers(&self, _handle: &()) -> Result<Vec<LayerDescriptor>, Error>
        {
            Ok(Vec::new())
        }

        async fn open_blob(&self, _handle: &(), _layer: &LayerDescriptor) -> Result<BlobStream, Error>
        {
            unreachable!("no layers are listed")
        }
    }

    #[tokio::test]
    async fn panic_releases_slot()
    {
        let tmp = TempDir::new().unwrap();
        let refs = vec!["boom".to_string(), "fine-1".to_string(), "fine-2".to_string()];

        // a leaked slot would block the remaining references forever
        let summary = run(Arc::new(PanickingSource), refs, config(&tmp, 1)).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_found, 2);
        assert!(matches!(summary.reports()[0].error, Some(Error::TaskPanicked(_))));
    }

    #[tokio::test]
    async fn no_references()
    {
        let tmp = TempDir::new().unwrap();
        let summary = run(Arc::new(FakeSource::default()), Vec::new(), config(&tmp, 5)).await;

        assert_eq!(summary.reports().len(), 0);
        assert!(!summary.has_failures());
    }
}

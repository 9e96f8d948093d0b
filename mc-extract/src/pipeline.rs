use log::{debug, error, info, warn};

use crate::archive::{scan_layer, ExtractionOutcome};
use crate::config::ExtractConfig;
use crate::layer::{select_layers, LayerDescriptor};
use crate::report::{LayerOutcome, LayerReport, ReferenceReport};
use crate::source::ImageSource;
use crate::writer::Writer;

async fn process_layer<S: ImageSource>(
    source: &S,
    handle: &S::Handle,
    reference: &str,
    layer: &LayerDescriptor,
    config: &ExtractConfig,
    writer: &Writer,
) -> LayerOutcome
{
    info!("[{}] Fetching layer {} ({}, {} bytes)", reference, layer.digest, layer.media_type, layer.size);

    let blob = match source.open_blob(handle, layer).await {
        Ok(blob) => blob,
        Err(e) => {
            error!("[{}] Layer {}: {} failed: {}", reference, layer.digest, e.phase(), e);
            return LayerOutcome::Failed(e);
        },
    };

    match scan_layer(blob, &layer.media_type, config).await {
        ExtractionOutcome::Extracted { file_name, content } => {
            info!("[{}] Layer {}: found single {} file: {} ({} bytes)",
                  reference, layer.digest, config.file_suffix, file_name, content.len());

            match writer.write(reference, &file_name, &content).await {
                Ok(path) => {
                    info!("[{}] Wrote {}", reference, path.display());
                    LayerOutcome::Written(path)
                },
                Err(e) => {
                    error!("[{}] Layer {}: {} failed: {}", reference, layer.digest, e.phase(), e);
                    LayerOutcome::Failed(e)
                },
            }
        },
        ExtractionOutcome::Ambiguous => {
            warn!("[{}] Layer {}: more than one {} file, nothing written", reference, layer.digest, config.file_suffix);
            LayerOutcome::Ambiguous
        },
        ExtractionOutcome::NotFound => {
            info!("[{}] Layer {}: no {} file", reference, layer.digest, config.file_suffix);
            LayerOutcome::NotFound
        },
        ExtractionOutcome::Failed(e) => {
            error!("[{}] Layer {}: {} failed: {}", reference, layer.digest, e.phase(), e);
            LayerOutcome::Failed(e)
        },
    }
}

/// Runs every step for one reference: resolve, select the annotated layers,
/// then scan each of them and write what was found.
///
/// Never fails as a whole; every error ends up in the returned report.
pub async fn process_reference<S: ImageSource>(
    source: &S,
    reference: &str,
    config: &ExtractConfig,
    writer: &Writer,
) -> ReferenceReport
{
    info!("[{}] Resolving manifest", reference);

    let handle = match source.resolve(reference).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("[{}] {} failed: {}", reference, e.phase(), e);
            return ReferenceReport::failed(reference, e);
        },
    };

    let layers = match source.layers(&handle).await {
        Ok(layers) => layers,
        Err(e) => {
            error!("[{}] {} failed: {}", reference, e.phase(), e);
            return ReferenceReport::failed(reference, e);
        },
    };

    for layer in &layers {
        debug!("[{}] Layer {} ({}, {} bytes) annotations: {:?}",
               reference, layer.digest, layer.media_type, layer.size, layer.annotations);
    }

    let selected = select_layers(&layers, &config.annotation_key, &config.annotation_value);
    info!("[{}] {} of {} layers annotated {}={}",
          reference, selected.len(), layers.len(), config.annotation_key, config.annotation_value);

    let mut reports = Vec::with_capacity(selected.len());
    for layer in selected {
        let outcome = process_layer(source, &handle, reference, layer, config, writer).await;
        reports.push(LayerReport { digest: layer.digest.clone(), outcome });
    }

    ReferenceReport::from_layers(reference, reports)
}

//! Fixtures shared by unit tests: in-memory layer archives and an image source double.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use mc_registry::Error as RegistryError;

use crate::error::Error;
use crate::layer::LayerDescriptor;
use crate::source::{BlobStream, ImageSource};

pub const ANNOTATION_KEY: &str = "io.opendatahub.modelcar.layer.type";
pub const TAR_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";

pub fn tar_archive(files: &[(&str, &[u8])]) -> Vec<u8>
{
    let mut builder = tar::Builder::new(Vec::new());

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        builder.append_data(&mut header, name, *content).unwrap();
    }

    builder.into_inner().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8>
{
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn layer(digest: &str, media_type: &str, annotations: &[(&str, &str)]) -> LayerDescriptor
{
    LayerDescriptor {
        digest: digest.to_string(),
        media_type: media_type.to_string(),
        size: 0,
        annotations: annotations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[derive(Default)]
pub struct FakeImage
{
    pub layers: Vec<LayerDescriptor>,
    pub blobs: HashMap<String, Vec<u8>>,
}

impl FakeImage
{
    /// Image with a single annotated gzip layer holding `files`.
    pub fn with_model_card(files: &[(&str, &[u8])]) -> Self
    {
        let digest = "sha256:modelcard";
        FakeImage {
            layers: vec![
                layer("sha256:weights", TAR_GZIP, &[]),
                layer(digest, TAR_GZIP, &[(ANNOTATION_KEY, "modelcard")]),
            ],
            blobs: HashMap::from([(digest.to_string(), gzip(&tar_archive(files)))]),
        }
    }
}

/// Resolved image of a `FakeSource`. Counts as active until dropped, which
/// happens when the pipeline for its reference is done.
pub struct FakeHandle
{
    reference: String,
    active: Arc<AtomicUsize>,
}

impl Drop for FakeHandle
{
    fn drop(&mut self)
    {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Image source serving canned images. Tracks how many pipelines hold a
/// resolved image at the same time.
#[derive(Default)]
pub struct FakeSource
{
    pub images: HashMap<String, FakeImage>,
    pub delay: Duration,
    active: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

impl FakeSource
{
    pub fn new(images: HashMap<String, FakeImage>) -> Self
    {
        FakeSource { images, ..Default::default() }
    }

    pub fn peak(&self) -> usize
    {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize
    {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for FakeSource
{
    type Handle = FakeHandle;

    async fn resolve(&self, reference: &str) -> Result<FakeHandle, Error>
    {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let handle = FakeHandle {
            reference: reference.to_string(),
            active: self.active.clone(),
        };

        tokio::time::sleep(self.delay).await;

        if !self.images.contains_key(reference) {
            return Err(Error::Resolution(RegistryError::StatusError(404)));
        }

        Ok(handle)
    }

    async fn layers(&self, handle: &FakeHandle) -> Result<Vec<LayerDescriptor>, Error>
    {
        Ok(self.images[&handle.reference].layers.clone())
    }

    async fn open_blob(&self, handle: &FakeHandle, layer: &LayerDescriptor) -> Result<BlobStream, Error>
    {
        // let the other pipelines run while this one is mid-layer
        tokio::time::sleep(self.delay).await;

        match self.images[&handle.reference].blobs.get(&layer.digest) {
            Some(blob) => Ok(Box::new(Cursor::new(blob.clone()))),
            None => Err(Error::Fetch(RegistryError::StatusError(404))),
        }
    }
}

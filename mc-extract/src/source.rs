use async_trait::async_trait;
use log::{debug, info, warn};
use mc_registry::{config::ConnectionMode, Client, Config, Digest, ImageReference};
use oci_spec::image::ImageManifest;
use tokio::io::AsyncRead;

use crate::error::Error;
use crate::layer::LayerDescriptor;

/// Byte stream of one layer. Owned by the caller and released when dropped.
pub type BlobStream = Box<dyn AsyncRead + Send + Unpin>;

/// Where images come from: turns a reference into a manifest and opens layer blobs.
#[async_trait]
pub trait ImageSource: Send + Sync
{
    type Handle: Send + Sync;

    async fn resolve(&self, reference: &str) -> Result<Self::Handle, Error>;

    /// Layers of the resolved image in manifest order.
    async fn layers(&self, handle: &Self::Handle) -> Result<Vec<LayerDescriptor>, Error>;

    async fn open_blob(&self, handle: &Self::Handle, layer: &LayerDescriptor) -> Result<BlobStream, Error>;
}

pub struct RemoteImage
{
    client: Client,
    image: ImageReference,
    manifest: ImageManifest,
}

/// Image source backed by OCI distribution registries.
///
/// A client is built per reference for the registry host the reference names,
/// all of them sharing the same connection mode.
pub struct RegistrySource
{
    mode: ConnectionMode,
}

impl RegistrySource
{
    pub fn new(mode: ConnectionMode) -> Self
    {
        RegistrySource { mode }
    }
}

#[async_trait]
impl ImageSource for RegistrySource
{
    type Handle = RemoteImage;

    async fn resolve(&self, reference: &str) -> Result<RemoteImage, Error>
    {
        let image = ImageReference::parse(reference).map_err(Error::Resolution)?;
        debug!("Parsed reference: {}", image);

        let config = Config::builder()
            .host(image.api_host().to_string())
            .mode(self.mode.clone());
        let client = Client::from_config(config).map_err(Error::Resolution)?;

        let manifest = client
            .get_manifest(image.repository(), image.reference().clone())
            .await
            .map_err(Error::Resolution)?;

        info!("Manifest of {} lists {} layers", image, manifest.layers().len());
        debug!("Manifest media type: {:?}, config {} ({} bytes)",
               manifest.media_type(), manifest.config().digest(), manifest.config().size());

        Ok(RemoteImage { client, image, manifest })
    }

    async fn layers(&self, handle: &RemoteImage) -> Result<Vec<LayerDescriptor>, Error>
    {
        Ok(handle.manifest.layers().iter().map(LayerDescriptor::from).collect())
    }

    async fn open_blob(&self, handle: &RemoteImage, layer: &LayerDescriptor) -> Result<BlobStream, Error>
    {
        let digest = Digest::try_from(layer.digest.as_str()).map_err(Error::Fetch)?;

        let blob = handle
            .client
            .get_blob_reader(handle.image.repository(), digest)
            .await
            .map_err(Error::Fetch)?;

        if let Some(length) = blob.len() {
            debug!("Blob {} is {} bytes", layer.digest, length);
        }
        if let Some(media_type) = blob.media_type() {
            debug!("Blob {} served as {}", layer.digest, media_type);
        }
        if blob.digest().as_ref().is_some_and(|served| served.to_string() != layer.digest) {
            warn!("Registry returned digest {:?} for blob {}", blob.digest(), layer.digest);
        }

        Ok(Box::new(blob))
    }
}

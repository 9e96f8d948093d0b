use std::pin::Pin;

use crate::{
    config::Config, error::Error, oci::{reference::{Digest, Reference}, service_url::{ServiceFile, ServiceUrl, DOCKER_MANIFEST_LIST_V2}}, utils
};
use bytes::Bytes;
use futures::stream::TryStreamExt;
use log::{debug, error, info, warn};
use oci_spec::image::{Arch, Descriptor, ImageIndex, ImageManifest as OciImageManifest, MediaType, Os};
use reqwest::{header::ACCEPT, Client as ReqwestClient, Response};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// Streaming body of a blob. Dropping it releases the underlying connection.
pub struct BlobReader {
    reader: Pin<Box<dyn AsyncRead + Send + 'static>>,
    length: Option<usize>,
    digest: Option<Digest>,
    media_type: Option<MediaType>,
}

impl BlobReader {
    pub fn init(reader: impl AsyncRead + Send + 'static, length: Option<usize>, media_type: Option<MediaType>, digest: Option<Digest>) -> Self {
        Self { reader: Box::pin(reader), length, media_type, digest }
    }

    pub fn len(&self) -> &Option<usize> {
        &self.length
    }

    pub fn media_type(&self) -> &Option<MediaType> {
        &self.media_type
    }

    pub fn digest(&self) -> &Option<Digest> {
        &self.digest
    }
}

impl AsyncRead for BlobReader
{
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

/// A manifest response, which is either an image manifest or an index of them.
enum ManifestDocument {
    Image(OciImageManifest),
    Index(ImageIndex),
}

impl ManifestDocument {
    fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;

        let is_index = match value.get("mediaType").and_then(|mt| mt.as_str()) {
            Some(media_type) => media_type == MediaType::ImageIndex.to_string() || media_type == DOCKER_MANIFEST_LIST_V2,
            None => value.get("manifests").is_some(),
        };

        if is_index {
            Ok(Self::Index(serde_json::from_value(value)?))
        } else {
            Ok(Self::Image(serde_json::from_value(value)?))
        }
    }
}

/// Entry of an image index to run on this host: the only entry when there is
/// one, otherwise the first linux entry for the host architecture.
pub fn select_platform_manifest(manifests: &[Descriptor]) -> Option<&Descriptor> {
    if let [only] = manifests {
        return Some(only);
    }

    let arch = Arch::default();
    manifests.iter().find(|descriptor| {
        descriptor
            .platform()
            .as_ref()
            .is_some_and(|platform| *platform.os() == Os::Linux && *platform.architecture() == arch)
    })
}

pub struct Client {
    url: ServiceUrl,
    reqwest_client: ReqwestClient,
}

impl Client {
    /// Create new image registry async client from given configuration
    pub fn from_config(config: Config) -> Result<Self, Error> {
        let Config {host, mode} = config;
        let url = ServiceUrl::init(mode.scheme(), host);
        match mode.into_rustls_config() {
            None => Ok (
                Self {
                    url,
                    reqwest_client: ReqwestClient::new(),
                }
            ),
            Some(client_config) => {
                let reqwest_client = ReqwestClient::builder()
                    .use_preconfigured_tls(client_config)
                    .build()
                    .map_err(Error::into_config)?;
                Ok (
                    Self {
                        url,
                        reqwest_client
                    }
                )
            }
        }
    }

    /// Fetch the image manifest of `reference`.
    ///
    /// When the reference names an image index (or a Docker manifest list) the
    /// manifest for linux on the host architecture is fetched in its place.
    pub async fn get_manifest(&self, repository: &str, reference: Reference) -> Result<OciImageManifest, Error> {
        let index = match self.get_manifest_document(repository, reference).await? {
            ManifestDocument::Image(manifest) => return Ok(manifest),
            ManifestDocument::Index(index) => index,
        };

        info!("Reference is an image index of {} manifests", index.manifests().len());

        let descriptor = select_platform_manifest(index.manifests())
            .ok_or_else(|| Error::PlatformNotFound(format!("{}/{}", Os::Linux, Arch::default())))?;
        info!("Selected platform manifest {}", descriptor.digest());

        let digest = Digest::try_from(descriptor.digest().as_str())?;
        match self.get_manifest_document(repository, Reference::Digest(digest)).await? {
            ManifestDocument::Image(manifest) => Ok(manifest),
            ManifestDocument::Index(_) => {
                error!("Image index points at another image index");
                Err(Error::PlatformNotFound(format!("{} (nested image index)", descriptor.digest())))
            }
        }
    }

    async fn get_manifest_document(&self, repository: &str, reference: Reference) -> Result<ManifestDocument, Error> {
        let response = self
            .get_response(repository, ServiceFile::Manifest(reference))
            .await?;

        let content_type = utils::content_type(response.headers());
        let document = ManifestDocument::parse(&Self::extract_bytes(response).await?)?;

        if let ManifestDocument::Image(manifest) = &document {
            debug!("Manifest media type: {:?}, {} layers", manifest.media_type(), manifest.layers().len());
            if !utils::verify_content_type(&content_type, manifest.media_type()) {
                warn!("Content-type doesn't match media-type");
            }
        }

        Ok(document)
    }

    pub async fn get_blob_reader(&self, repository: &str, digest: Digest) -> Result<BlobReader, Error> {
        let response = self
            .get_response(repository, ServiceFile::Blob(digest))
            .await?;

        let content_length = utils::content_length(response.headers());
        let content_type = utils::content_type(response.headers())
            .map(|ct| MediaType::from(ct.as_str()));
        let content_digest = utils::docker_content_digest(response.headers());
        let digest = content_digest.map(|cd| Digest::try_from(cd.as_str()))
            .transpose()
            .map_err(|_| Error::ResponseDigestInvalid)?;

        Ok(BlobReader::init(StreamReader::new(response.bytes_stream().map_err(std::io::Error::other)),
                            content_length, content_type, digest))
    }

    async fn extract_bytes(response: Response) -> Result<Bytes, Error> {
        let content_length = utils::content_length(response.headers());
        let content_digest = utils::docker_content_digest(response.headers());

        let bytes = response.bytes().await.map_err(|e| Error::ConnectionError(e.to_string()))?;

        if let Some(cl) = content_length {
            debug!("Content-Length: {cl}");
            if cl != bytes.len() {
                error!("Response length doesn't match servers content-length");
                return Err(Error::ResponseLengthInvalid);
            }
        }

        if let Some(cd) = content_digest {
            debug!("Docker-content-digest: {cd}");
            let digest = Digest::try_from(cd.as_str()).map_err(|_| Error::ResponseDigestInvalid)?;
            if !utils::verify_digest(&digest, &bytes) {
                error!("Response digest doesn't match servers docker-content-digest");
                return Err(Error::ResponseDigestInvalid);
            }
        }

        Ok(bytes)
    }

    async fn get_response(&self, repository: &str, file: ServiceFile) -> Result<Response, Error> {
        let accepted_types = file.supported_media_types();
        let url = self.url.get_url_path(repository, file)?;

        info!("Fetching response from {}", url);
        debug!("Supported media types: {}", accepted_types.join(","));

        match self
            .reqwest_client
            .get(url)
            .header(ACCEPT, accepted_types.join(","))
            .send()
            .await
            .inspect_err(|e| error!("Failed to send request: {}", e))
        {
            Ok(response) => {
                if response.status().is_success() {
                    if let Some(content_type_str) = utils::content_type(response.headers()) {
                        debug!("Content-Type:\"{content_type_str}\"");

                        if !accepted_types.contains(&content_type_str) {
                            warn!("Server returned unsupported content type");
                        }
                    }

                    Ok(response)
                } else {
                    Err(Error::StatusError(response.status().as_u16()))
                }
            }
            Err(err) => {
                if let Some(status_error) = err.status() {
                    Err(Error::StatusError(status_error.as_u16()))
                } else {
                    Err(Error::ConnectionError(err.to_string()))
                }
            }
        }
    }
}

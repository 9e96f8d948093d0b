use crate::error::Error;
use crate::oci::reference::{Digest, Reference};

use oci_spec::image::MediaType;
use url::Url;

pub(crate) const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub(crate) const DOCKER_MANIFEST_LIST_V2: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
const DOCKER_LAYER_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

pub(crate) enum ServiceFile {
    Manifest(Reference),
    Blob(Digest),
}

impl ServiceFile {
    const MANIFEST_PATH: &'static str = "manifests/";
    const BLOBS_PATH: &'static str = "blobs/";

    pub fn get_file_uri(&self) -> String {
        match self {
            Self::Manifest(reference) => format!("{}{}", Self::MANIFEST_PATH, reference),
            Self::Blob(digest) => format!("{}{}", Self::BLOBS_PATH, digest),
        }
    }

    pub fn supported_media_types(&self) -> Vec<String> {
        match self {
            Self::Manifest(_) => vec![
                MediaType::ImageManifest.to_string(),
                DOCKER_MANIFEST_V2.to_string(),
                MediaType::ImageIndex.to_string(),
                DOCKER_MANIFEST_LIST_V2.to_string()],
            Self::Blob(_) => vec![
                MediaType::ImageLayer.to_string(),
                MediaType::ImageLayerGzip.to_string(),
                MediaType::ImageLayerZstd.to_string(),
                DOCKER_LAYER_GZIP.to_string(),
                mime::APPLICATION_OCTET_STREAM.to_string()],
        }
    }
}

pub(crate) struct Scheme {
    scheme: &'static str,
}

impl Scheme {
    pub const fn init(scheme: &'static str) -> Self {
        Self {
            scheme
        }
    }

    pub const fn as_str(&self) -> &'static str {
        self.scheme
    }

    fn name(&self) -> &'static str {
        self.scheme.trim_end_matches("://")
    }
}

pub(crate) const HTTPS_SCHEME: Scheme = Scheme::init("https://");
pub(crate) const HTTP_SCHEME: Scheme = Scheme::init("http://");

impl PartialEq<&str> for Scheme {
    fn eq(&self, other: &&str) -> bool {
        &self.scheme == other || &self.name() == other
    }
}

// Accept "localhost:1337" the same as "https://localhost:1337" or "http://localhost:1337".
// Correct scheme will be added, when not passed by user. Otherwise it will be validated.
fn make_url(user: &str, scheme: &Scheme) -> Result<Url, Error> {
    if let Ok(user_parsed) = Url::parse(user) {
        // Otherwise scheme will be empty
        if user_parsed.has_host() {
            let user_scheme = user_parsed.scheme().to_owned();
            return (scheme == &user_parsed.scheme())
                .then_some(user_parsed)
                .ok_or(Error::UrlParsingError(format!("Invalid user scheme: {}", user_scheme)));
        }
    }

    Ok(Url::parse(&format!("{}{}", scheme.as_str(), user))?)
}

pub(crate) struct ServiceUrl {
    scheme: &'static Scheme,
    host: String,
}

impl ServiceUrl {
    const VERSION_PATH: &'static str = "v2/";

    pub fn init(scheme: &'static Scheme, host: String) -> Self {
        Self { scheme, host }
    }

    fn base_url(&self) -> Result<Url, Error> {
        Ok(make_url(&self.host, self.scheme)?.join(Self::VERSION_PATH)?)
    }

    pub fn get_url_path(&self, repository: &str, file: ServiceFile) -> Result<Url, Error> {
        let repository_path = &format!("{}/", repository);

        Ok(self
            .base_url()?
            .join(repository_path)?
            .join(&file.get_file_uri())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn manifest_url() {
        let url = ServiceUrl::init(&HTTPS_SCHEME, "quay.io".to_string());
        let reference = Reference::try_from("1.4").unwrap();
        assert_eq!(
            url.get_url_path("org/model", ServiceFile::Manifest(reference)).unwrap().as_str(),
            "https://quay.io/v2/org/model/manifests/1.4"
        );
    }

    #[test]
    fn blob_url() {
        let url = ServiceUrl::init(&HTTP_SCHEME, "localhost:5000".to_string());
        let digest = Digest::try_from(SHA).unwrap();
        assert_eq!(
            url.get_url_path("models/card", ServiceFile::Blob(digest)).unwrap().as_str(),
            format!("http://localhost:5000/v2/models/card/blobs/{SHA}")
        );
    }

    #[test]
    fn explicit_scheme_must_match() {
        let url = ServiceUrl::init(&HTTPS_SCHEME, "http://quay.io".to_string());
        let reference = Reference::try_from("latest").unwrap();
        assert!(matches!(
            url.get_url_path("org/model", ServiceFile::Manifest(reference)),
            Err(Error::UrlParsingError(_))
        ));
    }

    #[test]
    fn manifest_accepts_indexes() {
        let reference = Reference::try_from("latest").unwrap();
        let accepted = ServiceFile::Manifest(reference).supported_media_types();
        assert!(accepted.contains(&"application/vnd.oci.image.index.v1+json".to_string()));
        assert!(accepted.contains(&DOCKER_MANIFEST_LIST_V2.to_string()));
    }
}

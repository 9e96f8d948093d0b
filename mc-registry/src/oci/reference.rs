use std::fmt::Display;

use crate::error::{self, Error};
use log::{debug, error};
use regex::Regex;

pub(crate) const SHA_256: &str = "sha256";
pub(crate) const SHA_512: &str = "sha512";

const DEFAULT_REGISTRY: &str = "docker.io";
const DEFAULT_REGISTRY_API: &str = "registry-1.docker.io";
const DEFAULT_TAG: &str = "latest";
const OFFICIAL_NAMESPACE: &str = "library/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashType {
    Sha256,
    Sha512
}

impl Display for HashType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => f.write_str(SHA_256),
            Self::Sha512 => f.write_str(SHA_512)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    hash_type: HashType,
    value: String,
}

impl Digest {
    const REGEX: &'static str = r"^([a-z0-9]+(?:[+._-][a-z0-9]+)*):([a-zA-Z0-9=_-]+)$";

    pub fn hash_type(&self) -> &HashType {
        &self.hash_type
    }

    /// Hex encoded hash, without the algorithm prefix.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn from_str(value: &str) -> Option<Self> {
        let digest_re = Regex::new(Self::REGEX).expect("Digest regex is malformed");
        let captures = digest_re.captures(value)?;

        let (_, [algorithm, digest]) = captures.extract();
        match (algorithm, digest.len()) {
            (SHA_256, 64) => Some(
                Digest { hash_type: HashType::Sha256, value: digest.to_string() }
            ),
            (SHA_256, _) => {
                error!("Wrong length for sha256: {}", digest.len());
                None
            },

            (SHA_512, 128) => Some(
                Digest { hash_type: HashType::Sha512, value: digest.to_string() }
            ),
            (SHA_512, _) => {
                error!("Wrong length for sha512: {}", digest.len());
                None
            },
            (a, _) => {
                error!("Unrecognized digest algorithm: {}", a);
                None
            }
        }
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hash_type, self.value)
    }
}

impl TryFrom<&str> for Digest {
    type Error = error::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value).ok_or(Error::DigestInvalidError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(String);

impl Tag {
    const REGEX: &'static str = r"^[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}$";

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_str(value: &str) -> Option<Self> {
        let tag_re = Regex::new(Self::REGEX).expect("Tag regex is malformed");
        match tag_re.is_match(value) {
            true => Some(Tag(value.to_string())),
            false => {
                debug!("\"{value}\" is not a tag");
                None
            },
        }
    }
}

impl TryFrom<&str> for Tag {
    type Error = error::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value).ok_or(Error::TagInvalidError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Digest(Digest),
    Tag(Tag),
}

impl TryFrom<&str> for Reference {
    type Error = error::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if let Ok(digest) = Digest::try_from(value) {
            debug!("Reference \"{value}\" is a digest");
            return Ok(Self::Digest(digest));
        }

        if let Ok(tag) = Tag::try_from(value) {
            debug!("Reference \"{value}\" is a tag");
            return Ok(Self::Tag(tag));
        }

        error!("Reference is not a digest nor a tag");
        Err(Error::ReferenceInvalidError(value.to_string()))
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest(digest) => digest.fmt(f),
            Self::Tag(tag) => f.write_str(tag.as_str()),
        }
    }
}

/// Fully qualified image reference, e.g. `quay.io/org/model:1.0` or
/// `quay.io/org/model@sha256:...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    registry: String,
    repository: String,
    reference: Reference,
}

impl ImageReference {
    /// Parses `[registry/]repository[:tag][@digest]`.
    ///
    /// The first path component is taken as the registry host when it contains
    /// a `.` or a `:`, or is `localhost`. Otherwise the image lives on Docker Hub,
    /// where single segment names belong to the `library/` namespace. A missing
    /// tag means `latest`; a digest takes precedence over a tag.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let invalid = || Error::ReferenceInvalidError(value.to_string());

        let value = value.trim();
        if value.is_empty() {
            error!("Empty image reference");
            return Err(invalid());
        }

        let (name_tag, digest) = match value.rsplit_once('@') {
            Some((name_tag, digest)) => (name_tag, Some(digest)),
            None => (value, None),
        };

        // the tag separator is the last colon after the last slash,
        // earlier colons belong to a registry port
        let last_segment = name_tag.rfind('/').map(|pos| pos + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_segment..].rfind(':') {
            Some(pos) => (&name_tag[..last_segment + pos], Some(&name_tag[last_segment + pos + 1..])),
            None => (name_tag, None),
        };

        let (registry, repository) = Self::split_registry_repository(name).ok_or_else(invalid)?;

        let reference = match (digest, tag) {
            (Some(digest), _) => Reference::Digest(Digest::try_from(digest).map_err(|_| {
                error!("Invalid digest in reference \"{value}\"");
                invalid()
            })?),
            (None, Some(tag)) => Reference::Tag(Tag::try_from(tag).map_err(|_| {
                error!("Invalid tag in reference \"{value}\"");
                invalid()
            })?),
            (None, None) => Reference::Tag(Tag(DEFAULT_TAG.to_string())),
        };

        Ok(Self { registry, repository, reference })
    }

    fn split_registry_repository(name: &str) -> Option<(String, String)> {
        if let Some((first, rest)) = name.split_once('/') {
            if first.contains('.') || first.contains(':') || first == "localhost" {
                if rest.is_empty() {
                    error!("Empty repository in reference \"{name}\"");
                    return None;
                }
                return Some((first.to_string(), rest.to_string()));
            }
        }

        if name.is_empty() {
            return None;
        }

        let repository = if name.contains('/') {
            name.to_string()
        } else {
            format!("{}{}", OFFICIAL_NAMESPACE, name)
        };

        Some((DEFAULT_REGISTRY.to_string(), repository))
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Host serving the distribution API for this registry.
    pub fn api_host(&self) -> &str {
        match self.registry.as_str() {
            DEFAULT_REGISTRY => DEFAULT_REGISTRY_API,
            registry => registry,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }
}

impl Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reference {
            Reference::Tag(tag) => write!(f, "{}/{}:{}", self.registry, self.repository, tag.as_str()),
            Reference::Digest(digest) => write!(f, "{}/{}@{}", self.registry, self.repository, digest),
        }
    }
}

mod utils;

pub mod config;
pub mod error;
pub mod oci;

pub use config::{load_root_cert_store, Config};
pub use error::Error;
pub use oci::client::{BlobReader, Client};
pub use oci::reference::{Digest, ImageReference, Reference, Tag};
pub use utils::verify_digest;

pub mod archive;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod layer;
pub mod pipeline;
pub mod report;
pub mod sanitize;
pub mod source;
pub mod writer;

#[cfg(test)]
mod test_utils;

pub use config::ExtractConfig;
pub use error::Error;

pub mod client;
pub mod reference;
pub(crate) mod service_url;

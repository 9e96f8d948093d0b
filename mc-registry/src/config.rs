use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use rustls::{ClientConfig, RootCertStore};

use crate::error::Error;
use crate::oci::service_url::{Scheme, HTTPS_SCHEME, HTTP_SCHEME};

#[derive(Clone)]
pub enum ConnectionMode {
    None,
    /// TLS verified against the roots bundled with the HTTP client
    RusTLS,
    CustomTLS(ClientConfig),
}

pub struct Config {
    pub(crate) host: String,
    pub(crate) mode: ConnectionMode,
}

impl Config {
    pub fn builder() -> ConfigBuilder<WantsConfig> {
        ConfigBuilder {
            state: WantsConfig {}
        }
    }
}

impl ConnectionMode {
    pub fn is_secure(&self) -> bool {
        !matches!(self, ConnectionMode::None)
    }

    pub(crate) fn scheme(&self) -> &'static Scheme {
        match self {
            ConnectionMode::None => &HTTP_SCHEME,
            ConnectionMode::RusTLS => &HTTPS_SCHEME,
            ConnectionMode::CustomTLS(_) => &HTTPS_SCHEME,
        }
    }

    /// TLS verified against the root certificates of a PEM bundle.
    pub fn with_root_ca(path: impl AsRef<Path>) -> Result<Self, Error> {
        let rustls_config = ClientConfig::builder()
            .with_root_certificates(load_root_cert_store(path)?)
            .with_no_client_auth();
        Ok(ConnectionMode::CustomTLS(rustls_config))
    }

    pub fn into_rustls_config(self) -> Option<ClientConfig> {
        match self {
            ConnectionMode::None => None,
            ConnectionMode::RusTLS => None,
            ConnectionMode::CustomTLS(config) => Some(config),
        }
    }
}

pub struct ConfigBuilder<S> {
    state: S,
}

pub struct WantsConfig {}

pub struct WantsHost {
    pub(crate) host: String,
}

impl ConfigBuilder<WantsConfig> {
    pub fn host(self, host: String) -> ConfigBuilder<WantsHost> {
        ConfigBuilder {
            state: WantsHost {
                host
            }
        }
    }
}

impl ConfigBuilder<WantsHost> {
    pub fn no_tls(self) -> Config {
        Config {
            host: self.state.host,
            mode: ConnectionMode::None,
        }
    }

    pub fn tls(self) -> Config {
        Config {
            host: self.state.host,
            mode: ConnectionMode::RusTLS,
        }
    }

    pub fn mode(self, mode: ConnectionMode) -> Config {
        Config {
            host: self.state.host,
            mode,
        }
    }
}

/// Reads every certificate of a PEM bundle into a root store.
pub fn load_root_cert_store(path: impl AsRef<Path>) -> Result<RootCertStore, Error> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut root_cert_store = RootCertStore::empty();

    for cert in rustls_pemfile::certs(&mut reader) {
        root_cert_store
            .add(cert?)
            .map_err(|e| Error::TlsConfigError(e.to_string()))?;
    }

    if root_cert_store.is_empty() {
        return Err(Error::TlsConfigError(format!(
            "No certificates found in {}", path.as_ref().display()
        )));
    }

    debug!("Loaded {} root certificates", root_cert_store.len());
    Ok(root_cert_store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_follows_mode() {
        let config = Config::builder().host("localhost:5000".to_string()).no_tls();
        assert!(!config.mode.is_secure());
        assert_eq!(config.mode.scheme().as_str(), "http://");

        let config = Config::builder().host("quay.io".to_string()).tls();
        assert!(config.mode.is_secure());
        assert_eq!(config.mode.scheme().as_str(), "https://");
        assert!(config.mode.into_rustls_config().is_none());
    }

    #[test]
    fn missing_root_ca() {
        assert!(matches!(
            load_root_cert_store("/nonexistent/root-ca.crt"),
            Err(Error::IOError(_))
        ));
    }

    #[test]
    fn empty_root_ca() {
        let path = std::env::temp_dir().join(format!("mc-registry-empty-ca-{}.pem", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let result = load_root_cert_store(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::TlsConfigError(_))));
    }
}

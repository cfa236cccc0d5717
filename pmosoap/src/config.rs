//! Client configuration
//!
//! Only the target URL, basic-auth credentials, TLS settings and the idle
//! pool size are recognized. `Config` can be loaded from YAML alongside the
//! rest of an application's settings; TLS material is always provided in
//! code.

use reqwest::{Certificate, tls};
use serde::Deserialize;

/// Credentials sent as `Authorization: Basic ...`. Never part of the payload.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// TLS settings applied to the underlying HTTP client
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Extra trust anchors, on top of the system ones
    pub root_certificates: Vec<Certificate>,

    /// Disables certificate validation (self-signed appliances)
    pub accept_invalid_certs: bool,

    /// Lowest protocol version accepted
    pub min_version: Option<tls::Version>,
}

/// Configuration of a [`SoapClient`](crate::SoapClient)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic_auth: Option<BasicAuth>,

    #[serde(skip)]
    pub tls: Option<TlsConfig>,

    /// Idle connections kept per host. Calls ask for `Connection: close`
    /// anyway, so this mostly matters for servers that ignore it.
    pub max_idle_conns_per_host: Option<usize>,
}

impl Config {
    /// Builds the HTTP client described by this configuration.
    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(max_idle) = self.max_idle_conns_per_host {
            builder = builder.pool_max_idle_per_host(max_idle);
        }

        if let Some(tls) = &self.tls {
            for certificate in &tls.root_certificates {
                builder = builder.add_root_certificate(certificate.clone());
            }
            if let Some(version) = tls.min_version {
                builder = builder.min_tls_version(version);
            }
            builder = builder.danger_accept_invalid_certs(tls.accept_invalid_certs);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
basic_auth:
  username: user
  password: pass
max_idle_conns_per_host: 4
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.basic_auth, Some(BasicAuth::new("user", "pass")));
        assert_eq!(config.max_idle_conns_per_host, Some(4));
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();

        assert!(config.basic_auth.is_none());
        assert!(config.max_idle_conns_per_host.is_none());
        assert!(config.http_client().is_ok());
    }

    #[test]
    fn test_password_is_not_logged() {
        let auth = BasicAuth::new("user", "secret");

        assert!(!format!("{auth:?}").contains("secret"));
    }

    #[test]
    fn test_tls_settings_build() {
        let config = Config {
            tls: Some(TlsConfig {
                accept_invalid_certs: true,
                min_version: Some(tls::Version::TLS_1_2),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(config.http_client().is_ok());
    }

    #[test]
    fn test_root_certificate_build() {
        let pem = include_bytes!("../tests/data/self_signed.pem");
        let config = Config {
            tls: Some(TlsConfig {
                root_certificates: vec![Certificate::from_pem(pem).unwrap()],
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(config.http_client().is_ok());
    }
}

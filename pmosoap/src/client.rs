//! HTTP client for SOAP endpoints

use reqwest::StatusCode;
use reqwest::header::{CONNECTION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::body::Body;
use crate::config::{BasicAuth, Config, TlsConfig};
use crate::envelope::{Envelope, Header};
use crate::error::{Error, Result};

/// Content-Type of every request
pub const CONTENT_TYPE_XML: &str = r#"text/xml; charset="utf-8""#;

/// Name of the HTTP header carrying the action
pub const SOAP_ACTION: &str = "SOAPAction";

/// SOAP client bound to one endpoint URL
///
/// A client is configured first (`add_header` takes `&mut self`), then
/// shared: `call` takes `&self` and may run concurrently from several tasks,
/// for instance behind an `Arc`.
///
/// # Example
///
/// ```no_run
/// use pmosoap::SoapClient;
/// use serde::{Deserialize, Serialize};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Serialize)]
/// #[serde(rename = "GetVolume")]
/// struct GetVolume {
///     #[serde(rename = "@xmlns")]
///     xmlns: &'static str,
///     #[serde(rename = "InstanceID")]
///     instance_id: u32,
/// }
///
/// #[derive(Default, Deserialize)]
/// struct GetVolumeResponse {
///     #[serde(rename = "CurrentVolume")]
///     current_volume: u16,
/// }
///
/// # async fn run() -> pmosoap::Result<()> {
/// let client = SoapClient::builder("http://192.168.1.20:1400/RenderingControl/Control")
///     .basic_auth("user", "pass")
///     .build()?;
///
/// let request = GetVolume {
///     xmlns: "urn:schemas-upnp-org:service:RenderingControl:1",
///     instance_id: 0,
/// };
/// let mut response = GetVolumeResponse::default();
/// client
///     .call(
///         &CancellationToken::new(),
///         "urn:schemas-upnp-org:service:RenderingControl:1#GetVolume",
///         &request,
///         Some(&mut response),
///     )
///     .await?;
/// println!("volume: {}", response.current_volume);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SoapClient {
    url: String,
    auth: Option<BasicAuth>,
    headers: Header,
    http: reqwest::Client,
}

impl SoapClient {
    /// Create a client for `url`
    pub fn new(url: impl Into<String>, config: Config) -> Result<Self> {
        let http = config.http_client()?;
        Ok(Self {
            url: url.into(),
            auth: config.basic_auth,
            headers: Header::new(),
            http,
        })
    }

    /// Create a builder for configuring the client
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    /// Create a client with a custom reqwest::Client
    ///
    /// Useful for sharing HTTP connection pools or custom proxy settings
    pub fn with_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            auth: None,
            headers: Header::new(),
            http,
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Header blocks sent with every call
    pub fn headers(&self) -> &Header {
        &self.headers
    }

    /// Adds a header block to every subsequent call.
    pub fn add_header<H: Serialize + ?Sized>(&mut self, header: &H) -> Result<()> {
        self.headers.push(header)
    }

    /// Sends `request` as the body of a SOAP envelope and decodes the answer.
    ///
    /// `action` goes in the `SOAPAction` HTTP header, which is sent even when
    /// empty. When `response` is `None` the payload is read and dropped, but
    /// faults and malformed answers are still reported.
    ///
    /// Outcomes:
    /// - `Ok(())`: `response` was overwritten with the decoded payload, or
    ///   left untouched if the body was empty (void operation);
    /// - `Err(Error::Fault(_))`: the endpoint returned a SOAP fault, with the
    ///   HTTP status stamped on it;
    /// - any other error: the exchange failed, see [`Error::is_transport`].
    ///
    /// The name of the payload element is not checked against `Resp`: serde
    /// ignores the root element name, so `<Other>` decodes into a type
    /// renamed `Expected` as long as its fields match.
    ///
    /// Triggering `cancel` aborts the in-flight request.
    pub async fn call<Req, Resp>(
        &self,
        cancel: &CancellationToken,
        action: &str,
        request: &Req,
        response: Option<&mut Resp>,
    ) -> Result<()>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = {
            let mut envelope = Envelope::new(Body::new(request));
            if !self.headers.is_empty() {
                envelope.header = Some(self.headers.clone());
            }
            envelope.to_xml()?
        };

        debug!("SOAP call {} (action {:?})", self.url, action);
        trace!("SOAP request: {} bytes", payload.len());

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("SOAP call {} cancelled", self.url);
                return Err(Error::Cancelled);
            }
            exchange = self.exchange(action, payload) => exchange?,
        };

        trace!("SOAP response: HTTP {}, {} bytes", status, body.len());

        if body.is_empty() {
            return Err(Error::EmptyBody);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }

        match response {
            Some(response) => self.decode_response(status, &body, response),
            None => self.decode_response(status, &body, &mut IgnoredAny),
        }
    }

    /// [`call`](Self::call) for operations whose answer does not matter.
    pub async fn call_without_response<Req>(
        &self,
        cancel: &CancellationToken,
        action: &str,
        request: &Req,
    ) -> Result<()>
    where
        Req: Serialize + ?Sized,
    {
        self.call(cancel, action, request, None::<&mut IgnoredAny>)
            .await
    }

    /// One POST, connection closed afterwards, full body read.
    async fn exchange(&self, action: &str, payload: Vec<u8>) -> Result<(StatusCode, Vec<u8>)> {
        let mut request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, CONTENT_TYPE_XML)
            .header(SOAP_ACTION, action)
            .header(CONNECTION, "close")
            .body(payload);

        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok((status, body.to_vec()))
    }

    fn decode_response<T: DeserializeOwned>(
        &self,
        status: StatusCode,
        body: &[u8],
        destination: &mut T,
    ) -> Result<()> {
        let mut envelope = Envelope::new(Body::new(destination));

        if let Err(err) = envelope.decode(body) {
            warn!(
                "SOAP response from {} (HTTP {}) is not an envelope: {}",
                self.url, status, err
            );
            return Err(Error::BadResponse { status });
        }

        if let Some(mut fault) = envelope.body.fault.take() {
            fault.http_status = status.as_u16();
            debug!("SOAP call {} returned a fault: {}", self.url, fault);
            return Err(fault.into());
        }

        debug!("SOAP call {} succeeded (HTTP {})", self.url, status);
        Ok(())
    }
}

/// Builder for configuring a SoapClient
#[derive(Debug)]
pub struct ClientBuilder {
    url: String,
    config: Config,
    client: Option<reqwest::Client>,
}

impl ClientBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: Config::default(),
            client: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Send `Authorization: Basic ...` with every call
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    /// TLS settings of the underlying HTTP client
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.config.tls = Some(tls);
        self
    }

    /// Idle connections kept per host
    pub fn max_idle_conns_per_host(mut self, max: usize) -> Self {
        self.config.max_idle_conns_per_host = Some(max);
        self
    }

    /// Use an existing reqwest::Client; TLS and pool settings are then ignored
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SoapClient> {
        let http = match self.client {
            Some(client) => client,
            None => self.config.http_client()?,
        };

        Ok(SoapClient {
            url: self.url,
            auth: self.config.basic_auth,
            headers: Header::new(),
            http,
        })
    }
}

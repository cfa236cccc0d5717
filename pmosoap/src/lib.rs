//! # pmosoap - SOAP client
//!
//! Client for document/literal SOAP 1.1 endpoints over HTTP POST: the request
//! value is wrapped in an envelope, sent, and the answer is decoded back into a
//! caller-provided destination, or reported as a [`Fault`].
//!
//! ## Fonctionnalités
//!
//! - ✅ Typed requests and responses through serde (`quick-xml`)
//! - ✅ Single-pass body decoding: fault or payload, decided by the first element
//! - ✅ SOAP Faults returned as errors, with the HTTP status of the response
//! - ✅ Opaque header blocks added once, sent with every call
//! - ✅ Basic auth, TLS settings, cancellation of in-flight calls
//!
//! ## Architecture
//!
//! - [`Envelope`] / [`Header`] / [`Body`] : modèle de l'enveloppe
//! - [`Fault`] : erreur SOAP
//! - [`SoapClient`] : appel HTTP et classification du résultat
//! - [`Error`] : transport, protocole, fault
//!
//! Request and response types carry their own element name and namespace:
//!
//! ```
//! use pmosoap::{Body, Envelope};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! #[serde(rename = "Request")]
//! struct Request {
//!     #[serde(rename = "@xmlns")]
//!     xmlns: &'static str,
//!     attr1: &'static str,
//! }
//!
//! let request = Request { xmlns: "test:call", attr1: "value1" };
//! let xml = Envelope::new(Body::new(&request)).to_xml().unwrap();
//! assert_eq!(
//!     String::from_utf8(xml).unwrap(),
//!     r#"<Envelope xmlns="http://schemas.xmlsoap.org/soap/envelope/"><Body xmlns="http://schemas.xmlsoap.org/soap/envelope/"><Request xmlns="test:call"><attr1>value1</attr1></Request></Body></Envelope>"#
//! );
//! ```

mod body;
mod client;
mod config;
mod envelope;
mod error;
mod fault;

pub use body::Body;
pub use client::{CONTENT_TYPE_XML, ClientBuilder, SOAP_ACTION, SoapClient};
pub use config::{BasicAuth, Config, TlsConfig};
pub use envelope::{ENVELOPE_NS, Envelope, Header};
pub use error::{Error, Result};
pub use fault::{Fault, fault_message};

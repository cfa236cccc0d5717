//! Corps SOAP et décodage du corps
//!
//! A document/literal body holds at most one element: either a standard
//! `Fault` or the application payload. Which one is decided while reading,
//! from the namespace and local name of the first child element.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::envelope::ENVELOPE_NS;
use crate::error::{Error, Result};
use crate::fault::Fault;

const MULTIPLE_ELEMENTS: &str =
    "multiple elements inside body; not a compliant single-element document body";

/// Corps SOAP
///
/// `content` is the value to send (`Body<&T>`) or the destination to decode
/// into (`Body<&mut T>`). A body never carries both a fault and content:
/// decoding a fault drops the content reference.
#[derive(Debug)]
pub struct Body<C> {
    pub fault: Option<Fault>,
    pub content: Option<C>,
}

impl<C> Default for Body<C> {
    fn default() -> Self {
        Self {
            fault: None,
            content: None,
        }
    }
}

impl<C> Body<C> {
    /// Corps portant un contenu applicatif
    pub fn new(content: C) -> Self {
        Self {
            fault: None,
            content: Some(content),
        }
    }

    /// Corps portant un fault
    pub fn from_fault(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            content: None,
        }
    }
}

impl<T: Serialize + ?Sized> Body<&T> {
    pub(crate) fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(
            BytesStart::new("Body").with_attributes([("xmlns", ENVELOPE_NS)]),
        ))?;

        if let Some(fault) = &self.fault {
            fault.write_to(writer)?;
        } else if let Some(content) = self.content {
            let xml = quick_xml::se::to_string(content)?;
            writer.get_mut().write_all(xml.as_bytes())?;
        }

        writer.write_event(Event::End(BytesEnd::new("Body")))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Scanning,
    Consumed,
}

impl<T: DeserializeOwned> Body<&mut T> {
    /// Decodes the children of a `Body` element whose start tag has just been
    /// read from `reader` (`self_closing` for `<Body/>`).
    ///
    /// `xml` is the whole document `reader` was created over: the payload
    /// element is cut out of it and handed to serde.
    pub(crate) fn decode(
        &mut self,
        reader: &mut NsReader<&[u8]>,
        xml: &[u8],
        self_closing: bool,
    ) -> Result<()> {
        if self.content.is_none() {
            return Err(Error::Configuration("content destination required"));
        }
        if self_closing {
            return Ok(());
        }

        let mut scan = Scan::Scanning;
        loop {
            let element_start = reader.buffer_position() as usize;
            let (namespace, event) = reader.read_resolved_event()?;
            let in_envelope_ns = matches!(
                namespace,
                ResolveResult::Bound(Namespace(ns)) if ns == ENVELOPE_NS.as_bytes()
            );

            let (start, empty) = match event {
                Event::Start(start) => (start, false),
                Event::Empty(start) => (start, true),
                // closes the Body itself; an empty body is a void response
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(Error::protocol("unexpected end of document in Body")),
                _ => continue,
            };

            if scan == Scan::Consumed {
                return Err(Error::protocol(MULTIPLE_ELEMENTS));
            }

            if in_envelope_ns && start.local_name().as_ref() == b"Fault" {
                let fault = if empty {
                    Fault::default()
                } else {
                    Fault::read_from(reader)?
                };
                trace!("SOAP body carries a fault: {:?}", fault.code);
                self.fault = Some(fault);
                self.content = None;
            } else {
                if !empty {
                    reader.read_to_end(start.name())?;
                }
                let element_end = reader.buffer_position() as usize;
                let fragment = std::str::from_utf8(&xml[element_start..element_end])
                    .map_err(|e| Error::protocol(e.to_string()))?;

                let value: T = quick_xml::de::from_str(fragment)?;
                if let Some(destination) = self.content.as_deref_mut() {
                    *destination = value;
                }
            }

            scan = Scan::Consumed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(rename = "Response")]
    struct Response {
        #[serde(default)]
        attr3: String,
    }

    /// Runs the body decoder over `<Body>{children}</Body>`.
    fn decode_body<'a>(
        children: &str,
        destination: Option<&'a mut Response>,
    ) -> Result<Body<&'a mut Response>> {
        let xml = format!(r#"<Body xmlns="{ENVELOPE_NS}">{children}</Body>"#);
        let mut reader = NsReader::from_reader(xml.as_bytes());
        reader.read_event()?;

        let mut body = Body {
            fault: None,
            content: destination,
        };
        body.decode(&mut reader, xml.as_bytes(), false)?;
        Ok(body)
    }

    #[test]
    fn test_decode_content() {
        let mut response = Response::default();
        let body = decode_body(
            r#"<Response xmlns="test:call"><attr3>value3</attr3></Response>"#,
            Some(&mut response),
        )
        .unwrap();
        assert!(body.fault.is_none());
        drop(body);

        assert_eq!(response.attr3, "value3");
    }

    #[test]
    fn test_decode_self_closing_content() {
        let mut response = Response {
            attr3: "previous".to_string(),
        };
        decode_body(r#"<Response xmlns="test:call"/>"#, Some(&mut response)).unwrap();

        assert_eq!(response.attr3, "");
    }

    #[test]
    fn test_empty_body_leaves_destination_untouched() {
        let mut response = Response {
            attr3: "untouched".to_string(),
        };
        let body = decode_body("\n  \n", Some(&mut response)).unwrap();
        assert!(body.fault.is_none());
        assert!(body.content.is_some());
        drop(body);

        assert_eq!(response.attr3, "untouched");
    }

    #[test]
    fn test_missing_destination_is_a_configuration_error() {
        let err = decode_body("", None).unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.to_string(), "soap: content destination required");
    }

    #[test]
    fn test_multiple_elements_are_rejected() {
        for children in [
            r#"<Response><attr3>a</attr3></Response><Response><attr3>b</attr3></Response>"#,
            r#"<Response/><Other/>"#,
            r#"<Fault xmlns="http://schemas.xmlsoap.org/soap/envelope/"><faultstring>x</faultstring></Fault><Response/>"#,
        ] {
            let mut response = Response::default();
            let err = decode_body(children, Some(&mut response)).unwrap_err();
            assert_eq!(err.to_string(), format!("soap: {MULTIPLE_ELEMENTS}"));
        }
    }

    #[test]
    fn test_fault_replaces_content() {
        let mut response = Response {
            attr3: "untouched".to_string(),
        };
        let body = decode_body(
            r#"
            <Fault xmlns="http://schemas.xmlsoap.org/soap/envelope/">
                <faultcode>Server</faultcode>
                <faultstring>
                    fault text
                </faultstring>
            </Fault>
            "#,
            Some(&mut response),
        )
        .unwrap();

        assert!(body.content.is_none());
        let fault = body.fault.unwrap();
        assert_eq!(fault.code, "Server");
        assert_eq!(fault.text, "fault text");
        assert_eq!(response.attr3, "untouched");
    }

    #[test]
    fn test_prefixed_fault_is_detected_by_namespace() {
        let mut response = Response::default();
        let xml = r#"<s:Body xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Fault><faultstring>boom</faultstring></s:Fault></s:Body>"#;
        let mut reader = NsReader::from_reader(xml.as_bytes());
        reader.read_event().unwrap();

        let mut body = Body::new(&mut response);
        body.decode(&mut reader, xml.as_bytes(), false).unwrap();

        assert_eq!(body.fault.map(|f| f.text), Some("boom".to_string()));
    }

    #[test]
    fn test_fault_in_foreign_namespace_is_content() {
        let mut response = Response::default();
        let body = decode_body(
            r#"<Fault xmlns="urn:not-soap"><attr3>payload</attr3></Fault>"#,
            Some(&mut response),
        )
        .unwrap();
        assert!(body.fault.is_none());
        drop(body);

        assert_eq!(response.attr3, "payload");
    }

    #[test]
    fn test_payload_element_name_is_not_checked() {
        let mut response = Response::default();
        decode_body(
            r#"<Other xmlns="test:call"><attr3>renamed</attr3></Other>"#,
            Some(&mut response),
        )
        .unwrap();

        assert_eq!(response.attr3, "renamed");
    }

    #[test]
    fn test_truncated_body_fails() {
        let xml = format!(r#"<Body xmlns="{ENVELOPE_NS}"><Response>"#);
        let mut reader = NsReader::from_reader(xml.as_bytes());
        reader.read_event().unwrap();

        let mut response = Response::default();
        let mut body = Body::new(&mut response);
        assert!(body.decode(&mut reader, xml.as_bytes(), false).is_err());
    }
}

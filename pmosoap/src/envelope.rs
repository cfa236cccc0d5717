//! Structures de l'enveloppe SOAP
//!
//! An [`Envelope`] is generic over the way it holds its body content:
//! `Envelope<&T>` borrows a value to send, `Envelope<&mut T>` borrows the
//! destination a received envelope is decoded into.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{NsReader, Writer};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::body::Body;
use crate::error::{Error, Result};

/// Namespace of the SOAP 1.1 envelope elements
pub const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Enveloppe SOAP complète
#[derive(Debug)]
pub struct Envelope<C> {
    /// En-tête SOAP optionnel, only ever written
    pub header: Option<Header>,

    /// Corps SOAP
    pub body: Body<C>,
}

impl<C> Envelope<C> {
    /// Crée une nouvelle enveloppe sans en-tête
    pub fn new(body: Body<C>) -> Self {
        Self { header: None, body }
    }

    /// Crée une nouvelle enveloppe avec en-tête
    pub fn with_header(header: Header, body: Body<C>) -> Self {
        Self {
            header: Some(header),
            body,
        }
    }
}

impl<T: Serialize + ?Sized> Envelope<&T> {
    /// Serializes the envelope as
    /// `<Envelope xmlns="..."><Header xmlns="...">...</Header><Body xmlns="...">...</Body></Envelope>`,
    /// the header being written only when it has items.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());

        writer.write_event(Event::Start(
            BytesStart::new("Envelope").with_attributes([("xmlns", ENVELOPE_NS)]),
        ))?;

        if let Some(header) = self.header.as_ref().filter(|h| !h.is_empty()) {
            header.write_to(&mut writer)?;
        }
        self.body.write_to(&mut writer)?;

        writer.write_event(Event::End(BytesEnd::new("Envelope")))?;

        Ok(writer.into_inner())
    }
}

impl<T: DeserializeOwned> Envelope<&mut T> {
    /// Decodes a complete envelope document.
    ///
    /// The body is routed through [`Body::decode`]: either `body.fault` is
    /// set, or the destination held by `body.content` is overwritten, or
    /// (void response) nothing changes. The root, `Header` and `Body`
    /// elements are recognized by local name whatever their namespace;
    /// header blocks are skipped.
    pub fn decode(&mut self, xml: &[u8]) -> Result<()> {
        // the reader skips a BOM without counting it in buffer_position(),
        // and the payload is sliced out of `xml` by those positions
        let xml = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
        let mut reader = NsReader::from_reader(xml);

        let root_is_empty = loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    expect_local_name(&start, "Envelope")?;
                    break false;
                }
                Event::Empty(start) => {
                    expect_local_name(&start, "Envelope")?;
                    break true;
                }
                Event::Eof => return Err(Error::protocol("missing Envelope element")),
                // declaration, comments, whitespace
                _ => {}
            }
        };
        if root_is_empty {
            return Err(Error::protocol("envelope has no Body"));
        }

        let mut has_body = false;
        loop {
            let (start, self_closing) = match reader.read_event()? {
                Event::Start(start) => (start, false),
                Event::Empty(start) => (start, true),
                Event::End(_) => break,
                Event::Eof => return Err(Error::protocol("unexpected end of document in Envelope")),
                _ => continue,
            };

            if start.local_name().as_ref() != b"Body" {
                if !self_closing {
                    reader.read_to_end(start.name())?;
                }
                continue;
            }
            if has_body {
                return Err(Error::protocol("multiple Body elements inside envelope"));
            }
            self.body.decode(&mut reader, xml, self_closing)?;
            has_body = true;
        }

        if has_body {
            Ok(())
        } else {
            Err(Error::protocol("envelope has no Body"))
        }
    }
}

/// En-tête SOAP
///
/// Items are opaque to this crate: each one is serialized when it is added
/// and written back verbatim, in order, inside `<Header>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    items: Vec<String>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header block. Its element name and namespace come from
    /// its own serde attributes, like any body content.
    pub fn push<H: Serialize + ?Sized>(&mut self, item: &H) -> Result<()> {
        self.items.push(quick_xml::se::to_string(item)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(
            BytesStart::new("Header").with_attributes([("xmlns", ENVELOPE_NS)]),
        ))?;
        for item in &self.items {
            writer.get_mut().write_all(item.as_bytes())?;
        }
        writer.write_event(Event::End(BytesEnd::new("Header")))?;
        Ok(())
    }
}

fn expect_local_name(start: &BytesStart<'_>, expected: &str) -> Result<()> {
    if start.local_name().as_ref() == expected.as_bytes() {
        Ok(())
    } else {
        Err(Error::protocol(format!(
            "expected element <{}>, found <{}>",
            expected,
            String::from_utf8_lossy(start.name().as_ref())
        )))
    }
}

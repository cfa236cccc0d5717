//! SOAP Faults
//!
//! A [`Fault`] is what the endpoint sends back instead of the application
//! payload when the operation failed. It is both a value (decoded from the
//! response body) and an error (returned by [`SoapClient::call`]).
//!
//! [`SoapClient::call`]: crate::SoapClient::call

use std::fmt;
use std::io::Write;

use quick_xml::events::{BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{NsReader, Writer};

use crate::envelope::ENVELOPE_NS;
use crate::error::{Error, Result};

/// Prefix of every fault message
const PREFIX: &str = "soap";

/// Erreur SOAP (Fault)
///
/// All string fields are trimmed of surrounding whitespace when decoded:
/// servers frequently pretty-print their faults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fault {
    /// `faultcode` (ex: "s:Client")
    pub code: String,

    /// `faultstring`, the human readable description
    pub text: String,

    /// `faultactor`
    pub actor: String,

    /// Direct character data of `detail`
    pub detail: String,

    /// HTTP status of the response that carried the fault, 0 if unknown.
    /// Never read from the XML payload.
    pub http_status: u16,
}

impl Fault {
    /// Crée un fault avec un code et un message
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Decodes the sub-tree of a `Fault` element whose start tag has just
    /// been read from `reader`. Stops after the matching end tag.
    pub(crate) fn read_from(reader: &mut NsReader<&[u8]>) -> Result<Self> {
        let mut fault = Fault::default();

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let value = read_direct_text(reader)?;
                    if let Some(field) = fault.field_mut(start.local_name().as_ref()) {
                        *field = value.trim().to_string();
                    }
                }
                Event::End(_) => return Ok(fault),
                Event::Eof => return Err(Error::protocol("unexpected end of document in Fault")),
                // <faultcode/> and friends carry nothing
                _ => {}
            }
        }
    }

    /// Writes `<Fault xmlns="...">` with every non-empty field.
    pub(crate) fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(
            BytesStart::new("Fault").with_attributes([("xmlns", ENVELOPE_NS)]),
        ))?;

        for (name, value) in [
            ("faultcode", &self.code),
            ("faultstring", &self.text),
            ("faultactor", &self.actor),
            ("detail", &self.detail),
        ] {
            if value.is_empty() {
                continue;
            }
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }

        writer.write_event(Event::End(BytesEnd::new("Fault")))?;
        Ok(())
    }

    fn field_mut(&mut self, local_name: &[u8]) -> Option<&mut String> {
        match local_name {
            b"faultcode" => Some(&mut self.code),
            b"faultstring" => Some(&mut self.text),
            b"faultactor" => Some(&mut self.actor),
            b"detail" => Some(&mut self.detail),
            _ => None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}: ")?;
        if !self.code.is_empty() {
            write!(f, "{}: ", self.code)?;
        }
        f.write_str(&self.text)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        if self.http_status != 0 {
            write!(f, " {}", self.http_status)?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}

/// Renders an optional fault, `"soap: <nil>"` when there is none.
pub fn fault_message(fault: Option<&Fault>) -> String {
    match fault {
        Some(fault) => fault.to_string(),
        None => format!("{PREFIX}: <nil>"),
    }
}

/// Reads the character data directly under the current element, up to and
/// including its end tag. Nested elements are skipped.
fn read_direct_text(reader: &mut NsReader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Text(raw) if depth == 0 => {
                let raw = utf8(&raw)?;
                let unescaped = quick_xml::escape::unescape(raw)
                    .map_err(|e| Error::protocol(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(raw) if depth == 0 => text.push_str(utf8(&raw)?),
            Event::GeneralRef(reference) if depth == 0 => {
                text.push_str(&resolve_reference(&reference)?);
            }
            Event::Eof => return Err(Error::protocol("unexpected end of document in Fault")),
            _ => {}
        }
    }
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String> {
    let name = utf8(reference)?;
    quick_xml::escape::unescape(&format!("&{name};"))
        .map(|resolved| resolved.into_owned())
        .map_err(|e| Error::protocol(e.to_string()))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::protocol(e.to_string()))
}

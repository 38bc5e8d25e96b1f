//! SOAP 1.1 document/literal envelopes.
//!
//! Requests are written from `serde_json::Value` trees: objects become nested
//! elements, arrays become repeated elements, nulls become `xsi:nil`.
//! Responses are read back the same way, with every leaf kept as text.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use super::{RpcArgs, RpcError};

pub const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const API_NS: &str = "urn:api3";

/// Fault the billing server raises for a missing or expired session.
const SESSION_FAULT: &str = "error_auth";

fn encode_err(e: impl std::fmt::Display) -> RpcError {
    RpcError::Encode(e.to_string())
}

fn decode_err(e: impl std::fmt::Display) -> RpcError {
    RpcError::Decode(e.to_string())
}

fn write_value<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &Value,
) -> Result<(), RpcError> {
    match value {
        Value::Null => {
            let elem = BytesStart::new(name).with_attributes([("xsi:nil", "true")]);
            writer.write_event(Event::Empty(elem)).map_err(encode_err)?;
        }
        Value::Array(items) => {
            for item in items {
                write_value(writer, name, item)?;
            }
        }
        Value::Object(fields) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(encode_err)?;
            for (key, field) in fields {
                write_value(writer, key, field)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encode_err)?;
        }
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(encode_err)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(encode_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encode_err)?;
        }
    }
    Ok(())
}

pub fn encode_request(method: &str, args: &RpcArgs<'_>) -> Result<String, RpcError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;

    let envelope = BytesStart::new("soapenv:Envelope").with_attributes([
        ("xmlns:soapenv", ENVELOPE_NS),
        ("xmlns:xsi", XSI_NS),
        ("xmlns:urn", API_NS),
    ]);
    writer.write_event(Event::Start(envelope)).map_err(encode_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("soapenv:Body")))
        .map_err(encode_err)?;

    let operation = format!("urn:{method}");
    writer
        .write_event(Event::Start(BytesStart::new(operation.as_str())))
        .map_err(encode_err)?;
    for (name, value) in args {
        write_value(&mut writer, name, value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(operation.as_str())))
        .map_err(encode_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("soapenv:Body")))
        .map_err(encode_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("soapenv:Envelope")))
        .map_err(encode_err)?;

    String::from_utf8(writer.into_inner()).map_err(encode_err)
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    nil: bool,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
        let nil = e.attributes().flatten().any(|attr| {
            attr.key.local_name().into_inner() == b"nil" && attr.value.as_ref() == b"true"
        });
        Self {
            name,
            nil,
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn into_child(self, name: &str) -> Option<Element> {
        self.children.into_iter().find(|c| c.name == name)
    }

    fn into_value(self) -> Value {
        if self.nil {
            return Value::Null;
        }
        if self.children.is_empty() {
            return Value::String(self.text);
        }
        let mut fields = Map::new();
        for child in self.children {
            let name = child.name.clone();
            let value = child.into_value();
            match fields.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    fields.insert(name, value);
                }
            }
        }
        Value::Object(fields)
    }
}

fn parse_tree(xml: &str) -> Result<Element, RpcError> {
    let mut reader = Reader::from_str(xml);

    let mut root = Element::default();
    let mut stack: Vec<Element> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(decode_err)? {
            Event::Start(ref e) => stack.push(Element::from_start(e)),
            Event::Empty(ref e) => {
                let elem = Element::from_start(e);
                stack.last_mut().unwrap_or(&mut root).children.push(elem);
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(decode_err)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::End(_) => {
                let mut elem = stack
                    .pop()
                    .ok_or_else(|| RpcError::Decode("unbalanced closing tag".to_string()))?;
                // Text between child elements is layout, not data.
                if !elem.children.is_empty() {
                    elem.text.clear();
                }
                stack.last_mut().unwrap_or(&mut root).children.push(elem);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !stack.is_empty() {
        return Err(RpcError::Decode("document ended inside an element".to_string()));
    }
    Ok(root)
}

/// True only for the server's own session fault, matched on the whole fault
/// string or on the local part of the fault code.
pub fn is_session_fault(code: &str, message: &str) -> bool {
    let code = code.rsplit(':').next().unwrap_or(code);
    code.trim().eq_ignore_ascii_case(SESSION_FAULT)
        || message.trim().eq_ignore_ascii_case(SESSION_FAULT)
}

fn fault_error(fault: &Element) -> RpcError {
    let text = |name: &str| {
        fault
            .child(name)
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default()
    };
    let code = text("faultcode");
    let mut message = text("faultstring");
    if message.is_empty() {
        message = text("detail");
    }
    if is_session_fault(&code, &message) {
        RpcError::SessionExpired(message)
    } else {
        RpcError::Fault { code, message }
    }
}

/// Decodes a response envelope into the values of its result elements.
pub fn decode_response(xml: &str) -> Result<Vec<Value>, RpcError> {
    let body = parse_tree(xml)?
        .into_child("Envelope")
        .ok_or_else(|| RpcError::Decode("missing SOAP Envelope".to_string()))?
        .into_child("Body")
        .ok_or_else(|| RpcError::Decode("missing SOAP Body".to_string()))?;

    if let Some(fault) = body.child("Fault") {
        return Err(fault_error(fault));
    }

    Ok(body
        .children
        .into_iter()
        .next()
        .map(|response| response.children.into_iter().map(Element::into_value).collect())
        .unwrap_or_default())
}

/// Finds the service endpoint declared by a WSDL document.
pub fn wsdl_location(wsdl: &str) -> Result<Option<String>, RpcError> {
    let mut reader = Reader::from_str(wsdl);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(decode_err)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().into_inner() == b"address" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().into_inner() == b"location" {
                        let location = attr.unescape_value().map_err(decode_err)?;
                        return Ok(Some(location.to_string()));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

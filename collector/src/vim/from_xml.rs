/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::{btree_map::Entry, BTreeMap, HashSet};

use xml::{
    attribute::OwnedAttribute,
    name::OwnedName,
    reader::{EventReader, XmlEvent},
};

use super::error::{ParseError, ParseResult};
use crate::types::ManagedObjectHandle;
use crate::value::{Record, Value};

pub type XmlInput<'a> = &'a [XmlEvent];

pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub fn read_events(data: &str) -> xml::reader::Result<Vec<XmlEvent>> {
    let mut reader = EventReader::from_str(data);
    let mut events = Vec::new();
    loop {
        let event = reader.next()?;
        let done = matches!(event, XmlEvent::EndDocument);
        events.push(event);
        if done {
            return Ok(events);
        }
    }
}

/* Parsers. */

pub fn start_document(xml: XmlInput) -> ParseResult<()> {
    let (event, xml) = next(xml)?;
    match event {
        XmlEvent::StartDocument { .. } => Ok(((), xml)),
        _ => Err(ParseError::Unexpected(event.clone())),
    }
}

pub fn end_document(xml: XmlInput) -> ParseResult<()> {
    let (event, xml) = next(xml)?;
    match event {
        XmlEvent::EndDocument => Ok(((), xml)),
        _ => Err(ParseError::Unexpected(event.clone())),
    }
}

pub fn start_tag<'a>(
    xml: XmlInput<'a>,
    ns: &str,
    local: &str,
) -> ParseResult<'a, (&'a OwnedName, &'a [OwnedAttribute])> {
    let ((name, attrs), xml) = any_start_tag(xml)?;
    match name.namespace.as_deref() == Some(ns) && name.local_name == local {
        true => Ok(((name, attrs), xml)),
        false => Err(ParseError::UnexpectedTag(name.to_string())),
    }
}

pub fn any_start_tag(
    xml: XmlInput<'_>,
) -> ParseResult<'_, (&OwnedName, &[OwnedAttribute])> {
    let (event, xml) = next(xml)?;
    match event {
        XmlEvent::StartElement {
            name, attributes, ..
        } => Ok(((name, attributes), xml)),
        _ => Err(ParseError::Unexpected(event.clone())),
    }
}

pub fn end_tag<'a>(
    xml: XmlInput<'a>,
    start_tag: &OwnedName,
) -> ParseResult<'a, ()> {
    let (event, xml) = next(xml)?;
    match event {
        XmlEvent::EndElement { name } => match name == start_tag {
            true => Ok(((), xml)),
            false => Err(ParseError::UnexpectedEndTag(name.to_string())),
        },
        _ => Err(ParseError::Unexpected(event.clone())),
    }
}

pub fn text(xml: XmlInput<'_>) -> ParseResult<'_, &str> {
    let (event, xml) = next(xml)?;
    match event {
        XmlEvent::Characters(s) | XmlEvent::CData(s) => Ok((s.as_str(), xml)),
        _ => Err(ParseError::Unexpected(event.clone())),
    }
}

pub fn ignore_until_end_tag<'a>(
    mut xml: XmlInput<'a>,
    tag: &OwnedName,
) -> ParseResult<'a, ()> {
    loop {
        let (event, next) = next(xml)?;
        xml = next;
        match event {
            XmlEvent::EndElement { name } => match name == tag {
                true => return Ok(((), xml)),
                false => {
                    return Err(ParseError::UnexpectedEndTag(name.to_string()))
                }
            },
            XmlEvent::EndDocument => return Err(ParseError::Eof),
            XmlEvent::StartElement { name, .. } => {
                let (_, next) = ignore_until_end_tag(next, name)?;
                xml = next;
            }
            _ => {}
        }
    }
}

pub fn ignore_spaces(mut xml: XmlInput) -> ParseResult<()> {
    while let Ok((event, next)) = next(xml) {
        match event {
            XmlEvent::ProcessingInstruction { .. }
            | XmlEvent::Comment(_)
            | XmlEvent::Whitespace(_) => {}
            _ => break,
        }
        xml = next;
    }
    Ok(((), xml))
}

pub fn next(xml: XmlInput) -> ParseResult<&XmlEvent> {
    match xml.first() {
        Some(event) => Ok((event, &xml[1..])),
        None => Err(ParseError::Eof),
    }
}

pub fn optional<'a, F: FnMut(XmlInput<'a>) -> ParseResult<'a, R>, R: 'a>(
    mut parser: F,
) -> impl FnMut(XmlInput<'a>) -> ParseResult<'a, Option<R>> {
    move |xml| match parser(xml) {
        Ok((value, xml)) => Ok((Some(value), xml)),
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => Ok((None, xml)),
    }
}

/// Look up an attribute. `None` selects an unprefixed attribute, whatever
/// namespace the reader assigned to it.
pub fn attribute<'a>(
    attrs: &'a [OwnedAttribute],
    ns: Option<&str>,
    local: &str,
) -> Option<&'a str> {
    attrs
        .iter()
        .find(|attr| {
            attr.name.local_name == local
                && match ns {
                    Some(ns) => attr.name.namespace.as_deref() == Some(ns),
                    None => attr.name.prefix.is_none(),
                }
        })
        .map(|attr| attr.value.as_str())
}

/* Values. */

#[derive(Clone, Copy, Debug)]
enum Scalar {
    String,
    Integer,
    Float,
    Boolean,
}

impl Scalar {
    fn from_type(r#type: &str) -> Option<Self> {
        match r#type {
            "string" | "anyURI" | "dateTime" | "base64Binary" => {
                Some(Self::String)
            }
            "int" | "long" | "short" | "byte" => Some(Self::Integer),
            "float" | "double" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Element type of an `ArrayOfX` type.
    fn from_array_type(r#type: &str) -> Option<Self> {
        Self::from_type(&r#type.to_lowercase()).or(match r#type {
            "AnyURI" => Some(Self::String),
            "DateTime" => Some(Self::String),
            _ => None,
        })
    }
}

/// Strip a namespace prefix from an xsi:type value.
fn local_type(r#type: &str) -> &str {
    r#type.rsplit(':').next().unwrap_or(r#type)
}

/// Decode the content of an element whose start tag (with `attrs`) has
/// been consumed. Stops before the matching end tag.
pub fn element_value<'a>(
    xml: XmlInput<'a>,
    attrs: &'a [OwnedAttribute],
) -> ParseResult<'a, Value> {
    let xsi_type = attribute(attrs, Some(XSI), "type").map(local_type);
    match xsi_type {
        Some(t) if t.starts_with("ArrayOf") => {
            let (items, xml) =
                array_items(xml, Scalar::from_array_type(&t[7..]))?;
            Ok((Value::Array(items), xml))
        }
        Some("ManagedObjectReference") => handle(xml, attrs),
        Some(t) => match Scalar::from_type(t) {
            Some(kind) => scalar(xml, kind),
            None => compound(xml, Some(t)),
        },
        None => match attribute(attrs, None, "type") {
            Some(_) => handle(xml, attrs),
            None => compound(xml, None),
        },
    }
}

fn scalar(xml: XmlInput, kind: Scalar) -> ParseResult<Value> {
    let (_, xml) = ignore_spaces(xml)?;
    let (s, xml) = optional(text)(xml)?;
    let (_, xml) = ignore_spaces(xml)?;
    let s = s.unwrap_or("").trim();
    let value = match kind {
        Scalar::String => Value::String(s.to_string()),
        Scalar::Integer => Value::Integer(
            s.parse()
                .map_err(|_| ParseError::InvalidValue("integer", s.to_string()))?,
        ),
        Scalar::Float => Value::Float(
            s.parse()
                .map_err(|_| ParseError::InvalidValue("float", s.to_string()))?,
        ),
        Scalar::Boolean => Value::Boolean(match s {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return Err(ParseError::InvalidValue("boolean", s.to_string())),
        }),
    };
    Ok((value, xml))
}

fn handle<'a>(
    xml: XmlInput<'a>,
    attrs: &'a [OwnedAttribute],
) -> ParseResult<'a, Value> {
    let r#type = attribute(attrs, None, "type")
        .unwrap_or("ManagedObjectReference");
    let (_, xml) = ignore_spaces(xml)?;
    let (id, xml) =
        text(xml).map_err(|_| ParseError::Syntax("missing object id"))?;
    let (_, xml) = ignore_spaces(xml)?;
    Ok((
        Value::Handle(ManagedObjectHandle::new(r#type, id.trim())),
        xml,
    ))
}

/// Data object, enumeration value or untyped text.
fn compound<'a>(
    xml: XmlInput<'a>,
    r#type: Option<&str>,
) -> ParseResult<'a, Value> {
    let (_, xml) = ignore_spaces(xml)?;
    match next(xml)? {
        (XmlEvent::StartElement { .. }, _) => {
            let (fields, xml) = fields(xml)?;
            Ok((
                Value::Record(Record {
                    r#type: r#type.map(str::to_string),
                    fields,
                }),
                xml,
            ))
        }
        (XmlEvent::EndElement { .. }, _) => match r#type {
            Some(t) => Ok((
                Value::Record(Record {
                    r#type: Some(t.to_string()),
                    fields: BTreeMap::new(),
                }),
                xml,
            )),
            None => Ok((Value::String(String::new()), xml)),
        },
        (XmlEvent::Characters(s) | XmlEvent::CData(s), rest) => {
            let (_, rest) = ignore_spaces(rest)?;
            Ok((Value::String(s.trim().to_string()), rest))
        }
        (ev, _) => Err(ParseError::Unexpected(ev.clone())),
    }
}

/// Child elements as record fields; repeated elements become arrays.
fn fields(mut xml: XmlInput) -> ParseResult<BTreeMap<String, Value>> {
    let mut fields = BTreeMap::new();
    let mut repeated = HashSet::new();
    loop {
        let (_, sxml) = ignore_spaces(xml)?;
        let ((tag, attrs), ixml) = match any_start_tag(sxml) {
            Ok(r) => r,
            Err(_) => return Ok((fields, sxml)),
        };
        let (val, ixml) = element_value(ixml, attrs)?;
        let (_, ixml) = ignore_spaces(ixml)?;
        let (_, ixml) = end_tag(ixml, tag)?;

        match fields.entry(tag.local_name.to_string()) {
            Entry::Occupied(mut ent) => {
                if repeated.contains(&tag.local_name) {
                    if let Value::Array(vals) = ent.get_mut() {
                        vals.push(val);
                    }
                } else {
                    let first = ent.insert(Value::Array(Vec::new()));
                    ent.insert(Value::Array(vec![first, val]));
                    repeated.insert(tag.local_name.clone());
                }
            }
            Entry::Vacant(ent) => {
                ent.insert(val);
            }
        }
        xml = ixml;
    }
}

fn array_items(
    mut xml: XmlInput,
    kind: Option<Scalar>,
) -> ParseResult<Vec<Value>> {
    let mut items = Vec::new();
    loop {
        let (_, sxml) = ignore_spaces(xml)?;
        let ((tag, attrs), ixml) = match any_start_tag(sxml) {
            Ok(r) => r,
            Err(_) => return Ok((items, sxml)),
        };
        let typed = attribute(attrs, Some(XSI), "type").is_some();
        let (val, ixml) = match kind {
            Some(kind) if !typed => scalar(ixml, kind)?,
            _ => element_value(ixml, attrs)?,
        };
        let (_, ixml) = ignore_spaces(ixml)?;
        let (_, ixml) = end_tag(ixml, tag)?;
        items.push(val);
        xml = ixml;
    }
}

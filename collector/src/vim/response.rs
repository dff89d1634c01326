/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;

use log::debug;

use super::from_xml::{
    any_start_tag, element_value, end_document, end_tag, ignore_spaces,
    ignore_until_end_tag, optional, read_events, start_document, start_tag,
};
use super::session::ServiceContent;
use crate::error::{Error, Result};
use crate::service::{FilterUpdate, ObjectContent, RetrievePage, UpdateSet};
use crate::types::{
    ChangeOp, ContinuationToken, Cursor, FilterHandle, ManagedObjectHandle,
    ObjectUpdateKind, PropertyChange, PropertyPath,
};
use crate::value::{Fault, Value};

const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// The single element inside `SOAP-ENV:Body`.
#[derive(Debug)]
pub(crate) struct Body {
    pub name: String,
    pub content: Value,
}

pub(crate) fn parse_envelope(data: &str) -> Result<Body> {
    let events = read_events(data)?;
    let xml = events.as_slice();

    let (_, xml) = start_document(xml)?;
    let (_, xml) = ignore_spaces(xml)?;
    let ((envelope, _), xml) = start_tag(xml, SOAP_ENV, "Envelope")?;
    let (_, xml) = ignore_spaces(xml)?;
    let (header, xml) = optional(|xml| start_tag(xml, SOAP_ENV, "Header"))(xml)?;
    let xml = match header {
        Some((header, _)) => {
            let (_, xml) = ignore_until_end_tag(xml, header)?;
            ignore_spaces(xml)?.1
        }
        None => xml,
    };
    let ((body, _), xml) = start_tag(xml, SOAP_ENV, "Body")?;
    let (_, xml) = ignore_spaces(xml)?;
    let ((tag, attrs), xml) = any_start_tag(xml)?;
    let (content, xml) = element_value(xml, attrs)?;
    let (_, xml) = ignore_spaces(xml)?;
    let (_, xml) = end_tag(xml, tag)?;
    let (_, xml) = ignore_spaces(xml)?;
    let (_, xml) = end_tag(xml, body)?;
    let (_, xml) = ignore_spaces(xml)?;
    let (_, xml) = end_tag(xml, envelope)?;
    let (_, xml) = ignore_spaces(xml)?;
    end_document(xml)?;

    Ok(Body {
        name: tag.local_name.clone(),
        content,
    })
}

impl Body {
    /// The `returnval` of a successful call to `operation`. Methods
    /// without a result (and long polls that timed out) yield `None`.
    pub fn into_result(self, operation: &str) -> Result<Option<Value>> {
        if self.name == "Fault" {
            return Err(Error::Fault(soap_fault(&self.content)));
        }
        if self.name != format!("{}Response", operation) {
            return Err(Error::UnexpectedResponse(self.name));
        }
        match self.content {
            Value::Record(mut record) => Ok(record.fields.remove("returnval")),
            _ => Ok(None),
        }
    }
}

/// `faultstring` is the message; the type comes from the first element
/// under `detail` (e.g. `<ManagedObjectNotFoundFault
/// xsi:type="ManagedObjectNotFound">`).
fn soap_fault(content: &Value) -> Fault {
    let detail = content
        .get("detail")
        .and_then(Value::as_record)
        .and_then(|d| d.fields.iter().next());
    let r#type = match detail {
        Some((name, value)) => match value.as_record().and_then(|r| r.r#type.clone()) {
            Some(t) => t,
            None => name.strip_suffix("Fault").unwrap_or(name).to_string(),
        },
        None => String::from("MethodFault"),
    };
    let message = content
        .get("faultstring")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map_or_else(|| r#type.clone(), str::to_string);
    Fault { r#type, message }
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value> {
    value
        .get(name)
        .ok_or_else(|| Error::MissingField(name.to_string()))
}

fn str_field<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    field(value, name)?
        .as_str()
        .ok_or_else(|| Error::UnexpectedResponse(format!("{} is not a string", name)))
}

fn handle_field(value: &Value, name: &str) -> Result<ManagedObjectHandle> {
    field(value, name)?
        .as_handle()
        .cloned()
        .ok_or_else(|| {
            Error::UnexpectedResponse(format!("{} is not an object reference", name))
        })
}

fn bool_field(value: &Value, name: &str) -> bool {
    match value.get(name) {
        Some(Value::Boolean(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

pub(crate) fn handle(returnval: Option<Value>) -> Result<ManagedObjectHandle> {
    match returnval {
        Some(Value::Handle(handle)) => Ok(handle),
        Some(value) => Err(Error::UnexpectedResponse(format!(
            "expected an object reference, got {}",
            value
        ))),
        None => Err(Error::MissingField(String::from("returnval"))),
    }
}

pub(crate) fn service_content(
    returnval: Option<Value>,
) -> Result<ServiceContent> {
    let value =
        returnval.ok_or_else(|| Error::MissingField(String::from("returnval")))?;
    Ok(ServiceContent {
        root_folder: handle_field(&value, "rootFolder")?,
        property_collector: handle_field(&value, "propertyCollector")?,
        session_manager: handle_field(&value, "sessionManager")?,
        about: value
            .get("about")
            .and_then(|about| about.get("fullName"))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// A vim25 `UpdateSet`. Removal-like operations never carry a value, and
/// an `assign` without one clears the property.
pub(crate) fn update_set(returnval: Option<Value>) -> Result<Option<UpdateSet>> {
    let value = match returnval {
        Some(value) => value,
        None => return Ok(None),
    };

    let mut filters = Vec::new();
    for filter_update in value.get("filterSet").map_or(&[][..], Value::items) {
        let filter = FilterHandle::new(handle_field(filter_update, "filter")?);
        let mut changes = Vec::new();
        let mut left = Vec::new();
        for object_update in filter_update.get("objectSet").map_or(&[][..], Value::items) {
            let obj = handle_field(object_update, "obj")?;
            let kind = str_field(object_update, "kind")?
                .parse::<ObjectUpdateKind>()
                .map_err(|k| Error::UnexpectedResponse(format!("update kind {}", k)))?;
            if kind == ObjectUpdateKind::Leave {
                left.push(obj.clone());
            }
            for change in object_update.get("changeSet").map_or(&[][..], Value::items) {
                let path = PropertyPath::new(str_field(change, "name")?);
                let op = match (str_field(change, "op")?, change.get("val")) {
                    ("assign" | "add", Some(val)) => ChangeOp::Set(val.clone()),
                    ("assign" | "remove" | "indirectRemove", _) => ChangeOp::Remove,
                    (op, _) => {
                        debug!("ignoring '{}' change on {} of {}", op, path, obj);
                        continue;
                    }
                };
                changes.push(PropertyChange {
                    obj: obj.clone(),
                    kind,
                    path,
                    op,
                });
            }
        }
        filters.push(FilterUpdate {
            filter,
            changes,
            left,
        });
    }

    Ok(Some(UpdateSet {
        version: Cursor::new(str_field(&value, "version")?),
        filters,
        truncated: bool_field(&value, "truncated"),
    }))
}

/// A vim25 `RetrieveResult`. No result means no matching objects.
pub(crate) fn retrieve_result(returnval: Option<Value>) -> Result<RetrievePage> {
    let value = match returnval {
        Some(value) => value,
        None => return Ok(RetrievePage::default()),
    };

    let mut objects = Vec::new();
    for object in value.get("objects").map_or(&[][..], Value::items) {
        let mut properties = BTreeMap::new();
        for prop in object.get("propSet").map_or(&[][..], Value::items) {
            if let Some(val) = prop.get("val") {
                properties.insert(PropertyPath::new(str_field(prop, "name")?), val.clone());
            }
        }
        objects.push(ObjectContent {
            obj: handle_field(object, "obj")?,
            properties,
        });
    }

    Ok(RetrievePage {
        objects,
        token: value
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(ContinuationToken::new),
    })
}

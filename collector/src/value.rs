/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ManagedObjectHandle;

/// Property value as decoded at the service boundary.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Handle(ManagedObjectHandle),
    Record(Record),
    Array(Vec<Value>),
}

/// Data object; `type` is the xsi type when the server sent one.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct Record {
    pub r#type: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Fault {
    pub r#type: String,
    pub message: String,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&ManagedObjectHandle> {
        match self {
            Value::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_record()?.fields.get(field)
    }

    /// Elements of an array; any other value is a one-element sequence
    /// (repeated elements only become arrays from their second occurrence).
    pub fn items(&self) -> &[Value] {
        match self {
            Value::Array(values) => values,
            value => std::slice::from_ref(value),
        }
    }

    /// Interpret a `LocalizedMethodFault` (or bare `MethodFault`) record.
    pub fn as_fault(&self) -> Option<Fault> {
        let record = self.as_record()?;
        let inner = record.fields.get("fault");
        let is_fault = inner.is_some()
            || record
                .r#type
                .as_deref()
                .map_or(false, |t| t.ends_with("Fault"));
        if !is_fault {
            return None;
        }

        let r#type = inner
            .and_then(Value::as_record)
            .and_then(|r| r.r#type.clone())
            .or_else(|| record.r#type.clone())
            .unwrap_or_else(|| String::from("MethodFault"));
        let message = record
            .fields
            .get("localizedMessage")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or_else(|| r#type.clone(), str::to_string);
        Some(Fault { r#type, message })
    }
}

impl Fault {
    pub fn is(&self, r#type: &str) -> bool {
        self.r#type == r#type
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message == self.r#type {
            write!(f, "{}", self.r#type)
        } else {
            write!(f, "{}: {}", self.r#type, self.message)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Handle(h) => write!(f, "{}", h),
            Value::Record(r) => {
                if let Some(t) = &r.r#type {
                    write!(f, "{} ", t)?;
                }
                write!(f, "{{")?;
                for (i, (k, v)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", k, v)?;
                }
                write!(f, " }}")
            }
            Value::Array(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<ManagedObjectHandle> for Value {
    fn from(h: ManagedObjectHandle) -> Self {
        Value::Handle(h)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Record, Value};

    fn record(r#type: &str, fields: Vec<(&str, Value)>) -> Value {
        Value::Record(Record {
            r#type: Some(r#type.to_string()),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    #[test]
    fn localized_method_fault() {
        let error = record(
            "LocalizedMethodFault",
            vec![
                ("fault", record("InvalidArgument", vec![])),
                (
                    "localizedMessage",
                    Value::from("A specified parameter was not correct: spec"),
                ),
            ],
        );
        let fault = error.as_fault().unwrap();
        assert!(fault.is("InvalidArgument"));
        assert_eq!(
            fault.to_string(),
            "InvalidArgument: A specified parameter was not correct: spec"
        );
    }

    #[test]
    fn fault_without_message() {
        let fault = record("LocalizedMethodFault", vec![(
            "fault",
            record("NotAuthenticated", vec![]),
        )])
        .as_fault()
        .unwrap();
        assert_eq!(fault.to_string(), "NotAuthenticated");
    }

    #[test]
    fn not_a_fault() {
        assert_eq!(Value::from("").as_fault(), None);
        assert_eq!(record("TaskInfo", vec![]).as_fault(), None);
    }

    #[test]
    fn items_of_single_value() {
        let v = Value::from("x");
        assert_eq!(v.items(), &[Value::from("x")]);
        let a = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(a.items().len(), 2);
    }
}

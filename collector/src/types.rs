/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Server-assigned reference to a managed object (a vim25
/// `ManagedObjectReference`). Only ever echoed back to the server.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug,
)]
pub struct ManagedObjectHandle {
    pub r#type: String,
    pub value: String,
}

impl ManagedObjectHandle {
    pub fn new(r#type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.r#type, self.value)
    }
}

/// Dotted path into an object's property tree, e.g. `info.state`.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug,
)]
pub struct PropertyPath(String);

impl PropertyPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `other` is this path or lies below it (`a.b` covers
    /// `a.b.c` and `a.b[4000]`).
    pub fn covers(&self, other: &PropertyPath) -> bool {
        match other.0.strip_prefix(self.0.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.') || rest.starts_with('['),
            None => false,
        }
    }
}

impl Borrow<str> for PropertyPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for PropertyPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque version token of the change feed. The empty cursor means
/// "from the beginning".
#[derive(
    Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Debug, Default,
)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn initial() -> Self {
        Self(String::new())
    }

    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque continuation token of a paginated retrieve.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Debug)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Server-side property filter registration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Debug)]
pub struct FilterHandle(ManagedObjectHandle);

impl FilterHandle {
    pub fn new(handle: ManagedObjectHandle) -> Self {
        Self(handle)
    }

    pub fn handle(&self) -> &ManagedObjectHandle {
        &self.0
    }
}

impl fmt::Display for FilterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.value)
    }
}

/// What a watch (or a snapshot fetch) observes.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct WatchSpec {
    entries: Vec<WatchEntry>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct WatchEntry {
    pub scope: Scope,
    /// Empty means all properties.
    pub paths: Vec<PropertyPath>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub enum Scope {
    /// A single object.
    Object(ManagedObjectHandle),
    /// Every object of the given type reachable from the container.
    Container {
        container: ManagedObjectHandle,
        r#type: String,
    },
}

impl Scope {
    pub fn includes(&self, obj: &ManagedObjectHandle) -> bool {
        match self {
            Scope::Object(handle) => handle == obj,
            Scope::Container { r#type, .. } => &obj.r#type == r#type,
        }
    }

    /// Type of the objects whose properties are selected.
    pub fn object_type(&self) -> &str {
        match self {
            Scope::Object(handle) => &handle.r#type,
            Scope::Container { r#type, .. } => r#type,
        }
    }
}

impl WatchSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object<I, P>(mut self, obj: ManagedObjectHandle, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyPath>,
    {
        self.entries.push(WatchEntry {
            scope: Scope::Object(obj),
            paths: paths.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn container<I, P>(
        mut self,
        container: ManagedObjectHandle,
        r#type: impl Into<String>,
        paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyPath>,
    {
        self.entries.push(WatchEntry {
            scope: Scope::Container {
                container,
                r#type: r#type.into(),
            },
            paths: paths.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `obj` is selected by any entry, whatever the paths.
    pub fn includes(&self, obj: &ManagedObjectHandle) -> bool {
        self.entries.iter().any(|entry| entry.scope.includes(obj))
    }

    /// Whether a change on `path` of `obj` belongs to this watch.
    pub fn covers(&self, obj: &ManagedObjectHandle, path: &PropertyPath) -> bool {
        self.entries.iter().any(|entry| {
            entry.scope.includes(obj)
                && (entry.paths.is_empty()
                    || entry.paths.iter().any(|p| p.covers(path)))
        })
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum ObjectUpdateKind {
    Enter,
    Modify,
    Leave,
}

impl FromStr for ObjectUpdateKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "enter" => Ok(Self::Enter),
            "modify" => Ok(Self::Modify),
            "leave" => Ok(Self::Leave),
            _ => Err(s.to_string()),
        }
    }
}

/// A removal never carries a value.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub enum ChangeOp {
    Set(Value),
    Remove,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct PropertyChange {
    pub obj: ManagedObjectHandle,
    pub kind: ObjectUpdateKind,
    pub path: PropertyPath,
    pub op: ChangeOp,
}

impl PropertyChange {
    pub fn value(&self) -> Option<&Value> {
        match &self.op {
            ChangeOp::Set(value) => Some(value),
            ChangeOp::Remove => None,
        }
    }
}

pub type ChangeDelta = Vec<PropertyChange>;

/// Values of a task's `info.state`.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub enum TaskOutcome {
    /// Carries `info.result`, if the task produced one.
    Success(Option<Value>),
    Error(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{ManagedObjectHandle, PropertyPath, WatchSpec};

    #[test]
    fn path_covers_sub_paths() {
        let runtime = PropertyPath::from("runtime");
        assert!(runtime.covers(&PropertyPath::from("runtime")));
        assert!(runtime.covers(&PropertyPath::from("runtime.powerState")));
        assert!(PropertyPath::from("config.hardware.device")
            .covers(&PropertyPath::from("config.hardware.device[4000]")));
        assert!(!runtime.covers(&PropertyPath::from("runtimeInfo")));
        assert!(!runtime.covers(&PropertyPath::from("name")));
    }

    #[test]
    fn spec_covers_objects_and_containers() {
        let vm = ManagedObjectHandle::new("VirtualMachine", "vm-1");
        let other = ManagedObjectHandle::new("VirtualMachine", "vm-2");
        let host = ManagedObjectHandle::new("HostSystem", "host-9");
        let root = ManagedObjectHandle::new("Folder", "group-d1");

        let spec = WatchSpec::new().object(vm.clone(), ["a", "b"]);
        assert!(spec.covers(&vm, &PropertyPath::from("a")));
        assert!(!spec.covers(&vm, &PropertyPath::from("c")));
        assert!(!spec.covers(&other, &PropertyPath::from("a")));

        let spec = WatchSpec::new().container(root, "VirtualMachine", ["name"]);
        assert!(spec.covers(&other, &PropertyPath::from("name")));
        assert!(!spec.covers(&host, &PropertyPath::from("name")));

        let all = WatchSpec::new().object(host.clone(), Vec::<String>::new());
        assert!(all.covers(&host, &PropertyPath::from("summary.runtime")));
    }
}

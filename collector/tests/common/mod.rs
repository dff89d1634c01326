/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vim_collector::{
    ChangeOp, ContinuationToken, Cursor, Error, Fault, FilterHandle,
    FilterUpdate, ManagedObjectHandle, ObjectContent, ObjectUpdateKind,
    PropertyChange, PropertyCollector, PropertyPath, Result, RetrieveOptions,
    RetrievePage, UpdateSet, Value, WaitOptions, WatchSpec,
};

/// Scripted response to one `wait_for_updates` call.
pub enum Scripted {
    Update(UpdateSet),
    NoUpdate,
    Fault(&'static str),
}

#[derive(PartialEq, Clone, Debug)]
pub enum Call {
    CreateFilter(WatchSpec),
    WaitForUpdates(Cursor),
    DestroyFilter(FilterHandle),
    Retrieve(WatchSpec),
    Continue(ContinuationToken),
}

#[derive(Default)]
struct Inner {
    updates: VecDeque<Scripted>,
    pages: VecDeque<std::result::Result<RetrievePage, &'static str>>,
    filters: Vec<FilterHandle>,
    created: usize,
    calls: Vec<Call>,
}

/// In-memory property collector replaying scripted responses. Running out
/// of scripted responses is reported as a fault.
#[derive(Default)]
pub struct FakeCollector {
    inner: Mutex<Inner>,
}

impl FakeCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_update(&self, update: UpdateSet) {
        self.lock().updates.push_back(Scripted::Update(update));
    }

    pub fn push_no_update(&self) {
        self.lock().updates.push_back(Scripted::NoUpdate);
    }

    pub fn push_fault(&self, r#type: &'static str) {
        self.lock().updates.push_back(Scripted::Fault(r#type));
    }

    pub fn push_page(&self, page: RetrievePage) {
        self.lock().pages.push_back(Ok(page));
    }

    pub fn push_page_fault(&self, r#type: &'static str) {
        self.lock().pages.push_back(Err(r#type));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| pred(call)).count()
    }

    pub fn live_filters(&self) -> Vec<FilterHandle> {
        self.lock().filters.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

fn fault(r#type: &str) -> Error {
    Error::Fault(Fault {
        r#type: r#type.to_string(),
        message: r#type.to_string(),
    })
}

#[async_trait]
impl PropertyCollector for FakeCollector {
    async fn create_filter(
        &self,
        spec: &WatchSpec,
        _partial_updates: bool,
    ) -> Result<FilterHandle> {
        let mut inner = self.lock();
        inner.calls.push(Call::CreateFilter(spec.clone()));
        inner.created += 1;
        let filter = filter(inner.created);
        inner.filters.push(filter.clone());
        Ok(filter)
    }

    async fn wait_for_updates(
        &self,
        version: &Cursor,
        _options: &WaitOptions,
    ) -> Result<Option<UpdateSet>> {
        let mut inner = self.lock();
        inner.calls.push(Call::WaitForUpdates(version.clone()));
        match inner.updates.pop_front() {
            Some(Scripted::Update(update)) => Ok(Some(update)),
            Some(Scripted::NoUpdate) => Ok(None),
            Some(Scripted::Fault(r#type)) => Err(fault(r#type)),
            None => Err(fault("NoMoreScriptedUpdates")),
        }
    }

    async fn destroy_filter(&self, filter: &FilterHandle) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(Call::DestroyFilter(filter.clone()));
        match inner.filters.iter().position(|f| f == filter) {
            Some(i) => {
                inner.filters.remove(i);
                Ok(())
            }
            None => Err(fault("ManagedObjectNotFound")),
        }
    }

    async fn retrieve_properties(
        &self,
        spec: &WatchSpec,
        _options: &RetrieveOptions,
    ) -> Result<RetrievePage> {
        let mut inner = self.lock();
        inner.calls.push(Call::Retrieve(spec.clone()));
        next_page(&mut inner)
    }

    async fn continue_retrieve(
        &self,
        token: &ContinuationToken,
    ) -> Result<RetrievePage> {
        let mut inner = self.lock();
        inner.calls.push(Call::Continue(token.clone()));
        next_page(&mut inner)
    }
}

fn next_page(inner: &mut Inner) -> Result<RetrievePage> {
    match inner.pages.pop_front() {
        Some(Ok(page)) => Ok(page),
        Some(Err(r#type)) => Err(fault(r#type)),
        None => Err(fault("InvalidArgument")),
    }
}

/* Builders. */

pub fn filter(n: usize) -> FilterHandle {
    FilterHandle::new(ManagedObjectHandle::new(
        "PropertyFilter",
        format!("session[52b6]filter-{}", n),
    ))
}

pub fn vm(id: &str) -> ManagedObjectHandle {
    ManagedObjectHandle::new("VirtualMachine", id)
}

pub fn task(id: &str) -> ManagedObjectHandle {
    ManagedObjectHandle::new("Task", id)
}

pub fn set(
    obj: &ManagedObjectHandle,
    path: &str,
    value: impl Into<Value>,
) -> PropertyChange {
    PropertyChange {
        obj: obj.clone(),
        kind: ObjectUpdateKind::Modify,
        path: PropertyPath::from(path),
        op: ChangeOp::Set(value.into()),
    }
}

pub fn remove(obj: &ManagedObjectHandle, path: &str) -> PropertyChange {
    PropertyChange {
        obj: obj.clone(),
        kind: ObjectUpdateKind::Modify,
        path: PropertyPath::from(path),
        op: ChangeOp::Remove,
    }
}

pub fn update_set(
    version: &str,
    filter: &FilterHandle,
    changes: Vec<PropertyChange>,
) -> UpdateSet {
    UpdateSet {
        version: Cursor::new(version),
        filters: vec![FilterUpdate {
            filter: filter.clone(),
            changes,
            left: Vec::new(),
        }],
        truncated: false,
    }
}

pub fn leave_set(
    version: &str,
    filter: &FilterHandle,
    left: Vec<ManagedObjectHandle>,
) -> UpdateSet {
    let mut update = update_set(version, filter, Vec::new());
    update.filters[0].left = left;
    update
}

pub fn object(
    obj: &ManagedObjectHandle,
    props: Vec<(&str, Value)>,
) -> ObjectContent {
    ObjectContent {
        obj: obj.clone(),
        properties: props
            .into_iter()
            .map(|(path, value)| (PropertyPath::from(path), value))
            .collect(),
    }
}

pub fn page(objects: Vec<ObjectContent>, token: Option<&str>) -> RetrievePage {
    RetrievePage {
        objects,
        token: token.map(ContinuationToken::new),
    }
}

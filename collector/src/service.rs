/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{
    ChangeDelta, ContinuationToken, Cursor, FilterHandle, ManagedObjectHandle,
    PropertyPath, WatchSpec,
};
use crate::value::Value;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaitOptions {
    /// Server-side bound on a long poll. `None` waits until a change
    /// arrives; `Some(0)` returns immediately.
    pub max_wait_seconds: Option<u32>,
    pub max_object_updates: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Page size hint.
    pub max_objects: Option<u32>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct UpdateSet {
    pub version: Cursor,
    pub filters: Vec<FilterUpdate>,
    /// More updates are pending beyond `max_object_updates`.
    pub truncated: bool,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct FilterUpdate {
    pub filter: FilterHandle,
    pub changes: ChangeDelta,
    /// Objects that left the filter's scope. vim reports these without
    /// property changes.
    #[serde(default)]
    pub left: Vec<ManagedObjectHandle>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct ObjectContent {
    pub obj: ManagedObjectHandle,
    pub properties: BTreeMap<PropertyPath, Value>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct RetrievePage {
    pub objects: Vec<ObjectContent>,
    pub token: Option<ContinuationToken>,
}

/// The remote property collector of one authenticated session.
#[async_trait]
pub trait PropertyCollector: Send + Sync {
    async fn create_filter(
        &self,
        spec: &WatchSpec,
        partial_updates: bool,
    ) -> Result<FilterHandle>;

    /// Long poll for changes since `version`. `None` means the wait
    /// elapsed without any change.
    async fn wait_for_updates(
        &self,
        version: &Cursor,
        options: &WaitOptions,
    ) -> Result<Option<UpdateSet>>;

    async fn destroy_filter(&self, filter: &FilterHandle) -> Result<()>;

    async fn retrieve_properties(
        &self,
        spec: &WatchSpec,
        options: &RetrieveOptions,
    ) -> Result<RetrievePage>;

    async fn continue_retrieve(
        &self,
        token: &ContinuationToken,
    ) -> Result<RetrievePage>;
}

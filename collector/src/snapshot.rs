/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::BTreeMap;

use log::debug;

use crate::error::Result;
use crate::service::{PropertyCollector, RetrieveOptions};
use crate::types::{ManagedObjectHandle, PropertyPath, WatchSpec};
use crate::value::Value;

pub type Properties = BTreeMap<PropertyPath, Value>;
pub type Snapshot = BTreeMap<ManagedObjectHandle, Properties>;

/// Read the current properties of everything `spec` selects, following
/// continuation tokens until the server stops returning one. A fault on
/// any page aborts the whole fetch.
pub async fn fetch(
    collector: &dyn PropertyCollector,
    spec: &WatchSpec,
    options: &RetrieveOptions,
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    let mut page = collector.retrieve_properties(spec, options).await?;
    let mut pages = 1;

    loop {
        debug!("snapshot page {}: {} objects", pages, page.objects.len());
        for object in page.objects {
            snapshot
                .entry(object.obj)
                .or_default()
                .extend(object.properties);
        }
        match page.token.filter(|token| !token.is_empty()) {
            Some(token) => {
                page = collector.continue_retrieve(&token).await?;
                pages += 1;
            }
            None => break,
        }
    }

    debug!(
        "snapshot complete: {} objects in {} pages",
        snapshot.len(),
        pages
    );
    Ok(snapshot)
}

/// Properties of a single object; empty if the object reported none.
pub async fn fetch_one(
    collector: &dyn PropertyCollector,
    obj: &ManagedObjectHandle,
    paths: &[&str],
) -> Result<Properties> {
    let spec = WatchSpec::new().object(obj.clone(), paths.iter().copied());
    Ok(fetch(collector, &spec, &RetrieveOptions::default())
        .await?
        .remove(obj)
        .unwrap_or_default())
}

/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, warn};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::service::{FilterUpdate, PropertyCollector, WaitOptions};
use crate::types::{
    ChangeDelta, Cursor, FilterHandle, ManagedObjectHandle, WatchSpec,
};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum State {
    Idle,
    Waiting,
    Destroyed,
}

#[derive(PartialEq, Clone, Debug)]
pub struct Update {
    /// Empty when the update only reports objects leaving the watch, or
    /// when every entry of the server's update set was dropped.
    pub changes: ChangeDelta,
    /// Objects that left the scope of the watch.
    pub left: Vec<ManagedObjectHandle>,
    pub cursor: Cursor,
    pub truncated: bool,
}

#[derive(PartialEq, Clone, Debug)]
pub enum Poll {
    Update(Update),
    NoUpdate,
}

/// A server-side property filter and the change feed observed through it.
///
/// Use one watch per session: the server's version cursor belongs to the
/// collector, not to a filter. The filter must be released with
/// [`Watch::destroy`] (or by running inside [`with_watch`]); a watch
/// dropped while still registered schedules the release on the current
/// runtime.
pub struct Watch {
    collector: Arc<dyn PropertyCollector>,
    spec: WatchSpec,
    filter: FilterHandle,
    cursor: Cursor,
    state: State,
}

impl Watch {
    pub async fn create(
        collector: Arc<dyn PropertyCollector>,
        spec: WatchSpec,
    ) -> Result<Self> {
        Self::create_with(collector, spec, false).await
    }

    /// With `partial_updates`, the server may report changes on sub-paths
    /// of a watched path instead of the whole value.
    pub async fn create_with(
        collector: Arc<dyn PropertyCollector>,
        spec: WatchSpec,
        partial_updates: bool,
    ) -> Result<Self> {
        let filter = collector.create_filter(&spec, partial_updates).await?;
        debug!("created property filter {}", filter);
        Ok(Self {
            collector,
            spec,
            filter,
            cursor: Cursor::initial(),
            state: State::Idle,
        })
    }

    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    pub fn filter(&self) -> &FilterHandle {
        &self.filter
    }

    /// The cursor to pass to the next poll.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Issue one long poll. `cursor` must be the one returned by the
    /// previous poll on this watch (or the initial cursor).
    pub async fn poll(
        &mut self,
        cursor: &Cursor,
        max_wait_seconds: Option<u32>,
    ) -> Result<Poll> {
        match self.state {
            State::Destroyed => {
                return Err(Error::FilterNotFound(self.filter.clone()))
            }
            State::Waiting => {
                warn!("previous poll on filter {} was abandoned", self.filter)
            }
            State::Idle => {}
        }
        if cursor != &self.cursor {
            return Err(Error::StaleCursor(cursor.clone()));
        }

        let options = WaitOptions {
            max_wait_seconds,
            max_object_updates: None,
        };
        self.state = State::Waiting;
        let result = self.collector.wait_for_updates(cursor, &options).await;
        self.state = State::Idle;

        let update_set = match result? {
            Some(update_set) => update_set,
            None => return Ok(Poll::NoUpdate),
        };

        self.cursor = update_set.version;
        let (changes, left) = self.accept(update_set.filters);
        Ok(Poll::Update(Update {
            changes,
            left,
            cursor: self.cursor.clone(),
            truncated: update_set.truncated,
        }))
    }

    /// Poll until an update arrives. `term` is checked before every poll;
    /// an in-flight poll is never interrupted.
    pub async fn next_update(
        &mut self,
        max_wait_seconds: Option<u32>,
        term: &mut watch::Receiver<bool>,
    ) -> Result<Update> {
        loop {
            if *term.borrow() {
                return Err(Error::Cancelled);
            }
            let cursor = self.cursor.clone();
            match self.poll(&cursor, max_wait_seconds).await? {
                Poll::Update(update) => return Ok(update),
                Poll::NoUpdate => {
                    debug!("no update on filter {}", self.filter)
                }
            }
        }
    }

    /// Release the server-side filter. Only the first call reaches the
    /// server.
    pub async fn destroy(&mut self) -> Result<()> {
        if self.state == State::Destroyed {
            debug!("property filter {} already destroyed", self.filter);
            return Ok(());
        }
        self.state = State::Destroyed;
        self.collector.destroy_filter(&self.filter).await?;
        debug!("destroyed property filter {}", self.filter);
        Ok(())
    }

    fn accept(
        &self,
        filters: Vec<FilterUpdate>,
    ) -> (ChangeDelta, Vec<ManagedObjectHandle>) {
        let mut changes = ChangeDelta::new();
        let mut left = Vec::new();
        for update in filters {
            if update.filter != self.filter {
                debug!(
                    "skipping {} changes for foreign filter {}",
                    update.changes.len(),
                    update.filter
                );
                continue;
            }
            for change in update.changes {
                if self.spec.covers(&change.obj, &change.path) {
                    changes.push(change);
                } else {
                    warn!(
                        "ignoring change on unwatched property {} of {}",
                        change.path, change.obj
                    );
                }
            }
            for obj in update.left {
                if self.spec.includes(&obj) {
                    left.push(obj);
                } else {
                    warn!("ignoring leave of unwatched object {}", obj);
                }
            }
        }
        (changes, left)
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        if self.state == State::Destroyed {
            return;
        }
        warn!("property filter {} dropped without destroy", self.filter);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let collector = self.collector.clone();
                let filter = self.filter.clone();
                runtime.spawn(async move {
                    if let Err(e) = collector.destroy_filter(&filter).await {
                        warn!(
                            "failed to destroy property filter {}: {}",
                            filter, e
                        );
                    }
                });
            }
            Err(_) => warn!(
                "no runtime to destroy property filter {}; it stays \
                 registered until the session ends",
                self.filter
            ),
        }
    }
}

/// Create a watch, run `body` on it and destroy it afterwards, whatever
/// the outcome. An error from `body` takes precedence over a failure to
/// destroy.
pub async fn with_watch<T, F>(
    collector: Arc<dyn PropertyCollector>,
    spec: WatchSpec,
    body: F,
) -> Result<T>
where
    F: for<'a> FnOnce(&'a mut Watch) -> BoxFuture<'a, Result<T>>,
{
    let mut watch = Watch::create(collector, spec).await?;
    let result = body(&mut watch).await;
    let destroyed = watch.destroy().await;
    match (result, destroyed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(destroy_err)) => {
            warn!(
                "failed to destroy property filter {}: {}",
                watch.filter(),
                destroy_err
            );
            Err(e)
        }
    }
}

/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod config;
mod error;
pub mod poller;
pub mod service;
pub mod snapshot;
pub mod soap;
pub mod task;
pub mod types;
pub mod value;
pub mod vim;

pub use config::{Config, Credentials, HostAlias};
pub use error::{Error, Result};
pub use poller::{with_watch, Poll, State, Update, Watch};
pub use service::{
    FilterUpdate, ObjectContent, PropertyCollector, RetrieveOptions,
    RetrievePage, UpdateSet, WaitOptions,
};
pub use snapshot::{Properties, Snapshot};
pub use soap::{CertType, SoapClient, SoapError};
pub use task::{wait_for_task, wait_for_values, TaskWaitOptions};
pub use types::{
    ChangeDelta, ChangeOp, ContinuationToken, Cursor, FilterHandle,
    ManagedObjectHandle, ObjectUpdateKind, PropertyChange, PropertyPath,
    Scope, TaskOutcome, TaskState, WatchEntry, WatchSpec,
};
pub use value::{Fault, Record, Value};
pub use vim::{ServiceContent, Session};

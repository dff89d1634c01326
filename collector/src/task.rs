/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::sync::Arc;

use futures::FutureExt;
use log::{debug, info};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::poller::with_watch;
use crate::service::PropertyCollector;
use crate::snapshot::{self, Properties};
use crate::types::{
    ChangeOp, ManagedObjectHandle, PropertyPath, TaskOutcome, TaskState,
    WatchSpec,
};
use crate::value::Value;

pub const STATE_PATH: &str = "info.state";
pub const ERROR_PATH: &str = "info.error";
pub const RESULT_PATH: &str = "info.result";

#[derive(Clone, Copy, Debug)]
pub struct TaskWaitOptions {
    pub max_wait_seconds: Option<u32>,
}

impl Default for TaskWaitOptions {
    fn default() -> Self {
        Self {
            max_wait_seconds: Some(30),
        }
    }
}

/// Watch `paths` of `obj` until the value at `state_path` satisfies
/// `is_terminal`, and return the last known value of every watched path.
/// A missing state value means the object has not reported it yet.
pub async fn wait_for_values<F>(
    collector: Arc<dyn PropertyCollector>,
    obj: &ManagedObjectHandle,
    paths: &[&str],
    state_path: &str,
    is_terminal: F,
    max_wait_seconds: Option<u32>,
    mut term: watch::Receiver<bool>,
) -> Result<Properties>
where
    F: Fn(&Value) -> Result<bool> + Send + 'static,
{
    let spec = WatchSpec::new().object(obj.clone(), paths.iter().copied());
    let state_path = PropertyPath::from(state_path);

    with_watch(collector, spec, move |watch| {
        async move {
            let mut values = Properties::new();
            loop {
                let update = watch.next_update(max_wait_seconds, &mut term).await?;
                for change in update.changes {
                    match change.op {
                        ChangeOp::Set(value) => {
                            values.insert(change.path, value);
                        }
                        ChangeOp::Remove => {
                            values.remove(&change.path);
                        }
                    }
                }
                if let Some(state) = values.get(&state_path) {
                    if is_terminal(state)? {
                        debug!("{} reached {}", state_path, state);
                        return Ok(values);
                    }
                }
            }
        }
        .boxed()
    })
    .await
}

/// Wait for a task to finish. Task failures are reported as
/// [`TaskOutcome::Error`]; only transport and service faults are errors.
pub async fn wait_for_task(
    collector: Arc<dyn PropertyCollector>,
    task: &ManagedObjectHandle,
    options: &TaskWaitOptions,
    term: watch::Receiver<bool>,
) -> Result<TaskOutcome> {
    let values = wait_for_values(
        collector.clone(),
        task,
        &[STATE_PATH, ERROR_PATH],
        STATE_PATH,
        |value| Ok(task_state(value)?.is_terminal()),
        options.max_wait_seconds,
        term,
    )
    .await?;

    let state = match values.get(STATE_PATH) {
        Some(value) => task_state(value)?,
        None => return Err(Error::MissingField(STATE_PATH.to_string())),
    };
    let error = values.get(ERROR_PATH);

    // Some servers report success with a populated error on partial
    // failure.
    if let Some(fault) = error.and_then(Value::as_fault) {
        info!("task {} failed: {}", task.value, fault);
        return Ok(TaskOutcome::Error(fault.to_string()));
    }

    match state {
        TaskState::Success => {
            let result =
                snapshot::fetch_one(collector.as_ref(), task, &[RESULT_PATH])
                    .await?
                    .remove(RESULT_PATH);
            info!("task {} succeeded", task.value);
            Ok(TaskOutcome::Success(result))
        }
        _ => {
            let message = error.map_or_else(
                || String::from("task failed without error information"),
                |e| e.to_string(),
            );
            info!("task {} failed: {}", task.value, message);
            Ok(TaskOutcome::Error(message))
        }
    }
}

/// Unknown or non-string states fail instead of being treated as
/// still running.
fn task_state(value: &Value) -> Result<TaskState> {
    value
        .as_str()
        .ok_or_else(|| Error::UnexpectedTaskState(value.to_string()))?
        .parse()
        .map_err(Error::UnexpectedTaskState)
}

/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::sync::Arc;

use colored::Colorize;

use vim_collector::{
    wait_for_task, ManagedObjectHandle, Session, TaskOutcome, TaskWaitOptions,
};

use crate::{Error, Result};

pub async fn run(session: Arc<Session>, task: &str, max_wait: u32) -> Result<()> {
    if task.is_empty() || task.contains(char::is_whitespace) {
        return Err(Error::InvalidTask(task.to_string()));
    }
    let handle = ManagedObjectHandle::new("Task", task);
    let options = TaskWaitOptions {
        max_wait_seconds: Some(max_wait),
    };

    match wait_for_task(session, &handle, &options, super::term_on_ctrl_c())
        .await?
    {
        TaskOutcome::Success(result) => {
            println!("{}", format!("Task {} succeeded", task).green());
            if let Some(result) = result {
                println!("   result = {}", result);
            }
            Ok(())
        }
        TaskOutcome::Error(message) => {
            println!("{}", format!("Task {} failed: {}", task, message).red());
            Err(Error::TaskFailed(task.to_string(), message))
        }
    }
}

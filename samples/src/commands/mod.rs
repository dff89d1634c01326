/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod get_updates;
mod list;
mod wait_task;

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use vim_collector::Session;

use crate::{args::Command, Result};

pub async fn run(session: Arc<Session>, command: &Command) -> Result<()> {
    match command {
        Command::GetUpdates { vm_name, max_wait } => {
            get_updates::run(session, vm_name.as_deref(), *max_wait).await
        }
        Command::List {
            object_type,
            property,
            page_size,
        } => list::run(&session, object_type, property, *page_size).await,
        Command::WaitTask { task, max_wait } => {
            wait_task::run(session, task, *max_wait).await
        }
    }
}

/// Termination flag raised on Ctrl-C. Pollers see it before their next
/// poll.
fn term_on_ctrl_c() -> watch::Receiver<bool> {
    let (term_tx, term) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupted; stopping after the current poll");
                let _ = term_tx.send(true);
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {}", e),
        }
    });
    term
}

/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::sync::Arc;

use colored::Colorize;
use futures::FutureExt;
use log::info;

use vim_collector::{
    snapshot, with_watch, ChangeOp, ManagedObjectHandle, ObjectUpdateKind,
    PropertyChange, PropertyCollector, RetrieveOptions, Session, Value,
    WatchSpec,
};

use crate::{Error, Result};

const PROPERTIES: [&str; 2] = ["name", "runtime"];
const RUNTIME_FIELDS: [&str; 4] =
    ["powerState", "connectionState", "bootTime", "memoryOverhead"];

pub async fn run(
    session: Arc<Session>,
    vm_name: Option<&str>,
    max_wait: u32,
) -> Result<()> {
    let spec = match vm_name {
        Some(name) => {
            WatchSpec::new().object(find_vm(&session, name).await?, PROPERTIES)
        }
        None => WatchSpec::new().container(
            session.root_folder().clone(),
            "VirtualMachine",
            PROPERTIES,
        ),
    };

    let mut term = super::term_on_ctrl_c();
    let collector: Arc<dyn PropertyCollector> = session;
    with_watch(collector, spec, move |watch| {
        async move {
            loop {
                match watch.next_update(Some(max_wait), &mut term).await {
                    Ok(update) => {
                        update.changes.iter().for_each(print_change);
                        for obj in &update.left {
                            println!("{} {}", "Removed Data".red(), obj);
                        }
                        if update.truncated {
                            info!("more updates pending");
                        }
                    }
                    Err(vim_collector::Error::Cancelled) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
        }
        .boxed()
    })
    .await?;
    Ok(())
}

async fn find_vm(session: &Session, name: &str) -> Result<ManagedObjectHandle> {
    let spec = WatchSpec::new().container(
        session.root_folder().clone(),
        "VirtualMachine",
        ["name"],
    );
    snapshot::fetch(session, &spec, &RetrieveOptions::default())
        .await?
        .into_iter()
        .find(|(_, props)| {
            props.get("name").and_then(Value::as_str) == Some(name)
        })
        .map(|(vm, _)| vm)
        .ok_or_else(|| Error::VmNotFound(name.to_string()))
}

fn print_change(change: &PropertyChange) {
    let header = match change.kind {
        ObjectUpdateKind::Enter => "New Data".green(),
        ObjectUpdateKind::Modify => "Changed Data".yellow(),
        ObjectUpdateKind::Leave => "Removed Data".red(),
    };
    match &change.op {
        ChangeOp::Set(runtime) if change.path.as_str() == "runtime" => {
            println!("{} {}:", header, change.obj);
            for field in RUNTIME_FIELDS {
                if let Some(value) = runtime.get(field) {
                    println!("   runtime.{} = {}", field, value);
                }
            }
        }
        ChangeOp::Set(value) => {
            println!("{} {}: {} = {}", header, change.obj, change.path, value)
        }
        ChangeOp::Remove => {
            println!("{} {}: {} removed", header, change.obj, change.path)
        }
    }
}

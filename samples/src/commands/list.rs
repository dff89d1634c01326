/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use colored::Colorize;
use log::info;

use vim_collector::{snapshot, RetrieveOptions, Session, WatchSpec};

use crate::Result;

pub async fn run(
    session: &Session,
    object_type: &str,
    properties: &[String],
    page_size: Option<u32>,
) -> Result<()> {
    let spec = WatchSpec::new().container(
        session.root_folder().clone(),
        object_type,
        properties.iter().map(String::as_str),
    );
    let snapshot = snapshot::fetch(
        session,
        &spec,
        &RetrieveOptions {
            max_objects: page_size,
        },
    )
    .await?;

    for (obj, props) in &snapshot {
        println!("{}", obj.to_string().bold());
        for (path, value) in props {
            println!("   {} = {}", path, value);
        }
    }
    info!("{} objects of type {}", snapshot.len(), object_type);
    Ok(())
}

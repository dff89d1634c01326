/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{error, warn};

use vim_collector::Session;
use vim_samples::{args::Args, commands, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.init_logger();

    let config = args.config().await?;
    let session = Arc::new(Session::connect(&config).await?);

    let result = commands::run(session.clone(), &args.command).await;
    if let Err(e) = session.logout().await {
        warn!("failed to log out: {}", e);
    }
    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
    Ok(())
}

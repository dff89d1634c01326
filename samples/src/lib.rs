/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

pub mod args;
pub mod commands;
mod error;

pub use error::{Error, Result};

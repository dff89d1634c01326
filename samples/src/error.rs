/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Collector(#[from] vim_collector::Error),
    #[error("No hostname or config file given")]
    MissingHost,
    #[error("No virtual machine named '{0}'")]
    VmNotFound(String),
    #[error("Invalid task reference: '{0}'")]
    InvalidTask(String),
    #[error("Task {0} failed: {1}")]
    TaskFailed(String, String),
}

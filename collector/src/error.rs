/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use crate::soap::SoapError;
use crate::types::{Cursor, FilterHandle};
use crate::value::Fault;
use crate::vim::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error during SOAP requests: {0}")]
    Soap(#[from] SoapError),
    #[error("Server fault: {0}")]
    Fault(Fault),
    #[error("Property filter not found: {0}")]
    FilterNotFound(FilterHandle),
    #[error("Cursor '{0}' is not the current version of this watch")]
    StaleCursor(Cursor),
    #[error("Polling cancelled")]
    Cancelled,
    #[error("Unexpected task state: {0}")]
    UnexpectedTaskState(String),
    #[error("No password given for user {0}")]
    MissingPassword(String),
    #[error("failed to generate request: {0}")]
    GenerateRequest(#[from] xml::writer::Error),
    #[error("failed to parse response (invalid xml): {0}")]
    ParseResponseXml(#[from] xml::reader::Error),
    #[error("failed to parse response: {0}")]
    ParseResponse(#[from] ParseError),
    #[error("Missing {0} in response")]
    MissingField(String),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("failed to resolve hostname: {0}")]
    Resolve(#[from] trust_dns_resolver::error::ResolveError),
    #[error("No Ip found for hostname: {0}")]
    NoIpFound(String),
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
}

impl Error {
    /// The server fault carried by this error, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

//! The property collector over the vim25 SOAP API.

mod error;
mod from_xml;
mod request;
mod response;
mod session;

pub use error::ParseError;
pub use session::{ServiceContent, Session};

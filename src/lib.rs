//! OData query option processing.
//!
//! Turns the `$filter`, `$orderby`, `$expand`, `$select`, `$top`, `$skip`,
//! `$skiptoken` and `$inlinecount` options of a request into a validated
//! [`RequestDescription`](processor::RequestDescription) that a data layer
//! can execute.

pub mod config;
pub mod edm;
pub mod error;
pub mod filters;
pub mod instance;
pub mod metadata;
pub mod orderby;
pub mod processor;
pub mod projection;
pub mod skiptoken;

pub use bigdecimal;
pub use chrono;
pub use uuid;

pub use error::{Error, ErrorKind, Result};

//! # snapline-shared
//!
//! Types shared by every Snapline crate: identifier newtypes, the JSON
//! records exchanged with the social backend, and protocol constants.

pub mod constants;
pub mod protocol;
pub mod types;

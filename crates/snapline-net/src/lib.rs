//! # snapline-net
//!
//! Remote backend access for Snapline.
//!
//! The rest of the workspace talks to the backend only through the
//! [`RemoteDataClient`] trait. [`HttpRemote`] is the reqwest-backed
//! implementation and [`SocialApi`] layers typed endpoint helpers on top.

pub mod api;
pub mod http;
pub mod remote;

mod error;

pub use api::SocialApi;
pub use error::NetworkError;
pub use http::{HttpRemote, HttpRemoteConfig};
pub use remote::{RemoteDataClient, Response};

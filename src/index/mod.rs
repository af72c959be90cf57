//! Package index access
//!
//! - client.rs: `HttpClient` trait and the reqwest-backed implementation
//! - links.rs: repository link extraction from an index homepage

pub mod client;
pub mod links;

pub use client::{HttpClient, HttpResponse, ReqwestClient};
pub use links::{LinkExtractor, filter_to_known_hosts};

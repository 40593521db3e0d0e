pub mod accounts;
pub mod client;
pub mod common;
pub mod departments;
pub mod error;
pub mod sites;

pub use client::{Client, ClientConfig};
pub use error::ApiError;

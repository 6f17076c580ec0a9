//! Network layer: request pacing, retries, and the API client.

pub mod client;
pub mod throttle;

pub use client::{LibraryClient, LibraryTarget};
pub use throttle::Throttler;

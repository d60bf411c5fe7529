//! Library exports for tokennet, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod startup;
pub mod store;
pub mod utils;

pub use client::{ClientRegistry, NetClient};
pub use error::{NetError, NetResult};
pub use models::{Endpoint, Reply};

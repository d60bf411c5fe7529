#[allow(clippy::module_inception)]
pub mod client;
pub mod registry;
pub mod request;
pub mod token;

pub use client::NetClient;
pub use registry::ClientRegistry;
pub use request::{RequestBody, FORM_CONTENT_TYPE};

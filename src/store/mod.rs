pub mod base;
pub mod local_store;
pub mod redis_connector;
pub mod redis_store;

// Re-export the primary store items so code outside can do
// "use crate::store::{CredentialStore, create_store};"
pub use base::{create_store, CredentialStore};
pub use local_store::LocalStore;
pub use redis_connector::{KeyValueBackend, RedisConnector, RedisConnectors};
pub use redis_store::RedisStore;

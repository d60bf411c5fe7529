pub mod cookie;
pub mod endpoint;
pub mod envelope;
pub mod token;

pub use cookie::{SessionCookie, DEFAULT_SESSION_COOKIE};
pub use endpoint::{Endpoint, Reply};
pub use envelope::{Envelope, ResponseStatus};
pub use token::TokenData;

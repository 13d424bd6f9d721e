//! Built-in OAuth provider implementations

mod twitter;

pub use twitter::{Twitter, TwitterHost};

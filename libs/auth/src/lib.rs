//! Authentication library for Kurt
//!
//! Provides JWT validation against Auth0, the OIDC authorization-code +
//! PKCE flow, session cookie handling, and auth audit events.

pub mod audit;
pub mod config;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod oidc;
pub mod tokens;

pub use audit::*;
pub use config::*;
pub use error::*;
pub use jwks::*;
pub use jwt::*;
pub use oidc::*;
pub use tokens::*;

/// `time` re-export so callers building `cookie::Cookie`s (e.g. setting
/// `max_age`) don't need a direct dependency on the `cookie` crate's
/// `time` version.
pub use cookie::time as cookie_time;
pub use cookie::{Cookie, SameSite};

//! Authentication against the remote API.

pub mod token;

pub use token::TokenManager;

// Public API
pub use token::TokenConfig;
pub use types::AuthClaims;

// Internal modules
pub mod token;
pub mod types;

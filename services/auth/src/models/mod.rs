//! Email gate service models

pub mod lead;
pub mod token;

// Re-export for convenience
pub use lead::Lead;
pub use token::EmailToken;

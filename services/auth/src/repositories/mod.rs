//! Database repositories for the email gate service

pub mod lead;
pub mod token;

pub use lead::LeadRepository;
pub use token::TokenRepository;

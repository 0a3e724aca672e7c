pub mod config;
pub mod confirm;
pub mod entry;
pub mod error;
pub mod notification;
pub mod session;

// Re-export common error type
pub use error::MemoError;

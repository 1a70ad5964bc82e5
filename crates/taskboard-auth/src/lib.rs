pub mod accounts;
pub mod password;
pub mod token;
pub mod error;

// Re-exports
pub use accounts::{Accounts, Session};
pub use password::PasswordHasher;
pub use token::{Claims, TokenIssuer};
pub use error::{Error, Result};

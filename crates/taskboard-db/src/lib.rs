pub mod models;
pub mod repository;
pub mod error;
mod store;

// Re-exports
pub use models::{EventRecord, MemberRecord, SectionRecord, TaskRecord, UserRecord, WorkspaceRecord};
pub use repository::Database;
pub use error::{Error, Result};

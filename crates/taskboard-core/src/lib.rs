pub mod activity;
pub mod board;
pub mod error;
pub mod event;
pub mod memory;
pub mod permission;
pub mod position;
pub mod section;
pub mod store;
pub mod task;
pub mod user;
pub mod validation;
pub mod workspace;

// Re-exports
pub use activity::{ActivityPage, ActivityQuery, ExportFormat, SortOrder};
pub use board::{Board, MemberPatch, NewTaskInput, TaskPatch, WorkspacePatch};
pub use error::{Error, Result};
pub use event::{EntityType, Event, EventKind};
pub use memory::MemoryStore;
pub use permission::Action;
pub use section::Section;
pub use store::{Store, StoreStats};
pub use task::{Task, TaskPriority, TaskStatus};
pub use user::User;
pub use workspace::{Permissions, Workspace, WorkspaceMember};

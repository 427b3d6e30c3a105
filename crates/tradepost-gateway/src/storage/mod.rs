// User storage for the gateway (the principal-lookup collaborator).
// Decision: PostgreSQL in production, in-memory for dev mode, dispatched
// through a backend enum.

pub mod backend;
pub mod memory;
pub mod models;
pub mod password;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::{CreateUserRow, UserRow};
pub use repositories::Database;

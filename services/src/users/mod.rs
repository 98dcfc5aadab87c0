//! The users being listed, where they are read from, and the HTTP routes
//! serving the listing.

pub mod record;
pub mod routes;
pub mod source;

pub use record::{Field, Role, UserRecord};
pub use routes::{AppState, user_routes};
pub use source::{InMemory, MemoryUserSource, PgUserSource, RecordSource};

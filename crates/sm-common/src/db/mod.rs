pub mod dictionaries;
pub mod employees;
pub mod memory;
pub mod migrations;
pub mod pg_store;
pub mod pool;
pub mod projects;
pub mod references;
pub mod requests;
pub mod store;
pub mod util;

pub use memory::MemoryStore;
pub use migrations::{MigrationError, run_migrations};
pub use pg_store::PgStore;
pub use pool::{DbPoolError, PgPool, create_pool_from_url, create_pool_from_url_checked};
pub use store::{RefField, StaffingStore, StoreError};

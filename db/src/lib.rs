pub mod error;
pub mod forms;
pub mod memory;
pub mod models;
pub mod page;
pub mod pg;
pub mod renewal;
pub mod schema;
pub mod session;
pub mod status;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wire;

pub use error::StoreError;
pub use memory::MemoryCatalog;
pub use pg::{establish_pool, DbPool, PgCatalog};
pub use store::Catalog;

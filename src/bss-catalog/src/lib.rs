//! The entity catalog (§4.1, §6.2): a declarative registry mapping
//! replicated table names to their primary-key descriptor, plus the row
//! (de)serialization the rest of the replication engine is driven by.
//!
//! Every table the applier touches except the hard-coded `photo_data` case
//! (bss-replication) must be registered here. An unregistered table is a
//! row-skip condition, never a panic.

mod row_store;
mod schema;

pub use row_store::{InMemoryRowStore, RowStore, RowStoreError};
pub use schema::{CatalogError, EntityCatalog, EntitySchema, KeyColumn, RowField};

pub use bss_repr::{ParseError, ScalarType, ScalarValue};

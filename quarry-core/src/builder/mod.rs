//! Query builder module

pub mod common;
pub mod insert;
pub mod query;
pub mod update;

// Re-export types from submodules
pub use common::{IntoColumns, JoinClause, JoinType, OrderByClause, SortDirection, TableRef};
pub use insert::{InsertRows, IntoInsertData};
pub use query::{Query, QueryParts};
pub use update::IntoUpdateData;

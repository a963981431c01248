//! Quarry Core - a dialect-aware SQL query builder, compiler and executor
//!
//! Queries are built with a fluent API, compiled by a per-dialect
//! [`Grammar`] into parameterized SQL, and run through a
//! [`DatabaseProvider`]. Schema changes and migrations compile through the
//! same grammars.

pub mod builder;
pub mod config;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod grammar;
pub mod operator;
pub mod predicate;
pub mod row;
pub mod schema;
pub mod value;

// Re-export main types
pub use builder::{
    InsertRows, IntoColumns, IntoInsertData, IntoUpdateData, JoinClause, JoinType, Query,
    QueryParts, SortDirection,
};
pub use config::DatabaseConfig;
pub use error::{Error, Result};
pub use executor::DatabaseProvider;
pub use grammar::{Grammar, MySqlGrammar, PostgresGrammar, Sql, StandardGrammar};
pub use operator::{op, IntoOperator, Operator};
pub use predicate::{col, Condition, Connector, IntoCondition, Predicate};
pub use row::Row;
pub use value::Value;

pub use drivers::StubDatabase;
#[cfg(feature = "mysql")]
pub use drivers::{MySqlConnection, MySqlDatabase};
#[cfg(feature = "postgres")]
pub use drivers::{PostgresConnection, PostgresDatabase};

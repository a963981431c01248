//! Database drivers

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
mod stub;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlConnection, MySqlDatabase};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresConnection, PostgresDatabase};
pub use stub::StubDatabase;

//! SQLite driver for the sqlhooks driver contract, built on SQLx.
//!
//! Connections expose every connection extension (context-aware exec, query,
//! prepare and begin, session reset and ping); statements expose the
//! context-aware exec and query forms.
//!
//! # Example
//!
//! ```no_run
//! use sqlhooks_driver::{CallContext, Driver, NamedValue, collect_rows, dispatch};
//! use sqlhooks_sqlite::SqliteDriver;
//!
//! # async fn example() -> sqlhooks_driver::Result<()> {
//! let driver = SqliteDriver::default();
//! let mut conn = driver.open("app.db").await?;
//! let ctx = CallContext::background();
//!
//! dispatch::conn_exec(conn.as_mut(), &ctx, "CREATE TABLE users (name TEXT)", &[]).await?;
//! dispatch::conn_exec(
//!    conn.as_mut(),
//!    &ctx,
//!    "INSERT INTO users (name) VALUES (?)",
//!    &[NamedValue::positional(1, "Alice")],
//! )
//! .await?;
//!
//! let mut rows = dispatch::conn_query(conn.as_mut(), &ctx, "SELECT name FROM users", &[]).await?;
//! let names = collect_rows(rows.as_mut()).await?;
//!
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conn;
pub mod decode;
pub mod driver;
pub mod stmt;

pub use config::SqliteDriverConfig;
pub use conn::{SqliteConn, SqliteTx};
pub use driver::SqliteDriver;
pub use stmt::{SqliteStmt, bind_value};

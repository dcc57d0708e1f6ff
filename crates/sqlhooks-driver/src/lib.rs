//! Object-safe async database driver contract.
//!
//! A driver exposes a small base contract ([`Driver`], [`Conn`], [`Stmt`],
//! [`Tx`], [`Rows`]) plus optional extension traits. Callers discover the
//! extensions of a particular instance through the `as_*` accessors, or all at
//! once through [`Capabilities::of_conn`] and [`Capabilities::of_stmt`].
//!
//! The [`dispatch`] helpers pick the richest form an instance supports:
//!
//! ```no_run
//! use sqlhooks_driver::{CallContext, Conn, Error, NamedValue, Result, dispatch};
//!
//! # async fn example(conn: &mut dyn Conn) -> Result<()> {
//! let ctx = CallContext::background();
//! let args = vec![NamedValue::positional(1, "Alice")];
//!
//! match dispatch::conn_exec(conn, &ctx, "INSERT INTO users (name) VALUES (?)", &args).await {
//!    Ok(result) => println!("inserted {}", result.rows_affected),
//!    // No fast path: prepare, exec, close.
//!    Err(Error::Skip) => {
//!       let mut stmt = dispatch::conn_prepare(conn, &ctx, "INSERT INTO users (name) VALUES (?)").await?;
//!       dispatch::stmt_exec(stmt.as_mut(), &ctx, &args).await?;
//!       stmt.close().await?;
//!    }
//!    Err(err) => return Err(err),
//! }
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod context;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod rows;
pub mod value;

pub use capability::{Capabilities, Capability};
pub use context::CallContext;
pub use driver::{
   Conn, ConnBeginTx, ConnPrepareContext, Driver, ExecResult, Execer, ExecerContext,
   IsolationLevel, Pinger, Queryer, QueryerContext, SessionResetter, Stmt, StmtExecContext,
   StmtQueryContext, Tx, TxOptions,
};
pub use error::{BoxError, Error, MultipleErrors, Result, SharedError};
pub use rows::{EmptyRows, MemoryRows, Rows, collect_rows};
pub use value::{NamedValue, Value, named_from_values, named_to_values, rebind, values_of};

// Re-exported so implementors can write `#[sqlhooks_driver::async_trait]`
pub use async_trait::async_trait;

//! Before, after and on-error hooks for any database driver.
//!
//! Wrapping a driver yields proxies that run a hook set around every prepare,
//! exec, query, begin, commit and rollback. Each proxy exposes exactly the
//! optional extensions of the object it wraps, so a driver's fast paths keep
//! working behind the hooks.
//!
//! - [`Hooks`] / [`OnError`]: the hook contract; [`FnHooks`] and [`Noop`] are
//!   ready-made sets and [`LoggingHook`] logs through `tracing`
//! - [`compose`]: run several hook sets as one, aggregating their errors
//! - [`HookContext`]: per-operation query, args, outcome and side-channel values
//! - [`DriverRegistry`], [`open`], [`wrap`]: register and open hooked drivers
//! - [`Database`], [`Connection`]: caller-facing handles
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlhooks::{FnHooks, Hooks, LoggingHook, compose};
//! use sqlhooks_driver::{Error, Value};
//! use sqlhooks_sqlite::SqliteDriver;
//!
//! # async fn example() -> sqlhooks_driver::Result<()> {
//! sqlhooks::register("sqlite", Arc::new(SqliteDriver::default()))?;
//!
//! let guard: Arc<dyn Hooks> = Arc::new(FnHooks::new().before(|ctx| {
//!    if ctx.query.trim_start().to_uppercase().starts_with("DROP") {
//!       return Err(Error::hook("DROP is not allowed"));
//!    }
//!    Ok(())
//! }));
//! let logging: Arc<dyn Hooks> = Arc::new(LoggingHook::default());
//! let hooks: Arc<dyn Hooks> = Arc::new(compose([guard, logging]));
//!
//! let db = sqlhooks::open("sqlite", "app.db", Some(hooks))?;
//! let mut conn = db.connect().await?;
//!
//! conn.exec("CREATE TABLE IF NOT EXISTS users (name TEXT)", &[]).await?;
//! conn.exec("INSERT INTO users (name) VALUES (?)", &[Value::from("Alice")]).await?;
//! assert!(conn.exec("DROP TABLE users", &[]).await.is_err());
//!
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

mod compose;
mod config;
mod context;
mod database;
mod hooks;
mod logging;
mod pipeline;
pub mod proxy;
mod registry;

pub use compose::{Composed, compose};
pub use config::{LoggingConfig, RegistryConfig};
pub use context::{HookContext, Operation};
pub use database::{Connection, Database, Statement, Transaction};
pub use hooks::{FnHooks, Hooks, Noop, OnError};
pub use logging::{LoggingHook, render_args};
pub use proxy::{ProxyConn, ProxyDriver, ProxyStmt, ProxyTx};
pub use registry::{DriverRegistry, open, register, wrap};

// Re-export the driver contract so callers need a single dependency
pub use sqlhooks_driver as driver;
pub use sqlhooks_driver::{Error, Result};

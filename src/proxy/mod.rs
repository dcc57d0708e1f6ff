//! Proxies that run hooks around a wrapped driver.
//!
//! Each proxy probes the object it wraps when it is built and exposes exactly
//! the extensions that object exposes, so callers that feature-detect a
//! connection or statement see the same surface with or without hooks.

mod conn;
mod driver;
mod stmt;
mod tx;

pub use conn::ProxyConn;
pub use driver::ProxyDriver;
pub use stmt::ProxyStmt;
pub use tx::ProxyTx;

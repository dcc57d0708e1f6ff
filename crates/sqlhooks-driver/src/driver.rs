//! The driver contract: base traits every driver implements and the optional
//! extension traits it may additionally expose.
//!
//! Base operations are always present. Extensions are discovered at runtime
//! through the `as_*` accessors, which return `None` unless the concrete
//! object opts in:
//!
//! ```
//! use async_trait::async_trait;
//! use sqlhooks_driver::{
//!    CallContext, Conn, ExecResult, ExecerContext, NamedValue, Result, Stmt, Tx,
//! };
//!
//! struct MyConn;
//!
//! #[async_trait]
//! impl Conn for MyConn {
//!    async fn prepare(&mut self, _query: &str) -> Result<Box<dyn Stmt>> {
//!       unimplemented!()
//!    }
//!    async fn close(&mut self) -> Result<()> {
//!       Ok(())
//!    }
//!    async fn begin(&mut self) -> Result<Box<dyn Tx>> {
//!       unimplemented!()
//!    }
//!    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
//!       Some(self)
//!    }
//! }
//!
//! #[async_trait]
//! impl ExecerContext for MyConn {
//!    async fn exec_context(
//!       &mut self,
//!       _ctx: &CallContext,
//!       _query: &str,
//!       _args: &[NamedValue],
//!    ) -> Result<ExecResult> {
//!       Ok(ExecResult::default())
//!    }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::context::CallContext;
use crate::rows::Rows;
use crate::value::{NamedValue, Value};

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID, when the driver reports one.
   pub last_insert_id: Option<i64>,
}

/// Transaction isolation levels a caller may request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
   #[default]
   Default,
   ReadUncommitted,
   ReadCommitted,
   WriteCommitted,
   RepeatableRead,
   Snapshot,
   Serializable,
   Linearizable,
}

/// Options for starting a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
   pub isolation: IsolationLevel,
   pub read_only: bool,
}

impl TxOptions {
   pub fn read_only() -> Self {
      Self {
         read_only: true,
         ..Default::default()
      }
   }

   pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
      self.isolation = isolation;
      self
   }

   /// Returns `true` when the options can be honored by a plain `begin()`.
   pub fn is_default(&self) -> bool {
      self.isolation == IsolationLevel::Default && !self.read_only
   }
}

/// Entry point of a driver: opens connections from a data source name.
#[async_trait]
pub trait Driver: Send + Sync {
   async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>>;
}

/// A connection. Used by one caller at a time.
#[async_trait]
pub trait Conn: Send {
   async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>>;

   async fn close(&mut self) -> Result<()>;

   async fn begin(&mut self) -> Result<Box<dyn Tx>>;

   fn as_execer(&mut self) -> Option<&mut dyn Execer> {
      None
   }

   fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
      None
   }

   fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
      None
   }

   fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
      None
   }

   fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
      None
   }

   fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
      None
   }

   fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
      None
   }

   fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
      None
   }
}

/// A prepared statement bound to the connection that created it.
#[async_trait]
pub trait Stmt: Send {
   /// Number of placeholders, or `None` when the driver cannot tell.
   fn num_input(&self) -> Option<usize>;

   async fn exec(&mut self, args: &[Value]) -> Result<ExecResult>;

   async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>>;

   async fn close(&mut self) -> Result<()>;

   fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
      None
   }

   fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
      None
   }
}

/// An open transaction.
#[async_trait]
pub trait Tx: Send {
   async fn commit(&mut self) -> Result<()>;

   async fn rollback(&mut self) -> Result<()>;
}

/// Exec without a prepare round-trip, positional values.
#[async_trait]
pub trait Execer: Send {
   async fn exec(&mut self, query: &str, args: &[Value]) -> Result<ExecResult>;
}

/// Exec without a prepare round-trip, with a call context and named values.
#[async_trait]
pub trait ExecerContext: Send {
   async fn exec_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<ExecResult>;
}

/// Query without a prepare round-trip, positional values.
#[async_trait]
pub trait Queryer: Send {
   async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>>;
}

/// Query without a prepare round-trip, with a call context and named values.
#[async_trait]
pub trait QueryerContext: Send {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>>;
}

#[async_trait]
pub trait ConnPrepareContext: Send {
   async fn prepare_context(&mut self, ctx: &CallContext, query: &str) -> Result<Box<dyn Stmt>>;
}

#[async_trait]
pub trait ConnBeginTx: Send {
   async fn begin_tx(&mut self, ctx: &CallContext, opts: TxOptions) -> Result<Box<dyn Tx>>;
}

/// Resets session state before a connection is handed to a new caller.
#[async_trait]
pub trait SessionResetter: Send {
   async fn reset_session(&mut self, ctx: &CallContext) -> Result<()>;
}

#[async_trait]
pub trait Pinger: Send {
   async fn ping(&mut self, ctx: &CallContext) -> Result<()>;
}

#[async_trait]
pub trait StmtExecContext: Send {
   async fn exec_context(&mut self, ctx: &CallContext, args: &[NamedValue]) -> Result<ExecResult>;
}

#[async_trait]
pub trait StmtQueryContext: Send {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>>;
}

//! Caller-facing handles: database, connection, statement, transaction.
//!
//! These pick the richest path a connection offers through the driver
//! dispatch helpers, so the same code works over hooked and plain drivers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sqlhooks_driver::{
   CallContext, Capabilities, Conn, Driver, Error, ExecResult, NamedValue, Result, Rows, Stmt,
   Tx, TxOptions, Value, dispatch, named_from_values,
};
use tracing::{debug, warn};

/// A driver bound to a data source name.
#[derive(Clone)]
pub struct Database {
   name: String,
   dsn: String,
   driver: Arc<dyn Driver>,
}

impl Database {
   pub fn new(name: impl Into<String>, dsn: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
      Self {
         name: name.into(),
         dsn: dsn.into(),
         driver,
      }
   }

   /// Registered name of the driver; the hooked name when opened with hooks.
   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn dsn(&self) -> &str {
      &self.dsn
   }

   pub fn driver(&self) -> &Arc<dyn Driver> {
      &self.driver
   }

   /// Opens a new connection. Connections are not pooled.
   pub async fn connect(&self) -> Result<Connection> {
      let conn = self.driver.open(&self.dsn).await?;
      debug!(driver = %self.name, "Connected");
      Ok(Connection::new(conn))
   }
}

impl fmt::Debug for Database {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Database")
         .field("name", &self.name)
         .field("dsn", &self.dsn)
         .finish_non_exhaustive()
   }
}

/// A single connection.
///
/// Exec and query use the connection's fast path when it has one, and fall
/// back to prepare, statement call, close otherwise.
pub struct Connection {
   conn: Box<dyn Conn>,
   closed: bool,
}

impl Connection {
   pub fn new(conn: Box<dyn Conn>) -> Self {
      Self {
         conn,
         closed: false,
      }
   }

   /// Extensions the underlying connection exposes.
   pub fn capabilities(&mut self) -> Capabilities {
      Capabilities::of_conn(self.conn.as_mut())
   }

   /// The underlying driver connection.
   pub fn raw(&mut self) -> &mut dyn Conn {
      self.conn.as_mut()
   }

   fn check_open(&self) -> Result<()> {
      if self.closed {
         Err(Error::BadConnection)
      } else {
         Ok(())
      }
   }

   pub async fn exec(&mut self, query: &str, args: &[Value]) -> Result<ExecResult> {
      self
         .exec_with(&CallContext::background(), query, &named_from_values(args))
         .await
   }

   pub async fn exec_with(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<ExecResult> {
      self.check_open()?;
      match dispatch::conn_exec(self.conn.as_mut(), ctx, query, args).await {
         Err(Error::Skip) => {}
         other => return other,
      }

      let mut stmt = dispatch::conn_prepare(self.conn.as_mut(), ctx, query).await?;
      let result = dispatch::stmt_exec(stmt.as_mut(), ctx, args).await;
      let closed = stmt.close().await;
      let result = result?;
      closed?;
      Ok(result)
   }

   pub async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
      self
         .query_with(&CallContext::background(), query, &named_from_values(args))
         .await
   }

   pub async fn query_with(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      self.check_open()?;
      match dispatch::conn_query(self.conn.as_mut(), ctx, query, args).await {
         Err(Error::Skip) => {}
         other => return other,
      }

      let mut stmt = dispatch::conn_prepare(self.conn.as_mut(), ctx, query).await?;
      match dispatch::stmt_query(stmt.as_mut(), ctx, args).await {
         Ok(rows) => Ok(Box::new(StmtRows {
            rows,
            stmt: Some(stmt),
         })),
         Err(err) => {
            if let Err(close_err) = stmt.close().await {
               warn!(error = %close_err, "failed to close statement after query error");
            }
            Err(err)
         }
      }
   }

   pub async fn prepare(&mut self, query: &str) -> Result<Statement> {
      self.prepare_with(&CallContext::background(), query).await
   }

   pub async fn prepare_with(&mut self, ctx: &CallContext, query: &str) -> Result<Statement> {
      self.check_open()?;
      let stmt = dispatch::conn_prepare(self.conn.as_mut(), ctx, query).await?;
      Ok(Statement { stmt })
   }

   pub async fn begin(&mut self) -> Result<Transaction> {
      self
         .begin_tx(&CallContext::background(), TxOptions::default())
         .await
   }

   /// Starts a transaction with options.
   ///
   /// Non-default options on a connection without `ConnBeginTx` fail with
   /// [`Error::Unsupported`].
   pub async fn begin_tx(&mut self, ctx: &CallContext, opts: TxOptions) -> Result<Transaction> {
      self.check_open()?;
      let tx = dispatch::conn_begin_tx(self.conn.as_mut(), ctx, opts).await?;
      Ok(Transaction { tx })
   }

   /// Checks the connection is alive. Succeeds when the driver cannot ping.
   pub async fn ping(&mut self, ctx: &CallContext) -> Result<()> {
      self.check_open()?;
      match self.conn.as_pinger() {
         Some(pinger) => pinger.ping(ctx).await,
         None => Ok(()),
      }
   }

   /// Resets session state. Succeeds when the driver has nothing to reset.
   pub async fn reset_session(&mut self, ctx: &CallContext) -> Result<()> {
      self.check_open()?;
      match self.conn.as_session_resetter() {
         Some(resetter) => resetter.reset_session(ctx).await,
         None => Ok(()),
      }
   }

   /// Closes the connection. Later calls fail with [`Error::BadConnection`].
   pub async fn close(&mut self) -> Result<()> {
      if self.closed {
         return Ok(());
      }
      self.closed = true;
      self.conn.close().await
   }
}

/// A prepared statement.
pub struct Statement {
   stmt: Box<dyn Stmt>,
}

impl Statement {
   pub fn num_input(&self) -> Option<usize> {
      self.stmt.num_input()
   }

   pub fn capabilities(&mut self) -> Capabilities {
      Capabilities::of_stmt(self.stmt.as_mut())
   }

   pub fn raw(&mut self) -> &mut dyn Stmt {
      self.stmt.as_mut()
   }

   pub async fn exec(&mut self, args: &[Value]) -> Result<ExecResult> {
      self
         .exec_with(&CallContext::background(), &named_from_values(args))
         .await
   }

   pub async fn exec_with(&mut self, ctx: &CallContext, args: &[NamedValue]) -> Result<ExecResult> {
      dispatch::stmt_exec(self.stmt.as_mut(), ctx, args).await
   }

   pub async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
      self
         .query_with(&CallContext::background(), &named_from_values(args))
         .await
   }

   pub async fn query_with(
      &mut self,
      ctx: &CallContext,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      dispatch::stmt_query(self.stmt.as_mut(), ctx, args).await
   }

   pub async fn close(mut self) -> Result<()> {
      self.stmt.close().await
   }
}

/// An open transaction, ended by [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
pub struct Transaction {
   tx: Box<dyn Tx>,
}

impl Transaction {
   pub fn raw(&mut self) -> &mut dyn Tx {
      self.tx.as_mut()
   }

   pub async fn commit(mut self) -> Result<()> {
      self.tx.commit().await
   }

   pub async fn rollback(mut self) -> Result<()> {
      self.tx.rollback().await
   }
}

/// Rows that keep their statement open until they are closed.
struct StmtRows {
   rows: Box<dyn Rows>,
   stmt: Option<Box<dyn Stmt>>,
}

#[async_trait]
impl Rows for StmtRows {
   fn columns(&self) -> &[String] {
      self.rows.columns()
   }

   async fn next(&mut self) -> Result<Option<Vec<Value>>> {
      self.rows.next().await
   }

   async fn close(&mut self) -> Result<()> {
      let closed = self.rows.close().await;
      if let Some(mut stmt) = self.stmt.take() {
         stmt.close().await?;
      }
      closed
   }
}

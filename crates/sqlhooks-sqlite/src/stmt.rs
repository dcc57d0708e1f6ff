use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlhooks_driver::{
   CallContext, Error, ExecResult, MemoryRows, NamedValue, Result, Rows, Stmt, StmtExecContext,
   StmtQueryContext, Value, named_to_values,
};
use sqlx::sqlite::{SqliteArguments, SqliteConnection};
use sqlx::{Column, Either, Executor, Sqlite, Statement};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::decode::decode_row;

/// A connection shared between a [`SqliteConn`](crate::SqliteConn) and the
/// statements and transactions it hands out.
///
/// A transaction dropped without commit or rollback marks the connection;
/// the next [`lock`](Self::lock) rolls it back before handing it out.
#[derive(Clone)]
pub(crate) struct SharedConnection(Arc<SharedState>);

struct SharedState {
   // `None` once closed
   conn: Mutex<Option<SqliteConnection>>,
   abandoned: AtomicBool,
   abandoned_read_only: AtomicBool,
}

impl SharedConnection {
   pub(crate) fn new(conn: SqliteConnection) -> Self {
      Self(Arc::new(SharedState {
         conn: Mutex::new(Some(conn)),
         abandoned: AtomicBool::new(false),
         abandoned_read_only: AtomicBool::new(false),
      }))
   }

   /// Schedule a rollback of an open transaction for the next lock.
   pub(crate) fn abandon_transaction(&self, read_only: bool) {
      if read_only {
         self.0.abandoned_read_only.store(true, Ordering::SeqCst);
      }
      self.0.abandoned.store(true, Ordering::SeqCst);
   }

   pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<SqliteConnection>> {
      let mut guard = self.0.conn.lock().await;
      if self.0.abandoned.swap(false, Ordering::SeqCst) {
         let read_only = self.0.abandoned_read_only.swap(false, Ordering::SeqCst);
         if let Some(conn) = guard.as_mut() {
            roll_back_abandoned(conn, read_only).await;
         }
      }
      guard
   }
}

async fn roll_back_abandoned(conn: &mut SqliteConnection, read_only: bool) {
   if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
      warn!(error = %err, "rollback of dropped transaction failed");
   }
   if read_only {
      if let Err(err) = sqlx::query("PRAGMA query_only = OFF")
         .execute(&mut *conn)
         .await
      {
         warn!(error = %err, "failed to restore query_only after dropped transaction");
      }
   }
   trace!(read_only, "rolled back dropped transaction");
}

/// Bind a driver value to a SQLx query.
pub fn bind_value<'a>(
   query: sqlx::query::Query<'a, Sqlite, SqliteArguments<'a>>,
   value: Value,
) -> sqlx::query::Query<'a, Sqlite, SqliteArguments<'a>> {
   match value {
      Value::Null => query.bind(None::<i64>),
      Value::Integer(v) => query.bind(v),
      Value::Real(v) => query.bind(v),
      Value::Text(v) => query.bind(v),
      Value::Blob(v) => query.bind(v),
      Value::Bool(v) => query.bind(v),
   }
}

/// Prepare `sql` on the connection, returning its placeholder count and column names.
pub(crate) async fn describe(
   conn: &SharedConnection,
   sql: &str,
) -> Result<(Option<usize>, Vec<String>)> {
   let mut guard = conn.lock().await;
   let conn = guard.as_mut().ok_or(Error::BadConnection)?;
   let statement = conn.prepare(sql).await.map_err(Error::driver)?;

   let num_input = match statement.parameters() {
      Some(Either::Left(types)) => Some(types.len()),
      Some(Either::Right(count)) => Some(count),
      None => None,
   };
   let columns = statement
      .columns()
      .iter()
      .map(|c| c.name().to_string())
      .collect();

   Ok((num_input, columns))
}

pub(crate) async fn execute(
   conn: &SharedConnection,
   sql: &str,
   values: Vec<Value>,
) -> Result<ExecResult> {
   let mut guard = conn.lock().await;
   let conn = guard.as_mut().ok_or(Error::BadConnection)?;

   let mut q = sqlx::query(sql);
   for value in values {
      q = bind_value(q, value);
   }
   let result = q.execute(&mut *conn).await.map_err(Error::driver)?;

   trace!(rows_affected = result.rows_affected(), "sqlite exec");
   Ok(ExecResult {
      rows_affected: result.rows_affected(),
      last_insert_id: Some(result.last_insert_rowid()),
   })
}

pub(crate) async fn fetch(
   conn: &SharedConnection,
   sql: &str,
   values: Vec<Value>,
) -> Result<MemoryRows> {
   let (_, columns) = describe(conn, sql).await?;

   let mut guard = conn.lock().await;
   let conn = guard.as_mut().ok_or(Error::BadConnection)?;

   let mut q = sqlx::query(sql);
   for value in values {
      q = bind_value(q, value);
   }
   let rows = q.fetch_all(&mut *conn).await.map_err(Error::driver)?;

   trace!(rows = rows.len(), "sqlite query");
   let decoded = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
   Ok(MemoryRows::new(columns, decoded))
}

/// A prepared statement on a SQLite connection.
///
/// SQLx caches the compiled statement per connection, so executing it again
/// does not re-prepare.
pub struct SqliteStmt {
   conn: SharedConnection,
   sql: String,
   num_input: Option<usize>,
   closed: bool,
}

impl SqliteStmt {
   pub(crate) fn new(conn: SharedConnection, sql: String, num_input: Option<usize>) -> Self {
      Self {
         conn,
         sql,
         num_input,
         closed: false,
      }
   }

   pub fn sql(&self) -> &str {
      &self.sql
   }

   fn check_args(&self, args: &[Value]) -> Result<()> {
      if self.closed {
         return Err(Error::driver_message("sql: statement is closed"));
      }
      if let Some(expected) = self.num_input
         && expected != args.len()
      {
         return Err(Error::driver_message(format!(
            "sql: expected {expected} arguments, got {}",
            args.len()
         )));
      }
      Ok(())
   }
}

#[async_trait]
impl Stmt for SqliteStmt {
   fn num_input(&self) -> Option<usize> {
      self.num_input
   }

   async fn exec(&mut self, args: &[Value]) -> Result<ExecResult> {
      self.check_args(args)?;
      execute(&self.conn, &self.sql, args.to_vec()).await
   }

   async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
      self.check_args(args)?;
      let rows = fetch(&self.conn, &self.sql, args.to_vec()).await?;
      Ok(Box::new(rows))
   }

   async fn close(&mut self) -> Result<()> {
      self.closed = true;
      Ok(())
   }

   fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
      Some(self)
   }

   fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
      Some(self)
   }
}

#[async_trait]
impl StmtExecContext for SqliteStmt {
   async fn exec_context(&mut self, ctx: &CallContext, args: &[NamedValue]) -> Result<ExecResult> {
      let values = named_to_values(args)?;
      self.check_args(&values)?;
      ctx.run(execute(&self.conn, &self.sql, values)).await
   }
}

#[async_trait]
impl StmtQueryContext for SqliteStmt {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      let values = named_to_values(args)?;
      self.check_args(&values)?;
      let rows = ctx.run(fetch(&self.conn, &self.sql, values)).await?;
      Ok(Box::new(rows))
   }
}

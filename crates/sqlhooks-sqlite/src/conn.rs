use async_trait::async_trait;
use sqlhooks_driver::{
   CallContext, Conn, ConnBeginTx, ConnPrepareContext, Error, ExecResult, ExecerContext,
   IsolationLevel, NamedValue, Pinger, QueryerContext, Result, Rows, SessionResetter, Stmt, Tx,
   TxOptions, named_to_values,
};
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, warn};

use crate::stmt::{SharedConnection, SqliteStmt, describe, execute, fetch};

/// A single SQLite connection implementing every connection extension.
pub struct SqliteConn {
   conn: SharedConnection,
}

impl SqliteConn {
   pub(crate) fn new(conn: SqliteConnection) -> Self {
      Self {
         conn: SharedConnection::new(conn),
      }
   }

   async fn run_raw(&self, sql: &str) -> Result<()> {
      execute(&self.conn, sql, Vec::new()).await.map(|_| ())
   }
}

#[async_trait]
impl Conn for SqliteConn {
   async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
      self.prepare_context(&CallContext::background(), query).await
   }

   async fn close(&mut self) -> Result<()> {
      let conn = self.conn.lock().await.take();
      match conn {
         Some(conn) => conn.close().await.map_err(Error::driver),
         None => Ok(()),
      }
   }

   async fn begin(&mut self) -> Result<Box<dyn Tx>> {
      self
         .begin_tx(&CallContext::background(), TxOptions::default())
         .await
   }

   fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
      Some(self)
   }

   fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
      Some(self)
   }

   fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
      Some(self)
   }

   fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
      Some(self)
   }

   fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
      Some(self)
   }

   fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
      Some(self)
   }
}

#[async_trait]
impl ExecerContext for SqliteConn {
   async fn exec_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<ExecResult> {
      let values = named_to_values(args)?;
      ctx.run(execute(&self.conn, query, values)).await
   }
}

#[async_trait]
impl QueryerContext for SqliteConn {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      let values = named_to_values(args)?;
      let rows = ctx.run(fetch(&self.conn, query, values)).await?;
      Ok(Box::new(rows))
   }
}

#[async_trait]
impl ConnPrepareContext for SqliteConn {
   async fn prepare_context(&mut self, ctx: &CallContext, query: &str) -> Result<Box<dyn Stmt>> {
      let (num_input, _) = ctx.run(describe(&self.conn, query)).await?;
      Ok(Box::new(SqliteStmt::new(
         self.conn.clone(),
         query.to_string(),
         num_input,
      )))
   }
}

#[async_trait]
impl ConnBeginTx for SqliteConn {
   async fn begin_tx(&mut self, ctx: &CallContext, opts: TxOptions) -> Result<Box<dyn Tx>> {
      if !matches!(
         opts.isolation,
         IsolationLevel::Default | IsolationLevel::Serializable
      ) {
         return Err(Error::driver_message(format!(
            "sqlite: unsupported isolation level {:?}",
            opts.isolation
         )));
      }

      ctx.check()?;
      if opts.read_only {
         self.run_raw("PRAGMA query_only = ON").await?;
      }
      if let Err(err) = ctx.run(self.run_raw("BEGIN")).await {
         if opts.read_only {
            // Leave the connection writable for the next caller
            if let Err(reset_err) = self.run_raw("PRAGMA query_only = OFF").await {
               warn!(error = %reset_err, "failed to restore query_only");
            }
         }
         return Err(err);
      }

      debug!(read_only = opts.read_only, "sqlite transaction started");
      Ok(Box::new(SqliteTx {
         conn: self.conn.clone(),
         read_only: opts.read_only,
         done: false,
      }))
   }
}

#[async_trait]
impl SessionResetter for SqliteConn {
   async fn reset_session(&mut self, ctx: &CallContext) -> Result<()> {
      ctx.check()?;
      let guard = self.conn.lock().await;
      match guard.as_ref() {
         Some(_) => Ok(()),
         None => Err(Error::BadConnection),
      }
   }
}

#[async_trait]
impl Pinger for SqliteConn {
   async fn ping(&mut self, ctx: &CallContext) -> Result<()> {
      ctx
         .run(async {
            let mut guard = self.conn.lock().await;
            let conn = guard.as_mut().ok_or(Error::BadConnection)?;
            conn.ping().await.map_err(Error::driver)
         })
         .await
   }
}

/// A transaction started with `BEGIN` on a [`SqliteConn`].
pub struct SqliteTx {
   conn: SharedConnection,
   read_only: bool,
   done: bool,
}

impl SqliteTx {
   async fn finish(&mut self, statement: &str) -> Result<()> {
      if self.done {
         return Err(Error::TxDone);
      }
      self.done = true;

      let result = execute(&self.conn, statement, Vec::new()).await.map(|_| ());
      if self.read_only {
         execute(&self.conn, "PRAGMA query_only = OFF", Vec::new()).await?;
      }
      result
   }
}

#[async_trait]
impl Tx for SqliteTx {
   async fn commit(&mut self) -> Result<()> {
      self.finish("COMMIT").await
   }

   async fn rollback(&mut self) -> Result<()> {
      self.finish("ROLLBACK").await
   }
}

impl Drop for SqliteTx {
   fn drop(&mut self) {
      if !self.done {
         debug!(
            read_only = self.read_only,
            "sqlite transaction dropped without commit or rollback, will roll back on next use"
         );
         self.conn.abandon_transaction(self.read_only);
      }
   }
}

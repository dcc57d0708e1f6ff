//! Capability-aware dispatch over a connection or statement.
//!
//! Each helper prefers the richest form the instance exposes and falls back
//! to the simpler one. Context-aware forms receive the call context as-is.
//! Legacy forms get a context check up front and positional values only.

use tracing::trace;

use crate::context::CallContext;
use crate::driver::{Conn, ExecResult, Stmt, Tx, TxOptions};
use crate::rows::Rows;
use crate::value::{NamedValue, named_to_values};
use crate::{Capability, Error, Result};

/// Runs `query` through the connection's exec fast path.
///
/// Returns [`Error::Skip`] when the connection implements neither
/// `ExecerContext` nor `Execer`.
pub async fn conn_exec(
   conn: &mut dyn Conn,
   ctx: &CallContext,
   query: &str,
   args: &[NamedValue],
) -> Result<ExecResult> {
   if let Some(execer) = conn.as_execer_context() {
      return execer.exec_context(ctx, query, args).await;
   }
   if let Some(execer) = conn.as_execer() {
      trace!("exec through legacy Execer");
      let values = named_to_values(args)?;
      ctx.check()?;
      return execer.exec(query, &values).await;
   }
   Err(Error::Skip)
}

/// Runs `query` through the connection's query fast path.
///
/// Returns [`Error::Skip`] when the connection implements neither
/// `QueryerContext` nor `Queryer`.
pub async fn conn_query(
   conn: &mut dyn Conn,
   ctx: &CallContext,
   query: &str,
   args: &[NamedValue],
) -> Result<Box<dyn Rows>> {
   if let Some(queryer) = conn.as_queryer_context() {
      return queryer.query_context(ctx, query, args).await;
   }
   if let Some(queryer) = conn.as_queryer() {
      trace!("query through legacy Queryer");
      let values = named_to_values(args)?;
      ctx.check()?;
      return queryer.query(query, &values).await;
   }
   Err(Error::Skip)
}

pub async fn conn_prepare(
   conn: &mut dyn Conn,
   ctx: &CallContext,
   query: &str,
) -> Result<Box<dyn Stmt>> {
   if let Some(preparer) = conn.as_prepare_context() {
      return preparer.prepare_context(ctx, query).await;
   }
   ctx.check()?;
   conn.prepare(query).await
}

/// Starts a transaction.
///
/// Non-default options need `ConnBeginTx`; without it the call fails with
/// [`Error::Unsupported`] rather than silently dropping the options.
pub async fn conn_begin_tx(
   conn: &mut dyn Conn,
   ctx: &CallContext,
   opts: TxOptions,
) -> Result<Box<dyn Tx>> {
   if let Some(beginner) = conn.as_begin_tx() {
      return beginner.begin_tx(ctx, opts).await;
   }
   if !opts.is_default() {
      trace!(?opts, "transaction options need ConnBeginTx");
      return Err(Error::Unsupported(Capability::BeginTx));
   }
   ctx.check()?;
   conn.begin().await
}

pub async fn stmt_exec(
   stmt: &mut dyn Stmt,
   ctx: &CallContext,
   args: &[NamedValue],
) -> Result<ExecResult> {
   if let Some(execer) = stmt.as_exec_context() {
      return execer.exec_context(ctx, args).await;
   }
   let values = named_to_values(args)?;
   ctx.check()?;
   stmt.exec(&values).await
}

pub async fn stmt_query(
   stmt: &mut dyn Stmt,
   ctx: &CallContext,
   args: &[NamedValue],
) -> Result<Box<dyn Rows>> {
   if let Some(queryer) = stmt.as_query_context() {
      return queryer.query_context(ctx, args).await;
   }
   let values = named_to_values(args)?;
   ctx.check()?;
   stmt.query(&values).await
}

#[cfg(test)]
mod tests {
   use async_trait::async_trait;

   use super::*;
   use crate::driver::Execer;
   use crate::rows::EmptyRows;
   use crate::value::Value;

   #[derive(Default)]
   struct BareConn {
      with_execer: bool,
      prepared: Vec<String>,
      began: usize,
   }

   struct BareStmt;

   struct BareTx;

   #[async_trait]
   impl Conn for BareConn {
      async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
         self.prepared.push(query.to_string());
         Ok(Box::new(BareStmt))
      }

      async fn close(&mut self) -> Result<()> {
         Ok(())
      }

      async fn begin(&mut self) -> Result<Box<dyn Tx>> {
         self.began += 1;
         Ok(Box::new(BareTx))
      }

      fn as_execer(&mut self) -> Option<&mut dyn Execer> {
         if self.with_execer { Some(self) } else { None }
      }
   }

   #[async_trait]
   impl Execer for BareConn {
      async fn exec(&mut self, _query: &str, args: &[Value]) -> Result<ExecResult> {
         Ok(ExecResult {
            rows_affected: args.len() as u64,
            last_insert_id: None,
         })
      }
   }

   #[async_trait]
   impl Stmt for BareStmt {
      fn num_input(&self) -> Option<usize> {
         None
      }

      async fn exec(&mut self, args: &[Value]) -> Result<ExecResult> {
         Ok(ExecResult {
            rows_affected: args.len() as u64,
            last_insert_id: Some(1),
         })
      }

      async fn query(&mut self, _args: &[Value]) -> Result<Box<dyn Rows>> {
         Ok(Box::new(EmptyRows))
      }

      async fn close(&mut self) -> Result<()> {
         Ok(())
      }
   }

   #[async_trait]
   impl Tx for BareTx {
      async fn commit(&mut self) -> Result<()> {
         Ok(())
      }

      async fn rollback(&mut self) -> Result<()> {
         Ok(())
      }
   }

   #[tokio::test]
   async fn test_exec_without_fast_path_skips() {
      let mut conn = BareConn::default();
      let result = conn_exec(&mut conn, &CallContext::background(), "SELECT 1", &[]).await;
      assert_eq!(result, Err(Error::Skip));
   }

   #[tokio::test]
   async fn test_query_without_fast_path_skips() {
      let mut conn = BareConn::default();
      let result = conn_query(&mut conn, &CallContext::background(), "SELECT 1", &[]).await;
      assert!(matches!(result, Err(Error::Skip)));
   }

   #[tokio::test]
   async fn test_exec_falls_back_to_legacy_execer() {
      let mut conn = BareConn {
         with_execer: true,
         ..Default::default()
      };
      let args = vec![NamedValue::positional(1, 1), NamedValue::positional(2, 2)];
      let result = conn_exec(&mut conn, &CallContext::background(), "x", &args)
         .await
         .unwrap();
      assert_eq!(result.rows_affected, 2);
   }

   #[tokio::test]
   async fn test_legacy_execer_rejects_named_arguments() {
      let mut conn = BareConn {
         with_execer: true,
         ..Default::default()
      };
      let args = vec![NamedValue::named("id", 1, 1)];
      let result = conn_exec(&mut conn, &CallContext::background(), "x", &args).await;
      assert_eq!(result, Err(Error::NamedParameter("id".into())));
   }

   #[tokio::test]
   async fn test_legacy_path_honors_cancelled_context() {
      let mut conn = BareConn {
         with_execer: true,
         ..Default::default()
      };
      let ctx = CallContext::background();
      ctx.cancel();
      let result = conn_exec(&mut conn, &ctx, "x", &[]).await;
      assert_eq!(result, Err(Error::Cancelled));
   }

   #[tokio::test]
   async fn test_prepare_falls_back_to_base() {
      let mut conn = BareConn::default();
      conn_prepare(&mut conn, &CallContext::background(), "SELECT ?")
         .await
         .unwrap();
      assert_eq!(conn.prepared, vec!["SELECT ?".to_string()]);
   }

   #[tokio::test]
   async fn test_begin_tx_default_options_use_begin() {
      let mut conn = BareConn::default();
      conn_begin_tx(&mut conn, &CallContext::background(), TxOptions::default())
         .await
         .unwrap();
      assert_eq!(conn.began, 1);
   }

   #[tokio::test]
   async fn test_begin_tx_non_default_options_unsupported() {
      let mut conn = BareConn::default();
      let result = conn_begin_tx(&mut conn, &CallContext::background(), TxOptions::read_only()).await;
      assert!(matches!(result, Err(Error::Unsupported(Capability::BeginTx))));
      assert_eq!(conn.began, 0);
   }

   #[tokio::test]
   async fn test_stmt_exec_lowers_arguments() {
      let mut stmt = BareStmt;
      let args = vec![NamedValue::positional(1, "a")];
      let result = stmt_exec(&mut stmt, &CallContext::background(), &args)
         .await
         .unwrap();
      assert_eq!(result.rows_affected, 1);
   }
}

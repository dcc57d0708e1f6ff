use std::sync::Arc;

use async_trait::async_trait;
use sqlhooks_driver::{
   CallContext, Capabilities, Capability, ExecResult, NamedValue, Result, Rows, Stmt,
   StmtExecContext, StmtQueryContext, Value, dispatch, rebind, values_of,
};
use tracing::debug;

use crate::context::{HookContext, Operation};
use crate::hooks::Hooks;
use crate::pipeline::intercept;

/// A prepared statement whose exec and query run through the hooks.
///
/// Hooks see the query text the statement was prepared with.
pub struct ProxyStmt {
   inner: Box<dyn Stmt>,
   hooks: Arc<dyn Hooks>,
   query: String,
   caps: Capabilities,
}

impl ProxyStmt {
   pub(crate) fn new(mut inner: Box<dyn Stmt>, hooks: Arc<dyn Hooks>, query: String) -> Self {
      let caps = Capabilities::of_stmt(inner.as_mut());
      debug!(capabilities = ?caps, "Wrapped statement");
      Self {
         inner,
         hooks,
         query,
         caps,
      }
   }

   /// Query text the statement was prepared with.
   pub fn sql(&self) -> &str {
      &self.query
   }

   pub fn capabilities(&self) -> Capabilities {
      self.caps
   }

   fn context(&self, operation: Operation, args: Vec<Value>, call: &CallContext) -> HookContext {
      HookContext::new(operation, self.query.clone(), args, call.clone())
   }
}

#[async_trait]
impl Stmt for ProxyStmt {
   fn num_input(&self) -> Option<usize> {
      self.inner.num_input()
   }

   async fn exec(&mut self, args: &[Value]) -> Result<ExecResult> {
      let ctx = self.context(Operation::StmtExec, args.to_vec(), &CallContext::background());
      let inner = &mut self.inner;
      intercept(self.hooks.as_ref(), ctx, |req| async move {
         inner.exec(&req.args).await
      })
      .await
   }

   async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
      let ctx = self.context(Operation::StmtQuery, args.to_vec(), &CallContext::background());
      let inner = &mut self.inner;
      intercept(self.hooks.as_ref(), ctx, |req| async move {
         inner.query(&req.args).await
      })
      .await
   }

   async fn close(&mut self) -> Result<()> {
      self.inner.close().await
   }

   fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
      if self.caps.contains(Capability::StmtExecContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
      if self.caps.contains(Capability::StmtQueryContext) {
         Some(self)
      } else {
         None
      }
   }
}

#[async_trait]
impl StmtExecContext for ProxyStmt {
   async fn exec_context(&mut self, ctx: &CallContext, args: &[NamedValue]) -> Result<ExecResult> {
      let hook_ctx = self.context(Operation::StmtExec, values_of(args), ctx);
      let inner = &mut self.inner;
      intercept(self.hooks.as_ref(), hook_ctx, |req| async move {
         let args = rebind(args, req.args);
         dispatch::stmt_exec(inner.as_mut(), &req.call, &args).await
      })
      .await
   }
}

#[async_trait]
impl StmtQueryContext for ProxyStmt {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      let hook_ctx = self.context(Operation::StmtQuery, values_of(args), ctx);
      let inner = &mut self.inner;
      intercept(self.hooks.as_ref(), hook_ctx, |req| async move {
         let args = rebind(args, req.args);
         dispatch::stmt_query(inner.as_mut(), &req.call, &args).await
      })
      .await
   }
}

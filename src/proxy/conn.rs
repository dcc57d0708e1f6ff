use std::sync::Arc;

use async_trait::async_trait;
use sqlhooks_driver::{
   CallContext, Capabilities, Capability, Conn, ConnBeginTx, ConnPrepareContext, Error,
   ExecResult, Execer, ExecerContext, NamedValue, Pinger, Queryer, QueryerContext, Result, Rows,
   SessionResetter, Stmt, Tx, TxOptions, Value, dispatch, rebind, values_of,
};
use tracing::debug;

use super::{ProxyStmt, ProxyTx};
use crate::context::{HookContext, Operation};
use crate::hooks::Hooks;
use crate::pipeline::intercept;

/// A connection that runs its operations through a hook set.
///
/// The extensions it exposes are probed from the wrapped connection once, at
/// construction, and never change afterwards.
pub struct ProxyConn {
   inner: Box<dyn Conn>,
   hooks: Arc<dyn Hooks>,
   caps: Capabilities,
}

impl ProxyConn {
   pub fn new(mut inner: Box<dyn Conn>, hooks: Arc<dyn Hooks>) -> Self {
      let caps = Capabilities::of_conn(inner.as_mut());
      debug!(capabilities = ?caps, "Wrapped connection");
      Self { inner, hooks, caps }
   }

   pub fn capabilities(&self) -> Capabilities {
      self.caps
   }

   /// The wrapped connection. Calls made on it bypass the hooks.
   pub fn inner_mut(&mut self) -> &mut dyn Conn {
      self.inner.as_mut()
   }

   fn exposes(&self, capability: Capability) -> bool {
      self.caps.contains(capability)
   }

   async fn begin_with(&mut self, call: &CallContext, opts: Option<TxOptions>) -> Result<Box<dyn Tx>> {
      let ctx = HookContext::new(Operation::Begin, "", Vec::new(), call.clone());
      let id = ctx.id();
      let hooks = Arc::clone(&self.hooks);
      let inner = &mut self.inner;

      // Wrapped only once the hooks accept it; a rejected begin rolls back unhooked
      let tx: Box<dyn Tx> = intercept(self.hooks.as_ref(), ctx, |req| async move {
         match opts {
            Some(opts) => dispatch::conn_begin_tx(inner.as_mut(), &req.call, opts).await,
            None => inner.begin().await,
         }
      })
      .await?;
      Ok(Box::new(ProxyTx::new(tx, hooks, id)))
   }
}

#[async_trait]
impl Conn for ProxyConn {
   async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
      let ctx = HookContext::new(Operation::Prepare, query, Vec::new(), CallContext::background());
      let hooks = Arc::clone(&self.hooks);
      let inner = &mut self.inner;

      intercept(self.hooks.as_ref(), ctx, |req| async move {
         let stmt = inner.prepare(&req.query).await?;
         Ok::<_, Error>(Box::new(ProxyStmt::new(stmt, hooks, req.query)) as Box<dyn Stmt>)
      })
      .await
   }

   async fn close(&mut self) -> Result<()> {
      self.inner.close().await
   }

   async fn begin(&mut self) -> Result<Box<dyn Tx>> {
      self.begin_with(&CallContext::background(), None).await
   }

   fn as_execer(&mut self) -> Option<&mut dyn Execer> {
      if self.exposes(Capability::Execer) {
         Some(self)
      } else {
         None
      }
   }

   fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
      if self.exposes(Capability::ExecerContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
      if self.exposes(Capability::Queryer) {
         Some(self)
      } else {
         None
      }
   }

   fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
      if self.exposes(Capability::QueryerContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
      if self.exposes(Capability::PrepareContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
      if self.exposes(Capability::BeginTx) {
         Some(self)
      } else {
         None
      }
   }

   fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
      if self.exposes(Capability::SessionResetter) {
         Some(self)
      } else {
         None
      }
   }

   fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
      if self.exposes(Capability::Pinger) {
         Some(self)
      } else {
         None
      }
   }
}

#[async_trait]
impl Execer for ProxyConn {
   async fn exec(&mut self, query: &str, args: &[Value]) -> Result<ExecResult> {
      let ctx = HookContext::new(Operation::Exec, query, args.to_vec(), CallContext::background());
      let inner = &mut self.inner;

      intercept(self.hooks.as_ref(), ctx, |req| async move {
         let execer = inner
            .as_execer()
            .ok_or(Error::Unsupported(Capability::Execer))?;
         execer.exec(&req.query, &req.args).await
      })
      .await
   }
}

#[async_trait]
impl ExecerContext for ProxyConn {
   async fn exec_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<ExecResult> {
      let hook_ctx = HookContext::new(Operation::Exec, query, values_of(args), ctx.clone());
      let inner = &mut self.inner;

      intercept(self.hooks.as_ref(), hook_ctx, |req| async move {
         let args = rebind(args, req.args);
         dispatch::conn_exec(inner.as_mut(), &req.call, &req.query, &args).await
      })
      .await
   }
}

#[async_trait]
impl Queryer for ProxyConn {
   async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
      let ctx = HookContext::new(Operation::Query, query, args.to_vec(), CallContext::background());
      let inner = &mut self.inner;

      intercept(self.hooks.as_ref(), ctx, |req| async move {
         let queryer = inner
            .as_queryer()
            .ok_or(Error::Unsupported(Capability::Queryer))?;
         queryer.query(&req.query, &req.args).await
      })
      .await
   }
}

#[async_trait]
impl QueryerContext for ProxyConn {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      let hook_ctx = HookContext::new(Operation::Query, query, values_of(args), ctx.clone());
      let inner = &mut self.inner;

      intercept(self.hooks.as_ref(), hook_ctx, |req| async move {
         let args = rebind(args, req.args);
         dispatch::conn_query(inner.as_mut(), &req.call, &req.query, &args).await
      })
      .await
   }
}

#[async_trait]
impl ConnPrepareContext for ProxyConn {
   async fn prepare_context(&mut self, ctx: &CallContext, query: &str) -> Result<Box<dyn Stmt>> {
      let hook_ctx = HookContext::new(Operation::Prepare, query, Vec::new(), ctx.clone());
      let hooks = Arc::clone(&self.hooks);
      let inner = &mut self.inner;

      intercept(self.hooks.as_ref(), hook_ctx, |req| async move {
         let stmt = dispatch::conn_prepare(inner.as_mut(), &req.call, &req.query).await?;
         Ok::<_, Error>(Box::new(ProxyStmt::new(stmt, hooks, req.query)) as Box<dyn Stmt>)
      })
      .await
   }
}

#[async_trait]
impl ConnBeginTx for ProxyConn {
   async fn begin_tx(&mut self, ctx: &CallContext, opts: TxOptions) -> Result<Box<dyn Tx>> {
      self.begin_with(ctx, Some(opts)).await
   }
}

#[async_trait]
impl SessionResetter for ProxyConn {
   async fn reset_session(&mut self, ctx: &CallContext) -> Result<()> {
      match self.inner.as_session_resetter() {
         Some(resetter) => resetter.reset_session(ctx).await,
         None => Err(Error::Unsupported(Capability::SessionResetter)),
      }
   }
}

#[async_trait]
impl Pinger for ProxyConn {
   async fn ping(&mut self, ctx: &CallContext) -> Result<()> {
      match self.inner.as_pinger() {
         Some(pinger) => pinger.ping(ctx).await,
         None => Err(Error::Unsupported(Capability::Pinger)),
      }
   }
}

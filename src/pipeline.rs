//! Runs one intercepted operation: before, driver call, after, on-error.

use std::future::Future;

use async_trait::async_trait;
use sqlhooks_driver::{CallContext, EmptyRows, Error, ExecResult, Result, Rows, Stmt, Tx, Value};
use tracing::{trace, warn};

use crate::context::HookContext;
use crate::hooks::Hooks;

/// What the driver call receives after `before` hooks ran.
pub(crate) struct Request {
   pub query: String,
   pub args: Vec<Value>,
   pub call: CallContext,
}

/// How an operation's value is substituted when hooks clear its error, and
/// released when the caller receives an error instead.
#[async_trait]
pub(crate) trait Neutral: Sized + Send {
   fn neutral() -> Option<Self>;

   /// Release a value the caller will never see.
   async fn discard(self) {}
}

impl Neutral for () {
   fn neutral() -> Option<Self> {
      Some(())
   }
}

impl Neutral for ExecResult {
   fn neutral() -> Option<Self> {
      Some(ExecResult::default())
   }
}

#[async_trait]
impl Neutral for Box<dyn Rows> {
   fn neutral() -> Option<Self> {
      Some(Box::new(EmptyRows))
   }

   async fn discard(mut self) {
      if let Err(err) = self.close().await {
         warn!(error = %err, "failed to close discarded rows");
      }
   }
}

#[async_trait]
impl Neutral for Box<dyn Stmt> {
   fn neutral() -> Option<Self> {
      None
   }

   async fn discard(mut self) {
      if let Err(err) = self.close().await {
         warn!(error = %err, "failed to close discarded statement");
      }
   }
}

#[async_trait]
impl Neutral for Box<dyn Tx> {
   fn neutral() -> Option<Self> {
      None
   }

   async fn discard(mut self) {
      if let Err(err) = self.rollback().await {
         warn!(error = %err, "failed to roll back discarded transaction");
      }
   }
}

/// Runs `op` between the hooks and reconciles the outcome.
///
/// 1. `before`; an error skips the call and `after`.
/// 2. `op` with the possibly rewritten query and args.
/// 3. `after`; an error replaces the recorded one.
/// 4. on-error with the final error, whose result the caller receives. A value
///    the operation produced is discarded first, so an error never leaves a
///    transaction open or a statement prepared.
pub(crate) async fn intercept<T, F, Fut>(hooks: &dyn Hooks, mut ctx: HookContext, op: F) -> Result<T>
where
   T: Neutral,
   F: FnOnce(Request) -> Fut,
   Fut: Future<Output = Result<T>>,
{
   trace!(operation = %ctx.operation(), id = %ctx.id(), "before hooks");
   if let Err(err) = hooks.before(&mut ctx) {
      trace!(operation = %ctx.operation(), id = %ctx.id(), error = %err, "aborted by before hook");
      return Err(on_error(hooks, &mut ctx, err));
   }

   let request = Request {
      query: ctx.query.clone(),
      args: ctx.args.clone(),
      call: ctx.call_context().clone(),
   };
   let (value, original) = match op(request).await {
      Ok(value) => (Some(value), None),
      Err(err) => (None, Some(err)),
   };
   ctx.error = original.clone();

   trace!(operation = %ctx.operation(), id = %ctx.id(), failed = original.is_some(), "after hooks");
   if let Err(err) = hooks.after(&mut ctx) {
      ctx.error = Some(err);
   }

   match (ctx.error.take(), value) {
      (Some(err), value) => {
         if let Some(value) = value {
            trace!(operation = %ctx.operation(), id = %ctx.id(), "discarding value of failed operation");
            value.discard().await;
         }
         Err(on_error(hooks, &mut ctx, err))
      }
      (None, Some(value)) => Ok(value),
      (None, None) => match T::neutral() {
         Some(value) => Ok(value),
         None => {
            // Nothing to hand back for a prepare or begin that failed
            let err = original.unwrap_or(Error::BadConnection);
            warn!(
               operation = %ctx.operation(),
               id = %ctx.id(),
               error = %err,
               "hooks cleared an error but the operation produced no value"
            );
            Err(on_error(hooks, &mut ctx, err))
         }
      },
   }
}

fn on_error(hooks: &dyn Hooks, ctx: &mut HookContext, cause: Error) -> Error {
   let Some(on_error) = hooks.as_on_error() else {
      return cause;
   };
   ctx.error = Some(cause.clone());
   on_error.on_error(ctx, &cause)
}

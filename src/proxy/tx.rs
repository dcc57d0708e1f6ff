use std::sync::Arc;

use async_trait::async_trait;
use sqlhooks_driver::{CallContext, Result, Tx};
use uuid::Uuid;

use crate::context::{HookContext, Operation};
use crate::hooks::Hooks;
use crate::pipeline::intercept;

/// A transaction whose commit and rollback run through the hooks.
///
/// Both reuse the correlation id of the begin that created the transaction.
pub struct ProxyTx {
   inner: Box<dyn Tx>,
   hooks: Arc<dyn Hooks>,
   id: Uuid,
}

impl ProxyTx {
   pub(crate) fn new(inner: Box<dyn Tx>, hooks: Arc<dyn Hooks>, id: Uuid) -> Self {
      Self { inner, hooks, id }
   }

   /// Correlation id shared with the begin hooks.
   pub fn id(&self) -> Uuid {
      self.id
   }

   fn context(&self, operation: Operation) -> HookContext {
      HookContext::new(operation, "", Vec::new(), CallContext::background()).with_id(self.id)
   }
}

#[async_trait]
impl Tx for ProxyTx {
   async fn commit(&mut self) -> Result<()> {
      let ctx = self.context(Operation::Commit);
      let inner = &mut self.inner;
      intercept(self.hooks.as_ref(), ctx, |_| async move { inner.commit().await }).await
   }

   async fn rollback(&mut self) -> Result<()> {
      let ctx = self.context(Operation::Rollback);
      let inner = &mut self.inner;
      intercept(self.hooks.as_ref(), ctx, |_| async move { inner.rollback().await }).await
   }
}

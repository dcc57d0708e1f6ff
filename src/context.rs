//! Per-operation state threaded through before, after and on-error hooks.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlhooks_driver::{CallContext, Error, Value};
use uuid::Uuid;

/// The interception point a [`HookContext`] was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
   /// Statement preparation on a connection.
   Prepare,
   /// Exec directly on a connection.
   Exec,
   /// Query directly on a connection.
   Query,
   /// Exec on a prepared statement.
   StmtExec,
   /// Query on a prepared statement.
   StmtQuery,
   Begin,
   Commit,
   Rollback,
}

impl Operation {
   pub fn as_str(self) -> &'static str {
      match self {
         Operation::Prepare => "prepare",
         Operation::Exec => "exec",
         Operation::Query => "query",
         Operation::StmtExec => "stmt_exec",
         Operation::StmtQuery => "stmt_query",
         Operation::Begin => "begin",
         Operation::Commit => "commit",
         Operation::Rollback => "rollback",
      }
   }

   /// Returns `true` for begin, commit and rollback.
   pub fn is_transaction(self) -> bool {
      matches!(
         self,
         Operation::Begin | Operation::Commit | Operation::Rollback
      )
   }
}

impl fmt::Display for Operation {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Mutable carrier for a single intercepted operation.
///
/// Hooks may rewrite [`query`](Self::query) and [`args`](Self::args) in
/// `before`; the rewritten values are what reach the driver. After the driver
/// call, [`error`](Self::error) holds its failure, if any. An `after` hook may
/// clear or replace it.
///
/// The `values` side-channel carries state from a hook's `before` half to its
/// `after` half:
///
/// ```
/// use std::time::Instant;
/// use sqlhooks::{FnHooks, HookContext};
///
/// let hooks = FnHooks::new()
///    .before(|ctx: &mut HookContext| {
///       ctx.set("started", Instant::now());
///       Ok(())
///    })
///    .after(|ctx: &mut HookContext| {
///       if let Some(started) = ctx.get::<Instant>("started") {
///          println!("{} took {:?}", ctx.query, started.elapsed());
///       }
///       Ok(())
///    });
/// ```
pub struct HookContext {
   /// SQL text of the operation. Empty for transaction operations.
   pub query: String,
   /// Positional argument values.
   pub args: Vec<Value>,
   /// Outcome of the driver call, visible to `after` and on-error hooks.
   pub error: Option<Error>,
   id: Uuid,
   operation: Operation,
   call: CallContext,
   values: Option<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl HookContext {
   pub fn new(
      operation: Operation,
      query: impl Into<String>,
      args: Vec<Value>,
      call: CallContext,
   ) -> Self {
      Self {
         query: query.into(),
         args,
         error: None,
         id: Uuid::new_v4(),
         operation,
         call,
         values: None,
      }
   }

   /// Replaces the correlation id, used to tie commit or rollback to its begin.
   pub fn with_id(mut self, id: Uuid) -> Self {
      self.id = id;
      self
   }

   /// Correlation id, stable across the hook calls of one operation and across
   /// begin and the commit or rollback that ends the same transaction.
   pub fn id(&self) -> Uuid {
      self.id
   }

   pub fn operation(&self) -> Operation {
      self.operation
   }

   /// The caller's cancellation context, passed unchanged to the driver.
   pub fn call_context(&self) -> &CallContext {
      &self.call
   }

   pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
      self.values.as_ref()?.get(key)?.downcast_ref::<T>()
   }

   pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
      self
         .values
         .get_or_insert_with(HashMap::new)
         .insert(key.into(), Box::new(value));
   }

   /// Removes a value, returning it if it had type `T`.
   pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
      let boxed = self.values.as_mut()?.remove(key)?;
      boxed.downcast::<T>().ok().map(|v| *v)
   }

   pub fn remove(&mut self, key: &str) -> bool {
      self
         .values
         .as_mut()
         .is_some_and(|values| values.remove(key).is_some())
   }

   pub fn contains(&self, key: &str) -> bool {
      self
         .values
         .as_ref()
         .is_some_and(|values| values.contains_key(key))
   }
}

impl fmt::Debug for HookContext {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let keys: Vec<&String> = self
         .values
         .as_ref()
         .map(|values| values.keys().collect())
         .unwrap_or_default();

      f.debug_struct("HookContext")
         .field("id", &self.id)
         .field("operation", &self.operation)
         .field("query", &self.query)
         .field("args", &self.args)
         .field("error", &self.error)
         .field("values", &keys)
         .finish()
   }
}

//! Combining several hook sets into one.

use std::fmt;
use std::sync::Arc;

use sqlhooks_driver::{Error, MultipleErrors, Result};

use crate::context::HookContext;
use crate::hooks::{Hooks, OnError};

/// Combines hook sets into one that runs them in order.
///
/// Every hook runs at every stage, even after an earlier one failed. Errors are
/// collected in order: none yields `Ok`, one is returned as-is, more are
/// wrapped in [`Error::Multiple`]. Nested aggregates are flattened, so
/// composing `[compose([a, b]), c]` behaves like `compose([a, b, c])`.
///
/// ```
/// use std::sync::Arc;
/// use sqlhooks::{FnHooks, Hooks, Noop, compose};
/// use sqlhooks_driver::Error;
///
/// let deny: Arc<dyn Hooks> = Arc::new(FnHooks::new().before(|_| Err(Error::hook("denied"))));
/// let noop: Arc<dyn Hooks> = Arc::new(Noop);
/// let hooks = compose([deny.clone(), noop, deny]);
/// # let mut ctx = sqlhooks::HookContext::new(
/// #    sqlhooks::Operation::Exec, "", vec![], sqlhooks_driver::CallContext::background());
///
/// let err = hooks.before(&mut ctx).unwrap_err();
/// assert_eq!(err.as_multiple().map(|m| m.len()), Some(2));
/// ```
pub fn compose<I>(hooks: I) -> Composed
where
   I: IntoIterator<Item = Arc<dyn Hooks>>,
{
   Composed {
      hooks: hooks.into_iter().collect(),
   }
}

/// The hook set produced by [`compose`].
#[derive(Clone, Default)]
pub struct Composed {
   hooks: Vec<Arc<dyn Hooks>>,
}

impl Composed {
   pub fn len(&self) -> usize {
      self.hooks.len()
   }

   pub fn is_empty(&self) -> bool {
      self.hooks.is_empty()
   }

   fn run_all<F>(&self, mut stage: F) -> Result<()>
   where
      F: FnMut(&dyn Hooks) -> Result<()>,
   {
      let mut errors = Vec::new();
      for hook in &self.hooks {
         if let Err(err) = stage(hook.as_ref()) {
            push_flat(&mut errors, err);
         }
      }
      match MultipleErrors::collapse(errors) {
         Some(err) => Err(err),
         None => Ok(()),
      }
   }
}

fn push_flat(errors: &mut Vec<Error>, err: Error) {
   match err {
      Error::Multiple(inner) => errors.extend(inner.into_inner()),
      other => errors.push(other),
   }
}

impl Hooks for Composed {
   fn before(&self, ctx: &mut HookContext) -> Result<()> {
      self.run_all(|hook| hook.before(ctx))
   }

   fn after(&self, ctx: &mut HookContext) -> Result<()> {
      self.run_all(|hook| hook.after(ctx))
   }

   fn as_on_error(&self) -> Option<&dyn OnError> {
      Some(self)
   }
}

impl OnError for Composed {
   /// Only members that implement [`OnError`] take part. A member returning
   /// `cause` itself adds nothing. With no new errors, `cause` is returned.
   fn on_error(&self, ctx: &mut HookContext, cause: &Error) -> Error {
      let mut errors = Vec::new();
      for hook in &self.hooks {
         let Some(on_error) = hook.as_on_error() else {
            continue;
         };
         let err = on_error.on_error(ctx, cause);
         if err != *cause {
            push_flat(&mut errors, err);
         }
      }
      MultipleErrors::collapse(errors).unwrap_or_else(|| cause.clone())
   }
}

impl fmt::Debug for Composed {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Composed")
         .field("hooks", &self.hooks.len())
         .finish()
   }
}

#[cfg(test)]
mod tests {
   use std::sync::atomic::{AtomicUsize, Ordering};

   use sqlhooks_driver::CallContext;

   use super::*;
   use crate::context::Operation;
   use crate::hooks::{FnHooks, Noop};

   fn ctx() -> HookContext {
      HookContext::new(Operation::Exec, "SELECT 1", vec![], CallContext::background())
   }

   fn ok() -> Arc<dyn Hooks> {
      Arc::new(Noop)
   }

   fn failing(message: &'static str) -> Arc<dyn Hooks> {
      Arc::new(
         FnHooks::new()
            .before(move |_| Err(Error::hook(message)))
            .after(move |_| Err(Error::hook(message))),
      )
   }

   #[test]
   fn test_empty_composition_succeeds() {
      let hooks = compose(Vec::new());
      assert!(hooks.is_empty());
      assert_eq!(hooks.before(&mut ctx()), Ok(()));
      assert_eq!(hooks.after(&mut ctx()), Ok(()));
   }

   #[test]
   fn test_all_ok() {
      let hooks = compose([ok(), ok()]);
      assert_eq!(hooks.before(&mut ctx()), Ok(()));
   }

   #[test]
   fn test_single_error_is_verbatim() {
      let hooks = compose([ok(), failing("oops"), ok()]);
      assert_eq!(hooks.before(&mut ctx()), Err(Error::hook("oops")));
      assert_eq!(hooks.after(&mut ctx()), Err(Error::hook("oops")));
   }

   #[test]
   fn test_many_errors_aggregate_in_order() {
      let hooks = compose([failing("a"), ok(), failing("b")]);
      let err = hooks.before(&mut ctx()).unwrap_err();

      assert_eq!(
         err.as_multiple().unwrap().errors(),
         &[Error::hook("a"), Error::hook("b")]
      );
   }

   #[test]
   fn test_every_hook_runs_after_a_failure() {
      let calls = Arc::new(AtomicUsize::new(0));
      let counter = Arc::clone(&calls);
      let counting: Arc<dyn Hooks> = Arc::new(FnHooks::new().before(move |_| {
         counter.fetch_add(1, Ordering::SeqCst);
         Ok(())
      }));

      let hooks = compose([failing("first"), counting]);
      assert!(hooks.before(&mut ctx()).is_err());
      assert_eq!(calls.load(Ordering::SeqCst), 1);
   }

   #[test]
   fn test_nested_composition_is_flat() {
      let nested = compose([
         Arc::new(compose([failing("a"), failing("b")])) as Arc<dyn Hooks>,
         failing("c"),
      ]);
      let flat = compose([failing("a"), failing("b"), failing("c")]);

      assert_eq!(nested.before(&mut ctx()), flat.before(&mut ctx()));
      assert_eq!(nested.after(&mut ctx()), flat.after(&mut ctx()));
   }

   #[test]
   fn test_on_error_without_participants_returns_cause() {
      let hooks = compose([ok(), ok()]);
      let cause = Error::hook("cause");
      let on_error = hooks.as_on_error().unwrap();

      assert_eq!(on_error.on_error(&mut ctx(), &cause), cause);
   }

   #[test]
   fn test_on_error_pass_through_is_not_aggregated() {
      let pass: Arc<dyn Hooks> = Arc::new(FnHooks::new().on_error(|_, cause| cause.clone()));
      let hooks = compose([pass.clone(), pass]);
      let cause = Error::hook("cause");

      let err = hooks.as_on_error().unwrap().on_error(&mut ctx(), &cause);
      assert_eq!(err, cause);
      assert!(err.as_multiple().is_none());
   }

   #[test]
   fn test_on_error_replacements_aggregate() {
      let replace = |message: &'static str| -> Arc<dyn Hooks> {
         Arc::new(FnHooks::new().on_error(move |_, _| Error::hook(message)))
      };
      let pass: Arc<dyn Hooks> = Arc::new(FnHooks::new().on_error(|_, cause| cause.clone()));
      let hooks = compose([replace("x"), pass, replace("y")]);

      let err = hooks
         .as_on_error()
         .unwrap()
         .on_error(&mut ctx(), &Error::hook("cause"));
      assert_eq!(
         err.as_multiple().unwrap().errors(),
         &[Error::hook("x"), Error::hook("y")]
      );
   }

   #[test]
   fn test_single_on_error_replacement_is_verbatim() {
      let replace: Arc<dyn Hooks> =
         Arc::new(FnHooks::new().on_error(|_, _| Error::hook("replaced")));
      let hooks = compose([ok(), replace]);

      let err = hooks
         .as_on_error()
         .unwrap()
         .on_error(&mut ctx(), &Error::hook("cause"));
      assert_eq!(err, Error::hook("replaced"));
   }
}

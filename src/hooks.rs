//! The hook contract and the ready-made hook sets.

use std::fmt;

use sqlhooks_driver::{Error, Result};

use crate::context::HookContext;

/// Observer around every intercepted operation.
///
/// `before` runs immediately before the driver call. An error aborts the
/// operation: the driver is not called and `after` does not run.
///
/// `after` runs once the driver call has finished, with its failure recorded
/// in [`HookContext::error`]. Returning an error replaces the outcome. Returning
/// `Ok(())` keeps whatever `ctx.error` holds at that point, so clearing it turns
/// a failure into success.
///
/// Implementations run inline on the caller's task and may be invoked from
/// many connections at once. They must not block.
pub trait Hooks: Send + Sync {
   fn before(&self, ctx: &mut HookContext) -> Result<()>;

   fn after(&self, ctx: &mut HookContext) -> Result<()>;

   /// Returns the on-error extension if this hook set implements it.
   fn as_on_error(&self) -> Option<&dyn OnError> {
      None
   }
}

/// Optional extension called once for every failed operation.
pub trait OnError: Send + Sync {
   /// Receives the final error and returns the one the caller will see.
   /// Returning a clone of `cause` passes it through unchanged.
   fn on_error(&self, ctx: &mut HookContext, cause: &Error) -> Error;
}

/// A hook set that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Hooks for Noop {
   fn before(&self, _ctx: &mut HookContext) -> Result<()> {
      Ok(())
   }

   fn after(&self, _ctx: &mut HookContext) -> Result<()> {
      Ok(())
   }
}

type StageFn = dyn Fn(&mut HookContext) -> Result<()> + Send + Sync;
type OnErrorFn = dyn Fn(&mut HookContext, &Error) -> Error + Send + Sync;

/// Hook set built from closures.
///
/// Missing stages succeed. The set exposes [`OnError`] only when an
/// `on_error` closure was given.
///
/// ```
/// use sqlhooks::{FnHooks, Hooks};
/// use sqlhooks_driver::Error;
///
/// let hooks = FnHooks::new()
///    .before(|ctx| {
///       if ctx.query.contains("DROP") {
///          return Err(Error::hook("DROP is not allowed"));
///       }
///       Ok(())
///    })
///    .on_error(|_ctx, cause| cause.clone());
///
/// assert!(hooks.as_on_error().is_some());
/// ```
#[derive(Default)]
pub struct FnHooks {
   before: Option<Box<StageFn>>,
   after: Option<Box<StageFn>>,
   on_error: Option<Box<OnErrorFn>>,
}

impl FnHooks {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn before<F>(mut self, f: F) -> Self
   where
      F: Fn(&mut HookContext) -> Result<()> + Send + Sync + 'static,
   {
      self.before = Some(Box::new(f));
      self
   }

   pub fn after<F>(mut self, f: F) -> Self
   where
      F: Fn(&mut HookContext) -> Result<()> + Send + Sync + 'static,
   {
      self.after = Some(Box::new(f));
      self
   }

   pub fn on_error<F>(mut self, f: F) -> Self
   where
      F: Fn(&mut HookContext, &Error) -> Error + Send + Sync + 'static,
   {
      self.on_error = Some(Box::new(f));
      self
   }
}

impl Hooks for FnHooks {
   fn before(&self, ctx: &mut HookContext) -> Result<()> {
      match &self.before {
         Some(f) => f(ctx),
         None => Ok(()),
      }
   }

   fn after(&self, ctx: &mut HookContext) -> Result<()> {
      match &self.after {
         Some(f) => f(ctx),
         None => Ok(()),
      }
   }

   fn as_on_error(&self) -> Option<&dyn OnError> {
      if self.on_error.is_some() {
         Some(self)
      } else {
         None
      }
   }
}

impl OnError for FnHooks {
   fn on_error(&self, ctx: &mut HookContext, cause: &Error) -> Error {
      match &self.on_error {
         Some(f) => f(ctx, cause),
         None => cause.clone(),
      }
   }
}

impl fmt::Debug for FnHooks {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("FnHooks")
         .field("before", &self.before.is_some())
         .field("after", &self.after.is_some())
         .field("on_error", &self.on_error.is_some())
         .finish()
   }
}

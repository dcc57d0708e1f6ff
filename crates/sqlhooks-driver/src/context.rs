//! Cancellation and deadline carrier passed to context-aware driver calls.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Caller-supplied cancellation signal and optional deadline.
///
/// Clones share the same cancellation token, so cancelling any clone cancels
/// every in-flight call that received one.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sqlhooks_driver::CallContext;
///
/// let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
/// assert!(ctx.check().is_ok());
///
/// ctx.clone().cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
   token: CancellationToken,
   deadline: Option<Instant>,
}

impl CallContext {
   /// A context that is never cancelled and has no deadline.
   pub fn background() -> Self {
      Self::default()
   }

   /// A context cancelled together with `token`.
   pub fn with_token(token: CancellationToken) -> Self {
      Self {
         token,
         deadline: None,
      }
   }

   /// Sets an absolute deadline, keeping the shared cancellation token.
   pub fn with_deadline(mut self, deadline: Instant) -> Self {
      self.deadline = Some(match self.deadline {
         Some(existing) => existing.min(deadline),
         None => deadline,
      });
      self
   }

   /// Sets a deadline relative to now.
   pub fn with_timeout(self, timeout: Duration) -> Self {
      self.with_deadline(Instant::now() + timeout)
   }

   pub fn deadline(&self) -> Option<Instant> {
      self.deadline
   }

   /// The underlying token, for handing to code that speaks `tokio-util`.
   pub fn token(&self) -> &CancellationToken {
      &self.token
   }

   /// Cancels this context and every clone of it.
   pub fn cancel(&self) {
      self.token.cancel();
   }

   pub fn is_cancelled(&self) -> bool {
      self.token.is_cancelled()
   }

   /// Returns why the context is done, if it is.
   pub fn err(&self) -> Option<Error> {
      if self.is_cancelled() {
         return Some(Error::Cancelled);
      }
      match self.deadline {
         Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
         _ => None,
      }
   }

   /// Fails fast when the context is already done.
   pub fn check(&self) -> Result<()> {
      match self.err() {
         Some(err) => Err(err),
         None => Ok(()),
      }
   }

   /// Resolves once the context is cancelled or its deadline passes.
   pub async fn done(&self) {
      match self.deadline {
         Some(deadline) => {
            tokio::select! {
               _ = self.token.cancelled() => {}
               _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {}
            }
         }
         None => self.token.cancelled().await,
      }
   }

   /// Runs `fut` until it completes or the context is done, whichever is first.
   pub async fn run<T, F>(&self, fut: F) -> Result<T>
   where
      F: Future<Output = Result<T>>,
   {
      self.check()?;
      tokio::select! {
         biased;
         _ = self.done() => Err(if self.is_cancelled() || self.deadline.is_none() {
            Error::Cancelled
         } else {
            Error::DeadlineExceeded
         }),
         result = fut => result,
      }
   }
}

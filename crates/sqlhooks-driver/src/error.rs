//! Error types shared by drivers, proxies and hooks.

use std::fmt;
use std::sync::Arc;

use crate::capability::Capability;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error accepted from foreign driver implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by drivers, by the hook pipeline, or by the hooks themselves.
///
/// The type is cheap to clone so the same failure can be recorded on a hook
/// context, handed to an on-error hook, and returned to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
   /// Failure reported by an underlying driver.
   #[error("{0}")]
   Driver(SharedError),

   /// Failure reported by a hook.
   #[error("{0}")]
   Hook(String),

   /// Two or more hooks failed at the same stage.
   #[error("{0}")]
   Multiple(MultipleErrors),

   /// The wrapped object lacks an optional capability the caller requires.
   #[error("unsupported operation: driver does not implement {0}")]
   Unsupported(Capability),

   /// The fast path is not available; the caller should use the base form.
   #[error("driver: skip fast-path; continue as if unimplemented")]
   Skip,

   /// The call context was cancelled.
   #[error("context canceled")]
   Cancelled,

   /// The call context deadline passed.
   #[error("context deadline exceeded")]
   DeadlineExceeded,

   /// A named argument reached a driver path that only takes positional values.
   #[error("driver does not support the use of named parameters (got {0:?})")]
   NamedParameter(String),

   /// The connection is closed or otherwise unusable.
   #[error("driver: bad connection")]
   BadConnection,

   /// The transaction has already been committed or rolled back.
   #[error("transaction has already been committed or rolled back")]
   TxDone,

   /// No driver is registered under the requested name.
   #[error("unknown driver {0:?} (forgotten registration?)")]
   UnknownDriver(String),

   /// A driver is already registered under the requested name.
   #[error("driver {0:?} is already registered")]
   DuplicateDriver(String),

   /// A column value could not be mapped to a [`Value`](crate::Value).
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),
}

impl Error {
   /// Wraps a foreign driver error.
   pub fn driver<E>(err: E) -> Self
   where
      E: std::error::Error + Send + Sync + 'static,
   {
      Error::Driver(SharedError(Arc::new(err)))
   }

   /// Builds a driver error from a plain message.
   pub fn driver_message(message: impl Into<String>) -> Self {
      let boxed: BoxError = message.into().into();
      Error::Driver(SharedError(Arc::from(boxed)))
   }

   /// Builds a hook error from a plain message.
   pub fn hook(message: impl Into<String>) -> Self {
      Error::Hook(message.into())
   }

   /// Returns `true` when a required optional capability is missing.
   pub fn is_unsupported(&self) -> bool {
      matches!(self, Error::Unsupported(_))
   }

   /// Returns the underlying errors when this is an aggregate.
   pub fn as_multiple(&self) -> Option<&MultipleErrors> {
      match self {
         Error::Multiple(errors) => Some(errors),
         _ => None,
      }
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn code(&self) -> &'static str {
      match self {
         Error::Driver(_) => "DRIVER_ERROR",
         Error::Hook(_) => "HOOK_ERROR",
         Error::Multiple(_) => "MULTIPLE_ERRORS",
         Error::Unsupported(_) => "UNSUPPORTED_OPERATION",
         Error::Skip => "SKIP",
         Error::Cancelled => "CANCELLED",
         Error::DeadlineExceeded => "DEADLINE_EXCEEDED",
         Error::NamedParameter(_) => "NAMED_PARAMETER",
         Error::BadConnection => "BAD_CONNECTION",
         Error::TxDone => "TX_DONE",
         Error::UnknownDriver(_) => "UNKNOWN_DRIVER",
         Error::DuplicateDriver(_) => "DUPLICATE_DRIVER",
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE",
      }
   }
}

/// A foreign error behind an `Arc`.
///
/// Two `SharedError`s are equal only when they are clones of the same
/// original error.
#[derive(Clone)]
pub struct SharedError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl SharedError {
   /// Borrows the wrapped error.
   pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
      self.0.as_ref()
   }

   /// Attempts to view the wrapped error as a concrete type.
   pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
      self.0.downcast_ref::<E>()
   }
}

impl PartialEq for SharedError {
   fn eq(&self, other: &Self) -> bool {
      Arc::ptr_eq(&self.0, &other.0)
   }
}

impl fmt::Debug for SharedError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Debug::fmt(&self.0, f)
   }
}

impl fmt::Display for SharedError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Display::fmt(&self.0, f)
   }
}

/// Ordered collection of errors raised by independent hooks at one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleErrors(Vec<Error>);

impl MultipleErrors {
   /// Reduces a list of errors to a single outcome.
   ///
   /// No errors yields `None`, one error is returned verbatim, and two or
   /// more are wrapped in [`Error::Multiple`] in their original order.
   pub fn collapse(mut errors: Vec<Error>) -> Option<Error> {
      match errors.len() {
         0 => None,
         1 => errors.pop(),
         _ => Some(Error::Multiple(MultipleErrors(errors))),
      }
   }

   pub fn errors(&self) -> &[Error] {
      &self.0
   }

   pub fn len(&self) -> usize {
      self.0.len()
   }

   pub fn is_empty(&self) -> bool {
      self.0.is_empty()
   }

   pub fn into_inner(self) -> Vec<Error> {
      self.0
   }
}

impl fmt::Display for MultipleErrors {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "multiple errors: [")?;
      for (i, err) in self.0.iter().enumerate() {
         if i > 0 {
            write!(f, ", ")?;
         }
         write!(f, "{err}")?;
      }
      write!(f, "]")
   }
}

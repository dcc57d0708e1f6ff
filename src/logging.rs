//! A hook set that reports every intercepted operation through `tracing`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use base64::Engine;
use serde_json::Value as JsonValue;
use sqlhooks_driver::{Error, Result, Value};
use tracing::{debug, error, warn};

use crate::config::LoggingConfig;
use crate::context::HookContext;
use crate::hooks::{Hooks, OnError};

const STARTED_KEY: &str = "sqlhooks.logging.started";
const SEQUENCE_KEY: &str = "sqlhooks.logging.seq";

/// Logs queries, arguments and timings, and every failure exactly once.
///
/// Successful operations are logged at DEBUG, or at WARN when slower than the
/// configured threshold. Failures are logged at ERROR from the on-error stage,
/// which passes the error through unchanged.
#[derive(Debug, Default)]
pub struct LoggingHook {
   config: LoggingConfig,
   seq: AtomicU64,
}

impl LoggingHook {
   pub fn new(config: LoggingConfig) -> Self {
      Self {
         config,
         seq: AtomicU64::new(0),
      }
   }

   pub fn config(&self) -> &LoggingConfig {
      &self.config
   }

   fn elapsed(ctx: &HookContext) -> Option<Duration> {
      ctx.get::<Instant>(STARTED_KEY).map(Instant::elapsed)
   }

   fn sequence(ctx: &HookContext) -> u64 {
      ctx.get::<u64>(SEQUENCE_KEY).copied().unwrap_or_default()
   }

   fn args(&self, ctx: &HookContext) -> String {
      if self.config.log_args {
         render_args(&ctx.args)
      } else {
         String::from("[redacted]")
      }
   }

   fn is_slow(&self, elapsed: Duration) -> bool {
      self
         .config
         .slow_query_threshold_ms
         .is_some_and(|threshold| elapsed >= Duration::from_millis(threshold))
   }
}

impl Hooks for LoggingHook {
   fn before(&self, ctx: &mut HookContext) -> Result<()> {
      let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
      ctx.set(SEQUENCE_KEY, seq);
      ctx.set(STARTED_KEY, Instant::now());
      Ok(())
   }

   fn after(&self, ctx: &mut HookContext) -> Result<()> {
      // Failures are reported once, from on_error
      if ctx.error.is_some() {
         return Ok(());
      }

      let elapsed = Self::elapsed(ctx).unwrap_or_default();
      let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
      if self.is_slow(elapsed) {
         warn!(
            seq = Self::sequence(ctx),
            id = %ctx.id(),
            operation = %ctx.operation(),
            query = %ctx.query,
            args = %self.args(ctx),
            elapsed_ms,
            "Slow query"
         );
      } else {
         debug!(
            seq = Self::sequence(ctx),
            id = %ctx.id(),
            operation = %ctx.operation(),
            query = %ctx.query,
            args = %self.args(ctx),
            elapsed_ms,
            "Query completed"
         );
      }
      Ok(())
   }

   fn as_on_error(&self) -> Option<&dyn OnError> {
      Some(self)
   }
}

impl OnError for LoggingHook {
   fn on_error(&self, ctx: &mut HookContext, cause: &Error) -> Error {
      let elapsed_ms = Self::elapsed(ctx).map(|d| d.as_secs_f64() * 1000.0);
      error!(
         seq = Self::sequence(ctx),
         id = %ctx.id(),
         operation = %ctx.operation(),
         query = %ctx.query,
         args = %self.args(ctx),
         elapsed_ms = ?elapsed_ms,
         code = cause.code(),
         error = %cause,
         "Query failed"
      );
      cause.clone()
   }
}

/// Render argument values as a JSON array for log fields.
///
/// BLOB values are base64-encoded since JSON has no binary type.
pub fn render_args(args: &[Value]) -> String {
   JsonValue::Array(args.iter().map(to_json).collect()).to_string()
}

fn to_json(value: &Value) -> JsonValue {
   match value {
      Value::Null => JsonValue::Null,
      Value::Integer(v) => JsonValue::from(*v),
      Value::Real(v) => JsonValue::from(*v),
      Value::Text(v) => JsonValue::String(v.clone()),
      Value::Blob(v) => JsonValue::String(base64::engine::general_purpose::STANDARD.encode(v)),
      Value::Bool(v) => JsonValue::Bool(*v),
   }
}

#[cfg(test)]
mod tests {
   use sqlhooks_driver::CallContext;

   use super::*;
   use crate::context::Operation;

   fn ctx() -> HookContext {
      HookContext::new(
         Operation::Query,
         "SELECT ?",
         vec![Value::Integer(1)],
         CallContext::background(),
      )
   }

   #[test]
   fn test_render_args() {
      let rendered = render_args(&[
         Value::Null,
         Value::Integer(42),
         Value::Text("a\"b".into()),
         Value::Blob(b"hello".to_vec()),
         Value::Bool(true),
      ]);
      assert_eq!(rendered, r#"[null,42,"a\"b","aGVsbG8=",true]"#);
   }

   #[test]
   fn test_render_non_finite_real_as_null() {
      assert_eq!(render_args(&[Value::Real(f64::NAN)]), "[null]");
   }

   #[test]
   fn test_before_records_start_and_sequence() {
      let hook = LoggingHook::default();
      let mut first = ctx();
      let mut second = ctx();

      hook.before(&mut first).unwrap();
      hook.before(&mut second).unwrap();

      assert!(first.contains(STARTED_KEY));
      assert_eq!(LoggingHook::sequence(&first), 1);
      assert_eq!(LoggingHook::sequence(&second), 2);
   }

   #[test]
   fn test_on_error_passes_cause_through() {
      let hook = LoggingHook::default();
      let mut ctx = ctx();
      hook.before(&mut ctx).unwrap();

      let cause = Error::driver_message("no such table: users");
      let on_error = hook.as_on_error().unwrap();
      assert_eq!(on_error.on_error(&mut ctx, &cause), cause);
   }

   #[test]
   fn test_after_never_fails() {
      let hook = LoggingHook::new(LoggingConfig::new().with_slow_query_threshold_ms(Some(0)));
      let mut ctx = ctx();
      hook.before(&mut ctx).unwrap();
      assert!(hook.after(&mut ctx).is_ok());

      ctx.error = Some(Error::Cancelled);
      assert!(hook.after(&mut ctx).is_ok());
   }

   #[test]
   fn test_redacted_args() {
      let hook = LoggingHook::new(LoggingConfig::new().with_log_args(false));
      assert_eq!(hook.args(&ctx()), "[redacted]");
   }
}

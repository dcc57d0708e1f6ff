//! Configuration for the driver registry and the logging hook.

use serde::{Deserialize, Serialize};

/// Configuration for a [`DriverRegistry`](crate::DriverRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
   /// Prefix of the names given to hooked drivers.
   ///
   /// Registered names take the form `"{prefix}:{base}:{n}"`, where `n` counts
   /// registrations made through the same registry.
   ///
   /// Default: `"sqlhooks"`
   pub name_prefix: String,
}

impl Default for RegistryConfig {
   fn default() -> Self {
      Self {
         name_prefix: "sqlhooks".to_string(),
      }
   }
}

impl RegistryConfig {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
      self.name_prefix = prefix.into();
      self
   }
}

/// Configuration for [`LoggingHook`](crate::LoggingHook).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
   /// Include bound argument values in log events.
   ///
   /// Disable when arguments may carry secrets or personal data.
   ///
   /// Default: true
   pub log_args: bool,

   /// Operations slower than this are logged at WARN instead of DEBUG.
   ///
   /// `None` disables slow-query warnings.
   ///
   /// Default: 500
   pub slow_query_threshold_ms: Option<u64>,
}

impl Default for LoggingConfig {
   fn default() -> Self {
      Self {
         log_args: true,
         slow_query_threshold_ms: Some(500),
      }
   }
}

impl LoggingConfig {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn with_log_args(mut self, log_args: bool) -> Self {
      self.log_args = log_args;
      self
   }

   pub fn with_slow_query_threshold_ms(mut self, threshold_ms: Option<u64>) -> Self {
      self.slow_query_threshold_ms = threshold_ms;
      self
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_registry_defaults() {
      assert_eq!(RegistryConfig::default().name_prefix, "sqlhooks");
      assert_eq!(
         RegistryConfig::new().with_name_prefix("traced").name_prefix,
         "traced"
      );
   }

   #[test]
   fn test_logging_config_from_partial_json() {
      let config: LoggingConfig = serde_json::from_str(r#"{"log_args": false}"#).unwrap();
      assert!(!config.log_args);
      assert_eq!(config.slow_query_threshold_ms, Some(500));
   }

   #[test]
   fn test_logging_config_disable_slow_warnings() {
      let config = LoggingConfig::new().with_slow_query_threshold_ms(None);
      assert_eq!(config.slow_query_threshold_ms, None);
   }
}

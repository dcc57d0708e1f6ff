//! Configuration for SQLite driver connections

use serde::{Deserialize, Serialize};

/// Connection settings applied by [`SqliteDriver`](crate::SqliteDriver) to every
/// connection it opens.
///
/// # Examples
///
/// ```
/// use sqlhooks_sqlite::SqliteDriverConfig;
///
/// let config = SqliteDriverConfig::default()
///    .with_foreign_keys(false)
///    .with_busy_timeout_secs(1);
///
/// assert!(config.create_if_missing);
/// assert!(!config.foreign_keys);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteDriverConfig {
   /// Create the database file if it does not exist yet.
   ///
   /// Default: true
   pub create_if_missing: bool,

   /// Enforce foreign key constraints (`PRAGMA foreign_keys`).
   ///
   /// Default: true
   pub foreign_keys: bool,

   /// How long a statement waits on a locked database before failing (in seconds)
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,
}

impl Default for SqliteDriverConfig {
   fn default() -> Self {
      Self {
         create_if_missing: true,
         foreign_keys: true,
         busy_timeout_secs: 5,
      }
   }
}

impl SqliteDriverConfig {
   pub fn with_create_if_missing(mut self, create: bool) -> Self {
      self.create_if_missing = create;
      self
   }

   pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
      self.foreign_keys = enabled;
      self
   }

   pub fn with_busy_timeout_secs(mut self, secs: u64) -> Self {
      self.busy_timeout_secs = secs;
      self
   }
}

//! Named driver registry and the open surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use sqlhooks_driver::{Driver, Error, Result};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::database::Database;
use crate::hooks::Hooks;
use crate::proxy::ProxyDriver;

/// Identity of a hooked registration: base driver name plus the address of
/// the shared hook set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HookKey {
   base: String,
   hooks: usize,
}

impl HookKey {
   fn new(base: &str, hooks: &Arc<dyn Hooks>) -> Self {
      Self {
         base: base.to_string(),
         hooks: Arc::as_ptr(hooks) as *const () as usize,
      }
   }
}

/// Maps driver names to drivers.
///
/// One process-wide instance is available through [`DriverRegistry::global`];
/// tests can create their own. Hooked drivers registered here keep their hook
/// set alive for the lifetime of the registry, so a hook set's address cannot
/// be reused by another one while its registration exists.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sqlhooks::{DriverRegistry, Hooks, LoggingHook};
/// use sqlhooks_sqlite::SqliteDriver;
///
/// # async fn example() -> sqlhooks_driver::Result<()> {
/// let registry = DriverRegistry::new();
/// registry.register("sqlite", Arc::new(SqliteDriver::default()))?;
///
/// let hooks: Arc<dyn Hooks> = Arc::new(LoggingHook::default());
/// let db = registry.open("sqlite", "app.db", Some(hooks))?;
/// let mut conn = db.connect().await?;
/// conn.exec("CREATE TABLE IF NOT EXISTS t (id INTEGER)", &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverRegistry {
   config: RegistryConfig,
   drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
   hooked: Mutex<HashMap<HookKey, String>>,
   seq: AtomicU64,
}

impl Default for DriverRegistry {
   fn default() -> Self {
      Self::with_config(RegistryConfig::default())
   }
}

impl DriverRegistry {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn with_config(config: RegistryConfig) -> Self {
      Self {
         config,
         drivers: RwLock::new(HashMap::new()),
         hooked: Mutex::new(HashMap::new()),
         seq: AtomicU64::new(0),
      }
   }

   /// The process-wide registry, created on first use.
   pub fn global() -> &'static DriverRegistry {
      static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
      GLOBAL.get_or_init(DriverRegistry::new)
   }

   pub fn config(&self) -> &RegistryConfig {
      &self.config
   }

   /// Registers `driver` under `name`.
   ///
   /// Fails with [`Error::DuplicateDriver`] if the name is taken.
   pub fn register(&self, name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
      let name = name.into();
      let mut drivers = self.drivers.write();
      if drivers.contains_key(&name) {
         return Err(Error::DuplicateDriver(name));
      }
      debug!(driver = %name, "Registered driver");
      drivers.insert(name, driver);
      Ok(())
   }

   /// Looks up a driver by name.
   pub fn driver(&self, name: &str) -> Result<Arc<dyn Driver>> {
      self
         .drivers
         .read()
         .get(name)
         .cloned()
         .ok_or_else(|| Error::UnknownDriver(name.to_string()))
   }

   /// Registered driver names, sorted.
   pub fn drivers(&self) -> Vec<String> {
      let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
      names.sort();
      names
   }

   /// Registers `base` wrapped with `hooks` and returns the new driver's name.
   ///
   /// Repeated calls with the same base name and the same `Arc` return the
   /// name from the first call without registering anything new.
   pub fn register_hooked(&self, base: &str, hooks: Arc<dyn Hooks>) -> Result<String> {
      let key = HookKey::new(base, &hooks);
      let mut hooked = self.hooked.lock();
      if let Some(name) = hooked.get(&key) {
         return Ok(name.clone());
      }

      let inner = self.driver(base)?;
      let n = self.seq.fetch_add(1, Ordering::Relaxed);
      let name = format!("{}:{}:{}", self.config.name_prefix, base, n);
      self.register(name.clone(), Arc::new(ProxyDriver::new(inner, hooks)))?;

      debug!(driver = %name, base = %base, "Registered hooked driver");
      hooked.insert(key, name.clone());
      Ok(name)
   }

   /// Returns a database handle for `dsn` on the named driver.
   ///
   /// With `Some(hooks)` every connection runs through a proxy registered
   /// with [`register_hooked`](Self::register_hooked). With `None` the base
   /// driver is used as-is.
   pub fn open(&self, base: &str, dsn: &str, hooks: Option<Arc<dyn Hooks>>) -> Result<Database> {
      let name = match hooks {
         Some(hooks) => self.register_hooked(base, hooks)?,
         None => base.to_string(),
      };
      let driver = self.driver(&name)?;
      Ok(Database::new(name, dsn, driver))
   }
}

/// Registers a driver in the global registry.
pub fn register(name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
   DriverRegistry::global().register(name, driver)
}

/// Opens a database through the global registry.
pub fn open(base: &str, dsn: &str, hooks: Option<Arc<dyn Hooks>>) -> Result<Database> {
   DriverRegistry::global().open(base, dsn, hooks)
}

/// Wraps a driver with hooks without registering it anywhere.
pub fn wrap(driver: Arc<dyn Driver>, hooks: Arc<dyn Hooks>) -> Arc<dyn Driver> {
   Arc::new(ProxyDriver::new(driver, hooks))
}

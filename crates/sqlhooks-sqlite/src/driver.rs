use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlhooks_driver::{Conn, Driver, Error, Result};
use sqlx::ConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use tracing::debug;

use crate::config::SqliteDriverConfig;
use crate::conn::SqliteConn;

/// Opens SQLite connections from a file path or a `sqlite:` URL.
///
/// # Example
///
/// ```no_run
/// use sqlhooks_driver::Driver;
/// use sqlhooks_sqlite::SqliteDriver;
///
/// # async fn example() -> sqlhooks_driver::Result<()> {
/// let driver = SqliteDriver::default();
/// let mut conn = driver.open("sqlite::memory:").await?;
/// conn.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqliteDriver {
   config: SqliteDriverConfig,
}

impl SqliteDriver {
   pub fn new(config: SqliteDriverConfig) -> Self {
      Self { config }
   }

   pub fn config(&self) -> &SqliteDriverConfig {
      &self.config
   }

   fn connect_options(&self, dsn: &str) -> Result<SqliteConnectOptions> {
      let options = if dsn.starts_with("sqlite:") {
         SqliteConnectOptions::from_str(dsn).map_err(Error::driver)?
      } else {
         SqliteConnectOptions::new().filename(dsn)
      };

      Ok(options
         .create_if_missing(self.config.create_if_missing)
         .foreign_keys(self.config.foreign_keys)
         .busy_timeout(Duration::from_secs(self.config.busy_timeout_secs)))
   }
}

#[async_trait]
impl Driver for SqliteDriver {
   async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
      let options = self.connect_options(dsn)?;
      let conn = options.connect().await.map_err(Error::driver)?;

      debug!("Opened SQLite connection: {}", dsn);
      Ok(Box::new(SqliteConn::new(conn)))
   }
}

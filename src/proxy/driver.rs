use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sqlhooks_driver::{Conn, Driver, Result};

use super::ProxyConn;
use crate::hooks::Hooks;

/// A driver whose connections run every operation through a hook set.
#[derive(Clone)]
pub struct ProxyDriver {
   inner: Arc<dyn Driver>,
   hooks: Arc<dyn Hooks>,
}

impl ProxyDriver {
   pub fn new(inner: Arc<dyn Driver>, hooks: Arc<dyn Hooks>) -> Self {
      Self { inner, hooks }
   }

   pub fn inner(&self) -> &Arc<dyn Driver> {
      &self.inner
   }

   pub fn hooks(&self) -> &Arc<dyn Hooks> {
      &self.hooks
   }
}

#[async_trait]
impl Driver for ProxyDriver {
   async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
      let conn = self.inner.open(dsn).await?;
      Ok(Box::new(ProxyConn::new(conn, Arc::clone(&self.hooks))))
   }
}

impl fmt::Debug for ProxyDriver {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("ProxyDriver").finish_non_exhaustive()
   }
}

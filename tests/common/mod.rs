//! Scriptable in-memory driver used by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlhooks::{FnHooks, HookContext, Hooks};
use sqlhooks_driver::{
   CallContext, Capabilities, Capability, Conn, ConnBeginTx, ConnPrepareContext, Driver, Error,
   ExecResult, Execer, ExecerContext, MemoryRows, NamedValue, Pinger, Queryer, QueryerContext,
   Result, Rows, SessionResetter, Stmt, StmtExecContext, StmtQueryContext, Tx, TxOptions, Value,
   values_of,
};

/// Counters and recorded calls shared by everything a [`FakeDriver`] creates.
#[derive(Default)]
pub struct FakeState {
   pub opens: AtomicUsize,
   pub prepares: AtomicUsize,
   pub execs: AtomicUsize,
   pub queries: AtomicUsize,
   pub begins: AtomicUsize,
   pub commits: AtomicUsize,
   pub rollbacks: AtomicUsize,
   pub resets: AtomicUsize,
   pub pings: AtomicUsize,
   pub stmt_closes: AtomicUsize,
   /// Query text and arguments of every exec or query, in order.
   pub calls: Mutex<Vec<(String, Vec<NamedValue>)>>,
   /// Options passed to the last `begin_tx`.
   pub last_tx_options: Mutex<Option<TxOptions>>,
   /// Whether the last context-aware call received a cancelled context.
   pub saw_cancelled: Mutex<Option<bool>>,
   /// Returned by every exec, query, commit and rollback while set.
   pub fail_with: Mutex<Option<Error>>,
}

impl FakeState {
   pub fn count(counter: &AtomicUsize) -> usize {
      counter.load(Ordering::SeqCst)
   }

   pub fn fail(&self, err: Error) {
      *self.fail_with.lock() = Some(err);
   }

   fn record(&self, counter: &AtomicUsize, query: &str, args: Vec<NamedValue>) -> Result<()> {
      counter.fetch_add(1, Ordering::SeqCst);
      self.calls.lock().push((query.to_string(), args));
      match self.fail_with.lock().clone() {
         Some(err) => Err(err),
         None => Ok(()),
      }
   }

   fn record_ctx(&self, ctx: &CallContext) -> Result<()> {
      *self.saw_cancelled.lock() = Some(ctx.is_cancelled());
      ctx.check()
   }

   pub fn last_call(&self) -> Option<(String, Vec<NamedValue>)> {
      self.calls.lock().last().cloned()
   }
}

/// A driver whose connections expose a configurable set of extensions.
#[derive(Clone)]
pub struct FakeDriver {
   pub caps: Capabilities,
   pub state: Arc<FakeState>,
}

impl FakeDriver {
   pub fn new(caps: impl IntoIterator<Item = Capability>) -> Self {
      Self {
         caps: caps.into_iter().collect(),
         state: Arc::new(FakeState::default()),
      }
   }

   /// Only the base connection and statement operations.
   pub fn bare() -> Self {
      Self::new(Capabilities::empty().iter())
   }

   /// Every connection and statement extension.
   pub fn full() -> Self {
      Self::new(Capability::CONN.into_iter().chain(Capability::STMT))
   }

   pub fn conn(&self) -> FakeConn {
      FakeConn {
         caps: self.caps,
         state: Arc::clone(&self.state),
      }
   }
}

#[async_trait]
impl Driver for FakeDriver {
   async fn open(&self, _dsn: &str) -> Result<Box<dyn Conn>> {
      self.state.opens.fetch_add(1, Ordering::SeqCst);
      Ok(Box::new(self.conn()))
   }
}

pub struct FakeConn {
   caps: Capabilities,
   state: Arc<FakeState>,
}

fn rows_for(query: &str) -> Box<dyn Rows> {
   Box::new(MemoryRows::new(
      vec!["query".into()],
      vec![vec![Value::Text(query.to_string())]],
   ))
}

fn exec_result(args: usize) -> ExecResult {
   ExecResult {
      rows_affected: args as u64,
      last_insert_id: Some(42),
   }
}

impl FakeConn {
   fn stmt(&self, query: &str) -> Box<dyn Stmt> {
      Box::new(FakeStmt {
         query: query.to_string(),
         caps: self.caps,
         state: Arc::clone(&self.state),
      })
   }

   fn tx(&self) -> Box<dyn Tx> {
      Box::new(FakeTx {
         state: Arc::clone(&self.state),
      })
   }
}

#[async_trait]
impl Conn for FakeConn {
   async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
      self.state.prepares.fetch_add(1, Ordering::SeqCst);
      Ok(self.stmt(query))
   }

   async fn close(&mut self) -> Result<()> {
      Ok(())
   }

   async fn begin(&mut self) -> Result<Box<dyn Tx>> {
      self.state.begins.fetch_add(1, Ordering::SeqCst);
      Ok(self.tx())
   }

   fn as_execer(&mut self) -> Option<&mut dyn Execer> {
      if self.caps.contains(Capability::Execer) {
         Some(self)
      } else {
         None
      }
   }

   fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
      if self.caps.contains(Capability::ExecerContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
      if self.caps.contains(Capability::Queryer) {
         Some(self)
      } else {
         None
      }
   }

   fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
      if self.caps.contains(Capability::QueryerContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
      if self.caps.contains(Capability::PrepareContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
      if self.caps.contains(Capability::BeginTx) {
         Some(self)
      } else {
         None
      }
   }

   fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
      if self.caps.contains(Capability::SessionResetter) {
         Some(self)
      } else {
         None
      }
   }

   fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
      if self.caps.contains(Capability::Pinger) {
         Some(self)
      } else {
         None
      }
   }
}

#[async_trait]
impl Execer for FakeConn {
   async fn exec(&mut self, query: &str, args: &[Value]) -> Result<ExecResult> {
      let named = sqlhooks_driver::named_from_values(args);
      self.state.record(&self.state.execs, query, named)?;
      Ok(exec_result(args.len()))
   }
}

#[async_trait]
impl ExecerContext for FakeConn {
   async fn exec_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<ExecResult> {
      self.state.record_ctx(ctx)?;
      self.state.record(&self.state.execs, query, args.to_vec())?;
      Ok(exec_result(args.len()))
   }
}

#[async_trait]
impl Queryer for FakeConn {
   async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
      let named = sqlhooks_driver::named_from_values(args);
      self.state.record(&self.state.queries, query, named)?;
      Ok(rows_for(query))
   }
}

#[async_trait]
impl QueryerContext for FakeConn {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      query: &str,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      self.state.record_ctx(ctx)?;
      self.state.record(&self.state.queries, query, args.to_vec())?;
      Ok(rows_for(query))
   }
}

#[async_trait]
impl ConnPrepareContext for FakeConn {
   async fn prepare_context(&mut self, ctx: &CallContext, query: &str) -> Result<Box<dyn Stmt>> {
      self.state.record_ctx(ctx)?;
      self.state.prepares.fetch_add(1, Ordering::SeqCst);
      Ok(self.stmt(query))
   }
}

#[async_trait]
impl ConnBeginTx for FakeConn {
   async fn begin_tx(&mut self, ctx: &CallContext, opts: TxOptions) -> Result<Box<dyn Tx>> {
      self.state.record_ctx(ctx)?;
      self.state.begins.fetch_add(1, Ordering::SeqCst);
      *self.state.last_tx_options.lock() = Some(opts);
      Ok(self.tx())
   }
}

#[async_trait]
impl SessionResetter for FakeConn {
   async fn reset_session(&mut self, _ctx: &CallContext) -> Result<()> {
      self.state.resets.fetch_add(1, Ordering::SeqCst);
      Ok(())
   }
}

#[async_trait]
impl Pinger for FakeConn {
   async fn ping(&mut self, _ctx: &CallContext) -> Result<()> {
      self.state.pings.fetch_add(1, Ordering::SeqCst);
      Ok(())
   }
}

pub struct FakeStmt {
   query: String,
   caps: Capabilities,
   state: Arc<FakeState>,
}

#[async_trait]
impl Stmt for FakeStmt {
   fn num_input(&self) -> Option<usize> {
      None
   }

   async fn exec(&mut self, args: &[Value]) -> Result<ExecResult> {
      let named = sqlhooks_driver::named_from_values(args);
      self.state.record(&self.state.execs, &self.query, named)?;
      Ok(exec_result(args.len()))
   }

   async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
      let named = sqlhooks_driver::named_from_values(args);
      self.state.record(&self.state.queries, &self.query, named)?;
      Ok(rows_for(&self.query))
   }

   async fn close(&mut self) -> Result<()> {
      self.state.stmt_closes.fetch_add(1, Ordering::SeqCst);
      Ok(())
   }

   fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
      if self.caps.contains(Capability::StmtExecContext) {
         Some(self)
      } else {
         None
      }
   }

   fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
      if self.caps.contains(Capability::StmtQueryContext) {
         Some(self)
      } else {
         None
      }
   }
}

#[async_trait]
impl StmtExecContext for FakeStmt {
   async fn exec_context(&mut self, ctx: &CallContext, args: &[NamedValue]) -> Result<ExecResult> {
      self.state.record_ctx(ctx)?;
      self.state.record(&self.state.execs, &self.query, args.to_vec())?;
      Ok(exec_result(args.len()))
   }
}

#[async_trait]
impl StmtQueryContext for FakeStmt {
   async fn query_context(
      &mut self,
      ctx: &CallContext,
      args: &[NamedValue],
   ) -> Result<Box<dyn Rows>> {
      self.state.record_ctx(ctx)?;
      self.state.record(&self.state.queries, &self.query, args.to_vec())?;
      Ok(rows_for(&self.query))
   }
}

pub struct FakeTx {
   state: Arc<FakeState>,
}

#[async_trait]
impl Tx for FakeTx {
   async fn commit(&mut self) -> Result<()> {
      self.state.record(&self.state.commits, "COMMIT", Vec::new())
   }

   async fn rollback(&mut self) -> Result<()> {
      self.state.record(&self.state.rollbacks, "ROLLBACK", Vec::new())
   }
}

/// Everything a [`Recorder`] saw at one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
   pub stage: &'static str,
   pub operation: sqlhooks::Operation,
   pub id: uuid::Uuid,
   pub query: String,
   pub args: Vec<Value>,
   pub error: Option<Error>,
}

/// A hook set that records every call it receives.
#[derive(Default, Clone)]
pub struct Recorder {
   pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
   pub fn hooks(&self) -> Arc<dyn Hooks> {
      let before = Arc::clone(&self.seen);
      let after = Arc::clone(&self.seen);
      let on_error = Arc::clone(&self.seen);
      Arc::new(
         FnHooks::new()
            .before(move |ctx| {
               before.lock().push(seen("before", ctx));
               Ok(())
            })
            .after(move |ctx| {
               after.lock().push(seen("after", ctx));
               Ok(())
            })
            .on_error(move |ctx, cause| {
               on_error.lock().push(seen("on_error", ctx));
               cause.clone()
            }),
      )
   }

   pub fn stages(&self) -> Vec<&'static str> {
      self.seen.lock().iter().map(|s| s.stage).collect()
   }

   pub fn take(&self) -> Vec<Seen> {
      std::mem::take(&mut *self.seen.lock())
   }
}

fn seen(stage: &'static str, ctx: &HookContext) -> Seen {
   Seen {
      stage,
      operation: ctx.operation(),
      id: ctx.id(),
      query: ctx.query.clone(),
      args: ctx.args.clone(),
      error: ctx.error.clone(),
   }
}

/// A hook set whose before and after stages always fail with `message`.
pub fn failing(message: &'static str) -> Arc<dyn Hooks> {
   Arc::new(
      FnHooks::new()
         .before(move |_| Err(Error::hook(message)))
         .after(move |_| Err(Error::hook(message))),
   )
}

/// Strips names from recorded arguments.
pub fn plain(args: &[NamedValue]) -> Vec<Value> {
   values_of(args)
}

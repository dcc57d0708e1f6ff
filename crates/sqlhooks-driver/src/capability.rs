//! Optional driver capabilities and per-instance capability probing.
//!
//! A driver object advertises an extension by returning `Some` from the
//! matching `as_*` accessor on [`Conn`] or [`Stmt`]. Probing happens on the
//! instance, never on the type, since a driver may hand out connections with
//! different capability sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::{Conn, Stmt};

/// An optional extension interface a connection or statement may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
   /// Connection exec with positional values.
   Execer,
   /// Connection exec with a call context and named values.
   ExecerContext,
   /// Connection query with positional values.
   Queryer,
   /// Connection query with a call context and named values.
   QueryerContext,
   /// Prepare with a call context.
   PrepareContext,
   /// Begin with a call context and transaction options.
   BeginTx,
   /// Reset session state before the connection is reused.
   SessionResetter,
   /// Check the connection is still alive.
   Pinger,
   /// Statement exec with a call context and named values.
   StmtExecContext,
   /// Statement query with a call context and named values.
   StmtQueryContext,
}

impl Capability {
   /// Every capability a connection can expose.
   pub const CONN: [Capability; 8] = [
      Capability::Execer,
      Capability::ExecerContext,
      Capability::Queryer,
      Capability::QueryerContext,
      Capability::PrepareContext,
      Capability::BeginTx,
      Capability::SessionResetter,
      Capability::Pinger,
   ];

   /// Every capability a statement can expose.
   pub const STMT: [Capability; 2] = [Capability::StmtExecContext, Capability::StmtQueryContext];

   const fn bit(self) -> u16 {
      1 << (self as u16)
   }

   /// Name of the extension trait that provides this capability.
   pub fn trait_name(self) -> &'static str {
      match self {
         Capability::Execer => "Execer",
         Capability::ExecerContext => "ExecerContext",
         Capability::Queryer => "Queryer",
         Capability::QueryerContext => "QueryerContext",
         Capability::PrepareContext => "ConnPrepareContext",
         Capability::BeginTx => "ConnBeginTx",
         Capability::SessionResetter => "SessionResetter",
         Capability::Pinger => "Pinger",
         Capability::StmtExecContext => "StmtExecContext",
         Capability::StmtQueryContext => "StmtQueryContext",
      }
   }
}

impl fmt::Display for Capability {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.trait_name())
   }
}

/// A set of [`Capability`] values.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u16);

impl Capabilities {
   /// The empty set: only the base contract.
   pub const fn empty() -> Self {
      Capabilities(0)
   }

   pub fn contains(self, capability: Capability) -> bool {
      self.0 & capability.bit() != 0
   }

   pub fn insert(&mut self, capability: Capability) {
      self.0 |= capability.bit();
   }

   /// Returns a copy of the set with `capability` added.
   pub fn with(mut self, capability: Capability) -> Self {
      self.insert(capability);
      self
   }

   pub fn is_empty(self) -> bool {
      self.0 == 0
   }

   pub fn len(self) -> usize {
      self.0.count_ones() as usize
   }

   /// Iterates the contained capabilities in declaration order.
   pub fn iter(self) -> impl Iterator<Item = Capability> {
      Capability::CONN
         .into_iter()
         .chain(Capability::STMT)
         .filter(move |c| self.contains(*c))
   }

   /// Probes which extensions a connection instance exposes.
   pub fn of_conn(conn: &mut dyn Conn) -> Self {
      let mut caps = Capabilities::empty();
      if conn.as_execer().is_some() {
         caps.insert(Capability::Execer);
      }
      if conn.as_execer_context().is_some() {
         caps.insert(Capability::ExecerContext);
      }
      if conn.as_queryer().is_some() {
         caps.insert(Capability::Queryer);
      }
      if conn.as_queryer_context().is_some() {
         caps.insert(Capability::QueryerContext);
      }
      if conn.as_prepare_context().is_some() {
         caps.insert(Capability::PrepareContext);
      }
      if conn.as_begin_tx().is_some() {
         caps.insert(Capability::BeginTx);
      }
      if conn.as_session_resetter().is_some() {
         caps.insert(Capability::SessionResetter);
      }
      if conn.as_pinger().is_some() {
         caps.insert(Capability::Pinger);
      }
      caps
   }

   /// Probes which extensions a statement instance exposes.
   pub fn of_stmt(stmt: &mut dyn Stmt) -> Self {
      let mut caps = Capabilities::empty();
      if stmt.as_exec_context().is_some() {
         caps.insert(Capability::StmtExecContext);
      }
      if stmt.as_query_context().is_some() {
         caps.insert(Capability::StmtQueryContext);
      }
      caps
   }
}

impl FromIterator<Capability> for Capabilities {
   fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
      let mut caps = Capabilities::empty();
      for capability in iter {
         caps.insert(capability);
      }
      caps
   }
}

impl fmt::Debug for Capabilities {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_set().entries(self.iter()).finish()
   }
}

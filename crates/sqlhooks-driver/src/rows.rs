//! Result-set iteration and in-memory row sources.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::Result;
use crate::value::Value;

/// A forward-only cursor over the rows of a query.
#[async_trait]
pub trait Rows: Send {
   /// Column names in result order.
   fn columns(&self) -> &[String];

   /// Advances to the next row, returning `None` once exhausted.
   async fn next(&mut self) -> Result<Option<Vec<Value>>>;

   async fn close(&mut self) -> Result<()>;
}

/// Rows held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
   columns: Vec<String>,
   rows: VecDeque<Vec<Value>>,
   closed: bool,
}

impl MemoryRows {
   pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
      Self {
         columns,
         rows: rows.into(),
         closed: false,
      }
   }

   /// Rows not yet returned by `next`.
   pub fn remaining(&self) -> usize {
      self.rows.len()
   }
}

#[async_trait]
impl Rows for MemoryRows {
   fn columns(&self) -> &[String] {
      &self.columns
   }

   async fn next(&mut self) -> Result<Option<Vec<Value>>> {
      if self.closed {
         return Ok(None);
      }
      Ok(self.rows.pop_front())
   }

   async fn close(&mut self) -> Result<()> {
      self.closed = true;
      self.rows.clear();
      Ok(())
   }
}

/// A result set with no columns and no rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRows;

#[async_trait]
impl Rows for EmptyRows {
   fn columns(&self) -> &[String] {
      &[]
   }

   async fn next(&mut self) -> Result<Option<Vec<Value>>> {
      Ok(None)
   }

   async fn close(&mut self) -> Result<()> {
      Ok(())
   }
}

/// Drains `rows` into memory and closes it.
///
/// The cursor is closed even when reading fails part-way.
pub async fn collect_rows(rows: &mut dyn Rows) -> Result<Vec<Vec<Value>>> {
   let mut out = Vec::new();
   let read = loop {
      match rows.next().await {
         Ok(Some(row)) => out.push(row),
         Ok(None) => break Ok(()),
         Err(err) => break Err(err),
      }
   };
   let closed = rows.close().await;
   read?;
   closed?;
   Ok(out)
}

pub mod config;

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::Result;

pub use config::Configuration;

/// Statement parameter. Parameter binding and result mapping belong to the
/// engine, so both directions travel as JSON values.
pub type Param = serde_json::Value;

/// One mapped result row.
pub type Row = serde_json::Value;

/// Lazily evaluated query results. The owning session must stay open while
/// the cursor is drained, so cursors are only useful inside an active unit
/// of work.
pub type RowCursor = Box<dyn Iterator<Item = Result<Row>> + Send>;

/// Engine-defined raw connection handle.
pub type RawConnection = Arc<dyn Any + Send + Sync>;

/// Statement execution strategy hint passed through to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutorType {
    Simple,
    Reuse,
    Batch,
}

/// Offset/limit window applied by the engine while mapping results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// Outcome of one flushed batch statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub statement: String,
    pub update_counts: Vec<u64>,
}

/// Row-at-a-time consumer for streaming queries.
pub trait RowHandler {
    fn handle(&mut self, row: Row) -> Result<()>;
}

impl<F> RowHandler for F
where
    F: FnMut(Row) -> Result<()>,
{
    fn handle(&mut self, row: Row) -> Result<()> {
        self(row)
    }
}

/// The full data-access surface.
///
/// Engine adapters implement this over their native session. [`BoundSession`]
/// implements it as a delegating variant that resolves the physical session
/// per call, which is why every operation takes `&self`: implementations are
/// expected to manage their own interior state.
///
/// [`BoundSession`]: crate::facade::BoundSession
pub trait Session: Send + Sync {
    /// Retrieves at most one row for `statement`.
    fn select_one(&self, statement: &str, param: Option<Param>) -> Result<Option<Row>>;

    /// Retrieves all rows for `statement`, optionally windowed by `bounds`.
    fn select_list(
        &self,
        statement: &str,
        param: Option<Param>,
        bounds: Option<RowBounds>,
    ) -> Result<Vec<Row>>;

    /// Retrieves rows lazily.
    fn select_cursor(&self, statement: &str, param: Option<Param>) -> Result<RowCursor>;

    /// Streams each row into `handler` without materializing the result set.
    fn select_each(
        &self,
        statement: &str,
        param: Option<Param>,
        handler: &mut dyn RowHandler,
    ) -> Result<()>;

    /// Executes an insert statement, returning the number of affected rows.
    fn insert(&self, statement: &str, param: Option<Param>) -> Result<u64>;

    /// Executes an update statement, returning the number of affected rows.
    fn update(&self, statement: &str, param: Option<Param>) -> Result<u64>;

    /// Executes a delete statement, returning the number of affected rows.
    fn delete(&self, statement: &str, param: Option<Param>) -> Result<u64>;

    /// Flushes pending batch statements to the engine.
    fn flush_statements(&self) -> Result<Vec<BatchResult>>;

    /// Discards the session-local statement cache.
    fn clear_cache(&self) -> Result<()>;

    /// Raw engine connection backing this session.
    fn connection(&self) -> Result<RawConnection>;

    /// Configuration of the factory this session came from.
    fn configuration(&self) -> Arc<Configuration>;

    /// Commits pending work. `force` commits even when the session saw no
    /// writes.
    fn commit(&self, force: bool) -> Result<()>;

    /// Rolls pending work back. `force` rolls back even when the session saw
    /// no writes.
    fn rollback(&self, force: bool) -> Result<()>;

    /// Releases the session and its connection.
    fn close(&self) -> Result<()>;
}

/// Manufactures raw sessions. The factory's identity (its allocation) is the
/// key under which sessions are bound to a unit of work, so the same
/// `Arc<dyn SessionFactory>` must be used for every call that should share a
/// session.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self, executor: ExecutorType) -> Result<Arc<dyn Session>>;

    fn configuration(&self) -> Arc<Configuration>;
}

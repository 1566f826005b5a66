//! Moving a task between board columns.
//!
//! A move is applied to the local [`Board`] first and persisted afterwards in
//! a spawned task. If persistence fails the local board is *not* rolled back;
//! what happens instead is decided by the [`MoveReconciler`], which by default
//! only logs. Board and store then disagree until the next refresh.

use std::sync::Arc;

use async_trait::async_trait;
use db::{models::procedure::ProcedureColumn, store::ProcedureStore};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use super::board::Board;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("task {task_id} is not in column {column}")]
    NotInColumn {
        task_id: Uuid,
        column: ProcedureColumn,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMove {
    pub task_id: Uuid,
    pub from: ProcedureColumn,
    pub to: ProcedureColumn,
    /// Clamped to the destination length.
    pub to_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Same column; order inside a column is not persisted.
    Reordered,
    /// Different column; the new column must be persisted.
    Moved,
}

/// Apply a move to the board in place. Pure list surgery, no I/O.
pub fn apply_move(board: &mut Board, mv: &ColumnMove) -> Result<MoveOutcome, MoveError> {
    let source = board.column_mut(mv.from);
    let position = source
        .items
        .iter()
        .position(|item| item.id == mv.task_id)
        .ok_or(MoveError::NotInColumn {
            task_id: mv.task_id,
            column: mv.from,
        })?;
    let mut item = source.items.remove(position);

    if mv.from == mv.to {
        let index = mv.to_index.min(source.items.len());
        source.items.insert(index, item);
        return Ok(MoveOutcome::Reordered);
    }

    item.column = mv.to.to_string();
    let destination = board.column_mut(mv.to);
    let index = mv.to_index.min(destination.items.len());
    destination.items.insert(index, item);
    Ok(MoveOutcome::Moved)
}

/// Persists the new column of a moved task.
#[async_trait]
pub trait ColumnWriter: Send + Sync {
    async fn write_column(&self, task_id: Uuid, column: ProcedureColumn) -> anyhow::Result<()>;
}

/// Writes straight to a store, for sessions living next to the database.
pub struct StoreColumnWriter {
    store: Arc<dyn ProcedureStore>,
}

impl StoreColumnWriter {
    pub fn new(store: Arc<dyn ProcedureStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ColumnWriter for StoreColumnWriter {
    async fn write_column(&self, task_id: Uuid, column: ProcedureColumn) -> anyhow::Result<()> {
        match self.store.update_column(task_id, column).await? {
            Some(_) => Ok(()),
            None => Err(anyhow::anyhow!("procedure {task_id} not found")),
        }
    }
}

#[derive(Debug)]
pub struct PersistFailure {
    pub mv: ColumnMove,
    pub error: anyhow::Error,
}

/// Hook run once a move's persistence attempt has finished.
pub trait MoveReconciler: Send + Sync {
    fn on_persist_failure(&self, failure: &PersistFailure);

    fn on_persisted(&self, _mv: &ColumnMove) {}
}

/// Log the failure and keep the optimistic state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnly;

impl MoveReconciler for LogOnly {
    fn on_persist_failure(&self, failure: &PersistFailure) {
        error!(
            task_id = %failure.mv.task_id,
            from = %failure.mv.from,
            to = %failure.mv.to,
            error = %failure.error,
            "failed to persist column move; board and store now disagree"
        );
    }
}

#[derive(Clone)]
pub struct ColumnAssignmentEngine {
    writer: Arc<dyn ColumnWriter>,
    reconciler: Arc<dyn MoveReconciler>,
}

impl ColumnAssignmentEngine {
    pub fn new(writer: Arc<dyn ColumnWriter>) -> Self {
        Self::with_reconciler(writer, Arc::new(LogOnly))
    }

    pub fn with_reconciler(
        writer: Arc<dyn ColumnWriter>,
        reconciler: Arc<dyn MoveReconciler>,
    ) -> Self {
        Self { writer, reconciler }
    }

    /// Apply `mv` to `board` and, for a cross-column move, spawn the write.
    ///
    /// The returned handle may be dropped; the write still runs. Must be
    /// called from within a Tokio runtime.
    pub fn move_task(
        &self,
        board: &mut Board,
        mv: ColumnMove,
    ) -> Result<Option<JoinHandle<()>>, MoveError> {
        match apply_move(board, &mv)? {
            MoveOutcome::Reordered => Ok(None),
            MoveOutcome::Moved => Ok(Some(self.persist(mv))),
        }
    }

    fn persist(&self, mv: ColumnMove) -> JoinHandle<()> {
        let writer = Arc::clone(&self.writer);
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            match writer.write_column(mv.task_id, mv.to).await {
                Ok(()) => {
                    debug!(task_id = %mv.task_id, column = %mv.to, "column move persisted");
                    reconciler.on_persisted(&mv);
                }
                Err(error) => reconciler.on_persist_failure(&PersistFailure { mv, error }),
            }
        })
    }
}

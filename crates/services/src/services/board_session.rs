//! Client-side board state: current filter, current board, pending refreshes.

use db::{
    filter::ProcedureFilter,
    models::procedure::{ProcedureColumn, ProcedureWithRelations},
    store::{ProcedureStore, StoreError},
};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use super::{
    board::Board,
    column_assignment::{ColumnAssignmentEngine, ColumnMove, MoveError},
};

/// Issued by [`BoardSession::begin_refresh`]. Only the newest ticket may
/// replace the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

pub struct BoardSession {
    board: Board,
    filter: ProcedureFilter,
    engine: ColumnAssignmentEngine,
    issued: u64,
}

impl BoardSession {
    pub fn new(engine: ColumnAssignmentEngine) -> Self {
        Self {
            board: Board::empty(),
            filter: ProcedureFilter::default(),
            engine,
            issued: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn filter(&self) -> &ProcedureFilter {
        &self.filter
    }

    /// Record `filter` as current and hand out a ticket for the fetch that
    /// will answer it. Any ticket issued earlier becomes stale.
    pub fn begin_refresh(&mut self, filter: ProcedureFilter) -> RefreshTicket {
        self.issued += 1;
        self.filter = filter;
        RefreshTicket(self.issued)
    }

    /// Rebuild the board from a fetch result. Returns `false`, leaving the
    /// board alone, when a newer refresh has been started since `ticket`.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        records: &[ProcedureWithRelations],
    ) -> bool {
        if ticket.0 != self.issued {
            debug!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding stale board refresh"
            );
            return false;
        }
        self.board = Board::rebuild(records, &self.filter);
        true
    }

    /// Fetch from `store` and rebuild in one go.
    pub async fn refresh(
        &mut self,
        store: &dyn ProcedureStore,
        filter: ProcedureFilter,
    ) -> Result<bool, StoreError> {
        let ticket = self.begin_refresh(filter);
        let records = store.find_procedures(&self.filter).await?;
        Ok(self.complete_refresh(ticket, &records))
    }

    /// Drag-and-drop entry point. See [`ColumnAssignmentEngine::move_task`].
    pub fn move_task(
        &mut self,
        task_id: Uuid,
        from: ProcedureColumn,
        to: ProcedureColumn,
        to_index: usize,
    ) -> Result<Option<JoinHandle<()>>, MoveError> {
        self.engine.move_task(
            &mut self.board,
            ColumnMove {
                task_id,
                from,
                to,
                to_index,
            },
        )
    }
}

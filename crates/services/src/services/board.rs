//! The four-column board, always derived from procedure records.

use db::{
    filter::ProcedureFilter,
    models::procedure::{ProcedureColumn, ProcedureWithRelations},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use super::projection::{TaskViewModel, project};

pub fn column_title(column: ProcedureColumn) -> &'static str {
    match column {
        ProcedureColumn::Todo => "Todo",
        ProcedureColumn::Doing => "On doing",
        ProcedureColumn::Done => "Done",
        ProcedureColumn::Waiting => "Waiting",
    }
}

pub fn column_color(column: ProcedureColumn) -> &'static str {
    match column {
        ProcedureColumn::Todo => "#0CBE5E",
        ProcedureColumn::Doing => "#FFDD0F",
        ProcedureColumn::Done => "primary",
        ProcedureColumn::Waiting => "#64748B",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct BoardColumn {
    pub id: ProcedureColumn,
    pub title: String,
    pub color: String,
    pub items: Vec<TaskViewModel>,
}

impl BoardColumn {
    fn empty(id: ProcedureColumn) -> Self {
        Self {
            id,
            title: column_title(id).to_string(),
            color: column_color(id).to_string(),
            items: Vec::new(),
        }
    }

    pub fn contains(&self, task_id: Uuid) -> bool {
        self.items.iter().any(|item| item.id == task_id)
    }
}

/// Columns in [`ProcedureColumn::ALL`] order; `columns[c.index()]` is `c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Board {
    columns: Vec<BoardColumn>,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub fn empty() -> Self {
        Self {
            columns: ProcedureColumn::ALL.into_iter().map(BoardColumn::empty).collect(),
        }
    }

    /// Filter, project and group `records`. Records whose column key is not
    /// one of the four known ones are left off the board.
    pub fn rebuild(records: &[ProcedureWithRelations], filter: &ProcedureFilter) -> Self {
        let mut board = Self::empty();
        for record in records.iter().filter(|r| filter.matches(r)) {
            let Some(column) = record.board_column() else {
                warn!(
                    task_id = %record.id,
                    column = %record.column,
                    "dropping procedure with unknown column from board"
                );
                continue;
            };
            let target = board.column_mut(column);
            if !target.contains(record.id) {
                target.items.push(project(record));
            }
        }
        board
    }

    pub fn columns(&self) -> &[BoardColumn] {
        &self.columns
    }

    pub fn column(&self, column: ProcedureColumn) -> &BoardColumn {
        &self.columns[column.index()]
    }

    pub fn column_mut(&mut self, column: ProcedureColumn) -> &mut BoardColumn {
        &mut self.columns[column.index()]
    }

    /// Column and position of a task, if it is on the board.
    pub fn locate(&self, task_id: Uuid) -> Option<(ProcedureColumn, usize)> {
        self.columns.iter().find_map(|column| {
            column
                .items
                .iter()
                .position(|item| item.id == task_id)
                .map(|index| (column.id, index))
        })
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.items.len()).sum()
    }
}

use db::models::procedure::ProcedureWithRelations;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::date::format_display;
use uuid::Uuid;

/// Flat card shown on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TaskViewModel {
    pub id: Uuid,
    /// Name of the first category, empty when there is none.
    pub label: String,
    pub description: String,
    pub user: String,
    /// Due date as `dd/mm/yyyy`.
    pub date: String,
    pub priority: i32,
    pub column: String,
}

pub fn project(record: &ProcedureWithRelations) -> TaskViewModel {
    TaskViewModel {
        id: record.id,
        label: record
            .first_category()
            .map(|c| c.name.clone())
            .unwrap_or_default(),
        description: record.title.clone(),
        user: record
            .user
            .as_ref()
            .map(|u| u.user_name.clone())
            .unwrap_or_default(),
        date: format_display(&record.due_date),
        priority: record.priority,
        column: record.column.clone(),
    }
}

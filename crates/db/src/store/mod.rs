//! Storage capability used by the service layer.
//!
//! The board logic only talks to [`ProcedureStore`]. [`SqliteStore`] is the
//! relational backend; [`MemoryStore`] keeps documents in process and backs
//! tests and throwaway sessions.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    filter::ProcedureFilter,
    models::{
        category::Category,
        procedure::{NewProcedure, Procedure, ProcedureChanges, ProcedureColumn, ProcedureWithRelations},
        user::User,
    },
};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ProcedureStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user_name: &str) -> Result<User, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;

    async fn create_category(&self, name: &str) -> Result<Category, StoreError>;

    /// All procedures matching `filter`, in insertion order.
    async fn find_procedures(
        &self,
        filter: &ProcedureFilter,
    ) -> Result<Vec<ProcedureWithRelations>, StoreError>;

    async fn find_procedure(&self, id: Uuid)
    -> Result<Option<ProcedureWithRelations>, StoreError>;

    async fn create_procedure(&self, data: &NewProcedure) -> Result<Procedure, StoreError>;

    /// Returns `None` when no procedure has this id.
    async fn update_procedure(
        &self,
        id: Uuid,
        changes: &ProcedureChanges,
    ) -> Result<Option<Procedure>, StoreError>;

    /// Overwrite only the column. Repeating the call is harmless.
    async fn update_column(
        &self,
        id: Uuid,
        column: ProcedureColumn,
    ) -> Result<Option<Procedure>, StoreError> {
        self.update_procedure(id, &ProcedureChanges::column_only(column))
            .await
    }
}

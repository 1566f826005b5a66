use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProcedureStore, StoreError};
use crate::{
    filter::ProcedureFilter,
    models::{
        category::Category,
        procedure::{NewProcedure, Procedure, ProcedureChanges, ProcedureWithRelations},
        user::User,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    categories: Vec<Category>,
    procedures: Vec<Procedure>,
}

impl MemoryState {
    fn resolve(&self, procedure: &Procedure) -> ProcedureWithRelations {
        let user = self.users.iter().find(|u| u.id == procedure.user_id).cloned();
        let category = procedure
            .category_ids
            .iter()
            .filter_map(|id| self.categories.iter().find(|c| &c.id == id).cloned())
            .collect();
        ProcedureWithRelations {
            procedure: procedure.clone(),
            user,
            category,
        }
    }
}

/// Document-style store kept entirely in process. Every procedure embeds its
/// category ids; relations are resolved on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, bypassing validation. Lets callers seed
    /// rows that the API would refuse, such as an unknown column key.
    pub async fn insert_procedure(&self, procedure: Procedure) {
        self.state.write().await.procedures.push(procedure);
    }
}

#[async_trait]
impl ProcedureStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.state.read().await.users.clone())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user_name: &str) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4(),
            user_name: user_name.to_string(),
        };
        self.state.write().await.users.push(user.clone());
        Ok(user)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.state.read().await.categories.clone())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state.write().await.categories.push(category.clone());
        Ok(category)
    }

    async fn find_procedures(
        &self,
        filter: &ProcedureFilter,
    ) -> Result<Vec<ProcedureWithRelations>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .procedures
            .iter()
            .map(|p| state.resolve(p))
            .filter(|record| filter.matches(record))
            .collect())
    }

    async fn find_procedure(
        &self,
        id: Uuid,
    ) -> Result<Option<ProcedureWithRelations>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .procedures
            .iter()
            .find(|p| p.id == id)
            .map(|p| state.resolve(p)))
    }

    async fn create_procedure(&self, data: &NewProcedure) -> Result<Procedure, StoreError> {
        let procedure = Procedure {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            priority: data.priority,
            user_id: data.user_id,
            category_ids: data.category_ids.clone(),
            column: data.column.to_string(),
            create_at: data.create_at,
            due_date: data.due_date,
        };
        self.state.write().await.procedures.push(procedure.clone());
        Ok(procedure)
    }

    async fn update_procedure(
        &self,
        id: Uuid,
        changes: &ProcedureChanges,
    ) -> Result<Option<Procedure>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.procedures.iter_mut().find(|p| p.id == id).map(|p| {
            changes.apply_to(p);
            p.clone()
        }))
    }
}

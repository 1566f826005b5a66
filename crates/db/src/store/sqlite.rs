use async_trait::async_trait;
use uuid::Uuid;

use super::{ProcedureStore, StoreError};
use crate::{
    DBService,
    filter::ProcedureFilter,
    models::{
        category::Category,
        procedure::{NewProcedure, Procedure, ProcedureChanges, ProcedureWithRelations},
        user::User,
    },
};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: DBService,
}

impl SqliteStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }
}

#[async_trait]
impl ProcedureStore for SqliteStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(User::find_all(&self.db.pool).await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.db.pool, id).await?)
    }

    async fn create_user(&self, user_name: &str) -> Result<User, StoreError> {
        Ok(User::create(&self.db.pool, Uuid::new_v4(), user_name).await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(Category::find_all(&self.db.pool).await?)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(Category::find_by_id(&self.db.pool, id).await?)
    }

    async fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        Ok(Category::create(&self.db.pool, Uuid::new_v4(), name).await?)
    }

    async fn find_procedures(
        &self,
        filter: &ProcedureFilter,
    ) -> Result<Vec<ProcedureWithRelations>, StoreError> {
        Ok(ProcedureWithRelations::find_filtered(&self.db.pool, filter).await?)
    }

    async fn find_procedure(
        &self,
        id: Uuid,
    ) -> Result<Option<ProcedureWithRelations>, StoreError> {
        Ok(ProcedureWithRelations::find_by_id(&self.db.pool, id).await?)
    }

    async fn create_procedure(&self, data: &NewProcedure) -> Result<Procedure, StoreError> {
        Ok(Procedure::create(&self.db.pool, Uuid::new_v4(), data).await?)
    }

    async fn update_procedure(
        &self,
        id: Uuid,
        changes: &ProcedureChanges,
    ) -> Result<Option<Procedure>, StoreError> {
        Ok(Procedure::update(&self.db.pool, id, changes).await?)
    }
}

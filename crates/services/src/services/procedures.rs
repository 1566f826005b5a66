//! Validation and orchestration behind the HTTP endpoints.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::{
    filter::{FilterCriteria, FilterError, ProcedureFilter},
    models::{
        category::{Category, CreateCategory},
        procedure::{
            CreateProcedure, NewProcedure, PatchProcedure, Procedure, ProcedureChanges,
            ProcedureColumn, ProcedureWithRelations, UpdateProcedureColumn,
        },
        user::{CreateUser, User},
    },
    store::{ProcedureStore, StoreError},
};
use thiserror::Error;
use tracing::{debug, info};
use utils::date;
use uuid::Uuid;

use super::board::Board;

pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=3;

#[derive(Debug, Error)]
pub enum ProcedureError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FilterError> for ProcedureError {
    fn from(err: FilterError) -> Self {
        Self::Validation(err.to_string())
    }
}

fn invalid(message: impl Into<String>) -> ProcedureError {
    ProcedureError::Validation(message.into())
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ProcedureError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid(message))
}

fn parse_procedure_id(id: Option<&str>) -> Result<Uuid, ProcedureError> {
    let id = required(id, "ID not found")?;
    Uuid::parse_str(id).map_err(|_| invalid("Invalid Procedure ID"))
}

fn parse_column(column: &str) -> Result<ProcedureColumn, ProcedureError> {
    column
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid column: {column}")))
}

fn check_priority(priority: i32) -> Result<i32, ProcedureError> {
    if PRIORITY_RANGE.contains(&priority) {
        Ok(priority)
    } else {
        Err(invalid("Priority must be between 1 and 3"))
    }
}

fn parse_date(value: &str, field: &str) -> Result<DateTime<Utc>, ProcedureError> {
    date::normalize(value).map_err(|e| invalid(format!("{field}: {e}")))
}

#[derive(Clone)]
pub struct ProcedureService {
    store: Arc<dyn ProcedureStore>,
}

impl ProcedureService {
    pub fn new(store: Arc<dyn ProcedureStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ProcedureStore> {
        &self.store
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ProcedureError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn create_user(&self, data: &CreateUser) -> Result<User, ProcedureError> {
        let user_name = required(Some(data.user_name.as_str()), "User name is required")?;
        let user = self.store.create_user(user_name).await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ProcedureError> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn create_category(&self, data: &CreateCategory) -> Result<Category, ProcedureError> {
        let name = required(Some(data.name.as_str()), "Category name is required")?;
        let category = self.store.create_category(name).await?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn list_procedures(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ProcedureWithRelations>, ProcedureError> {
        let filter = ProcedureFilter::from_criteria(criteria)?;
        Ok(self.store.find_procedures(&filter).await?)
    }

    pub async fn board(&self, criteria: &FilterCriteria) -> Result<Board, ProcedureError> {
        let filter = ProcedureFilter::from_criteria(criteria)?;
        let records = self.store.find_procedures(&filter).await?;
        Ok(Board::rebuild(&records, &filter))
    }

    pub async fn create_procedure(
        &self,
        data: &CreateProcedure,
    ) -> Result<Procedure, ProcedureError> {
        let title = required(Some(data.title.as_str()), "Title is required")?.to_string();
        let priority = check_priority(data.priority.ok_or_else(|| invalid("Priority is required"))?)?;

        let user_id = required(data.user_id.as_deref(), "User ID is required")?;
        let user_id = Uuid::parse_str(user_id).map_err(|_| invalid("Invalid user ID"))?;
        if self.store.find_user(user_id).await?.is_none() {
            return Err(invalid("User not found"));
        }

        let raw_categories: Vec<&str> = data
            .category_id
            .iter()
            .chain(data.category_ids.iter())
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if raw_categories.is_empty() {
            return Err(invalid("Category ID is required"));
        }
        let category_ids = self.resolve_categories(&raw_categories).await?;

        let column = match data.column.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(column) => parse_column(column)?,
            None => ProcedureColumn::default(),
        };

        let create_at = match data.create_at.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(value) => parse_date(value, "createAt")?,
            None => date::today(),
        };
        let due_date = parse_date(
            required(data.due_date.as_deref(), "Due date is required")?,
            "dueDate",
        )?;
        if due_date < create_at {
            debug!(%create_at, %due_date, "accepting procedure due before it starts");
        }

        let procedure = self
            .store
            .create_procedure(&NewProcedure {
                title,
                priority,
                user_id,
                category_ids,
                column,
                create_at,
                due_date,
            })
            .await?;
        info!(task_id = %procedure.id, column = %procedure.column, "procedure created");
        Ok(procedure)
    }

    /// Column-only update issued by drag and drop.
    pub async fn update_column(
        &self,
        data: &UpdateProcedureColumn,
    ) -> Result<Procedure, ProcedureError> {
        let id = parse_procedure_id(data.id.as_deref())?;
        let column = parse_column(required(data.column.as_deref(), "Column is required")?)?;
        let procedure = self
            .store
            .update_column(id, column)
            .await?
            .ok_or_else(not_found)?;
        info!(task_id = %id, %column, "procedure moved");
        Ok(procedure)
    }

    pub async fn patch_procedure(&self, data: &PatchProcedure) -> Result<Procedure, ProcedureError> {
        let id = parse_procedure_id(data.id.as_deref())?;

        let mut changes = ProcedureChanges {
            // A blank title means "leave it", as does any absent field.
            title: data
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            priority: data.priority.map(check_priority).transpose()?,
            ..Default::default()
        };
        if let Some(category) = &data.category {
            let raw: Vec<&str> = category.iter().map(|id| id.trim()).collect();
            changes.category_ids = Some(self.resolve_categories(&raw).await?);
        }
        if let Some(column) = data.column.as_deref().filter(|c| !c.trim().is_empty()) {
            changes.column = Some(parse_column(column)?);
        }
        if let Some(due_date) = data.due_date.as_deref().filter(|d| !d.trim().is_empty()) {
            changes.due_date = Some(
                date::normalize(due_date).map_err(|_| invalid("Invalid dueDate format"))?,
            );
        }

        let procedure = self
            .store
            .update_procedure(id, &changes)
            .await?
            .ok_or_else(not_found)?;
        info!(task_id = %id, "procedure updated");
        Ok(procedure)
    }

    async fn resolve_categories(&self, raw: &[&str]) -> Result<Vec<Uuid>, ProcedureError> {
        let mut ids = Vec::with_capacity(raw.len());
        for value in raw {
            let id = Uuid::parse_str(value).map_err(|_| invalid("Invalid category ID"))?;
            if self.store.find_category(id).await?.is_none() {
                return Err(invalid("Category not found"));
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

fn not_found() -> ProcedureError {
    ProcedureError::NotFound("Procedure not found in the database".to_string())
}

#[cfg(test)]
mod tests {
    use db::store::MemoryStore;

    use super::*;

    struct Fixture {
        service: ProcedureService,
        alice: User,
        bugs: Category,
    }

    async fn fixture() -> Fixture {
        let service = ProcedureService::new(Arc::new(MemoryStore::new()));
        let alice = service
            .create_user(&CreateUser {
                user_name: "Alice".into(),
            })
            .await
            .unwrap();
        let bugs = service
            .create_category(&CreateCategory {
                name: "Bugs".into(),
            })
            .await
            .unwrap();
        Fixture {
            service,
            alice,
            bugs,
        }
    }

    fn payload(f: &Fixture) -> CreateProcedure {
        CreateProcedure {
            title: "Fix crash".into(),
            priority: Some(2),
            user_id: Some(f.alice.id.to_string()),
            category_id: Some(f.bugs.id.to_string()),
            category_ids: vec![],
            column: Some("todo".into()),
            create_at: Some("01/01/2025".into()),
            due_date: Some("10/01/2025".into()),
        }
    }

    fn validation_message(err: ProcedureError) -> String {
        match err {
            ProcedureError::Validation(message) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn creates_a_valid_procedure() {
        let f = fixture().await;
        let created = f.service.create_procedure(&payload(&f)).await.unwrap();
        assert_eq!(created.title, "Fix crash");
        assert_eq!(created.category_ids, vec![f.bugs.id]);
        assert_eq!(created.column, "todo");
        assert_eq!(date::format_display(&created.create_at), "01/01/2025");
    }

    #[tokio::test]
    async fn rejects_invalid_payloads() {
        let f = fixture().await;
        let cases: Vec<(CreateProcedure, &str)> = vec![
            (CreateProcedure { title: "  ".into(), ..payload(&f) }, "Title is required"),
            (CreateProcedure { priority: None, ..payload(&f) }, "Priority is required"),
            (CreateProcedure { priority: Some(4), ..payload(&f) }, "Priority must be between 1 and 3"),
            (CreateProcedure { user_id: None, ..payload(&f) }, "User ID is required"),
            (CreateProcedure { user_id: Some("nope".into()), ..payload(&f) }, "Invalid user ID"),
            (CreateProcedure { user_id: Some(Uuid::new_v4().to_string()), ..payload(&f) }, "User not found"),
            (CreateProcedure { category_id: None, ..payload(&f) }, "Category ID is required"),
            (CreateProcedure { category_id: Some(Uuid::new_v4().to_string()), ..payload(&f) }, "Category not found"),
            (CreateProcedure { column: Some("archived".into()), ..payload(&f) }, "Invalid column: archived"),
            (CreateProcedure { due_date: None, ..payload(&f) }, "Due date is required"),
            (CreateProcedure { due_date: Some("99/99/2025".into()), ..payload(&f) }, "dueDate: invalid date format"),
        ];
        for (data, expected) in cases {
            let err = f.service.create_procedure(&data).await.unwrap_err();
            assert_eq!(validation_message(err), expected);
        }
    }

    #[tokio::test]
    async fn due_date_before_start_is_accepted() {
        let f = fixture().await;
        let data = CreateProcedure {
            create_at: Some("10/01/2025".into()),
            due_date: Some("01/01/2025".into()),
            ..payload(&f)
        };
        let created = f.service.create_procedure(&data).await.unwrap();
        assert!(created.due_date < created.create_at);
    }

    #[tokio::test]
    async fn missing_column_and_start_take_defaults() {
        let f = fixture().await;
        let data = CreateProcedure {
            column: None,
            create_at: None,
            ..payload(&f)
        };
        let before = date::today();
        let created = f.service.create_procedure(&data).await.unwrap();
        let after = date::today();
        assert_eq!(created.column, "todo");
        assert!(
            created.create_at == before || created.create_at == after,
            "create_at {} is neither {before} nor {after}",
            created.create_at
        );
    }

    #[tokio::test]
    async fn column_update_validates_and_reports_missing_rows() {
        let f = fixture().await;
        let created = f.service.create_procedure(&payload(&f)).await.unwrap();

        let moved = f
            .service
            .update_column(&UpdateProcedureColumn {
                id: Some(created.id.to_string()),
                column: Some("waiting".into()),
            })
            .await
            .unwrap();
        assert_eq!(moved.column, "waiting");

        let missing_id = f
            .service
            .update_column(&UpdateProcedureColumn {
                id: None,
                column: Some("done".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(validation_message(missing_id), "ID not found");

        let bad_id = f
            .service
            .update_column(&UpdateProcedureColumn {
                id: Some("123".into()),
                column: Some("done".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(validation_message(bad_id), "Invalid Procedure ID");

        let unknown = f
            .service
            .update_column(&UpdateProcedureColumn {
                id: Some(Uuid::new_v4().to_string()),
                column: Some("done".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, ProcedureError::NotFound(_)));
    }

    #[tokio::test]
    async fn patch_changes_only_supplied_fields() {
        let f = fixture().await;
        let created = f.service.create_procedure(&payload(&f)).await.unwrap();

        let patched = f
            .service
            .patch_procedure(&PatchProcedure {
                id: Some(created.id.to_string()),
                title: Some(String::new()),
                priority: Some(3),
                due_date: Some("31/12/2025".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(patched.title, "Fix crash");
        assert_eq!(patched.priority, 3);
        assert_eq!(date::format_display(&patched.due_date), "31/12/2025");
        assert_eq!(patched.column, created.column);

        let bad_date = f
            .service
            .patch_procedure(&PatchProcedure {
                id: Some(created.id.to_string()),
                due_date: Some("2025/31/12".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(validation_message(bad_date), "Invalid dueDate format");
    }

    #[tokio::test]
    async fn invalid_filters_are_validation_errors() {
        let f = fixture().await;
        let err = f
            .service
            .list_procedures(&FilterCriteria {
                start_date: Some("yesterday".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(validation_message(err), "startDate: invalid date format");
    }

    #[tokio::test]
    async fn board_groups_filtered_procedures() {
        let f = fixture().await;
        let created = f.service.create_procedure(&payload(&f)).await.unwrap();
        let board = f
            .service
            .board(&FilterCriteria {
                title: Some("crash".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(board.locate(created.id), Some((ProcedureColumn::Todo, 0)));

        let empty = f
            .service
            .board(&FilterCriteria {
                title: Some("nothing like it".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(empty, Board::empty());
    }
}

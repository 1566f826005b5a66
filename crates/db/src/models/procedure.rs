use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{category::Category, user::User};
use crate::filter::ProcedureFilter;

/// Status bucket a procedure sits in on the board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProcedureColumn {
    #[default]
    Todo,
    Doing,
    Done,
    Waiting,
}

impl ProcedureColumn {
    /// Board order, left to right.
    pub const ALL: [ProcedureColumn; 4] = [Self::Todo, Self::Doing, Self::Done, Self::Waiting];

    pub fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::Doing => 1,
            Self::Done => 2,
            Self::Waiting => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub id: Uuid,
    pub title: String,
    pub priority: i32,
    pub user_id: Uuid,
    /// Ordered; only the first one is shown and filtered on.
    #[sqlx(skip)]
    pub category_ids: Vec<Uuid>,
    /// Raw key as stored. Rows written outside the API may hold unknown keys.
    #[sqlx(rename = "board_column")]
    pub column: String,
    pub create_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl Procedure {
    pub fn board_column(&self) -> Option<ProcedureColumn> {
        self.column.parse().ok()
    }
}

/// A procedure with its user and categories resolved, as listed by `GET /procedure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ProcedureWithRelations {
    #[serde(flatten)]
    pub procedure: Procedure,
    pub user: Option<User>,
    pub category: Vec<Category>,
}

impl std::ops::Deref for ProcedureWithRelations {
    type Target = Procedure;
    fn deref(&self) -> &Self::Target {
        &self.procedure
    }
}

impl std::ops::DerefMut for ProcedureWithRelations {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.procedure
    }
}

impl ProcedureWithRelations {
    pub fn first_category(&self) -> Option<&Category> {
        let first = self.procedure.category_ids.first()?;
        self.category.iter().find(|c| &c.id == first)
    }
}

/// Body of `POST /procedure`. Everything is loosely typed so validation can
/// answer with a field-level message instead of a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProcedure {
    #[serde(default)]
    pub title: String,
    pub priority: Option<i32>,
    #[serde(alias = "user")]
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    #[serde(default, alias = "category")]
    pub category_ids: Vec<String>,
    pub column: Option<String>,
    #[serde(alias = "startDate")]
    pub create_at: Option<String>,
    #[serde(alias = "endDate")]
    pub due_date: Option<String>,
}

/// Body of `PUT /procedure`: a column-only move.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProcedureColumn {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub column: Option<String>,
}

/// Body of `PATCH /procedure`: any subset of the editable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PatchProcedure {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub category: Option<Vec<String>>,
    pub column: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i32>,
}

/// Validated input for inserting a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProcedure {
    pub title: String,
    pub priority: i32,
    pub user_id: Uuid,
    pub category_ids: Vec<Uuid>,
    pub column: ProcedureColumn,
    pub create_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Validated partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureChanges {
    pub title: Option<String>,
    pub priority: Option<i32>,
    pub category_ids: Option<Vec<Uuid>>,
    pub column: Option<ProcedureColumn>,
    pub due_date: Option<DateTime<Utc>>,
}

impl ProcedureChanges {
    pub fn column_only(column: ProcedureColumn) -> Self {
        Self {
            column: Some(column),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category_ids.is_none() && !self.has_row_changes()
    }

    /// Whether anything stored on the `procedures` row itself changes.
    fn has_row_changes(&self) -> bool {
        self.title.is_some()
            || self.priority.is_some()
            || self.column.is_some()
            || self.due_date.is_some()
    }

    /// Apply to an in-memory record.
    pub fn apply_to(&self, procedure: &mut Procedure) {
        if let Some(title) = &self.title {
            procedure.title = title.clone();
        }
        if let Some(priority) = self.priority {
            procedure.priority = priority;
        }
        if let Some(ids) = &self.category_ids {
            procedure.category_ids = ids.clone();
        }
        if let Some(column) = self.column {
            procedure.column = column.to_string();
        }
        if let Some(due_date) = self.due_date {
            procedure.due_date = due_date;
        }
    }
}

const PROCEDURE_COLUMNS: &str =
    "id, title, priority, user_id, board_column, create_at, due_date";

const SELECT_WITH_USER: &str = "SELECT p.id, p.title, p.priority, p.user_id, p.board_column, \
     p.create_at, p.due_date, u.user_name \
     FROM procedures p LEFT JOIN users u ON u.id = p.user_id";

#[derive(FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    procedure: Procedure,
    user_name: Option<String>,
}

#[derive(FromRow)]
struct CategoryLink {
    procedure_id: Uuid,
    category_id: Uuid,
    name: Option<String>,
}

impl Procedure {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let procedure = sqlx::query_as::<_, Procedure>(&format!(
            "SELECT {PROCEDURE_COLUMNS} FROM procedures WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(mut procedure) = procedure else {
            return Ok(None);
        };
        procedure.category_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT category_id FROM procedure_categories WHERE procedure_id = $1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(Some(procedure))
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &NewProcedure,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut procedure = sqlx::query_as::<_, Procedure>(&format!(
            "INSERT INTO procedures ({PROCEDURE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PROCEDURE_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.title)
        .bind(data.priority)
        .bind(data.user_id)
        .bind(data.column.to_string())
        .bind(data.create_at)
        .bind(data.due_date)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_categories(&mut tx, id, &data.category_ids).await?;
        tx.commit().await?;

        procedure.category_ids = data.category_ids.clone();
        Ok(procedure)
    }

    /// Apply `changes` and return the updated row, or `None` if `id` is unknown.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        changes: &ProcedureChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let found = if changes.has_row_changes() {
            let mut qb = QueryBuilder::<Sqlite>::new("UPDATE procedures SET ");
            let mut set = qb.separated(", ");
            if let Some(title) = &changes.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(priority) = changes.priority {
                set.push("priority = ").push_bind_unseparated(priority);
            }
            if let Some(column) = changes.column {
                set.push("board_column = ")
                    .push_bind_unseparated(column.to_string());
            }
            if let Some(due_date) = changes.due_date {
                set.push("due_date = ").push_bind_unseparated(due_date);
            }
            qb.push(" WHERE id = ").push_bind(id);
            qb.build().execute(&mut *tx).await?.rows_affected() > 0
        } else {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM procedures WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?
                > 0
        };

        if !found {
            return Ok(None);
        }
        if let Some(category_ids) = &changes.category_ids {
            Self::replace_categories(&mut tx, id, category_ids).await?;
        }
        tx.commit().await?;

        Self::find_by_id(pool, id).await
    }

    async fn replace_categories(
        conn: &mut SqliteConnection,
        procedure_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM procedure_categories WHERE procedure_id = $1")
            .bind(procedure_id)
            .execute(&mut *conn)
            .await?;
        for (position, category_id) in category_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO procedure_categories (procedure_id, category_id, position) VALUES ($1, $2, $3)",
            )
            .bind(procedure_id)
            .bind(category_id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

impl ProcedureWithRelations {
    pub async fn find_filtered(
        pool: &SqlitePool,
        filter: &ProcedureFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_USER);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY p.rowid ASC");
        let rows: Vec<JoinedRow> = qb
            .build_query_as::<JoinedRow>()
            .fetch_all(pool)
            .await?
            .into_iter()
            .filter(|row| filter.matches_title(&row.procedure.title))
            .collect();
        Self::attach_categories(pool, rows).await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_USER);
        qb.push(" WHERE p.id = ").push_bind(id);
        let rows = qb.build_query_as::<JoinedRow>().fetch_all(pool).await?;
        Ok(Self::attach_categories(pool, rows).await?.into_iter().next())
    }

    async fn attach_categories(
        pool: &SqlitePool,
        rows: Vec<JoinedRow>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT pc.procedure_id, pc.category_id, c.name \
             FROM procedure_categories pc LEFT JOIN categories c ON c.id = pc.category_id \
             WHERE pc.procedure_id IN (",
        );
        let mut ids = qb.separated(", ");
        for row in &rows {
            ids.push_bind(row.procedure.id);
        }
        ids.push_unseparated(") ORDER BY pc.procedure_id, pc.position ASC");
        let links = qb.build_query_as::<CategoryLink>().fetch_all(pool).await?;

        let mut by_procedure: HashMap<Uuid, Vec<CategoryLink>> = HashMap::new();
        for link in links {
            by_procedure.entry(link.procedure_id).or_default().push(link);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut procedure = row.procedure;
                let links = by_procedure.remove(&procedure.id).unwrap_or_default();
                procedure.category_ids = links.iter().map(|l| l.category_id).collect();
                let category = links
                    .into_iter()
                    .filter_map(|l| {
                        l.name.map(|name| Category {
                            id: l.category_id,
                            name,
                        })
                    })
                    .collect();
                let user = row.user_name.map(|user_name| User {
                    id: procedure.user_id,
                    user_name,
                });
                ProcedureWithRelations {
                    procedure,
                    user,
                    category,
                }
            })
            .collect())
    }
}

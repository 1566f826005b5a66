//! Board filter criteria and their translation into store queries.
//!
//! [`FilterCriteria`] is what arrives on the wire (every field an optional
//! string). [`ProcedureFilter`] is the validated form with one optional field
//! per dimension. It can either be pushed into an SQLite `WHERE` clause or be
//! evaluated against already fetched records; both paths select the same rows.
//! SQLite's `lower()` only folds ASCII, so the title is never matched in SQL:
//! the relational path narrows by the other criteria and then applies
//! [`ProcedureFilter::matches_title`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;
use ts_rs::TS;
use utils::date::{self, DateError};
use uuid::Uuid;

use crate::models::procedure::ProcedureWithRelations;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{field}: {source}")]
    InvalidDate {
        field: &'static str,
        #[source]
        source: DateError,
    },
    #[error("{field}: invalid identifier")]
    InvalidId { field: &'static str },
}

/// Raw filter values, as found in the `GET /procedure` and `GET /board` query
/// strings. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl FilterCriteria {
    fn fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("title", self.title.as_deref()),
            ("userId", self.user_id.as_deref()),
            ("userName", self.user_name.as_deref()),
            ("categoryId", self.category_id.as_deref()),
            ("categoryName", self.category_name.as_deref()),
            ("startDate", self.start_date.as_deref()),
            ("endDate", self.end_date.as_deref()),
        ]
    }

    /// Encode the present criteria as a URL query string so a view can be
    /// restored from the address bar.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.fields() {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    pub fn from_query_string(query: &str) -> Self {
        let mut criteria = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "title" => criteria.title = value,
                "userId" => criteria.user_id = value,
                "userName" => criteria.user_name = value,
                "categoryId" => criteria.category_id = value,
                "categoryName" => criteria.category_name = value,
                "startDate" => criteria.start_date = value,
                "endDate" => criteria.end_date = value,
                _ => {}
            }
        }
        criteria
    }
}

/// How a related user or category is identified in a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationMatch {
    Id(Uuid),
    Name(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureFilter {
    pub title: Option<String>,
    pub user: Option<RelationMatch>,
    pub category: Option<RelationMatch>,
    /// Inclusive lower bound on `create_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `due_date`.
    pub due_until: Option<DateTime<Utc>>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_relation(
    id: &Option<String>,
    name: &Option<String>,
    id_field: &'static str,
) -> Result<Option<RelationMatch>, FilterError> {
    if let Some(id) = present(id) {
        let id = Uuid::parse_str(id).map_err(|_| FilterError::InvalidId { field: id_field })?;
        return Ok(Some(RelationMatch::Id(id)));
    }
    Ok(present(name).map(|name| RelationMatch::Name(name.to_string())))
}

fn parse_date(
    value: &Option<String>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, FilterError> {
    present(value)
        .map(|v| date::normalize(v).map_err(|source| FilterError::InvalidDate { field, source }))
        .transpose()
}

impl ProcedureFilter {
    /// Validate raw criteria. An id wins over a name for the same relation.
    pub fn from_criteria(criteria: &FilterCriteria) -> Result<Self, FilterError> {
        Ok(Self {
            // The title is matched verbatim, surrounding spaces included.
            title: criteria.title.clone().filter(|t| !t.is_empty()),
            user: parse_relation(&criteria.user_id, &criteria.user_name, "userId")?,
            category: parse_relation(&criteria.category_id, &criteria.category_name, "categoryId")?,
            created_from: parse_date(&criteria.start_date, "startDate")?,
            due_until: parse_date(&criteria.end_date, "endDate")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Append every criterion except the title as a `WHERE` clause. Expects
    /// the procedure table aliased `p` and the joined users table aliased `u`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        if let Some(from) = self.created_from {
            qb.push(" AND p.create_at >= ").push_bind(from);
        }
        if let Some(until) = self.due_until {
            qb.push(" AND p.due_date <= ").push_bind(until);
        }
        match &self.user {
            Some(RelationMatch::Id(id)) => {
                qb.push(" AND p.user_id = ").push_bind(*id);
            }
            Some(RelationMatch::Name(name)) => {
                qb.push(" AND u.user_name = ").push_bind(name.clone());
            }
            None => {}
        }
        match &self.category {
            Some(RelationMatch::Id(id)) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM procedure_categories pc \
                     WHERE pc.procedure_id = p.id AND pc.position = 0 AND pc.category_id = ",
                )
                .push_bind(*id)
                .push(")");
            }
            Some(RelationMatch::Name(name)) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM procedure_categories pc \
                     JOIN categories c ON c.id = pc.category_id \
                     WHERE pc.procedure_id = p.id AND pc.position = 0 AND c.name = ",
                )
                .push_bind(name.clone())
                .push(")");
            }
            None => {}
        }
    }

    /// Unicode case-insensitive substring match on the title.
    pub fn matches_title(&self, title: &str) -> bool {
        self.title
            .as_ref()
            .is_none_or(|needle| title.to_lowercase().contains(&needle.to_lowercase()))
    }

    /// Evaluate the predicate against a fetched record.
    pub fn matches(&self, record: &ProcedureWithRelations) -> bool {
        if self.created_from.is_some_and(|from| record.create_at < from) {
            return false;
        }
        if self.due_until.is_some_and(|until| record.due_date > until) {
            return false;
        }
        let user_matches = match &self.user {
            Some(RelationMatch::Id(id)) => record.user_id == *id,
            Some(RelationMatch::Name(name)) => {
                record.user.as_ref().is_some_and(|u| &u.user_name == name)
            }
            None => true,
        };
        let category_matches = match &self.category {
            Some(RelationMatch::Id(id)) => record.category_ids.first() == Some(id),
            Some(RelationMatch::Name(name)) => {
                record.first_category().is_some_and(|c| &c.name == name)
            }
            None => true,
        };
        user_matches && category_matches && self.matches_title(&record.title)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{
        category::Category,
        procedure::{Procedure, ProcedureWithRelations},
        user::User,
    };

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        date::midnight_utc(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn record(title: &str, user: &User, category: Option<&Category>) -> ProcedureWithRelations {
        ProcedureWithRelations {
            procedure: Procedure {
                id: Uuid::new_v4(),
                title: title.to_string(),
                priority: 2,
                user_id: user.id,
                category_ids: category.map(|c| vec![c.id]).unwrap_or_default(),
                column: "todo".to_string(),
                create_at: day(2025, 1, 1),
                due_date: day(2025, 1, 10),
            },
            user: Some(user.clone()),
            category: category.cloned().into_iter().collect(),
        }
    }

    fn alice() -> User {
        User {
            id: Uuid::new_v4(),
            user_name: "Alice".into(),
        }
    }

    fn bugs() -> Category {
        Category {
            id: Uuid::new_v4(),
            name: "Bugs".into(),
        }
    }

    #[test]
    fn empty_criteria_match_everything() {
        let filter = ProcedureFilter::from_criteria(&FilterCriteria::default()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&record("anything", &alice(), None)));
    }

    #[test]
    fn blank_strings_are_absent() {
        let criteria = FilterCriteria {
            title: Some(String::new()),
            user_id: Some("  ".into()),
            start_date: Some(String::new()),
            ..Default::default()
        };
        assert!(ProcedureFilter::from_criteria(&criteria).unwrap().is_empty());
    }

    #[test]
    fn title_is_a_case_insensitive_substring() {
        let filter = ProcedureFilter {
            title: Some("CRASH".into()),
            ..Default::default()
        };
        assert!(filter.matches(&record("Fix crash on save", &alice(), None)));
        assert!(!filter.matches(&record("Write docs", &alice(), None)));
    }

    #[test]
    fn title_folds_non_ascii_case() {
        let filter = ProcedureFilter {
            title: Some("école".into()),
            ..Default::default()
        };
        assert!(filter.matches(&record("ÉCOLE inscription", &alice(), None)));
        assert!(filter.matches_title("Rentrée à l'École"));
        assert!(!filter.matches_title("ecole"));
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let rec = record("Fix crash", &alice(), None);
        let exact = ProcedureFilter {
            created_from: Some(day(2025, 1, 1)),
            due_until: Some(day(2025, 1, 10)),
            ..Default::default()
        };
        assert!(exact.matches(&rec));

        let late_start = ProcedureFilter {
            created_from: Some(day(2025, 1, 2)),
            ..Default::default()
        };
        assert!(!late_start.matches(&rec));

        let early_end = ProcedureFilter {
            due_until: Some(day(2025, 1, 9)),
            ..Default::default()
        };
        assert!(!early_end.matches(&rec));
    }

    #[test]
    fn category_matches_only_the_first_one() {
        let user = alice();
        let first = bugs();
        let second = Category {
            id: Uuid::new_v4(),
            name: "Docs".into(),
        };
        let mut rec = record("Fix crash", &user, Some(&first));
        rec.procedure.category_ids.push(second.id);
        rec.category.push(second.clone());

        let by_first = ProcedureFilter {
            category: Some(RelationMatch::Id(first.id)),
            ..Default::default()
        };
        let by_second = ProcedureFilter {
            category: Some(RelationMatch::Name(second.name.clone())),
            ..Default::default()
        };
        assert!(by_first.matches(&rec));
        assert!(!by_second.matches(&rec));
    }

    #[test]
    fn all_five_criteria_are_conjunctive() {
        let user = alice();
        let category = bugs();
        let rec = record("Fix crash", &user, Some(&category));
        let full = ProcedureFilter {
            title: Some("fix".into()),
            user: Some(RelationMatch::Id(user.id)),
            category: Some(RelationMatch::Id(category.id)),
            created_from: Some(day(2025, 1, 1)),
            due_until: Some(day(2025, 1, 31)),
        };
        assert!(full.matches(&rec));

        // Failing any single criterion excludes the record.
        let variants = [
            ProcedureFilter { title: Some("nope".into()), ..full.clone() },
            ProcedureFilter { user: Some(RelationMatch::Name("Bob".into())), ..full.clone() },
            ProcedureFilter { category: Some(RelationMatch::Id(Uuid::new_v4())), ..full.clone() },
            ProcedureFilter { created_from: Some(day(2025, 2, 1)), ..full.clone() },
            ProcedureFilter { due_until: Some(day(2024, 12, 31)), ..full.clone() },
        ];
        for variant in variants {
            assert!(!variant.matches(&rec), "{variant:?}");
        }
    }

    #[test]
    fn invalid_values_are_reported_per_field() {
        let bad_date = FilterCriteria {
            end_date: Some("32/01/2025".into()),
            ..Default::default()
        };
        let err = ProcedureFilter::from_criteria(&bad_date).unwrap_err();
        assert_eq!(err.to_string(), "endDate: invalid date format");

        let bad_id = FilterCriteria {
            user_id: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert_eq!(
            ProcedureFilter::from_criteria(&bad_id).unwrap_err(),
            FilterError::InvalidId { field: "userId" }
        );
    }

    #[test]
    fn id_wins_over_name() {
        let id = Uuid::new_v4();
        let criteria = FilterCriteria {
            user_id: Some(id.to_string()),
            user_name: Some("Alice".into()),
            ..Default::default()
        };
        let filter = ProcedureFilter::from_criteria(&criteria).unwrap();
        assert_eq!(filter.user, Some(RelationMatch::Id(id)));
    }

    #[test]
    fn push_where_binds_every_criterion_but_the_title() {
        let filter = ProcedureFilter {
            title: Some("fix".into()),
            user: Some(RelationMatch::Name("Alice".into())),
            category: Some(RelationMatch::Id(Uuid::new_v4())),
            created_from: Some(day(2025, 1, 1)),
            due_until: None,
        };
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT p.id FROM procedures p");
        filter.push_where(&mut qb);
        let sql = qb.sql();
        assert!(sql.contains("p.create_at >= ?"));
        assert!(!sql.contains("p.due_date"));
        assert!(sql.contains("u.user_name = ?"));
        assert!(sql.contains("pc.position = 0 AND pc.category_id = ?"));
        assert!(!sql.contains("p.title"));
        assert_eq!(sql.matches('?').count(), 3);
    }

    #[test]
    fn criteria_survive_the_query_string() {
        let criteria = FilterCriteria {
            title: Some("fix crash & burn".into()),
            user_name: Some("Alice".into()),
            start_date: Some("01/01/2025".into()),
            end_date: Some("10/01/2025".into()),
            ..Default::default()
        };
        let query = criteria.to_query_string();
        assert!(query.contains("startDate=01%2F01%2F2025"));
        assert_eq!(FilterCriteria::from_query_string(&query), criteria);
        assert_eq!(FilterCriteria::from_query_string(&format!("?{query}")), criteria);
    }
}

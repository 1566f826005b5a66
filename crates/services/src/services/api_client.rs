//! HTTP client for the board endpoints.

use std::time::Duration;

use async_trait::async_trait;
use db::{
    filter::FilterCriteria,
    models::{
        category::{Category, CreateCategory},
        procedure::{
            CreateProcedure, PatchProcedure, Procedure, ProcedureColumn, ProcedureWithRelations,
            UpdateProcedureColumn,
        },
        user::{CreateUser, User},
    },
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{board::Board, column_assignment::ColumnWriter};

/// What actually went wrong. Only ever logged or inspected by callers that
/// care; the user-facing text is always the generic one on [`ClientError`].
#[derive(Debug, Clone, Error)]
pub enum ClientFailure {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("response carried no data")]
    MissingData,
}

#[derive(Debug, Clone, Error)]
#[error("Something went wrong! Please try again later.")]
pub struct ClientError {
    #[source]
    pub cause: ClientFailure,
}

impl ClientError {
    fn new(cause: ClientFailure) -> Self {
        error!(error = %cause, "board request failed");
        Self { cause }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match &self.cause {
            ClientFailure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardApiClient {
    http: Client,
    base_url: String,
}

impl BoardApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("procedure-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::new(ClientFailure::Transport(e.to_string())))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_users(&self) -> Result<Vec<User>, ClientError> {
        self.fetch("/user").await
    }

    pub async fn create_user(&self, user_name: &str) -> Result<User, ClientError> {
        let body = CreateUser {
            user_name: user_name.to_string(),
        };
        self.mutate(Method::POST, "/user", &body).await
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>, ClientError> {
        self.fetch("/category").await
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, ClientError> {
        let body = CreateCategory {
            name: name.to_string(),
        };
        self.mutate(Method::POST, "/category", &body).await
    }

    pub async fn get_procedures(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ProcedureWithRelations>, ClientError> {
        self.fetch(&with_query("/procedure", criteria)).await
    }

    pub async fn get_board(&self, criteria: &FilterCriteria) -> Result<Board, ClientError> {
        self.fetch(&with_query("/board", criteria)).await
    }

    pub async fn create_procedure(&self, body: &CreateProcedure) -> Result<Procedure, ClientError> {
        self.mutate(Method::POST, "/procedure", body).await
    }

    pub async fn update_procedure_column(
        &self,
        id: Uuid,
        column: ProcedureColumn,
    ) -> Result<Procedure, ClientError> {
        let body = UpdateProcedureColumn {
            id: Some(id.to_string()),
            column: Some(column.to_string()),
        };
        self.mutate(Method::PUT, "/procedure", &body).await
    }

    pub async fn patch_procedure(&self, body: &PatchProcedure) -> Result<Procedure, ClientError> {
        self.mutate(Method::PATCH, "/procedure", body).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let res = self.send(self.request(Method::GET, path)).await?;
        res.json::<T>()
            .await
            .map_err(|e| ClientError::new(ClientFailure::Transport(e.to_string())))
    }

    async fn mutate<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.send(self.request(method, path).json(body)).await?;
        res.json::<ApiResponse<T>>()
            .await
            .map_err(|e| ClientError::new(ClientFailure::Transport(e.to_string())))?
            .into_data()
            .ok_or_else(|| ClientError::new(ClientFailure::MissingData))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let res = request
            .send()
            .await
            .map_err(|e| ClientError::new(ClientFailure::Transport(e.to_string())))?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let message = match res.json::<ApiResponse<serde_json::Value>>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
        };
        Err(ClientError::new(ClientFailure::Http {
            status: status.as_u16(),
            message,
        }))
    }
}

fn with_query(path: &str, criteria: &FilterCriteria) -> String {
    let query = criteria.to_query_string();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

#[async_trait]
impl ColumnWriter for BoardApiClient {
    async fn write_column(&self, task_id: Uuid, column: ProcedureColumn) -> anyhow::Result<()> {
        self.update_procedure_column(task_id, column).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_message_is_generic() {
        let err = ClientError {
            cause: ClientFailure::Http {
                status: 400,
                message: "Title is required".into(),
            },
        };
        assert_eq!(err.to_string(), "Something went wrong! Please try again later.");
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            std::error::Error::source(&err).map(|s| s.to_string()),
            Some("http 400: Title is required".to_string())
        );
    }

    #[test]
    fn query_is_only_appended_when_criteria_present() {
        assert_eq!(with_query("/board", &FilterCriteria::default()), "/board");
        let criteria = FilterCriteria {
            user_name: Some("Alice".into()),
            ..Default::default()
        };
        assert_eq!(with_query("/procedure", &criteria), "/procedure?userName=Alice");
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let client = BoardApiClient::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_failure() {
        let client = BoardApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.get_users().await.unwrap_err();
        assert!(matches!(err.cause, ClientFailure::Transport(_)));
        assert_eq!(err.status(), None);
    }
}

use crate::infrastructure::error::CoreError;
use crate::infrastructure::record_store::{Filter, FilterOp, OrderBy, RecordStore};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Connection settings for a Supabase/PostgREST table endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project base, e.g. `https://project.supabase.co`.
    pub base_url: String,
    pub api_key: String,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Production [`RecordStore`]: every operation is one HTTP round trip against
/// the remote table API. Constructed at sign-in with the session's bearer
/// token and dropped at sign-out.
#[derive(Debug, Clone)]
pub struct PostgrestRecordStore {
    client: Client,
    config: PostgrestConfig,
    access_token: Option<String>,
}

impl PostgrestRecordStore {
    pub fn new(config: PostgrestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), CoreError> {
        if value.trim().is_empty() {
            return Err(CoreError::Validation(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn store_http_error(table: &str, status: reqwest::StatusCode, body: &str) -> CoreError {
        let message = if body.trim().is_empty() {
            format!("table api error on {table}: http {}", status.as_u16())
        } else {
            format!(
                "table api error on {table}: http {}; body={body}",
                status.as_u16()
            )
        };
        CoreError::Transient(message)
    }

    fn table_endpoint(&self, table: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|error| CoreError::Validation(format!("invalid store base url: {error}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CoreError::Validation("store base URL cannot be a base".to_string()))?;
            segments.push("rest");
            segments.push("v1");
            segments.push(table);
        }
        Ok(url)
    }

    fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.config.api_key)
    }

    fn apply_filters(url: &mut Url, filters: &[Filter]) {
        let mut pairs = url.query_pairs_mut();
        for filter in filters {
            pairs.append_pair(&filter.column, &render_filter(filter));
        }
    }

    async fn read_body(
        table: &str,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<(reqwest::StatusCode, String), CoreError> {
        let status = response.status();
        let body = response.text().await.map_err(|error| {
            CoreError::Transient(format!(
                "failed reading {operation} response from {table}: {error}"
            ))
        })?;
        Ok((status, body))
    }
}

fn render_filter(filter: &Filter) -> String {
    let op = match filter.op {
        FilterOp::Eq => "eq",
        FilterOp::Gte => "gte",
    };
    format!("{op}.{}", render_value(&filter.value))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn render_order(order: &OrderBy) -> String {
    let direction = if order.ascending { "asc" } else { "desc" };
    format!("{}.{direction}", order.column)
}

#[async_trait]
impl RecordStore for PostgrestRecordStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Value>, CoreError> {
        Self::ensure_non_empty(table, "table")?;

        let mut url = self.table_endpoint(table)?;
        Self::apply_filters(&mut url, filters);
        if let Some(order) = order {
            url.query_pairs_mut()
                .append_pair("order", &render_order(order));
        }

        let response = self
            .client
            .get(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer_token())
            .send()
            .await
            .map_err(|error| {
                CoreError::Transient(format!("network error while selecting from {table}: {error}"))
            })?;

        let (status, body) = Self::read_body(table, "select", response).await?;
        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, CoreError> {
        Self::ensure_non_empty(table, "table")?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.table_endpoint(table)?)
            .header("apikey", &self.config.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer_token())
            .json(&rows)
            .send()
            .await
            .map_err(|error| {
                CoreError::Transient(format!("network error while inserting into {table}: {error}"))
            })?;

        let (status, body) = Self::read_body(table, "insert", response).await?;
        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<(), CoreError> {
        Self::ensure_non_empty(table, "table")?;
        if filters.is_empty() {
            return Err(CoreError::Validation(format!(
                "update on {table} requires at least one filter"
            )));
        }

        let mut url = self.table_endpoint(table)?;
        Self::apply_filters(&mut url, filters);

        let response = self
            .client
            .patch(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer_token())
            .json(&patch)
            .send()
            .await
            .map_err(|error| {
                CoreError::Transient(format!("network error while updating {table}: {error}"))
            })?;

        let (status, body) = Self::read_body(table, "update", response).await?;
        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        row: Value,
        conflict_key: &[&str],
    ) -> Result<(), CoreError> {
        Self::ensure_non_empty(table, "table")?;
        if conflict_key.is_empty() {
            return Err(CoreError::Validation(format!(
                "upsert into {table} requires a conflict key"
            )));
        }

        let mut url = self.table_endpoint(table)?;
        url.query_pairs_mut()
            .append_pair("on_conflict", &conflict_key.join(","));

        let response = self
            .client
            .post(url)
            .header("apikey", &self.config.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .bearer_auth(self.bearer_token())
            .json(&[row])
            .send()
            .await
            .map_err(|error| {
                CoreError::Transient(format!("network error while upserting into {table}: {error}"))
            })?;

        let (status, body) = Self::read_body(table, "upsert", response).await?;
        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), CoreError> {
        Self::ensure_non_empty(table, "table")?;
        if filters.is_empty() {
            return Err(CoreError::Validation(format!(
                "delete on {table} requires at least one filter"
            )));
        }

        let mut url = self.table_endpoint(table)?;
        Self::apply_filters(&mut url, filters);

        let response = self
            .client
            .delete(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer_token())
            .send()
            .await
            .map_err(|error| {
                CoreError::Transient(format!("network error while deleting from {table}: {error}"))
            })?;

        let (status, body) = Self::read_body(table, "delete", response).await?;
        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(())
    }
}

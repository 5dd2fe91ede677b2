//! `PostgREST` client for the `cart_items` table.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use mauve_core::{CartId, CartItemId, Quantity};

use super::SupabaseError;
use crate::config::SupabaseConfig;
use crate::db::{CartItemRow, CartItemTable, NewCartItem, RepositoryError};

const TABLE_PATH: &str = "rest/v1/cart_items";

/// Error body returned by `PostgREST`.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

/// Cart item table backed by a Supabase project.
#[derive(Clone)]
pub struct SupabaseCartTable {
    inner: Arc<SupabaseCartTableInner>,
}

struct SupabaseCartTableInner {
    client: reqwest::Client,
    endpoint: Url,
    anon_key: SecretString,
}

impl SupabaseCartTable {
    /// Create a client for the project in `config`.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::InvalidUrl` if the project URL cannot be joined
    /// with the table path.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let endpoint = base.join(TABLE_PATH)?;

        Ok(Self {
            inner: Arc::new(SupabaseCartTableInner {
                client: reqwest::Client::new(),
                endpoint,
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    /// The fully qualified table endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    fn url_with(&self, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.inner.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let key = self.inner.anon_key.expose_secret();
        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .header(CONTENT_TYPE, "application/json")
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, SupabaseError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SupabaseError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Supabase returned non-success status"
            );
            let (code, message) = match serde_json::from_str::<PostgrestError>(&body) {
                Ok(err) => (err.code, err.message.unwrap_or_default()),
                Err(_) => (None, body.chars().take(200).collect()),
            };
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SupabaseError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Supabase response"
            );
            SupabaseError::Parse(e)
        })
    }
}

fn into_repository_error(err: SupabaseError) -> RepositoryError {
    if err.is_conflict() {
        RepositoryError::Conflict(err.to_string())
    } else {
        RepositoryError::Supabase(err)
    }
}

#[async_trait]
impl CartItemTable for SupabaseCartTable {
    #[instrument(skip(self))]
    async fn fetch_by_cart(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, RepositoryError> {
        let filter = format!("eq.{cart_id}");
        let url = self.url_with(&[("select", "*"), ("cart_id", filter.as_str())]);

        let rows: Vec<CartItemRow> = self
            .send_json(self.request(reqwest::Method::GET, url))
            .await
            .map_err(into_repository_error)?;

        debug!(count = rows.len(), "fetched cart rows");
        Ok(rows)
    }

    #[instrument(skip(self, item), fields(cart_id = %item.cart_id, name = %item.name))]
    async fn insert(&self, item: &NewCartItem) -> Result<CartItemRow, RepositoryError> {
        let url = self.url_with(&[("select", "*")]);
        let request = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[item]);

        let mut rows: Vec<CartItemRow> = self
            .send_json(request)
            .await
            .map_err(into_repository_error)?;

        match (rows.pop(), rows.is_empty()) {
            (Some(row), true) => Ok(row),
            (None, _) => Err(RepositoryError::DataCorruption(
                "insert returned no row".to_string(),
            )),
            (Some(_), false) => Err(RepositoryError::DataCorruption(
                "insert returned more than one row".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn update_quantity(
        &self,
        id: &CartItemId,
        qty: Quantity,
    ) -> Result<(), RepositoryError> {
        let filter = format!("eq.{id}");
        let url = self.url_with(&[("id", filter.as_str()), ("select", "id")]);
        let request = self
            .request(reqwest::Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "qty": qty }));

        let updated: Vec<serde_json::Value> = self
            .send_json(request)
            .await
            .map_err(into_repository_error)?;

        if updated.is_empty() {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn delete_by_ids(&self, ids: &[CartItemId]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }

        let list = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let filter = format!("in.({list})");
        let url = self.url_with(&[("id", filter.as_str())]);

        self.send(self.request(reqwest::Method::DELETE, url))
            .await
            .map_err(into_repository_error)?;
        Ok(())
    }
}

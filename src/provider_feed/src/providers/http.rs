//! HTTP implementation of [`StockProvider`] for the generic provider stock API.
//!
//! `GET {api_url}/{siret}?limit=N[&after=REF][&modifiedSince=RFC3339]` with an
//! `Authorization: Basic <token>` header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::{
    errors::FeedError,
    models::{StockPage, StockPageRequest},
    providers::StockProvider,
};

/// Client for one provider's stock API.
pub struct ProviderApi {
    client: Client,
    api_url: String,
}

impl ProviderApi {
    /// Creates a client for the API rooted at `api_url`. The token only lives
    /// on in the client's sensitive `Authorization` header.
    pub fn new(api_url: &str, auth_token: SecretString) -> Result<Self, FeedError> {
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if api_url.is_empty() {
            return Err(FeedError::Config("empty api_url".into()));
        }

        let mut auth = header::HeaderValue::from_str(&format!(
            "Basic {}",
            auth_token.expose_secret()
        ))
        .map_err(|e| FeedError::Config(format!("invalid auth token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, api_url })
    }

    /// URL of the stock listing for a venue.
    pub fn stocks_url(&self, siret: &str) -> String {
        format!("{}/{}", self.api_url, siret)
    }
}

#[async_trait]
impl StockProvider for ProviderApi {
    async fn fetch_stocks(&self, request: &StockPageRequest) -> Result<StockPage, FeedError> {
        let url = self.stocks_url(&request.siret);
        debug!(%url, after = ?request.after, "fetching provider stock page");

        let response = self
            .client
            .get(&url)
            .query(&request.query_pairs())
            .send()
            .await?;

        match response.status() {
            // Some providers answer 404 for a venue they have nothing for.
            StatusCode::NOT_FOUND => Ok(StockPage {
                total: Some(0),
                limit: Some(u64::from(request.limit)),
                offset: None,
                stocks: vec![],
            }),
            status if status.is_success() => Ok(response.json::<StockPage>().await?),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown API error".to_string());
                Err(FeedError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

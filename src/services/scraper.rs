use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::models::profile::Profile;

/// A logged-in session able to turn a profile URL into a [`Profile`].
#[async_trait]
pub trait Scraper: Send {
    async fn login(&mut self) -> Result<(), ScrapeError>;

    async fn get_profile(&mut self, url: &str) -> Result<Profile, ScrapeError>;

    /// Release the session. Safe to call after a failed login.
    async fn close(&mut self);
}

/// Builds one scraper per crawl job.
pub trait ScraperFactory: Send + Sync {
    fn create(&self) -> Box<dyn Scraper>;
}

/// Client for the browser-automation sidecar.
pub struct HttpScraper {
    http: Client,
    base_url: String,
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ProfileRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Serialize)]
struct CloseRequest<'a> {
    session_id: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    session_id: Option<String>,
}

impl HttpScraper {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: None,
        }
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn login(&mut self) -> Result<(), ScrapeError> {
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .send()
            .await
            .map_err(ScrapeError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Auth(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await.map_err(ScrapeError::Http)?;
        let login: LoginResponse = if body.trim().is_empty() {
            LoginResponse { session_id: None }
        } else {
            serde_json::from_str(&body).map_err(ScrapeError::Parse)?
        };
        self.session_id = login.session_id;
        Ok(())
    }

    async fn get_profile(&mut self, url: &str) -> Result<Profile, ScrapeError> {
        let response = self
            .http
            .post(format!("{}/profile", self.base_url))
            .json(&ProfileRequest {
                url,
                session_id: self.session_id.as_deref(),
            })
            .send()
            .await
            .map_err(ScrapeError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ScrapeError::NotFound(url.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ScrapeError::Auth("session rejected".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await.map_err(ScrapeError::Http)?;
        serde_json::from_str(&body).map_err(ScrapeError::Parse)
    }

    async fn close(&mut self) {
        let Some(session_id) = self.session_id.take() else {
            return;
        };
        let result = self
            .http
            .post(format!("{}/close", self.base_url))
            .json(&CloseRequest {
                session_id: &session_id,
            })
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to close scraper session");
        }
    }
}

/// Creates [`HttpScraper`]s sharing one connection pool.
pub struct HttpScraperFactory {
    http: Client,
    base_url: String,
}

impl HttpScraperFactory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ScrapeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScrapeError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }
}

impl ScraperFactory for HttpScraperFactory {
    fn create(&self) -> Box<dyn Scraper> {
        Box::new(HttpScraper::new(self.http.clone(), &self.base_url))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Scraper login failed: {0}")]
    Auth(String),

    #[error("Scraper request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scraper returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to parse scraped profile: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Profile not found: {0}")]
    NotFound(String),
}

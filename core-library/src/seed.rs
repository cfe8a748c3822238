//! Catalog seeding from an HTTP endpoint.
//!
//! The endpoint serves a JSON array of songs. Seeding never fails the caller:
//! any problem is logged and reported as [`SeedReport::Skipped`], leaving the
//! catalog as it was.

use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::CatalogService;
use crate::models::Song;

/// Outcome of one seeding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedReport {
    Imported { count: usize },
    Skipped { reason: String },
}

impl SeedReport {
    pub fn imported(&self) -> usize {
        match self {
            Self::Imported { count } => *count,
            Self::Skipped { .. } => 0,
        }
    }
}

pub struct CatalogSeeder {
    http: Arc<dyn HttpClient>,
    catalog: CatalogService,
    policy: RetryPolicy,
}

impl CatalogSeeder {
    pub fn new(http: Arc<dyn HttpClient>, catalog: CatalogService) -> Self {
        Self {
            http,
            catalog,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch the song list at `url` and upsert it into the catalog.
    pub async fn seed(&self, url: &str) -> SeedReport {
        let request = HttpRequest::get(url).header("Accept", "application/json");

        let response = match self
            .http
            .execute_with_retry(request, self.policy.clone())
            .await
        {
            Ok(response) => response,
            Err(e) => return skipped(url, format!("request failed: {}", e)),
        };

        if !response.is_success() {
            return skipped(url, format!("unexpected status {}", response.status));
        }

        let songs: Vec<Song> = match response.json() {
            Ok(songs) => songs,
            Err(e) => return skipped(url, format!("malformed catalog: {}", e)),
        };

        match self.catalog.import_songs(songs).await {
            Ok(count) => {
                info!(url = %url, count, "Seeded catalog");
                SeedReport::Imported { count }
            }
            Err(e) => skipped(url, format!("import failed: {}", e)),
        }
    }
}

fn skipped(url: &str, reason: String) -> SeedReport {
    warn!(url = %url, reason = %reason, "Catalog seeding skipped");
    SeedReport::Skipped { reason }
}

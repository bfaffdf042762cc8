//! Application configuration and environment variable parsing.
//!
//! Settings come from the environment (optionally seeded from a `.env` file by
//! the binary). They select the tracked repository, the credential, and the
//! time and page limits applied to collection runs.

use serde::{de, Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "grpc").
    pub owner: String,
    /// The name of the repository (e.g., "grpc").
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// GitHub access token. Without it every request goes out unauthenticated.
    pub github_token: Option<String>,

    /// Repository whose tracker is analysed, as "owner/repo".
    #[serde(
        default = "default_repository",
        deserialize_with = "deserialize_repository"
    )]
    pub github_repository: RepoId,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_api_url")]
    pub github_api_url: String,

    /// Upper bound on a single network call, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Upper bound on one collection run or detail batch, in seconds.
    #[serde(default = "default_collection_timeout_seconds")]
    pub collection_timeout_seconds: u64,

    /// Hard limit on the number of listing pages fetched per collection run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum number of decoded listing pages memoised in-process.
    #[serde(default = "default_page_cache_capacity")]
    pub page_cache_capacity: u64,
}

fn default_repository() -> RepoId {
    RepoId {
        owner: "grpc".to_string(),
        repo: "grpc".to_string(),
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_collection_timeout_seconds() -> u64 {
    900
}

fn default_max_pages() -> u32 {
    1000
}

fn default_page_cache_capacity() -> u64 {
    2000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            github_repository: default_repository(),
            github_api_url: default_api_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            collection_timeout_seconds: default_collection_timeout_seconds(),
            max_pages: default_max_pages(),
            page_cache_capacity: default_page_cache_capacity(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_seconds)
    }

    pub fn collection_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.collection_timeout_seconds)
    }
}

fn deserialize_repository<'de, D>(deserializer: D) -> Result<RepoId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_repository(&s)
        .ok_or_else(|| de::Error::custom(format!("expected \"owner/repo\", got \"{s}\"")))
}

fn parse_repository(s: &str) -> Option<RepoId> {
    let (owner, repo) = s.trim().split_once('/')?;
    let (owner, repo) = (owner.trim(), repo.trim());

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some(RepoId {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

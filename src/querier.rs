//! Service layer for computing tracker health reports.
//!
//! `MetricsQuerier` is the entry point the command surface calls. For one
//! invocation it:
//! 1. Runs paginated collection over the issue listing (issues, pull requests, or both).
//! 2. Fetches pull request details for the collected pull requests.
//! 3. Computes the requested report from the materialised data.
//!
//! Each collection run and detail batch is bounded by the configured timeout.

use crate::collector::{fetch_details, DetailBatch, Discriminator, PaginatedCollector};
use crate::config::AppConfig;
use crate::dates::{normalize, DateRange};
use crate::error::{Error, Result};
use crate::github::{GitHubClient, IssueSource};
use crate::metrics::{GeneralReport, MaintainabilityReport};
use crate::types::{Issue, ProjectLang};
use std::future::Future;
use std::time::Duration;

pub struct MetricsQuerier<S = GitHubClient> {
    source: S,
    collection_timeout: Duration,
    max_pages: u32,
}

impl MetricsQuerier<GitHubClient> {
    /// Builds a querier backed by the GitHub API.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_source(
            GitHubClient::new(config)?,
            config.collection_timeout(),
            config.max_pages,
        ))
    }
}

impl<S: IssueSource> MetricsQuerier<S> {
    pub fn with_source(source: S, collection_timeout: Duration, max_pages: u32) -> Self {
        Self {
            source,
            collection_timeout,
            max_pages,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Issue counts for the range plus created/merged pull request counts.
    pub async fn general(&self, lang: ProjectLang, range: DateRange) -> Result<GeneralReport> {
        tracing::info!(%lang, %range, "Analyzing general stats");

        let issues = self.collect(lang, &Discriminator::issues()).await?;

        let created_in_range =
            Discriminator::pull_requests().with_filter(move |item| {
                Ok(range.contains(normalize(&item.created_at)?))
            });
        let pull_requests = self.collect(lang, &created_in_range).await?;
        let details = self.fetch_details(&pull_requests).await?;

        GeneralReport::calculate(lang, range, &issues, &details)
    }

    /// Median resolution time and close ratio for the range.
    pub async fn maintainability(
        &self,
        lang: ProjectLang,
        range: DateRange,
    ) -> Result<MaintainabilityReport> {
        tracing::info!(%lang, %range, "Analyzing maintainability stats");

        let issues = self.collect(lang, &Discriminator::issues()).await?;

        MaintainabilityReport::calculate(lang, range, &issues)
    }

    async fn collect(&self, lang: ProjectLang, discriminator: &Discriminator) -> Result<Vec<Issue>> {
        let collector = PaginatedCollector::new(&self.source, lang, self.max_pages);
        let run = collector.collect_with_progress(discriminator, |progress| {
            tracing::info!(
                "Fetched page {}/{} ({} kept, {} total)",
                progress.page,
                progress.total_pages,
                progress.kept,
                progress.accumulated
            );
        });

        self.bounded("issue collection", run).await
    }

    async fn fetch_details(&self, pull_requests: &[Issue]) -> Result<DetailBatch> {
        let numbers: Vec<u64> = pull_requests.iter().map(|pr| pr.number).collect();
        let batch = self
            .bounded("pull request details", async {
                Ok::<_, Error>(fetch_details(&self.source, &numbers).await)
            })
            .await?;

        if !batch.is_complete() {
            tracing::warn!(
                "{} of {} pull request details could not be fetched",
                batch.failed.len(),
                numbers.len()
            );
        }

        Ok(batch)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        run: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.collection_timeout, run)
            .await
            .map_err(|_| Error::timeout(operation, self.collection_timeout))?
    }
}

//! Link-header driven pagination over the issue listing, plus the sequential
//! pull request detail fetch that follows it.

use crate::error::{Error, Result};
use crate::github::{IssuePage, IssueSource, PageLinks};
use crate::types::{Issue, ProjectLang, PullRequestDetail};
use futures::stream::{self, StreamExt};

type ItemFilter = Box<dyn Fn(&Issue) -> Result<bool> + Send + Sync>;

/// Selects either plain issues or pull requests out of a listing page,
/// optionally narrowed by an extra predicate.
pub struct Discriminator {
    want_pull_requests: bool,
    filter: Option<ItemFilter>,
}

impl Discriminator {
    pub fn issues() -> Self {
        Self {
            want_pull_requests: false,
            filter: None,
        }
    }

    pub fn pull_requests() -> Self {
        Self {
            want_pull_requests: true,
            filter: None,
        }
    }

    /// ANDs `filter` onto the issue/pull request classification.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Issue) -> Result<bool> + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn wants_pull_requests(&self) -> bool {
        self.want_pull_requests
    }

    pub fn discriminate(&self, items: Vec<Issue>) -> Result<Vec<Issue>> {
        let mut kept = Vec::with_capacity(items.len());

        for item in items {
            if item.is_pull_request() != self.want_pull_requests {
                continue;
            }
            if let Some(filter) = &self.filter {
                if !filter(&item)? {
                    continue;
                }
            }
            tracing::trace!("Keeping {}", item);
            kept.push(item);
        }

        Ok(kept)
    }
}

/// Pagination position of a single collection run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub next_page: u32,
    pub total_pages: u32,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            next_page: 1,
            total_pages: 1,
        }
    }
}

impl Cursor {
    pub fn is_exhausted(&self) -> bool {
        self.next_page > self.total_pages
    }

    /// Moves the cursor past `fetched` using the page's link relations.
    ///
    /// `total_pages` never decreases. A page that has a `next` relation must
    /// also carry `last`, and `next` must land in `(fetched, total_pages]`.
    pub fn advance(&mut self, fetched: u32, links: PageLinks) -> Result<()> {
        if let Some(last) = links.last {
            self.total_pages = self.total_pages.max(last);
        }

        match links.next {
            Some(next) => {
                if links.last.is_none() {
                    return Err(Error::PaginationMetadataMissing { page: fetched });
                }
                if next <= fetched || next > self.total_pages {
                    return Err(Error::PaginationInconsistent {
                        page: fetched,
                        next,
                        last: self.total_pages,
                    });
                }
                self.next_page = next;
            }
            None => self.next_page = self.total_pages + 1,
        }

        Ok(())
    }
}

/// Progress reported after each page of a collection run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub total_pages: u32,
    pub kept: usize,
    pub accumulated: usize,
}

/// Walks the issue listing for one language until the cursor is exhausted.
pub struct PaginatedCollector<'a, S> {
    source: &'a S,
    lang: ProjectLang,
    max_pages: u32,
}

impl<'a, S: IssueSource> PaginatedCollector<'a, S> {
    pub fn new(source: &'a S, lang: ProjectLang, max_pages: u32) -> Self {
        Self {
            source,
            lang,
            max_pages,
        }
    }

    pub async fn collect(&self, discriminator: &Discriminator) -> Result<Vec<Issue>> {
        self.collect_with_progress(discriminator, |_| {}).await
    }

    /// Fetches pages strictly in order, filtering each before accumulating.
    pub async fn collect_with_progress<F>(
        &self,
        discriminator: &Discriminator,
        mut on_page: F,
    ) -> Result<Vec<Issue>>
    where
        F: FnMut(&PageProgress),
    {
        let mut cursor = Cursor::default();
        let mut accumulated = Vec::new();
        let mut fetched_pages = 0;

        while !cursor.is_exhausted() {
            if fetched_pages >= self.max_pages {
                return Err(Error::PageLimitExceeded {
                    limit: self.max_pages,
                });
            }

            let page = cursor.next_page;
            tracing::debug!(lang = %self.lang, page, total = cursor.total_pages, "Fetching issue page");

            let IssuePage { items, link } = self.source.fetch_page(self.lang, page).await?;
            fetched_pages += 1;

            let links = link.as_deref().map(PageLinks::parse).unwrap_or_default();
            cursor.advance(page, links)?;

            let kept = discriminator.discriminate(items)?;
            let kept_count = kept.len();
            accumulated.extend(kept);

            on_page(&PageProgress {
                page,
                total_pages: cursor.total_pages,
                kept: kept_count,
                accumulated: accumulated.len(),
            });
        }

        tracing::info!(
            lang = %self.lang,
            pages = fetched_pages,
            pull_requests = discriminator.wants_pull_requests(),
            "Collected {} items",
            accumulated.len()
        );

        Ok(accumulated)
    }
}

/// A detail lookup that failed and was left out of the batch.
#[derive(Debug)]
pub struct DetailFailure {
    pub number: u64,
    pub error: Error,
}

/// Outcome of fetching pull request details for a set of identifiers.
#[derive(Debug, Default)]
pub struct DetailBatch {
    pub details: Vec<PullRequestDetail>,
    pub failed: Vec<DetailFailure>,
}

impl DetailBatch {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetches one pull request at a time; the next request starts only after the
/// previous one has been recorded. Failures are logged and kept in
/// [`DetailBatch::failed`] instead of aborting the batch.
pub async fn fetch_details<S: IssueSource>(source: &S, numbers: &[u64]) -> DetailBatch {
    let total = numbers.len();
    tracing::info!("Fetching {} pull request details", total);

    let batch = stream::iter(numbers.iter().copied().enumerate())
        .then(|(index, number)| async move {
            tracing::debug!(number, "Fetching pull request {}/{}", index + 1, total);
            (number, source.fetch_pull_request(number).await)
        })
        .fold(DetailBatch::default(), |mut batch, (number, result)| async move {
            match result {
                Ok(detail) => {
                    tracing::debug!("Fetched {}", detail);
                    batch.details.push(detail);
                }
                Err(error) => {
                    tracing::warn!(number, "Dropping pull request: {}", error);
                    batch.failed.push(DetailFailure { number, error });
                }
            }
            batch
        })
        .await;

    tracing::info!(
        fetched = batch.details.len(),
        failed = batch.failed.len(),
        "Finished fetching pull request details"
    );

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueState;

    fn item(number: u64, pull_request: Option<serde_json::Value>) -> Issue {
        Issue {
            number,
            title: format!("item {number}"),
            state: IssueState::Open,
            user: None,
            assignee: None,
            comments: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            closed_at: None,
            updated_at: None,
            pull_request,
        }
    }

    fn numbers(items: &[Issue]) -> Vec<u64> {
        items.iter().map(|i| i.number).collect()
    }

    #[test]
    fn test_discriminate_by_marker_presence() {
        let page = vec![
            item(1, None),
            item(2, Some(serde_json::json!({}))),
            item(3, Some(serde_json::json!({"url": "https://x/pulls/3"}))),
            item(4, None),
        ];

        let issues = Discriminator::issues().discriminate(page.clone()).unwrap();
        let prs = Discriminator::pull_requests().discriminate(page).unwrap();

        assert_eq!(numbers(&issues), vec![1, 4]);
        assert_eq!(numbers(&prs), vec![2, 3]);
    }

    #[test]
    fn test_discriminate_ands_extra_filter() {
        let page = vec![
            item(1, Some(serde_json::json!({}))),
            item(2, Some(serde_json::json!({}))),
            item(3, None),
        ];

        let odd = Discriminator::pull_requests().with_filter(|i| Ok(i.number % 2 == 1));

        assert_eq!(numbers(&odd.discriminate(page).unwrap()), vec![1]);
    }

    #[test]
    fn test_discriminate_propagates_filter_error() {
        let failing = Discriminator::issues().with_filter(|_| {
            Err(Error::MalformedTimestamp {
                value: "nope".to_string(),
            })
        });

        let result = failing.discriminate(vec![item(1, None)]);
        assert!(matches!(result, Err(Error::MalformedTimestamp { .. })));
    }

    #[test]
    fn test_cursor_follows_next_and_last() {
        let mut cursor = Cursor::default();

        cursor
            .advance(
                1,
                PageLinks {
                    next: Some(2),
                    last: Some(3),
                },
            )
            .unwrap();
        assert_eq!(
            cursor,
            Cursor {
                next_page: 2,
                total_pages: 3
            }
        );

        cursor.advance(3, PageLinks::default()).unwrap();
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next_page, 4);
    }

    #[test]
    fn test_cursor_single_page() {
        let mut cursor = Cursor::default();
        cursor.advance(1, PageLinks::default()).unwrap();

        assert!(cursor.is_exhausted());
        assert_eq!(cursor.total_pages, 1);
    }

    #[test]
    fn test_cursor_total_never_decreases() {
        let mut cursor = Cursor {
            next_page: 2,
            total_pages: 5,
        };

        cursor
            .advance(
                2,
                PageLinks {
                    next: Some(3),
                    last: Some(4),
                },
            )
            .unwrap();

        assert_eq!(cursor.total_pages, 5);
        assert_eq!(cursor.next_page, 3);
    }

    #[test]
    fn test_cursor_requires_last_with_next() {
        let mut cursor = Cursor::default();
        let result = cursor.advance(
            1,
            PageLinks {
                next: Some(2),
                last: None,
            },
        );

        assert!(matches!(
            result,
            Err(Error::PaginationMetadataMissing { page: 1 })
        ));
    }

    #[test]
    fn test_cursor_rejects_non_advancing_next() {
        let mut cursor = Cursor {
            next_page: 3,
            total_pages: 5,
        };
        let result = cursor.advance(
            3,
            PageLinks {
                next: Some(3),
                last: Some(5),
            },
        );

        assert!(matches!(
            result,
            Err(Error::PaginationInconsistent {
                page: 3,
                next: 3,
                last: 5
            })
        ));
    }
}

//! Access to the repository issue listing and pull request endpoints.

use crate::config::{AppConfig, RepoId};
use crate::error::{Error, Result};
use crate::types::{Issue, ProjectLang, PullRequestDetail};
use moka::future::Cache;
use octocrab::Octocrab;
use std::future::Future;
use std::time::Duration;

/// Fixed page size for listing requests.
pub const PER_PAGE: u32 = 100;

/// One decoded listing page and the raw `Link` header that came with it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssuePage {
    pub items: Vec<Issue>,
    pub link: Option<String>,
}

/// The two fetch capabilities the collector needs from the tracker.
pub trait IssueSource {
    fn fetch_page(&self, lang: ProjectLang, page: u32) -> impl Future<Output = Result<IssuePage>> + Send;

    fn fetch_pull_request(&self, number: u64) -> impl Future<Output = Result<PullRequestDetail>> + Send;
}

/// Page numbers carried by the `next` and `last` relations of a `Link` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<u32>,
    pub last: Option<u32>,
}

impl PageLinks {
    /// Parses `<url>; rel="next", <url>; rel="last"` style metadata.
    ///
    /// Entries whose url has no integer `page` parameter are ignored.
    pub fn parse(header: &str) -> Self {
        let mut links = PageLinks::default();

        for entry in header.split(',') {
            let mut segments = entry.split(';').map(str::trim);
            let Some(url) = segments.next() else {
                continue;
            };
            let page = page_param(url.trim_start_matches('<').trim_end_matches('>'));

            for segment in segments {
                match segment {
                    r#"rel="next""# => links.next = page.or(links.next),
                    r#"rel="last""# => links.last = page.or(links.last),
                    _ => {}
                }
            }
        }

        links
    }
}

fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

struct RawResponse {
    status: u16,
    link: Option<String>,
    body: String,
}

/// Tracker client backed by octocrab.
///
/// Decoded pages are memoised for the lifetime of the client so that issue and
/// pull request collection runs in one invocation share the same listing.
#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    api_url: String,
    repository: RepoId,
    request_timeout: Duration,
    pages: Cache<(ProjectLang, u32), IssuePage>,
}

impl GitHubClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = &config.github_token {
            builder = builder.personal_token(token.clone());
        } else {
            tracing::warn!("GITHUB_TOKEN is not set; requests will be unauthenticated");
        }

        let pages = Cache::builder()
            .max_capacity(config.page_cache_capacity)
            .build();

        Ok(Self {
            octocrab: builder.build()?,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            repository: config.github_repository.clone(),
            request_timeout: config.request_timeout(),
            pages,
        })
    }

    fn listing_url(&self, lang: ProjectLang, page: u32) -> String {
        format!(
            "{}/repos/{}/{}/issues?filter=all&state=all&per_page={PER_PAGE}&page={page}&labels={}",
            self.api_url,
            self.repository.owner,
            self.repository.repo,
            lang.label()
        )
    }

    fn pull_request_url(&self, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{number}",
            self.api_url, self.repository.owner, self.repository.repo
        )
    }

    async fn get(
        &self,
        url: &str,
        operation: &str,
        on_error: impl FnOnce(octocrab::Error) -> Error,
    ) -> Result<RawResponse> {
        let request = async {
            let response = self.octocrab._get(url).await?;
            let status = response.status().as_u16();
            let link = response
                .headers()
                .get("link")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = self.octocrab.body_to_string(response).await?;

            Ok::<_, octocrab::Error>(RawResponse { status, link, body })
        };

        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| Error::timeout(operation, self.request_timeout))?
            .map_err(on_error)
    }
}

impl IssueSource for GitHubClient {
    async fn fetch_page(&self, lang: ProjectLang, page: u32) -> Result<IssuePage> {
        if let Some(cached) = self.pages.get(&(lang, page)).await {
            tracing::debug!(%lang, page, "Using memoised issue page");
            return Ok(cached);
        }

        let url = self.listing_url(lang, page);
        let response = self
            .get(&url, &format!("issue page {page}"), |e| Error::PageFetch {
                page,
                reason: e.to_string(),
            })
            .await?;

        if !(200..300).contains(&response.status) {
            tracing::warn!(page, status = response.status, "Issue page request failed");
            return Err(Error::PageFetch {
                page,
                reason: format!("HTTP {}: {}", response.status, response.body),
            });
        }

        let items: Vec<Issue> =
            serde_json::from_str(&response.body).map_err(|source| Error::Decode {
                what: format!("issue page {page}"),
                source,
            })?;

        tracing::debug!(page, count = items.len(), "Received issue page");

        let fetched = IssuePage {
            items,
            link: response.link,
        };
        self.pages.insert((lang, page), fetched.clone()).await;

        Ok(fetched)
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestDetail> {
        let url = self.pull_request_url(number);
        let response = self
            .get(&url, &format!("pull request #{number}"), |e| Error::DetailFetch {
                number,
                reason: e.to_string(),
            })
            .await?;

        if !(200..300).contains(&response.status) {
            return Err(Error::DetailFetch {
                number,
                reason: format!("HTTP {}", response.status),
            });
        }

        serde_json::from_str(&response.body).map_err(|source| Error::Decode {
            what: format!("pull request #{number}"),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_and_last() {
        let header = "<https://api.github.com/repositories/27729880/issues?filter=all&state=all&per_page=100&page=2>; rel=\"next\", \
                      <https://api.github.com/repositories/27729880/issues?filter=all&state=all&per_page=100&page=294>; rel=\"last\"";

        let links = PageLinks::parse(header);

        assert_eq!(links.next, Some(2));
        assert_eq!(links.last, Some(294));
    }

    #[test]
    fn test_parse_final_page_has_no_next() {
        let header = "<https://api.github.com/repos/o/r/issues?page=3>; rel=\"prev\", \
                      <https://api.github.com/repos/o/r/issues?page=1>; rel=\"first\"";

        assert_eq!(PageLinks::parse(header), PageLinks::default());
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let header = "  <https://x/issues?per_page=100&page=5>  ;   rel=\"next\"  ,<https://x/issues?page=9>;rel=\"last\"";

        let links = PageLinks::parse(header);

        assert_eq!(links.next, Some(5));
        assert_eq!(links.last, Some(9));
    }

    #[test]
    fn test_parse_does_not_confuse_per_page() {
        let header = "<https://x/issues?per_page=100>; rel=\"last\"";
        assert_eq!(PageLinks::parse(header).last, None);
    }

    #[test]
    fn test_parse_ignores_unparsable_page() {
        let header = "<https://x/issues?page=abc>; rel=\"next\", <https://x/issues?page=4>; rel=\"last\"";

        let links = PageLinks::parse(header);

        assert_eq!(links.next, None);
        assert_eq!(links.last, Some(4));
    }

    #[test]
    fn test_parse_empty_header() {
        assert_eq!(PageLinks::parse(""), PageLinks::default());
    }

    #[tokio::test]
    async fn test_listing_url() {
        let config = AppConfig::default();
        let client = GitHubClient::new(&config).unwrap();

        assert_eq!(
            client.listing_url(ProjectLang::Ruby, 3),
            "https://api.github.com/repos/grpc/grpc/issues?filter=all&state=all&per_page=100&page=3&labels=lang/ruby"
        );
        assert_eq!(
            client.pull_request_url(17),
            "https://api.github.com/repos/grpc/grpc/pulls/17"
        );
    }
}

#![allow(dead_code)]

use issue_health::github::{IssuePage, IssueSource};
use issue_health::types::{Issue, IssueState, ProjectLang, PullRequestDetail};
use issue_health::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const LISTING: &str = "https://api.github.com/repos/grpc/grpc/issues?filter=all&state=all&per_page=100";

/// In-memory tracker serving pre-built pages and pull request details.
#[derive(Default)]
pub struct FakeSource {
    pub pages: HashMap<u32, IssuePage>,
    pub details: HashMap<u64, PullRequestDetail>,
    pub requested_pages: Mutex<Vec<u32>>,
    pub requested_details: Mutex<Vec<u64>>,
    pub page_delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeSource {
    /// Serves `pages` as pages `1..=pages.len()` with GitHub style link headers.
    pub fn paginated(pages: Vec<Vec<Issue>>) -> Self {
        let total = pages.len() as u32;
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, items)| {
                let page = i as u32 + 1;
                (
                    page,
                    IssuePage {
                        items,
                        link: link_header(page, total),
                    },
                )
            })
            .collect();

        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: Vec<PullRequestDetail>) -> Self {
        self.details = details.into_iter().map(|d| (d.number, d)).collect();
        self
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.requested_pages.lock().unwrap().clone()
    }

    pub fn details_requested(&self) -> Vec<u64> {
        self.requested_details.lock().unwrap().clone()
    }
}

impl IssueSource for FakeSource {
    async fn fetch_page(&self, _lang: ProjectLang, page: u32) -> Result<IssuePage> {
        self.requested_pages.lock().unwrap().push(page);
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        self.pages.get(&page).cloned().ok_or(Error::PageFetch {
            page,
            reason: "HTTP 404".to_string(),
        })
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestDetail> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.requested_details.lock().unwrap().push(number);

        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.details.get(&number).cloned().ok_or(Error::DetailFetch {
            number,
            reason: "HTTP 502".to_string(),
        })
    }
}

pub fn link_header(page: u32, total: u32) -> Option<String> {
    if total <= 1 {
        return None;
    }
    if page < total {
        Some(format!(
            "<{LISTING}&page={}>; rel=\"next\", <{LISTING}&page={total}>; rel=\"last\"",
            page + 1
        ))
    } else {
        Some(format!(
            "<{LISTING}&page={}>; rel=\"prev\", <{LISTING}&page=1>; rel=\"first\"",
            page - 1
        ))
    }
}

pub fn issue(number: u64, created_at: &str, closed_at: Option<&str>) -> Issue {
    Issue {
        number,
        title: format!("issue {number}"),
        state: if closed_at.is_some() {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        user: None,
        assignee: None,
        comments: 0,
        created_at: created_at.to_string(),
        closed_at: closed_at.map(str::to_string),
        updated_at: None,
        pull_request: None,
    }
}

pub fn pull_item(number: u64, created_at: &str) -> Issue {
    Issue {
        pull_request: Some(serde_json::json!({
            "url": format!("https://api.github.com/repos/grpc/grpc/pulls/{number}")
        })),
        ..issue(number, created_at, None)
    }
}

pub fn pull_detail(number: u64, created_at: &str, merged_at: Option<&str>) -> PullRequestDetail {
    PullRequestDetail {
        number,
        state: if merged_at.is_some() {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        title: format!("pull {number}"),
        comments: 1,
        review_comments: 2,
        commits: 3,
        additions: 40,
        deletions: 4,
        changed_files: 2,
        created_at: created_at.to_string(),
        closed_at: merged_at.map(str::to_string),
        updated_at: merged_at.map(str::to_string),
        merged_at: merged_at.map(str::to_string),
        merged: merged_at.is_some(),
    }
}

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// One entry of the repository issue listing. Pull requests share the endpoint
/// and are told apart only by the presence of `pull_request`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub user: Option<User>,
    pub assignee: Option<User>,
    pub comments: u64,
    pub created_at: String,
    pub closed_at: Option<String>,
    pub updated_at: Option<String>,
    /// Only presence matters; an empty object still marks a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ISSUE[{}][{:?}][created: {}]: {}",
            self.number, self.state, self.created_at, self.title
        )
    }
}

/// Merge-specific fields the listing endpoint leaves out, fetched one pull
/// request at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PullRequestDetail {
    pub number: u64,
    pub state: IssueState,
    pub title: String,
    pub comments: u64,
    pub review_comments: u64,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub created_at: String,
    pub closed_at: Option<String>,
    pub updated_at: Option<String>,
    pub merged_at: Option<String>,
    pub merged: bool,
}

impl fmt::Display for PullRequestDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PULL[{}][{:?}][created: {}]: {}",
            self.number, self.state, self.created_at, self.title
        )
    }
}

/// Project language whose label narrows the issue listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProjectLang {
    Objc,
    Ruby,
    Php,
}

impl ProjectLang {
    pub fn label(self) -> &'static str {
        match self {
            ProjectLang::Objc => "lang/ObjC",
            ProjectLang::Ruby => "lang/ruby",
            ProjectLang::Php => "lang/php",
        }
    }
}

impl fmt::Display for ProjectLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

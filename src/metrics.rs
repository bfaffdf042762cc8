//! Date-windowed statistics over collected issues and pull request details.
//!
//! Everything here is pure: the caller materialises the collections and the
//! [`DateRange`], and every date is compared at day granularity.

use crate::collector::DetailBatch;
use crate::dates::{normalize, DateRange};
use crate::error::Result;
use crate::types::{Issue, ProjectLang, PullRequestDetail};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Median number of days between creation and close.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct MedianResolution {
    /// Median truncated to whole days.
    pub days: i64,
    /// Number of issues the median was taken over.
    pub sample_size: usize,
}

/// Issues closed within the range out of those created within it.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CloseRatio {
    pub closed: usize,
    pub created: usize,
    /// `None` when nothing was created in the range.
    pub ratio: Option<f64>,
}

impl fmt::Display for CloseRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ratio {
            Some(ratio) => write!(f, "{:.2}[{}/{}]", ratio, self.closed, self.created),
            None => write!(f, "undefined[{}/{}]", self.closed, self.created),
        }
    }
}

/// Creation and close day of one issue.
struct Lifespan {
    created: NaiveDate,
    closed: Option<NaiveDate>,
}

impl Lifespan {
    fn of(issue: &Issue) -> Result<Self> {
        Ok(Self {
            created: normalize(&issue.created_at)?,
            closed: issue.closed_at.as_deref().map(normalize).transpose()?,
        })
    }
}

fn lifespans(issues: &[Issue]) -> Result<Vec<Lifespan>> {
    issues.iter().map(Lifespan::of).collect()
}

/// Issues created within the range.
pub fn created_count(issues: &[Issue], range: &DateRange) -> Result<usize> {
    Ok(lifespans(issues)?
        .iter()
        .filter(|span| range.contains(span.created))
        .count())
}

/// Issues closed within the range, including ones created before it.
pub fn closed_count(issues: &[Issue], range: &DateRange) -> Result<usize> {
    Ok(lifespans(issues)?
        .iter()
        .filter(|span| span.closed.is_some_and(|closed| range.contains(closed)))
        .count())
}

/// Issues created within the range that were still open at its end.
///
/// The close timestamp decides: an issue without one is open regardless of
/// its reported state.
pub fn open_count(issues: &[Issue], range: &DateRange) -> Result<usize> {
    Ok(lifespans(issues)?
        .iter()
        .filter(|span| range.contains(span.created))
        .filter(|span| span.closed.map_or(true, |closed| closed > range.end))
        .count())
}

/// Median time to close over issues both created and closed within the range.
///
/// Returns `None` when no issue qualifies.
pub fn median_resolution(issues: &[Issue], range: &DateRange) -> Result<Option<MedianResolution>> {
    let mut durations: Vec<i64> = lifespans(issues)?
        .iter()
        .filter(|span| range.contains(span.created))
        .filter_map(|span| {
            span.closed
                .filter(|closed| range.contains(*closed))
                .map(|closed| (closed - span.created).num_days())
        })
        .collect();
    durations.sort_unstable();

    Ok(median(&durations).map(|days| MedianResolution {
        days: days.trunc() as i64,
        sample_size: durations.len(),
    }))
}

fn median(sorted: &[i64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    if n % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) as f64 / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

pub fn close_ratio(issues: &[Issue], range: &DateRange) -> Result<CloseRatio> {
    let mut created = 0;
    let mut closed = 0;

    for span in lifespans(issues)? {
        if !range.contains(span.created) {
            continue;
        }
        created += 1;
        if span.closed.is_some_and(|day| range.contains(day)) {
            closed += 1;
        }
    }

    let ratio = (created > 0).then(|| closed as f64 / created as f64);

    Ok(CloseRatio {
        closed,
        created,
        ratio,
    })
}

/// Pull requests created within the range.
pub fn pr_created_count(details: &[PullRequestDetail], range: &DateRange) -> Result<usize> {
    let mut count = 0;
    for detail in details {
        if range.contains(normalize(&detail.created_at)?) {
            count += 1;
        }
    }
    Ok(count)
}

/// Pull requests created within the range and merged on or before its end.
///
/// Only the end bound applies to the merge day.
pub fn pr_merged_count(details: &[PullRequestDetail], range: &DateRange) -> Result<usize> {
    let mut count = 0;
    for detail in details {
        if !range.contains(normalize(&detail.created_at)?) {
            continue;
        }
        if let Some(merged_at) = &detail.merged_at {
            if normalize(merged_at)? <= range.end {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Output of the `general` command.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GeneralReport {
    pub lang: ProjectLang,
    pub range: DateRange,
    pub issues_created: usize,
    pub issues_closed: usize,
    pub issues_open: usize,
    pub pull_requests_created: usize,
    pub pull_requests_merged: usize,
    /// Pull requests whose detail fetch failed and are missing from the counts above.
    pub pull_request_details_unavailable: usize,
}

impl GeneralReport {
    pub fn calculate(
        lang: ProjectLang,
        range: DateRange,
        issues: &[Issue],
        pull_requests: &DetailBatch,
    ) -> Result<Self> {
        Ok(Self {
            lang,
            range,
            issues_created: created_count(issues, &range)?,
            issues_closed: closed_count(issues, &range)?,
            issues_open: open_count(issues, &range)?,
            pull_requests_created: pr_created_count(&pull_requests.details, &range)?,
            pull_requests_merged: pr_merged_count(&pull_requests.details, &range)?,
            pull_request_details_unavailable: pull_requests.failed.len(),
        })
    }
}

impl fmt::Display for GeneralReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[GENERAL] {} {}", self.lang, self.range)?;
        writeln!(
            f,
            "[GENERAL]: {} new issues created in time range",
            self.issues_created
        )?;
        writeln!(
            f,
            "[GENERAL]: {} issues closed in time range, including issues created prior to time range",
            self.issues_closed
        )?;
        writeln!(
            f,
            "[GENERAL]: {} issues remain open on {}",
            self.issues_open, self.range.end
        )?;
        writeln!(
            f,
            "[GENERAL]: {} new pull requests created in time range",
            self.pull_requests_created
        )?;
        write!(
            f,
            "[GENERAL]: {} pull requests merged in time range",
            self.pull_requests_merged
        )?;
        if self.pull_request_details_unavailable > 0 {
            write!(
                f,
                "\n[GENERAL]: {} pull requests could not be fetched and are not counted",
                self.pull_request_details_unavailable
            )?;
        }
        Ok(())
    }
}

/// Output of the `maintainability` command.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MaintainabilityReport {
    pub lang: ProjectLang,
    pub range: DateRange,
    pub median_resolution: Option<MedianResolution>,
    pub close_ratio: CloseRatio,
}

impl MaintainabilityReport {
    pub fn calculate(lang: ProjectLang, range: DateRange, issues: &[Issue]) -> Result<Self> {
        Ok(Self {
            lang,
            range,
            median_resolution: median_resolution(issues, &range)?,
            close_ratio: close_ratio(issues, &range)?,
        })
    }
}

impl fmt::Display for MaintainabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[MAINTAINABILITY] {} {}", self.lang, self.range)?;
        match &self.median_resolution {
            Some(median) => writeln!(
                f,
                "[MAINTAINABILITY]: median time to close an issue: {} days ({} issues)",
                median.days, median.sample_size
            )?,
            None => writeln!(
                f,
                "[MAINTAINABILITY]: median time to close an issue: undefined (0 issues)"
            )?,
        }
        write!(
            f,
            "[MAINTAINABILITY]: percentage of issues that are closed: {}",
            self.close_ratio
        )
    }
}

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize)]
pub enum ChangeType {
    Increase,
    Decrease,
    Neutral,
}

/// A count compared with the same count over an earlier window.
#[derive(Debug, Clone, PartialEq, SimpleObject, Serialize)]
pub struct DashboardMetric {
    pub value: i64,
    /// Percentage change against `previous_value`, rounded to two decimals.
    pub change: f64,
    pub change_type: ChangeType,
    pub previous_value: i64,
}

impl DashboardMetric {
    pub fn compare(current: u64, previous: u64) -> Self {
        let change = if previous == 0 {
            0.0
        } else {
            let raw = (current as f64 - previous as f64) / previous as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        let change_type = if change > 0.0 {
            ChangeType::Increase
        } else if change < 0.0 {
            ChangeType::Decrease
        } else {
            ChangeType::Neutral
        };

        Self {
            value: clamp_i64(current),
            change,
            change_type,
            previous_value: clamp_i64(previous),
        }
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The equally long window that ends where this one starts.
    pub fn preceding(&self) -> Self {
        Self {
            start: self.start - self.duration(),
            end: self.start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("date range end must not be before its start")]
    EndBeforeStart,
}

/// Windows a dashboard metric is evaluated over.
///
/// `current: None` means all rows regardless of creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWindows {
    pub current: Option<TimeWindow>,
    pub previous: TimeWindow,
}

pub fn metric_windows(
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    now: DateTime<Utc>,
) -> Result<MetricWindows, RangeError> {
    match range {
        Some((from, to)) => {
            if to < from {
                return Err(RangeError::EndBeforeStart);
            }
            let current = TimeWindow::new(from, to);
            Ok(MetricWindows {
                current: Some(current),
                previous: current.preceding(),
            })
        }
        None => {
            let month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now);
            Ok(MetricWindows {
                current: None,
                previous: TimeWindow::new(month_ago, now),
            })
        }
    }
}

/// `[today 00:00 UTC, tomorrow 00:00 UTC)`.
pub fn today(now: DateTime<Utc>) -> TimeWindow {
    let start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
    TimeWindow::new(start, start + Duration::days(1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    /// `YYYY-MM`.
    pub label: String,
    pub window: TimeWindow,
}

/// The trailing `count` calendar months ending with the current one, oldest first.
pub fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<MonthBucket> {
    let first_of_month = now
        .date_naive()
        .with_day(1)
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
        .unwrap_or(now);

    (0..count)
        .rev()
        .filter_map(|back| {
            let start = first_of_month.checked_sub_months(Months::new(back))?;
            let end = start.checked_add_months(Months::new(1))?;
            Some(MonthBucket {
                label: format!("{:04}-{:02}", start.year(), start.month()),
                window: TimeWindow::new(start, end),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize)]
pub enum ActivityKind {
    PropertyCreated,
    InquiryReceived,
    ApprovalDecision,
}

#[derive(Debug, Clone, PartialEq, SimpleObject, Serialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub subject_id: Uuid,
    pub title: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

struct Cursor {
    at: DateTime<Utc>,
    source: usize,
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cursor {}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    // Newest first; ties go to the earlier source.
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges feeds that are each sorted newest first into one feed of at most
/// `limit` events, newest first.
pub fn merge_recent(sources: Vec<Vec<ActivityEvent>>, limit: usize) -> Vec<ActivityEvent> {
    let mut feeds: Vec<std::vec::IntoIter<ActivityEvent>> =
        sources.into_iter().map(Vec::into_iter).collect();
    let mut heads: Vec<Option<ActivityEvent>> = feeds.iter_mut().map(Iterator::next).collect();
    let mut heap: BinaryHeap<Cursor> = heads
        .iter()
        .enumerate()
        .filter_map(|(source, head)| head.as_ref().map(|event| Cursor { at: event.at, source }))
        .collect();

    let mut merged = Vec::with_capacity(limit);
    while merged.len() < limit {
        let Some(Cursor { source, .. }) = heap.pop() else {
            break;
        };
        let Some(event) = heads[source].take() else {
            continue;
        };
        merged.push(event);

        heads[source] = feeds[source].next();
        if let Some(next) = heads[source].as_ref() {
            heap.push(Cursor {
                at: next.at,
                source,
            });
        }
    }
    merged
}

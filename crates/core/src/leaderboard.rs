//! Per-course leaderboard aggregation over attempt records.
//!
//! Everything here is a pure function of the record list; nothing is cached.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{CourseName, QuizAttemptRecord, UserId};

/// Aggregate of one user's attempts within one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub course: CourseName,
    pub average_score: f64,
    pub attempt_count: u32,
}

/// Column a leaderboard can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    AverageScore,
    AttemptCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

impl SortDirection {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Descending => Self::Ascending,
            Self::Ascending => Self::Descending,
        }
    }
}

/// Active sort column and direction. Defaults to average score, descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaderboardSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl LeaderboardSort {
    #[must_use]
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Column-header click: flip direction on the active column, otherwise
    /// switch to `field` and reset to descending.
    #[must_use]
    pub fn toggle(self, field: SortField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                field,
                direction: SortDirection::Descending,
            }
        }
    }
}

/// A leaderboard row with its 1-based display rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub entry: LeaderboardEntry,
}

struct Group<'a> {
    first: &'a QuizAttemptRecord,
    total: u64,
    count: u32,
}

/// Group records by course and user and compute averages.
///
/// Each course's entries are sorted with the default sort. Courses without
/// records do not appear; use [`course_leaderboard`] for a specific course.
#[must_use]
pub fn aggregate(records: &[QuizAttemptRecord]) -> BTreeMap<CourseName, Vec<LeaderboardEntry>> {
    aggregate_with(records, LeaderboardSort::default())
}

/// Like [`aggregate`] with an explicit sort.
#[must_use]
pub fn aggregate_with(
    records: &[QuizAttemptRecord],
    sort: LeaderboardSort,
) -> BTreeMap<CourseName, Vec<LeaderboardEntry>> {
    // Groups keep first-seen order so the sort sees construction order.
    let mut order: Vec<(CourseName, UserId)> = Vec::new();
    let mut groups: HashMap<(CourseName, UserId), Group<'_>> = HashMap::new();

    for record in records {
        let key = (record.course().clone(), record.user_id().clone());
        match groups.get_mut(&key) {
            Some(group) => {
                group.total += u64::from(record.score());
                group.count = group.count.saturating_add(1);
            }
            None => {
                order.push(key.clone());
                groups.insert(
                    key,
                    Group {
                        first: record,
                        total: u64::from(record.score()),
                        count: 1,
                    },
                );
            }
        }
    }

    let mut out: BTreeMap<CourseName, Vec<LeaderboardEntry>> = BTreeMap::new();
    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        let (course, user_id) = key;
        #[allow(clippy::cast_precision_loss)]
        let average_score = group.total as f64 / f64::from(group.count);
        out.entry(course.clone()).or_default().push(LeaderboardEntry {
            user_id,
            user_name: group.first.user_name().to_owned(),
            user_email: group.first.user_email().to_owned(),
            course,
            average_score,
            attempt_count: group.count,
        });
    }

    for entries in out.values_mut() {
        sort_entries(entries, sort);
    }
    out
}

/// Leaderboard for one course. Empty when the course has no records.
#[must_use]
pub fn course_leaderboard(
    records: &[QuizAttemptRecord],
    course: &CourseName,
    sort: LeaderboardSort,
) -> Vec<LeaderboardEntry> {
    let matching: Vec<QuizAttemptRecord> = records
        .iter()
        .filter(|r| r.course() == course)
        .cloned()
        .collect();
    aggregate_with(&matching, sort)
        .remove(course)
        .unwrap_or_default()
}

/// Stable sort by the active field; ties fall back to ascending user id.
pub fn sort_entries(entries: &mut [LeaderboardEntry], sort: LeaderboardSort) {
    entries.sort_by(|a, b| {
        let primary = match sort.field {
            SortField::AverageScore => a.average_score.total_cmp(&b.average_score),
            SortField::AttemptCount => a.attempt_count.cmp(&b.attempt_count),
        };
        let primary = match sort.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        match primary {
            Ordering::Equal => a.user_id.cmp(&b.user_id),
            other => other,
        }
    });
}

/// Case-insensitive substring match on the user name. An empty query keeps everything.
#[must_use]
pub fn filter_by_name(entries: &[LeaderboardEntry], query: &str) -> Vec<LeaderboardEntry> {
    let needle = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| needle.is_empty() || e.user_name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[must_use]
pub fn ranked(entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RankedEntry { rank: i + 1, entry })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identity, QuestionOutcome};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn record(
        user: &str,
        name: &str,
        course: &str,
        score: u32,
        total: u32,
        offset: i64,
    ) -> QuizAttemptRecord {
        QuizAttemptRecord::from_persisted(
            UserId::new(user).unwrap(),
            format!("{user}@example.com"),
            name.to_owned(),
            CourseName::new(course).unwrap(),
            score,
            total,
            Vec::<QuestionOutcome>::new(),
            fixed_now() + Duration::seconds(offset),
        )
        .unwrap()
    }

    fn sql() -> CourseName {
        CourseName::new("SQL").unwrap()
    }

    #[test]
    fn averages_per_user_and_sorts_descending() {
        let records = vec![
            record("U1", "Uma", "SQL", 80, 100, 0),
            record("U2", "Vic", "SQL", 70, 100, 1),
            record("U1", "Uma", "SQL", 90, 100, 2),
        ];

        let board = course_leaderboard(&records, &sql(), LeaderboardSort::default());

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id.as_str(), "U1");
        assert!((board[0].average_score - 85.0).abs() < f64::EPSILON);
        assert_eq!(board[0].attempt_count, 2);
        assert_eq!(board[1].user_id.as_str(), "U2");
        assert!((board[1].average_score - 70.0).abs() < f64::EPSILON);
        assert_eq!(board[1].attempt_count, 1);
    }

    #[test]
    fn groups_by_course() {
        let records = vec![
            record("U1", "Uma", "SQL", 3, 5, 0),
            record("U1", "Uma", "Docker", 5, 5, 1),
            record("U2", "Vic", "Docker", 1, 5, 2),
        ];
        let all = aggregate(&records);
        assert_eq!(all.len(), 2);
        assert_eq!(all[&sql()].len(), 1);
        let docker = &all[&CourseName::new("Docker").unwrap()];
        assert_eq!(docker[0].user_id.as_str(), "U1");
        assert_eq!(docker[1].user_id.as_str(), "U2");
    }

    #[test]
    fn empty_course_yields_empty_board() {
        let records = vec![record("U1", "Uma", "Linux", 3, 5, 0)];
        assert!(course_leaderboard(&records, &sql(), LeaderboardSort::default()).is_empty());
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![
            record("U3", "Cy", "SQL", 4, 5, 0),
            record("U1", "Uma", "SQL", 4, 5, 1),
            record("U2", "Vic", "SQL", 2, 5, 2),
        ];
        assert_eq!(aggregate(&records), aggregate(&records));
    }

    #[test]
    fn ties_break_by_user_id() {
        let records = vec![
            record("U9", "Zed", "SQL", 4, 5, 0),
            record("U1", "Amy", "SQL", 4, 5, 1),
        ];
        let desc = course_leaderboard(&records, &sql(), LeaderboardSort::default());
        assert_eq!(desc[0].user_id.as_str(), "U1");

        let asc = course_leaderboard(
            &records,
            &sql(),
            LeaderboardSort::new(SortField::AverageScore, SortDirection::Ascending),
        );
        assert_eq!(asc[0].user_id.as_str(), "U1");
    }

    #[test]
    fn name_comes_from_first_record() {
        let records = vec![
            record("U1", "First", "SQL", 1, 5, 0),
            record("U1", "Renamed", "SQL", 2, 5, 1),
        ];
        let board = course_leaderboard(&records, &sql(), LeaderboardSort::default());
        assert_eq!(board[0].user_name, "First");
    }

    #[test]
    fn toggle_flips_or_resets() {
        let sort = LeaderboardSort::default();
        let flipped = sort.toggle(SortField::AverageScore);
        assert_eq!(flipped.direction, SortDirection::Ascending);

        let switched = flipped.toggle(SortField::AttemptCount);
        assert_eq!(switched.field, SortField::AttemptCount);
        assert_eq!(switched.direction, SortDirection::Descending);
    }

    #[test]
    fn sorts_by_attempt_count() {
        let records = vec![
            record("U1", "Uma", "SQL", 5, 5, 0),
            record("U2", "Vic", "SQL", 1, 5, 1),
            record("U2", "Vic", "SQL", 1, 5, 2),
        ];
        let board = course_leaderboard(
            &records,
            &sql(),
            LeaderboardSort::new(SortField::AttemptCount, SortDirection::Descending),
        );
        assert_eq!(board[0].user_id.as_str(), "U2");
    }

    #[test]
    fn filter_and_rank() {
        let identity = Identity::new(UserId::new("U1").unwrap(), "a@b.c", "Alex Johnson");
        let records = vec![
            record(identity.user_id.as_str(), &identity.name, "SQL", 5, 5, 0),
            record("U2", "Jamie Smith", "SQL", 3, 5, 1),
        ];
        let board = course_leaderboard(&records, &sql(), LeaderboardSort::default());
        let filtered = filter_by_name(&board, "jamie");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filter_by_name(&board, "  ").len(), 2);

        let ranks = ranked(board);
        assert_eq!(ranks[0].rank, 1);
        assert_eq!(ranks[1].rank, 2);
        assert_eq!(ranks[1].entry.user_name, "Jamie Smith");
    }
}

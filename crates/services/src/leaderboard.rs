use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use quiz_core::leaderboard::{self, LeaderboardEntry, LeaderboardSort, RankedEntry};
use quiz_core::model::{CourseName, QuizAttemptRecord, UserId};
use storage::repository::{AttemptRepository, StorageError};

/// Leaderboards derived from every stored attempt on each call.
#[derive(Clone)]
pub struct LeaderboardService {
    attempts: Arc<dyn AttemptRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// Ranked boards for every course that has attempts, optionally filtered by
    /// user name. Courses with no matching user are left out of a search.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if attempts cannot be read.
    pub async fn all_courses(
        &self,
        sort: LeaderboardSort,
        search: Option<&str>,
    ) -> Result<BTreeMap<CourseName, Vec<RankedEntry>>, StorageError> {
        let records = self.records().await?;
        Ok(leaderboard::aggregate_with(&records, sort)
            .into_iter()
            .map(|(course, board)| (course, rank_then_filter(board, search)))
            .filter(|(_, rows)| !rows.is_empty())
            .collect())
    }

    /// Ranked board for one course, optionally filtered by user name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if attempts cannot be read.
    pub async fn course(
        &self,
        course: &CourseName,
        sort: LeaderboardSort,
        search: Option<&str>,
    ) -> Result<Vec<RankedEntry>, StorageError> {
        let records = self.records().await?;
        let board = leaderboard::course_leaderboard(&records, course, sort);
        Ok(rank_then_filter(board, search))
    }

    async fn records(&self) -> Result<Vec<QuizAttemptRecord>, StorageError> {
        let rows = self.attempts.list_attempts().await?;
        tracing::debug!(count = rows.len(), "loaded attempts for leaderboard");
        Ok(rows.into_iter().map(|row| row.record).collect())
    }
}

/// Ranks are assigned before filtering so a search keeps each user's place.
fn rank_then_filter(board: Vec<LeaderboardEntry>, search: Option<&str>) -> Vec<RankedEntry> {
    let matching: Option<HashSet<UserId>> = search.map(|query| {
        leaderboard::filter_by_name(&board, query)
            .into_iter()
            .map(|e| e.user_id)
            .collect()
    });
    leaderboard::ranked(board)
        .into_iter()
        .filter(|r| matching.as_ref().is_none_or(|m| m.contains(&r.entry.user_id)))
        .collect()
}

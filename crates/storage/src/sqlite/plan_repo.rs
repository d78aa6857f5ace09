use quiz_core::model::{StudyPlan, UserId};

use super::{SqliteRepository, map_document_row};
use crate::document::{self, STUDY_PLANS};
use crate::repository::{StorageError, StudyPlanRepository};

#[async_trait::async_trait]
impl StudyPlanRepository for SqliteRepository {
    async fn get_plan(&self, user: &UserId) -> Result<Option<StudyPlan>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT key, body FROM documents
                WHERE collection = ?1 AND key = ?2
            ",
        )
        .bind(STUDY_PLANS)
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| {
            let (key, body) = map_document_row(&row)?;
            document::decode_plan(&key, body)
        })
        .transpose()
    }

    async fn put_plan(&self, plan: &StudyPlan) -> Result<(), StorageError> {
        let body = document::encode(plan)?.to_string();
        self.insert_raw(STUDY_PLANS, plan.user_id().as_str(), &body)
            .await
    }
}

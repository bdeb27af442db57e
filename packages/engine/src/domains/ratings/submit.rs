//! Rating submission: append the interaction's scores, re-read the recent
//! window, and refresh the rated user's cumulative rating.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::common::{now_millis, EpochMillis, StoreError, UserId};
use crate::domains::users::{ratings_path, user_path};
use crate::kernel::{BaseDocumentStore, Query};

use super::score::{aggregate_rating, RATING_WINDOW};

/// One rated interaction as stored in `users/{uid}/ratings/{ratingId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    /// Score the counterpart gave this user.
    pub feedback: f64,
    /// Conversation-balance score of the dialogue itself.
    pub conversation: f64,
    pub timestamp: EpochMillis,
}

/// Appends a rating for `target` and recomputes their cumulative rating from
/// the [`RATING_WINDOW`] most recent entries.
///
/// Callers treat failures as non-fatal to the session: log and proceed with
/// the stale rating.
pub async fn record_rating(
    store: &dyn BaseDocumentStore,
    target: &UserId,
    feedback: f64,
    conversation: f64,
) -> Result<f64, StoreError> {
    let collection = ratings_path(target);
    store
        .add(
            &collection,
            json!({
                "feedback": feedback,
                "conversation": conversation,
                "timestamp": now_millis(),
            }),
        )
        .await?;

    let recent = store
        .query(
            &collection,
            Query::new().order_desc("timestamp").limit(RATING_WINDOW),
        )
        .await?;

    let mut feedback_scores = Vec::with_capacity(recent.len());
    let mut conversation_scores = Vec::with_capacity(recent.len());
    for snapshot in &recent {
        let entry: RatingEntry = snapshot.decode(&collection)?;
        feedback_scores.push(entry.feedback);
        conversation_scores.push(entry.conversation);
    }

    let rating = aggregate_rating(&feedback_scores, &conversation_scores);
    store
        .update(
            &user_path(target),
            json!({ "rating": rating, "timestamp": now_millis() }),
        )
        .await?;
    info!(uid = %target, rating, entries = recent.len(), "Rating refreshed");
    Ok(rating)
}

//! Ratings domain: pure conversational-balance scoring and the submission
//! flow that maintains each user's cumulative rating.

pub mod score;
pub mod submit;

pub use score::{
    aggregate_rating, conversation_score, LOG_BASE, RATING_BASELINE, RATING_WINDOW, SCORE_CAP,
};
pub use submit::{record_rating, RatingEntry};

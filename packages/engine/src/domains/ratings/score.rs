/// Pure scoring functions for conversational balance
///
/// These functions contain NO side effects - they implement the arithmetic
/// for turning word counts and feedback into a bounded user rating.

/// Upper bound on a single conversation's score; caps the influence of any
/// one exceptional conversation.
pub const SCORE_CAP: f64 = 3.0;

/// Logarithm base compressing volume growth, so score rises sub-linearly
/// with word count.
pub const LOG_BASE: f64 = 400.0;

/// Number of recent interactions an aggregate rating considers.
pub const RATING_WINDOW: usize = 5;

/// Offset centering aggregate ratings around a default midpoint.
pub const RATING_BASELINE: f64 = 5.0;

/// Scores one conversation from words sent (`S`) by one party and received
/// (`R`) from the other.
///
/// Algorithm:
/// - `S + R == 0` -> 0 (nothing was said)
/// - `avg = (S+R)/2`, `balance = 1 - |S-R|/(S+R)`, `raw = avg³ · balance`
/// - `score = clamp(log₄₀₀(raw), 0, 3)`, rounded to one decimal
///
/// Substantial *and* balanced conversations score highest: a completely
/// one-sided exchange has `balance = 0` and scores 0 regardless of volume.
/// Symmetric in its arguments.
pub fn conversation_score(sent: u32, received: u32) -> f64 {
    let total = sent + received;
    if total == 0 {
        return 0.0;
    }

    let s = f64::from(sent);
    let r = f64::from(received);
    let avg = (s + r) / 2.0;
    let balance = 1.0 - (s - r).abs() / (s + r);
    let raw = avg.powi(3) * balance;

    // ln(0) is -inf; the clamp folds fully one-sided conversations to 0.
    let score = (raw.ln() / LOG_BASE.ln()).clamp(0.0, SCORE_CAP);
    round_one_decimal(score)
}

/// Combines feedback scores and conversation scores into a user rating.
///
/// Both lists hold the most recent interactions, newest first, at most
/// [`RATING_WINDOW`] entries. Shorter lists are padded with neutral fillers
/// (`0` for feedback, `conversation_score(1, 1)` for conversation) so a user
/// with few rated interactions is not penalized disproportionately. The five
/// element-wise sums are averaged and offset by [`RATING_BASELINE`].
pub fn aggregate_rating(feedback: &[f64], conversation: &[f64]) -> f64 {
    let neutral_conversation = conversation_score(1, 1);

    let mut sum = 0.0;
    for i in 0..RATING_WINDOW {
        let f = feedback.get(i).copied().unwrap_or(0.0);
        let c = conversation.get(i).copied().unwrap_or(neutral_conversation);
        sum += f + c;
    }

    RATING_BASELINE + sum / RATING_WINDOW as f64
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

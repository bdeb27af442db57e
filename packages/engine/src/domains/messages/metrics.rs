//! Word-count metrics over a conversation, feeding the rating engine.

use crate::common::UserId;

use super::models::Message;

/// Words one party sent and received across a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordMetrics {
    pub sent: u32,
    pub received: u32,
}

/// Counts words sent by `target` and words sent by everyone else.
pub fn word_metrics(messages: &[Message], target: &UserId) -> WordMetrics {
    let mut metrics = WordMetrics { sent: 0, received: 0 };
    for message in messages {
        let words = message.content.split_whitespace().count() as u32;
        if &message.uid == target {
            metrics.sent += words;
        } else {
            metrics.received += words;
        }
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(uid: &str, content: &str) -> Message {
        Message {
            uid: UserId::from(uid),
            content: content.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn splits_words_by_sender() {
        let messages = vec![
            msg("me", "one two three"),
            msg("them", "four five"),
            msg("me", "six"),
        ];
        let metrics = word_metrics(&messages, &UserId::from("me"));
        assert_eq!(metrics, WordMetrics { sent: 4, received: 2 });
    }

    #[test]
    fn extra_whitespace_does_not_inflate_counts() {
        let messages = vec![msg("me", "  spaced   out  ")];
        let metrics = word_metrics(&messages, &UserId::from("me"));
        assert_eq!(metrics.sent, 2);
    }

    #[test]
    fn empty_conversation_yields_zero() {
        let metrics = word_metrics(&[], &UserId::from("me"));
        assert_eq!(metrics, WordMetrics { sent: 0, received: 0 });
    }
}

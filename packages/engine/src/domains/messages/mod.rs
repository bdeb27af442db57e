//! Messages domain: the message model, the append path, and conversation
//! word metrics.

pub mod metrics;
pub mod models;
pub mod send;

pub use metrics::{word_metrics, WordMetrics};
pub use models::Message;
pub use send::send_message;

//! Message retrieval from the device SMS provider.
//!
//! Provides:
//! - [`Record`] and its provider JSON parsing
//! - [`RecordSource`], the seam the migrator fetches through
//! - [`CommandSource`], which runs the provider command with a timeout
//! - [`VecSource`], an in-memory source for embedding and tests

pub mod command;
pub mod record;

pub use command::CommandSource;
pub use record::{MessageBox, MessageKind, ParseBoxError, Record, DEFAULT_NUMBER, DEFAULT_SENDER};

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Error type for record retrieval.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("SMS provider '{program}' is not installed or is an incompatible version: {detail}")]
    ProviderUnavailable { program: String, detail: String },

    #[error("Retrieving text messages timed out after {0:?}")]
    RetrievalTimeout(Duration),

    #[error("Failed to retrieve text messages: {0}")]
    RetrievalFailed(String),
}

/// Something that yields a batch of records.
///
/// Implementations number the batch 1..=N in retrieval order and return at
/// most `limit` records.
pub trait RecordSource: Send + Sync {
    fn fetch(
        &self,
        limit: u32,
        mbox: MessageBox,
    ) -> impl Future<Output = Result<Vec<Record>, SourceError>> + Send;
}

/// In-memory record source.
///
/// Records are filtered by box, truncated to the limit and renumbered, so
/// the ids they were built with do not matter.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    records: Vec<Record>,
}

impl VecSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl RecordSource for VecSource {
    async fn fetch(&self, limit: u32, mbox: MessageBox) -> Result<Vec<Record>, SourceError> {
        let wanted = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .records
            .iter()
            .filter(|record| match mbox {
                MessageBox::All => true,
                MessageBox::Inbox => record.kind == MessageKind::Inbox,
                MessageBox::Outbox => record.kind == MessageKind::Outbox,
                MessageBox::Draft => record.kind == MessageKind::Draft,
            })
            .take(wanted)
            .zip(1..)
            .map(|(record, id)| Record {
                id,
                ..record.clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: MessageKind, body: &str) -> Record {
        Record::new(1, kind, "2021-03-04 05:06", body)
    }

    #[tokio::test]
    async fn test_vec_source_filters_and_renumbers() {
        let source = VecSource::new(vec![
            record(MessageKind::Inbox, "a"),
            record(MessageKind::Outbox, "b"),
            record(MessageKind::Inbox, "c"),
            record(MessageKind::Other("sent".into()), "d"),
        ]);

        let inbox = source.fetch(10, MessageBox::Inbox).await.unwrap();
        let bodies: Vec<_> = inbox.iter().map(|r| (r.id, r.body.as_str())).collect();
        assert_eq!(bodies, vec![(1, "a"), (2, "c")]);

        let all = source.fetch(3, MessageBox::All).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_vec_source_zero_limit() {
        let source = VecSource::new(vec![record(MessageKind::Inbox, "a")]);
        assert!(source.fetch(0, MessageBox::All).await.unwrap().is_empty());
    }
}

//! Storage-side form of a retrieved record.

use thiserror::Error;

use crate::source::Record;

/// Maximum lengths, in characters, of the text columns.
pub const MAX_TYPE_LEN: usize = 10;
pub const MAX_SENDER_LEN: usize = 40;
pub const MAX_NUMBER_LEN: usize = 30;
pub const MAX_RECEIVED_LEN: usize = 30;
pub const MAX_BODY_LEN: usize = 500;

/// A record that could not be turned into a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {id}: {reason}")]
pub struct ConversionError {
    /// Sequence id of the offending record.
    pub id: u64,
    pub reason: String,
}

/// One `messages` row, staged in a session until commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRow {
    pub id: i64,
    pub thread_id: i64,
    pub kind: String,
    pub read: bool,
    pub sender: String,
    pub number: String,
    pub received: String,
    pub body: String,
}

impl TryFrom<Record> for StagedRow {
    type Error = ConversionError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        let fail = |reason: String| ConversionError {
            id: record.id,
            reason,
        };

        let id = i64::try_from(record.id)
            .map_err(|_| fail(format!("sequence id {} out of range", record.id)))?;

        let kind = record.kind.as_str();
        if kind.is_empty() {
            return Err(fail("type must not be empty".into()));
        }
        if record.received.trim().is_empty() {
            return Err(fail("received timestamp must not be empty".into()));
        }

        for (column, value, max) in [
            ("type", kind, MAX_TYPE_LEN),
            ("sender", record.sender.as_str(), MAX_SENDER_LEN),
            ("number", record.number.as_str(), MAX_NUMBER_LEN),
            ("received", record.received.as_str(), MAX_RECEIVED_LEN),
            ("body", record.body.as_str(), MAX_BODY_LEN),
        ] {
            let len = value.chars().count();
            if len > max {
                return Err(fail(format!("{column} is {len} characters (max {max})")));
            }
        }

        Ok(Self {
            id,
            thread_id: record.thread_id,
            kind: kind.to_string(),
            read: record.read,
            sender: record.sender,
            number: record.number,
            received: record.received,
            body: record.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MessageKind;

    fn record(body: &str) -> Record {
        Record {
            id: 5,
            ..Record::new(3, MessageKind::Inbox, "2022-02-02 12:00", body)
        }
    }

    #[test]
    fn test_field_mapping() {
        let mut input = record("hello");
        input.read = false;
        input.sender = "Cy".into();
        input.number = "+1555".into();

        let row = StagedRow::try_from(input).unwrap();
        assert_eq!(
            row,
            StagedRow {
                id: 5,
                thread_id: 3,
                kind: "inbox".into(),
                read: false,
                sender: "Cy".into(),
                number: "+1555".into(),
                received: "2022-02-02 12:00".into(),
                body: "hello".into(),
            }
        );
    }

    #[test]
    fn test_body_limit_counts_characters() {
        let at_limit = "é".repeat(MAX_BODY_LEN);
        assert!(StagedRow::try_from(record(&at_limit)).is_ok());

        let err = StagedRow::try_from(record(&"a".repeat(MAX_BODY_LEN + 1))).unwrap_err();
        assert_eq!(err.id, 5);
        assert!(err.reason.contains("body"), "{}", err.reason);
    }

    #[test]
    fn test_long_type_tag_rejected() {
        let mut input = record("x");
        input.kind = MessageKind::Other("undeliverable".into());
        let err = StagedRow::try_from(input).unwrap_err();
        assert!(err.reason.starts_with("type"), "{}", err.reason);
    }

    #[test]
    fn test_empty_received_rejected() {
        let mut input = record("x");
        input.received = " ".into();
        assert!(StagedRow::try_from(input).is_err());
    }
}

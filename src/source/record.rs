//! Retrieved message records and the provider's JSON shape.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Sender recorded when the provider omits it.
pub const DEFAULT_SENDER: &str = "Unknown";
/// Number recorded when the provider omits it.
pub const DEFAULT_NUMBER: &str = "N/A";

/// Message type tag as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Inbox,
    Outbox,
    Draft,
    /// Any other tag (`sent`, `failed`, `queued`, ...), kept verbatim.
    Other(String),
}

impl MessageKind {
    /// The tag stored in the `type` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "inbox",
            Self::Outbox => "outbox",
            Self::Draft => "draft",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "inbox" => Self::Inbox,
            "outbox" => Self::Outbox,
            "draft" => Self::Draft,
            _ => Self::Other(tag),
        }
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval filter passed to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageBox {
    #[default]
    All,
    Inbox,
    Outbox,
    Draft,
}

impl MessageBox {
    /// The value passed to the provider's `-t` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Inbox => "inbox",
            Self::Outbox => "outbox",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for MessageBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown box name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message box '{0}' (expected all, inbox, outbox or draft)")]
pub struct ParseBoxError(pub String);

impl FromStr for MessageBox {
    type Err = ParseBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "inbox" => Ok(Self::Inbox),
            "outbox" => Ok(Self::Outbox),
            "draft" => Ok(Self::Draft),
            _ => Err(ParseBoxError(s.to_string())),
        }
    }
}

/// One retrieved message with its batch sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based position in the retrieval batch.
    pub id: u64,
    pub thread_id: i64,
    pub kind: MessageKind,
    pub read: bool,
    pub sender: String,
    pub number: String,
    pub received: String,
    pub body: String,
}

impl Record {
    /// Build a read record with default sender and number and sequence id 0.
    ///
    /// Sources assign the real sequence id when the record is fetched.
    pub fn new(
        thread_id: i64,
        kind: MessageKind,
        received: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            thread_id,
            kind,
            read: true,
            sender: DEFAULT_SENDER.into(),
            number: DEFAULT_NUMBER.into(),
            received: received.into(),
            body: body.into(),
        }
    }

    /// Attach a sequence id to a parsed provider entry.
    pub(crate) fn from_raw(id: u64, raw: RawRecord) -> Self {
        Self {
            id,
            thread_id: raw.threadid,
            kind: raw.kind,
            read: raw.read,
            sender: raw.sender.unwrap_or_else(|| DEFAULT_SENDER.into()),
            number: raw.number.unwrap_or_else(|| DEFAULT_NUMBER.into()),
            received: raw.received,
            body: raw.body,
        }
    }
}

/// Provider output entry. Fields not listed here are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRecord {
    threadid: i64,
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default = "default_read")]
    read: bool,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    number: Option<String>,
    received: String,
    body: String,
}

fn default_read() -> bool {
    true
}

/// Parse the provider's JSON array and number the entries 1..=N in array order.
///
/// Blank output is an empty batch.
pub(crate) fn parse_records(output: &str) -> Result<Vec<Record>, serde_json::Error> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawRecord> = serde_json::from_str(output)?;
    Ok(raw
        .into_iter()
        .zip(1..)
        .map(|(raw, id)| Record::from_raw(id, raw))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assigns_sequence_ids_in_order() {
        let output = r#"[
            {"threadid": 7, "type": "inbox", "read": false, "sender": "Ann",
             "number": "+15550001", "received": "2020-01-01 10:00", "body": "first"},
            {"threadid": 7, "type": "sent", "read": true,
             "number": "+15550001", "received": "2020-01-01 10:01", "body": "second"},
            {"threadid": 9, "type": "draft", "received": "2020-01-02 08:00", "body": "third",
             "_id": 1234}
        ]"#;

        let records = parse_records(output).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(records[0].body, "first");
        assert_eq!(records[0].kind, MessageKind::Inbox);
        assert!(!records[0].read);
        assert_eq!(records[1].kind, MessageKind::Other("sent".into()));
        assert_eq!(records[1].sender, DEFAULT_SENDER);
        assert_eq!(records[2].number, DEFAULT_NUMBER);
        assert!(records[2].read, "read defaults to true");
    }

    #[test]
    fn test_parse_blank_output_is_empty() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("  \n").unwrap().is_empty());
        assert!(parse_records("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_missing_required_field_fails() {
        let output = r#"[{"threadid": 1, "type": "inbox", "received": "now"}]"#;
        assert!(parse_records(output).is_err());
    }

    #[test]
    fn test_parse_not_an_array_fails() {
        assert!(parse_records(r#"{"error": "no permission"}"#).is_err());
        assert!(parse_records("Permission denied").is_err());
    }

    #[test]
    fn test_message_box_from_str() {
        assert_eq!("all".parse::<MessageBox>().unwrap(), MessageBox::All);
        assert_eq!("Inbox".parse::<MessageBox>().unwrap(), MessageBox::Inbox);
        assert_eq!(" outbox ".parse::<MessageBox>().unwrap(), MessageBox::Outbox);
        assert_eq!("draft".parse::<MessageBox>().unwrap(), MessageBox::Draft);
        assert!("spam".parse::<MessageBox>().is_err());
    }
}

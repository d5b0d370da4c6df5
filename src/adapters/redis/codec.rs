//! Bit-exact codecs for the on-Redis message representation.
//!
//! Messages are stored as flat string-to-string hashes; booleans are
//! `"0"`/`"1"` and timestamps second-precision ISO-8601 UTC with a
//! trailing `Z`.

use std::collections::HashMap;

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::message::{format_utc_seconds, parse_utc_seconds};
use crate::domain::models::{CoordinationMessage, MessagePayload, MessageType};

const FIELD_ID: &str = "id";
const FIELD_TYPE: &str = "type";
const FIELD_FROM: &str = "from";
const FIELD_TO: &str = "to";
const FIELD_TIMESTAMP: &str = "timestamp";
const FIELD_REQUIRES_ACK: &str = "requires_ack";
const FIELD_ACKNOWLEDGED: &str = "acknowledged";
const FIELD_SUBJECT: &str = "subject";
const FIELD_DESCRIPTION: &str = "description";
const FIELD_ACK_BY: &str = "ack_by";
const FIELD_ACK_TIMESTAMP: &str = "ack_timestamp";
const FIELD_ACK_COMMENT: &str = "ack_comment";

fn encode_flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Encode a message into hash fields in stable order.
pub fn encode_message(message: &CoordinationMessage) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        (FIELD_ID, message.id.clone()),
        (FIELD_TYPE, message.msg_type.as_str().to_string()),
        (FIELD_FROM, message.from_instance.clone()),
        (FIELD_TO, message.to_instance.clone()),
        (FIELD_TIMESTAMP, format_utc_seconds(&message.timestamp)),
        (FIELD_REQUIRES_ACK, encode_flag(message.requires_ack).to_string()),
        (FIELD_ACKNOWLEDGED, encode_flag(message.acknowledged).to_string()),
        (FIELD_SUBJECT, message.payload.subject.clone()),
        (FIELD_DESCRIPTION, message.payload.description.clone()),
    ];

    if let Some(ack_by) = &message.ack_by {
        fields.push((FIELD_ACK_BY, ack_by.clone()));
    }
    if let Some(ack_timestamp) = &message.ack_timestamp {
        fields.push((FIELD_ACK_TIMESTAMP, format_utc_seconds(ack_timestamp)));
    }
    if let Some(ack_comment) = &message.ack_comment {
        fields.push((FIELD_ACK_COMMENT, ack_comment.clone()));
    }

    fields
}

fn required<'a>(
    hash: &'a HashMap<String, String>,
    field: &str,
) -> CoordinationResult<&'a str> {
    hash.get(field)
        .map(String::as_str)
        .ok_or_else(|| CoordinationError::Serialization(format!("message hash missing `{field}`")))
}

/// Decode a message from its hash fields.
///
/// Missing optional acknowledgement fields decode to `None`; an unknown
/// message type or unparsable timestamp is a serialization error.
pub fn decode_message(hash: &HashMap<String, String>) -> CoordinationResult<CoordinationMessage> {
    let id = required(hash, FIELD_ID)?.to_string();

    let type_raw = required(hash, FIELD_TYPE)?;
    let msg_type = MessageType::from_str(type_raw).ok_or_else(|| {
        CoordinationError::Serialization(format!("unknown message type `{type_raw}`"))
    })?;

    let timestamp_raw = required(hash, FIELD_TIMESTAMP)?;
    let timestamp = parse_utc_seconds(timestamp_raw).map_err(|e| {
        CoordinationError::Serialization(format!("bad timestamp `{timestamp_raw}`: {e}"))
    })?;

    let ack_timestamp = hash
        .get(FIELD_ACK_TIMESTAMP)
        .map(|raw| {
            parse_utc_seconds(raw).map_err(|e| {
                CoordinationError::Serialization(format!("bad ack timestamp `{raw}`: {e}"))
            })
        })
        .transpose()?;

    Ok(CoordinationMessage {
        id,
        msg_type,
        from_instance: required(hash, FIELD_FROM)?.to_string(),
        to_instance: required(hash, FIELD_TO)?.to_string(),
        timestamp,
        requires_ack: hash.get(FIELD_REQUIRES_ACK).map(String::as_str) != Some("0"),
        acknowledged: hash.get(FIELD_ACKNOWLEDGED).map(String::as_str) == Some("1"),
        ack_by: hash.get(FIELD_ACK_BY).cloned(),
        ack_timestamp,
        ack_comment: hash.get(FIELD_ACK_COMMENT).cloned(),
        payload: MessagePayload {
            subject: hash.get(FIELD_SUBJECT).cloned().unwrap_or_default(),
            description: hash.get(FIELD_DESCRIPTION).cloned().unwrap_or_default(),
        },
    })
}

//! Signaling messages
//!
//! JSON objects exchanged with the viewer page:
//!
//! ```text
//! viewer → relay   {"type":"offer","sdp":"v=0..."}
//!                  {"candidate":"candidate:1 1 tcp ...","sdpMid":"0","sdpMLineIndex":0}
//!                  {"pong":true}
//! relay  → viewer  {"type":"answer","sdp":"v=0..."}
//!                  {"candidate":"...","sdpMid":"0","sdpMLineIndex":0}
//!                  {"ping":true}
//! ```
//!
//! Messages carry no envelope, so they are recognised by shape: ping/pong
//! flags first, then a session description with a non-empty `sdp`, then a
//! candidate with a non-empty `candidate` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SignalingError;

/// Longest excerpt of an unrecognized message kept in the error
const EXCERPT_LEN: usize = 64;

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// An SDP offer or answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A connectivity candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,

    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,

    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,

    #[serde(
        rename = "usernameFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Serialize)]
struct Ping {
    ping: bool,
}

#[derive(Serialize)]
struct Pong {
    pong: bool,
}

/// A message on the signaling channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    Offer(SessionDescription),
    Answer(SessionDescription),
    Candidate(IceCandidate),
    /// Liveness check
    Ping,
    /// Liveness check acknowledgement
    Pong,
}

impl SignalMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Offer(_) => "offer",
            SignalMessage::Answer(_) => "answer",
            SignalMessage::Candidate(_) => "candidate",
            SignalMessage::Ping => "ping",
            SignalMessage::Pong => "pong",
        }
    }

    /// Decode a JSON text message
    pub fn parse(text: &str) -> Result<Self, SignalingError> {
        let value: Value = serde_json::from_str(text)?;

        if flag(&value, "pong") {
            return Ok(SignalMessage::Pong);
        }
        if flag(&value, "ping") {
            return Ok(SignalMessage::Ping);
        }

        if non_empty(&value, "sdp") {
            let desc: SessionDescription = serde_json::from_value(value)?;
            return match desc.sdp_type {
                SdpType::Offer => Ok(SignalMessage::Offer(desc)),
                SdpType::Answer => Ok(SignalMessage::Answer(desc)),
                _ => Err(SignalingError::Unrecognized(excerpt(text))),
            };
        }

        if non_empty(&value, "candidate") {
            let candidate: IceCandidate = serde_json::from_value(value)?;
            return Ok(SignalMessage::Candidate(candidate));
        }

        Err(SignalingError::Unrecognized(excerpt(text)))
    }

    /// Encode as a JSON text message
    pub fn to_json(&self) -> Result<String, SignalingError> {
        let json = match self {
            SignalMessage::Offer(desc) | SignalMessage::Answer(desc) => {
                serde_json::to_string(desc)?
            }
            SignalMessage::Candidate(candidate) => serde_json::to_string(candidate)?,
            SignalMessage::Ping => serde_json::to_string(&Ping { ping: true })?,
            SignalMessage::Pong => serde_json::to_string(&Pong { pong: true })?,
        };
        Ok(json)
    }
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn non_empty(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offer() {
        let msg = SignalMessage::parse(r#"{"type":"offer","sdp":"v=0\r\n"}"#).unwrap();
        assert_eq!(msg, SignalMessage::Offer(SessionDescription::offer("v=0\r\n")));
        assert_eq!(msg.kind(), "offer");
    }

    #[test]
    fn test_parse_candidate() {
        let msg = SignalMessage::parse(
            r#"{"candidate":"candidate:1 1 tcp 1 10.0.0.1 8514 typ host","sdpMid":"0","sdpMLineIndex":0,"usernameFragment":"abc"}"#,
        )
        .unwrap();

        let SignalMessage::Candidate(c) = msg else {
            panic!("expected candidate");
        };
        assert!(c.candidate.starts_with("candidate:1"));
        assert_eq!(c.sdp_mid.as_deref(), Some("0"));
        assert_eq!(c.sdp_mline_index, Some(0));
        assert_eq!(c.username_fragment.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_ping_pong() {
        assert_eq!(SignalMessage::parse(r#"{"pong":true}"#).unwrap(), SignalMessage::Pong);
        assert_eq!(SignalMessage::parse(r#"{"ping":true}"#).unwrap(), SignalMessage::Ping);
    }

    #[test]
    fn test_empty_fields_are_not_messages() {
        for text in [
            r#"{"pong":false}"#,
            r#"{"type":"offer","sdp":""}"#,
            r#"{"candidate":""}"#,
            r#"{"hello":"world"}"#,
        ] {
            assert!(
                matches!(SignalMessage::parse(text), Err(SignalingError::Unrecognized(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SignalMessage::parse("not json"),
            Err(SignalingError::Json(_))
        ));
    }

    #[test]
    fn test_rollback_is_unrecognized() {
        assert!(matches!(
            SignalMessage::parse(r#"{"type":"rollback","sdp":"x"}"#),
            Err(SignalingError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_encode_answer() {
        let json = SignalMessage::Answer(SessionDescription::answer("v=0")).to_json().unwrap();
        assert_eq!(json, r#"{"type":"answer","sdp":"v=0"}"#);
    }

    #[test]
    fn test_encode_ping() {
        assert_eq!(SignalMessage::Ping.to_json().unwrap(), r#"{"ping":true}"#);
        assert_eq!(SignalMessage::Pong.to_json().unwrap(), r#"{"pong":true}"#);
    }

    #[test]
    fn test_encode_candidate_omits_missing_fields() {
        let mut candidate = IceCandidate::new("candidate:2 1 tcp 2 ::1 8514 typ host");
        candidate.sdp_mline_index = Some(0);

        let json = SignalMessage::Candidate(candidate.clone()).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"candidate":"candidate:2 1 tcp 2 ::1 8514 typ host","sdpMLineIndex":0}"#
        );
        assert_eq!(
            SignalMessage::parse(&json).unwrap(),
            SignalMessage::Candidate(candidate)
        );
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = format!(r#"{{"x":"{}"}}"#, "a".repeat(500));
        let Err(SignalingError::Unrecognized(text)) = SignalMessage::parse(&long) else {
            panic!("expected unrecognized");
        };
        assert_eq!(text.len(), EXCERPT_LEN);
    }
}

//! Plivo audio streaming WebSocket frame types.
//!
//! This module defines the inbound events sent by Plivo's media server and
//! the outbound events an application sends back. Every frame is one JSON
//! object carrying an `event` discriminator.
//!
//! # Protocol Overview
//!
//! Inbound events (received from Plivo):
//! - start - Stream metadata (call id, stream id, media format)
//! - media - One chunk of base64 encoded audio
//! - dtmf - A detected keypad digit
//! - playedStream - A checkpoint sent earlier has finished playing
//! - clearedAudio - The outbound audio buffer was flushed
//!
//! Outbound events (sent to Plivo):
//! - playAudio - Queue base64 encoded audio for playback
//! - checkpoint - Mark a point in the outbound audio
//! - clearAudio - Discard queued audio that has not played yet
//!
//! Decoding is done in two steps: the discriminator is read first so that
//! an unknown kind can be told apart from a malformed known kind, then the
//! matching payload struct is deserialized.

use std::fmt;

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::base::ParseError;

/// Name of the discriminator field carried by every frame.
pub const EVENT_FIELD: &str = "event";

// =============================================================================
// Event Kinds
// =============================================================================

/// Inbound event kinds known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Media,
    Dtmf,
    PlayedStream,
    ClearedAudio,
}

impl EventKind {
    /// All known inbound kinds.
    pub const ALL: [EventKind; 5] = [
        EventKind::Start,
        EventKind::Media,
        EventKind::Dtmf,
        EventKind::PlayedStream,
        EventKind::ClearedAudio,
    ];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Media => "media",
            EventKind::Dtmf => "dtmf",
            EventKind::PlayedStream => "playedStream",
            EventKind::ClearedAudio => "clearedAudio",
        }
    }

    /// Look up a kind by its wire name. Matching is exact.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Inbound Events (received from Plivo)
// =============================================================================

/// Audio format negotiated for the stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaFormat {
    /// Audio encoding, e.g. `audio/x-mulaw`
    pub encoding: String,
    /// Sample rate in Hz, e.g. 8000
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
}

/// Body of the `start` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartData {
    /// Unique call identifier
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Unique stream identifier
    #[serde(rename = "streamId")]
    pub stream_id: String,
    /// Plivo account identifier
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Audio tracks in the stream, e.g. `["inbound"]`
    pub tracks: Vec<String>,
    /// Media format of the inbound audio
    #[serde(rename = "mediaFormat")]
    pub media_format: MediaFormat,
}

/// `start` event - first frame after the socket is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartEvent {
    /// Message sequence number
    #[serde(rename = "sequenceNumber")]
    pub sequence_number: u64,
    /// Stream metadata
    pub start: StartData,
    /// Extra headers as an opaque JSON string
    pub extra_headers: String,
}

impl StartEvent {
    /// Parse the extra headers, if they hold JSON.
    pub fn extra_headers_json(&self) -> Option<Value> {
        parse_extra_headers(&self.extra_headers)
    }
}

/// Body of the `media` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaData {
    /// Audio track, e.g. `inbound`
    pub track: String,
    /// Presentation timestamp in milliseconds from stream start
    pub timestamp: String,
    /// Chunk number, starts at 1 and increments per frame
    pub chunk: u64,
    /// Base64 encoded audio
    pub payload: String,
}

/// `media` event - one chunk of inbound audio.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaEvent {
    /// Message sequence number
    #[serde(rename = "sequenceNumber")]
    pub sequence_number: u64,
    /// Stream identifier
    #[serde(rename = "streamId")]
    pub stream_id: String,
    /// Audio chunk
    pub media: MediaData,
    /// Extra headers as an opaque JSON string
    pub extra_headers: String,
}

impl MediaEvent {
    /// Decode the base64 payload into raw audio bytes.
    pub fn raw_media(&self) -> Result<Bytes, base64::DecodeError> {
        BASE64_STANDARD
            .decode(self.media.payload.as_bytes())
            .map(Bytes::from)
    }

    /// Parse the extra headers, if they hold JSON.
    pub fn extra_headers_json(&self) -> Option<Value> {
        parse_extra_headers(&self.extra_headers)
    }
}

/// Body of the `dtmf` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DtmfData {
    /// Audio track the digit was detected on
    pub track: String,
    /// The detected digit
    pub digit: char,
    /// Timestamp in milliseconds
    pub timestamp: String,
}

/// `dtmf` event - a keypad digit was detected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DtmfEvent {
    /// Message sequence number
    #[serde(rename = "sequenceNumber")]
    pub sequence_number: u64,
    /// Stream identifier
    #[serde(rename = "streamId")]
    pub stream_id: String,
    /// Digit details
    pub dtmf: DtmfData,
    /// Extra headers as an opaque JSON string
    pub extra_headers: String,
}

impl DtmfEvent {
    /// Parse the extra headers, if they hold JSON.
    pub fn extra_headers_json(&self) -> Option<Value> {
        parse_extra_headers(&self.extra_headers)
    }
}

/// `playedStream` event - a checkpoint finished playing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayedStreamEvent {
    /// Message sequence number. Plivo sends this one as a string.
    #[serde(rename = "sequenceNumber", deserialize_with = "sequence_number_lenient")]
    pub sequence_number: u64,
    /// Stream identifier
    #[serde(rename = "streamId")]
    pub stream_id: String,
    /// Checkpoint name
    pub name: String,
}

/// `clearedAudio` event - the outbound buffer was flushed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClearedAudioEvent {
    /// Message sequence number
    #[serde(rename = "sequenceNumber")]
    pub sequence_number: u64,
    /// Stream identifier
    #[serde(rename = "streamId")]
    pub stream_id: String,
}

/// Any inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Start(StartEvent),
    Media(MediaEvent),
    Dtmf(DtmfEvent),
    PlayedStream(PlayedStreamEvent),
    ClearedAudio(ClearedAudioEvent),
}

impl InboundEvent {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::Start(_) => EventKind::Start,
            InboundEvent::Media(_) => EventKind::Media,
            InboundEvent::Dtmf(_) => EventKind::Dtmf,
            InboundEvent::PlayedStream(_) => EventKind::PlayedStream,
            InboundEvent::ClearedAudio(_) => EventKind::ClearedAudio,
        }
    }

    /// Server-assigned sequence number.
    pub fn sequence_number(&self) -> u64 {
        match self {
            InboundEvent::Start(e) => e.sequence_number,
            InboundEvent::Media(e) => e.sequence_number,
            InboundEvent::Dtmf(e) => e.sequence_number,
            InboundEvent::PlayedStream(e) => e.sequence_number,
            InboundEvent::ClearedAudio(e) => e.sequence_number,
        }
    }

    /// Stream id carried by the event.
    pub fn stream_id(&self) -> &str {
        match self {
            InboundEvent::Start(e) => &e.start.stream_id,
            InboundEvent::Media(e) => &e.stream_id,
            InboundEvent::Dtmf(e) => &e.stream_id,
            InboundEvent::PlayedStream(e) => &e.stream_id,
            InboundEvent::ClearedAudio(e) => &e.stream_id,
        }
    }
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// A known event with all required fields
    Event(InboundEvent),
    /// Valid JSON whose `event` value is not a known kind
    Unknown(String),
}

/// A frame parsed as a JSON object with its `event` value read, before the
/// kind-specific payload is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    name: String,
    value: Value,
}

impl RawFrame {
    /// Parse the text and read the discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is not a JSON object or has no
    /// string `event` field.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(raw).map_err(ParseError::InvalidJson)?;

        if !value.is_object() {
            return Err(ParseError::NotAnObject);
        }

        let name = value
            .get(EVENT_FIELD)
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingEvent)?
            .to_string();

        Ok(Self { name, value })
    }

    /// Value of the `event` field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Known kind, `None` for an unrecognized `event` value.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_wire(&self.name)
    }

    /// The whole frame, including fields the typed events do not keep.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Check the payload of the matched kind.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidPayload`] when a required field of the
    /// matched kind is missing or has the wrong type.
    pub fn decode(self) -> Result<DecodedFrame, ParseError> {
        let Some(kind) = self.kind() else {
            return Ok(DecodedFrame::Unknown(self.name));
        };

        let value = self.value;
        let invalid = |source| ParseError::InvalidPayload { event: kind, source };

        let event = match kind {
            EventKind::Start => InboundEvent::Start(serde_json::from_value(value).map_err(invalid)?),
            EventKind::Media => InboundEvent::Media(serde_json::from_value(value).map_err(invalid)?),
            EventKind::Dtmf => InboundEvent::Dtmf(serde_json::from_value(value).map_err(invalid)?),
            EventKind::PlayedStream => {
                InboundEvent::PlayedStream(serde_json::from_value(value).map_err(invalid)?)
            }
            EventKind::ClearedAudio => {
                InboundEvent::ClearedAudio(serde_json::from_value(value).map_err(invalid)?)
            }
        };

        Ok(DecodedFrame::Event(event))
    }
}

/// Decode one raw text frame.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is not a JSON object, has no string
/// `event` field, or lacks a required field of the matched kind. An
/// unrecognized kind is not an error; it decodes to [`DecodedFrame::Unknown`].
pub fn decode_frame(raw: &str) -> Result<DecodedFrame, ParseError> {
    RawFrame::parse(raw)?.decode()
}

/// Accept a sequence number sent either as a JSON number or a numeric string.
fn sequence_number_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("sequenceNumber '{s}' is not a number"))
        }),
    }
}

fn parse_extra_headers(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

// =============================================================================
// Outbound Events (sent to Plivo)
// =============================================================================

/// Audio handed to `send_media`.
///
/// The variant decides whether the bytes still need base64 encoding, so a
/// string that is already base64 is never encoded twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPayload {
    /// Raw audio bytes; encoded to base64 when the frame is built
    Raw(Bytes),
    /// Audio that is already base64 encoded; sent verbatim
    Base64(String),
}

impl AudioPayload {
    /// Wrap a string that is already base64 encoded.
    pub fn base64(encoded: impl Into<String>) -> Self {
        AudioPayload::Base64(encoded.into())
    }

    /// Base64 text to put on the wire.
    pub fn into_base64(self) -> String {
        match self {
            AudioPayload::Raw(bytes) => BASE64_STANDARD.encode(&bytes),
            AudioPayload::Base64(encoded) => encoded,
        }
    }
}

impl From<Bytes> for AudioPayload {
    fn from(bytes: Bytes) -> Self {
        AudioPayload::Raw(bytes)
    }
}

impl From<Vec<u8>> for AudioPayload {
    fn from(bytes: Vec<u8>) -> Self {
        AudioPayload::Raw(Bytes::from(bytes))
    }
}

impl From<&[u8]> for AudioPayload {
    fn from(bytes: &[u8]) -> Self {
        AudioPayload::Raw(Bytes::copy_from_slice(bytes))
    }
}

/// Media body of the `playAudio` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayAudioMedia {
    /// Audio content type, e.g. `audio/x-mulaw` or `audio/x-l16`
    #[serde(rename = "contentType")]
    pub content_type: String,
    /// Sample rate in Hz
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    /// Base64 encoded audio
    pub payload: String,
}

/// Events sent to Plivo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum OutboundEvent {
    /// Queue audio for playback
    #[serde(rename = "playAudio")]
    PlayAudio {
        /// Audio body
        media: PlayAudioMedia,
    },

    /// Mark a point in the outbound audio
    #[serde(rename = "checkpoint")]
    Checkpoint {
        /// Stream identifier
        #[serde(rename = "streamId")]
        stream_id: String,
        /// Checkpoint label echoed back in `playedStream`
        name: String,
    },

    /// Discard queued audio that has not played yet
    #[serde(rename = "clearAudio")]
    ClearAudio {
        /// Stream identifier
        #[serde(rename = "streamId")]
        stream_id: String,
    },
}

impl OutboundEvent {
    /// Build a `playAudio` event.
    pub fn play_audio(
        payload: impl Into<AudioPayload>,
        content_type: impl Into<String>,
        sample_rate: u32,
    ) -> Self {
        OutboundEvent::PlayAudio {
            media: PlayAudioMedia {
                content_type: content_type.into(),
                sample_rate,
                payload: payload.into().into_base64(),
            },
        }
    }

    /// Build a `checkpoint` event.
    pub fn checkpoint(stream_id: impl Into<String>, name: impl Into<String>) -> Self {
        OutboundEvent::Checkpoint {
            stream_id: stream_id.into(),
            name: name.into(),
        }
    }

    /// Build a `clearAudio` event.
    pub fn clear_audio(stream_id: impl Into<String>) -> Self {
        OutboundEvent::ClearAudio {
            stream_id: stream_id.into(),
        }
    }

    /// Wire name of the event.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundEvent::PlayAudio { .. } => "playAudio",
            OutboundEvent::Checkpoint { .. } => "checkpoint",
            OutboundEvent::ClearAudio { .. } => "clearAudio",
        }
    }

    /// Encode the event as one text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const START: &str = r#"{
        "sequenceNumber": 0,
        "event": "start",
        "start": {
            "callId": "c1b5f6a2-0000-4000-8000-000000000001",
            "streamId": "S1",
            "accountId": "MA123",
            "tracks": ["inbound"],
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000}
        },
        "extra_headers": "{\"X-Campaign\": \"spring\"}"
    }"#;

    fn expect_event(raw: &str) -> InboundEvent {
        match decode_frame(raw).unwrap() {
            DecodedFrame::Event(event) => event,
            DecodedFrame::Unknown(name) => panic!("unexpected unknown event {name}"),
        }
    }

    #[test]
    fn test_decode_start() {
        let InboundEvent::Start(event) = expect_event(START) else {
            panic!("Wrong event type");
        };
        assert_eq!(event.sequence_number, 0);
        assert_eq!(event.start.stream_id, "S1");
        assert_eq!(event.start.account_id, "MA123");
        assert_eq!(event.start.tracks, vec!["inbound".to_string()]);
        assert_eq!(event.start.media_format.encoding, "audio/x-mulaw");
        assert_eq!(event.start.media_format.sample_rate, 8000);
        assert_eq!(
            event.extra_headers_json().unwrap()["X-Campaign"],
            "spring"
        );
    }

    #[test]
    fn test_decode_media() {
        let raw = r#"{"sequenceNumber":3,"streamId":"S1","event":"media",
            "media":{"track":"inbound","timestamp":"1280","chunk":2,"payload":"AAEC"},
            "extra_headers":""}"#;
        let InboundEvent::Media(event) = expect_event(raw) else {
            panic!("Wrong event type");
        };
        assert_eq!(event.media.chunk, 2);
        assert_eq!(event.media.timestamp, "1280");
        assert_eq!(event.raw_media().unwrap(), Bytes::from_static(&[0, 1, 2]));
        assert!(event.extra_headers_json().is_none());
    }

    #[test]
    fn test_decode_dtmf() {
        let raw = r#"{"event":"dtmf","sequenceNumber":7,"streamId":"S1",
            "dtmf":{"track":"inbound","digit":"5","timestamp":"4000"},"extra_headers":"{}"}"#;
        let InboundEvent::Dtmf(event) = expect_event(raw) else {
            panic!("Wrong event type");
        };
        assert_eq!(event.dtmf.digit, '5');
        assert_eq!(event.dtmf.timestamp, "4000");
    }

    #[test]
    fn test_decode_dtmf_rejects_multi_char_digit() {
        let raw = r#"{"event":"dtmf","sequenceNumber":7,"streamId":"S1",
            "dtmf":{"track":"inbound","digit":"12","timestamp":"4000"},"extra_headers":""}"#;
        assert!(matches!(
            decode_frame(raw),
            Err(ParseError::InvalidPayload { event: EventKind::Dtmf, .. })
        ));
    }

    #[test]
    fn test_played_stream_sequence_number_as_string() {
        let raw = r#"{"event":"playedStream","sequenceNumber":"42","streamId":"S1","name":"done"}"#;
        let InboundEvent::PlayedStream(event) = expect_event(raw) else {
            panic!("Wrong event type");
        };
        assert_eq!(event.sequence_number, 42);
        assert_eq!(event.name, "done");
    }

    #[test]
    fn test_played_stream_sequence_number_as_int() {
        let raw = r#"{"event":"playedStream","sequenceNumber":42,"streamId":"S1","name":"done"}"#;
        assert_eq!(expect_event(raw).sequence_number(), 42);
    }

    #[test]
    fn test_played_stream_rejects_non_numeric_sequence() {
        let raw = r#"{"event":"playedStream","sequenceNumber":"abc","streamId":"S1","name":"x"}"#;
        assert!(matches!(
            decode_frame(raw),
            Err(ParseError::InvalidPayload { event: EventKind::PlayedStream, .. })
        ));
    }

    #[test]
    fn test_decode_cleared_audio() {
        let raw = r#"{"sequenceNumber":9,"event":"clearedAudio","streamId":"S1"}"#;
        let event = expect_event(raw);
        assert_eq!(event.kind(), EventKind::ClearedAudio);
        assert_eq!(event.stream_id(), "S1");
        assert_eq!(event.sequence_number(), 9);
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(matches!(
            decode_frame("not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_decode_not_an_object() {
        assert!(matches!(decode_frame("[1,2]"), Err(ParseError::NotAnObject)));
    }

    #[test]
    fn test_decode_missing_event() {
        assert!(matches!(
            decode_frame(r#"{"sequenceNumber":1}"#),
            Err(ParseError::MissingEvent)
        ));
        assert!(matches!(
            decode_frame(r#"{"event":5}"#),
            Err(ParseError::MissingEvent)
        ));
    }

    #[test]
    fn test_decode_media_without_body() {
        let err = decode_frame(r#"{"event":"media"}"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidPayload { event: EventKind::Media, .. }
        ));
        assert!(err.to_string().starts_with("Invalid 'media' frame"));
    }

    #[test]
    fn test_decode_wrong_field_type() {
        let raw = r#"{"sequenceNumber":"3","streamId":"S1","event":"media",
            "media":{"track":"inbound","timestamp":"1","chunk":1,"payload":""},"extra_headers":""}"#;
        assert!(decode_frame(raw).is_err());
    }

    #[test]
    fn test_decode_unknown_event() {
        let decoded = decode_frame(r#"{"event":"mark","streamId":"S1"}"#).unwrap();
        assert_eq!(decoded, DecodedFrame::Unknown("mark".to_string()));
    }

    #[test]
    fn test_raw_frame_keeps_extra_fields() {
        let raw = r#"{"event":"dtmf","sequenceNumber":7,"streamId":"S1","vendorTag":"x",
            "dtmf":{"track":"inbound","digit":"5","timestamp":"4000","duration":120},"extra_headers":""}"#;
        let frame = RawFrame::parse(raw).unwrap();
        assert_eq!(frame.name(), "dtmf");
        assert_eq!(frame.kind(), Some(EventKind::Dtmf));
        assert_eq!(frame.value()["vendorTag"], "x");
        assert_eq!(frame.value()["dtmf"]["duration"], 120);

        let DecodedFrame::Event(InboundEvent::Dtmf(event)) = frame.decode().unwrap() else {
            panic!("Wrong event type");
        };
        assert_eq!(event.dtmf.digit, '5');
    }

    #[test]
    fn test_raw_frame_parses_before_payload_check() {
        let frame = RawFrame::parse(r#"{"event":"media","streamId":"S1"}"#).unwrap();
        assert_eq!(frame.kind(), Some(EventKind::Media));
        assert!(matches!(
            frame.decode(),
            Err(ParseError::InvalidPayload { event: EventKind::Media, .. })
        ));

        let unknown = RawFrame::parse(r#"{"event":"mark"}"#).unwrap();
        assert_eq!(unknown.kind(), None);
        assert_eq!(unknown.decode().unwrap(), DecodedFrame::Unknown("mark".to_string()));
    }

    #[test]
    fn test_event_kind_wire_names() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_wire("Start"), None);
        assert_eq!(EventKind::PlayedStream.to_string(), "playedStream");
    }

    #[test]
    fn test_play_audio_encodes_raw_bytes() {
        let event = OutboundEvent::play_audio(vec![0u8, 1, 2, 3], "audio/x-l16", 16000);
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "playAudio");
        assert_eq!(value["media"]["contentType"], "audio/x-l16");
        assert_eq!(value["media"]["sampleRate"], 16000);
        let decoded = BASE64_STANDARD
            .decode(value["media"]["payload"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, vec![0u8, 1, 2, 3]);
    }

    #[test]
    fn test_play_audio_frame_shape() {
        let frame = OutboundEvent::play_audio(AudioPayload::base64("AAEC"), "audio/x-mulaw", 8000)
            .to_json()
            .unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "playAudio",
                "media": {"contentType": "audio/x-mulaw", "sampleRate": 8000, "payload": "AAEC"}
            })
        );
    }

    #[test]
    fn test_play_audio_keeps_base64_verbatim() {
        let event = OutboundEvent::play_audio(AudioPayload::base64("AAEC"), "audio/x-mulaw", 8000);
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["media"]["payload"], "AAEC");
    }

    #[test]
    fn test_checkpoint_frame_shape() {
        let frame = OutboundEvent::checkpoint("S1", "done").to_json().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"event": "checkpoint", "streamId": "S1", "name": "done"})
        );
    }

    #[test]
    fn test_clear_audio_frame_shape() {
        let frame = OutboundEvent::clear_audio("S1").to_json().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"event": "clearAudio", "streamId": "S1"}));
    }

    #[test]
    fn test_outbound_json_matches_serde_shape() {
        let event = OutboundEvent::checkpoint("S9", "greeting");
        let parsed: OutboundEvent = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.event_name(), "checkpoint");
    }
}

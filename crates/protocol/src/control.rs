//! Control-Protokoll (TCP/TLS)
//!
//! Definiert alle Steuerungsnachrichten die ueber die Kontrollverbindung
//! zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Request/Response Pattern: jede Nachricht hat eine `request_id: u32`
//! - Server-initiierte Nachrichten (Options-Updates, Abonnements) tragen
//!   `request_id = 0`
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enums fuer typsichere Nachrichtentypen

use nahklang_core::types::StreamKey;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    NotFound,
    // Peer-Beziehungen
    UnsupportedMode,
    NotReady,
    UnknownPeer,
}

// ---------------------------------------------------------------------------
// Peer-Optionen
// ---------------------------------------------------------------------------

/// Render-Optionen fuer einen einzelnen Peer-Stream
///
/// Beschreibt wie der Besitzer der Beziehung vom Peer dargestellt werden
/// soll. Wird an Abonnements angehaengt und bei Aenderungen per
/// `VoiceOptionsUpdate` nachgereicht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePeerOptions {
    /// Raeumliches Audio-Rendering (Entfernungsdaempfung, Panning)
    pub spatial_audio: bool,
    /// Peer in der Teilnehmerliste sichtbar
    pub visible: bool,
}

impl Default for VoicePeerOptions {
    fn default() -> Self {
        Self {
            spatial_audio: true,
            visible: true,
        }
    }
}

impl VoicePeerOptions {
    /// Optionen fuer statische Peers: nie raeumlich, Sichtbarkeit waehlbar
    pub fn statisch(visible: bool) -> Self {
        Self {
            spatial_audio: false,
            visible,
        }
    }
}

// ---------------------------------------------------------------------------
// Voice-Peer-Nachrichten
// ---------------------------------------------------------------------------

/// Options-Update fuer einen bereits abonnierten Stream
///
/// Wird an die Verbindung des Beziehungs-Besitzers adressiert und traegt
/// den StreamKey des Peers, damit der Client die Optionen gegen den
/// richtigen entfernten Stream anwendet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceOptionsUpdatePayload {
    /// StreamKey des Peers dessen Darstellung sich aendert
    pub target_stream_key: StreamKey,
    /// Neue Render-Optionen
    pub options: VoicePeerOptions,
}

/// Aufforderung an den Client, einen Stream zu abonnieren
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSubscribePayload {
    /// StreamKey des zu abonnierenden Streams
    pub stream_key: StreamKey,
    /// Render-Optionen fuer den neuen Stream
    pub options: VoicePeerOptions,
}

/// Aufforderung an den Client, ein Stream-Abonnement zu beenden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceUnsubscribePayload {
    /// StreamKey des zu trennenden Streams
    pub stream_key: StreamKey,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    /// Originaler Timestamp aus dem Ping
    pub echo_timestamp_ms: u64,
    /// Server-eigener Timestamp
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlMessage
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    // Voice-Peers
    VoiceOptionsUpdate(VoiceOptionsUpdatePayload),
    VoiceSubscribe(VoiceSubscribePayload),
    VoiceUnsubscribe(VoiceUnsubscribePayload),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Error
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    /// Optionale maschinenlesbare Details
    pub details: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Nachricht traegt eine `request_id` die der Client vergibt.
/// Der Server kopiert die ID in die Antwort damit der Client
/// Request und Response zuordnen kann. Server-Pushes tragen die ID 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Eindeutige Nachrichten-ID fuer Request/Response-Zuordnung
    pub request_id: u32,
    /// Inhalt der Nachricht
    pub payload: ControlPayload,
}

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt ein Options-Update fuer einen Peer-Stream (Server-Push)
    pub fn options_update(target_stream_key: StreamKey, options: VoicePeerOptions) -> Self {
        Self::new(
            0,
            ControlPayload::VoiceOptionsUpdate(VoiceOptionsUpdatePayload {
                target_stream_key,
                options,
            }),
        )
    }

    /// Erstellt eine Abonnement-Aufforderung (Server-Push)
    pub fn subscribe(stream_key: StreamKey, options: VoicePeerOptions) -> Self {
        Self::new(
            0,
            ControlPayload::VoiceSubscribe(VoiceSubscribePayload {
                stream_key,
                options,
            }),
        )
    }

    /// Erstellt eine Abonnement-Trennung (Server-Push)
    pub fn unsubscribe(stream_key: StreamKey) -> Self {
        Self::new(
            0,
            ControlPayload::VoiceUnsubscribe(VoiceUnsubscribePayload { stream_key }),
        )
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
                details: None,
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

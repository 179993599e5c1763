//! nahklang-protocol – Protokoll-Definitionen
//!
//! Enthaelt die Nachrichtentypen des Control-Protokolls. Die eigentliche
//! Zustellung (Framing, Transport) liegt ausserhalb dieses Crates und wird
//! als zuverlaessig und geordnet pro Verbindung angenommen.

pub mod control;

pub use control::{ControlMessage, ControlPayload, ErrorCode, VoicePeerOptions};

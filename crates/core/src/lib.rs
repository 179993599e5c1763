//! nahklang-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Nahklang-Crates gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{BetriebsModus, ServerId, StreamKey, UserId};

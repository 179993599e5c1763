//! Gemeinsame Identifikationstypen fuer Nahklang
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID
///
/// Stabiler, opaker Schluessel fuer alle Peer-Beziehungsmengen.
/// Unveraenderlich fuer die Lebensdauer einer Verbindung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Server-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(pub Uuid);

impl ServerId {
    /// Erstellt eine neue zufaellige ServerId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "server:{}", self.0)
    }
}

/// Opakes Handle auf den ausgehenden Audio-Stream einer Session
///
/// Wird Peers gegenueber offengelegt damit sie den Stream abonnieren
/// koennen. Wird bei Session-Erstellung vergeben und bleibt fuer die
/// Lebensdauer der Session konstant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamKey(pub Uuid);

impl StreamKey {
    /// Erstellt einen neuen zufaelligen StreamKey
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for StreamKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream:{}", self.0)
    }
}

/// Betriebsmodus des Servers
///
/// Peer-Beziehungsoperationen stehen nur im raeumlichen Modus zur
/// Verfuegung; im reinen Sendungsmodus (ein Stream an alle, keine
/// Peer-Beziehungen) schlagen sie sofort fehl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetriebsModus {
    /// Raeumlicher Voice-Chat mit Naehe- und statischen Peers
    Raeumlich,
    /// Reiner Sendungsbetrieb ohne Peer-Beziehungen
    Sendung,
}

impl Default for BetriebsModus {
    fn default() -> Self {
        Self::Raeumlich
    }
}

impl std::fmt::Display for BetriebsModus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raeumlich => write!(f, "raeumlich"),
            Self::Sendung => write!(f, "sendung"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn stream_key_eindeutig() {
        let a = StreamKey::new();
        let b = StreamKey::new();
        assert_ne!(a, b);
    }

    #[test]
    fn stream_key_display() {
        let key = StreamKey(Uuid::nil());
        assert!(key.to_string().starts_with("stream:"));
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }

    #[test]
    fn betriebsmodus_serde_schreibweise() {
        let json = serde_json::to_string(&BetriebsModus::Raeumlich).unwrap();
        assert_eq!(json, "\"raeumlich\"");
        let modus: BetriebsModus = serde_json::from_str("\"sendung\"").unwrap();
        assert_eq!(modus, BetriebsModus::Sendung);
    }
}

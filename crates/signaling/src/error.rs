//! Fehlertypen fuer die Peer-Beziehungs-Engine
//!
//! Alle Fehler sind synchron und fail-fast: Pruefungen laufen vor jeder
//! Zustandsaenderung, kein Aufruf mutiert teilweise und schlaegt dann
//! fehl. Wiederholungen liegen beim Aufrufer (z.B. nach hergestellter
//! Bereitschaft erneut aufrufen).

use nahklang_core::types::{BetriebsModus, UserId};
use thiserror::Error;

/// Fehlertyp der Peer-Beziehungs-Engine
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Operation ausserhalb des unterstuetzten Betriebsmodus aufgerufen
    #[error("Peer-Operationen sind im Modus '{0}' nicht verfuegbar")]
    ModusNichtUnterstuetzt(BetriebsModus),

    /// Eine oder beide Sessions sind nicht bereit
    #[error("Beide Sessions muessen bereit sein (verbunden und Voice-Chat aktiviert)")]
    NichtBereit,

    /// Ziel-Identitaet steht in keiner Beziehungsmenge des Besitzers
    #[error("Peer {0} ist mit diesem Client nicht verbunden")]
    UnbekannterPeer(UserId),

    /// Keine lebende Session fuer die Identitaet
    #[error("Keine aktive Session fuer {0}")]
    SessionNichtGefunden(UserId),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,

    /// Senden an Client fehlgeschlagen (Queue voll oder geschlossen)
    #[error("Senden fehlgeschlagen")]
    SendFehler,
}

/// Result-Typ der Peer-Beziehungs-Engine
pub type SignalingResult<T> = Result<T, SignalingError>;

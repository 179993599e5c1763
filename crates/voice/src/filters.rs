//! Filter-Registry – benutzerdefinierte Hoerbarkeits-Filter
//!
//! Prozessweite, append-only Sammlung von Praedikaten die entscheiden ob
//! eine Peer-Beziehung beim Rendern unterdrueckt wird. Filter werden beim
//! Start bzw. beim Laden einer Erweiterung einmal registriert und in
//! diesem Umfang nie entfernt.
//!
//! Die Registry wird als `Arc<FilterRegistry>` injiziert statt als echtes
//! Global gehalten, damit Tests eine isolierte Instanz verwenden koennen.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::session::VoiceSession;

/// Praedikat das entscheidet ob ein Peer fuer einen Besitzer hoerbar ist
pub trait PeerFilter: Send + Sync {
    /// `true` wenn `peer` fuer `besitzer` hoerbar bleiben soll
    fn hoerbar(&self, besitzer: &VoiceSession, peer: &VoiceSession) -> bool;
}

impl<F> PeerFilter for F
where
    F: Fn(&VoiceSession, &VoiceSession) -> bool + Send + Sync,
{
    fn hoerbar(&self, besitzer: &VoiceSession, peer: &VoiceSession) -> bool {
        self(besitzer, peer)
    }
}

/// Append-only Registry aller Hoerbarkeits-Filter
#[derive(Default)]
pub struct FilterRegistry {
    filter: RwLock<Vec<Arc<dyn PeerFilter>>>,
}

impl FilterRegistry {
    /// Erstellt eine neue leere Registry
    pub fn neu() -> Self {
        Self {
            filter: RwLock::new(Vec::new()),
        }
    }

    /// Haengt einen Filter an die Registry an
    ///
    /// Keine weiteren Seiteneffekte; die Reihenfolge der Registrierung
    /// bleibt erhalten.
    pub fn registrieren(&self, filter: Arc<dyn PeerFilter>) {
        self.filter.write().push(filter);
        tracing::debug!(anzahl = self.anzahl(), "Hoerbarkeits-Filter registriert");
    }

    /// Gibt die vollstaendige, geordnete Registry zurueck
    pub fn alle(&self) -> Vec<Arc<dyn PeerFilter>> {
        self.filter.read().clone()
    }

    /// Anzahl der registrierten Filter
    pub fn anzahl(&self) -> usize {
        self.filter.read().len()
    }

    /// Wertet alle Filter fuer ein Paar aus
    ///
    /// Ein Peer ist hoerbar wenn JEDER registrierte Filter zustimmt;
    /// eine leere Registry unterdrueckt nichts.
    pub fn hoerbar(&self, besitzer: &VoiceSession, peer: &VoiceSession) -> bool {
        self.filter
            .read()
            .iter()
            .all(|f| f.hoerbar(besitzer, peer))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

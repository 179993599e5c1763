//! Naehe-Abgleich – uebernimmt die Ergebnisse der Naehe-Neuberechnung
//!
//! Die eigentliche Reichweiten-Berechnung (Welt-/Positionsabfragen) ist
//! ein externer Prozess; dieses Modul wendet nur deren Ergebnis auf die
//! Peer-Mengen an. Neu eingetretene Peers bekommen ein raeumliches
//! Abonnement eingereiht, verlassene eine Trennung – ueber dieselbe
//! Peer-Queue wie die statische API, unter demselben Session-Lock.

use nahklang_core::types::UserId;
use nahklang_protocol::control::VoicePeerOptions;
use nahklang_voice::registry::SessionRegistry;
use std::collections::HashSet;

/// Wendet Naehe-Neuberechnungen auf Sessions an
#[derive(Clone)]
pub struct NaeheAbgleich {
    registry: SessionRegistry,
}

impl NaeheAbgleich {
    /// Erstellt einen neuen Naehe-Abgleich
    pub fn neu(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Uebernimmt die aktuell hoerbaren Identitaeten fuer einen Besitzer
    ///
    /// Kandidaten ohne lebende, bereite Session werden uebersprungen –
    /// sie treten bei einer spaeteren Neuberechnung erneut ein. Ein nicht
    /// bereiter oder getrennter Besitzer ist ein No-op.
    pub fn uebernehmen(&self, besitzer: &UserId, in_reichweite: &HashSet<UserId>) {
        let besitzer_session = match self.registry.session(besitzer) {
            Some(s) if s.ist_bereit() => s,
            _ => return,
        };

        // Nur Kandidaten mit lebender, bereiter Session; nie der Besitzer selbst
        let gefiltert: HashSet<UserId> = in_reichweite
            .iter()
            .filter(|id| *id != besitzer)
            .filter(|id| {
                self.registry
                    .session(*id)
                    .map(|s| s.ist_bereit())
                    .unwrap_or(false)
            })
            .copied()
            .collect();

        let diff = besitzer_session.naehe_uebernehmen(&gefiltert);
        if diff.eingetreten.is_empty() && diff.verlassen.is_empty() {
            return;
        }

        for id in &diff.eingetreten {
            if let Some(peer_session) = self.registry.session(id) {
                besitzer_session
                    .warteschlange()
                    .abonnieren(peer_session.stream_key(), VoicePeerOptions::default());
            }
        }
        for id in &diff.verlassen {
            // Session kann schon weg sein – die eifrige Bereinigung hat
            // die Kante dann bereits entfernt
            if let Some(peer_session) = self.registry.session(id) {
                besitzer_session
                    .warteschlange()
                    .trennen(peer_session.stream_key());
            }
        }

        tracing::debug!(
            besitzer = %besitzer,
            eingetreten = diff.eingetreten.len(),
            verlassen = diff.verlassen.len(),
            "Naehe-Abgleich uebernommen"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

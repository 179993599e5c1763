//! Session-Registry – Identitaet -> lebende Session
//!
//! Zentraler Lookup fuer alle aktiven Voice-Sessions. Die Engine loest
//! Peer-Identitaeten immer hier auf statt vom Aufrufer gehaltene (und
//! moeglicherweise veraltete) Referenzen zu verwenden.
//!
//! Disconnect-Politik: eifrige Bereinigung. Beim Entfernen einer Session
//! wird ihre Identitaet aus den Peer-Mengen aller verbleibenden Sessions
//! ausgetragen; die Queue der entfernten Session verfaellt mit ihr.
//! Lookups einer getrennten Identitaet liefern `None` – abwesend, kein
//! Fehler.

use dashmap::DashMap;
use nahklang_core::types::UserId;
use std::sync::Arc;

use crate::session::VoiceSession;

/// Registry aller aktiven Voice-Sessions
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<SessionRegistryInner>,
}

struct SessionRegistryInner {
    /// Lebende Sessions, indiziert nach UserId
    sessions: DashMap<UserId, Arc<VoiceSession>>,
}

impl SessionRegistry {
    /// Erstellt eine neue leere Registry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(SessionRegistryInner {
                sessions: DashMap::new(),
            }),
        }
    }

    /// Legt eine neue Session fuer die Identitaet an und registriert sie
    ///
    /// Eine bestehende Session derselben Identitaet (Reconnect) wird
    /// ersetzt; ihre Peer-Eintraege bei anderen Sessions bleiben gueltig,
    /// da die Identitaet dieselbe ist.
    pub fn registrieren(&self, user_id: UserId) -> Arc<VoiceSession> {
        let session = Arc::new(VoiceSession::neu(user_id));
        if self
            .inner
            .sessions
            .insert(user_id, Arc::clone(&session))
            .is_some()
        {
            tracing::warn!(user_id = %user_id, "Bestehende Session ersetzt (Reconnect)");
        } else {
            tracing::info!(user_id = %user_id, stream_key = %session.stream_key(), "Session registriert");
        }
        session
    }

    /// Entfernt eine Session und bereinigt alle Gegenseiten
    ///
    /// Traegt die Identitaet eifrig aus den Peer-Mengen aller anderen
    /// Sessions aus, damit keine Kante auf eine tote Session zeigt.
    pub fn entfernen(&self, user_id: &UserId) -> Option<Arc<VoiceSession>> {
        let (_, session) = self.inner.sessions.remove(user_id)?;
        for eintrag in self.inner.sessions.iter() {
            eintrag.value().peer_austragen_alle(user_id);
        }
        tracing::info!(user_id = %user_id, "Session entfernt, Gegenseiten bereinigt");
        Some(session)
    }

    /// Loest eine Identitaet zur lebenden Session auf
    pub fn session(&self, user_id: &UserId) -> Option<Arc<VoiceSession>> {
        self.inner.sessions.get(user_id).map(|e| Arc::clone(e.value()))
    }

    /// Prueft ob eine Session registriert ist
    pub fn ist_registriert(&self, user_id: &UserId) -> bool {
        self.inner.sessions.contains_key(user_id)
    }

    /// Gibt alle registrierten Sessions zurueck
    ///
    /// Iteriert ueber die DashMap – nicht im Hot Path verwenden.
    pub fn alle(&self) -> Vec<Arc<VoiceSession>> {
        self.inner
            .sessions
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect()
    }

    /// Anzahl der registrierten Sessions
    pub fn anzahl(&self) -> usize {
        self.inner.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_und_aufloesen() {
        let registry = SessionRegistry::neu();
        let uid = UserId::new();

        let session = registry.registrieren(uid);
        assert!(registry.ist_registriert(&uid));
        assert_eq!(registry.anzahl(), 1);

        let aufgeloest = registry.session(&uid).expect("Session muss existieren");
        assert_eq!(aufgeloest.stream_key(), session.stream_key());
    }

    #[test]
    fn entfernte_identitaet_ist_abwesend() {
        let registry = SessionRegistry::neu();
        let uid = UserId::new();
        registry.registrieren(uid);
        registry.entfernen(&uid);

        assert!(registry.session(&uid).is_none());
        assert!(!registry.ist_registriert(&uid));
    }

    #[test]
    fn entfernen_bereinigt_peer_mengen_der_anderen() {
        let registry = SessionRegistry::neu();
        let a = UserId::new();
        let b = UserId::new();
        let session_a = registry.registrieren(a);
        registry.registrieren(b);

        session_a.statisch_eintragen(b);
        session_a.naehe_uebernehmen(&[b].into_iter().collect());
        assert!(session_a.ist_peer(&b));

        registry.entfernen(&b);
        assert!(!session_a.ist_peer(&b), "Kante auf tote Session muss weg");
    }

    #[test]
    fn reconnect_ersetzt_session() {
        let registry = SessionRegistry::neu();
        let uid = UserId::new();

        let erste = registry.registrieren(uid);
        let zweite = registry.registrieren(uid);
        assert_eq!(registry.anzahl(), 1);
        // Neue Session bekommt einen frischen StreamKey
        assert_ne!(erste.stream_key(), zweite.stream_key());
    }
}

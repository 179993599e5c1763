//! Queue-Abgleich – verwandelt Peer-Auftraege in Netzwerk-Nachrichten
//!
//! Der einzige Konsument der Peer-Queues. Laeuft periodisch, leert pro
//! Session die Queue in FIFO-Reihenfolge und sendet Abonnier-/Trenn-
//! Nachrichten an die eigene Verbindung der Session.
//!
//! Idempotenz: pro Session wird die Menge der aktiven Abonnements
//! mitgefuehrt. Ein Abonnement fuer einen bereits aktiven Stream ist ein
//! No-op, ebenso eine Trennung fuer einen inaktiven.

use dashmap::DashMap;
use nahklang_core::types::{StreamKey, UserId};
use nahklang_protocol::control::ControlMessage;
use nahklang_voice::queue::PeerAuftrag;
use nahklang_voice::registry::SessionRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::broadcast::EventBroadcaster;

/// Periodischer Abgleich der Peer-Queues
pub struct QueueAbgleich {
    registry: SessionRegistry,
    broadcaster: EventBroadcaster,
    /// Aktive Abonnements pro Session (StreamKeys)
    aktive: DashMap<UserId, HashSet<StreamKey>>,
}

impl QueueAbgleich {
    /// Erstellt einen neuen Abgleich
    pub fn neu(registry: SessionRegistry, broadcaster: EventBroadcaster) -> Self {
        Self {
            registry,
            broadcaster,
            aktive: DashMap::new(),
        }
    }

    /// Verarbeitet die Queues aller Sessions einmal
    ///
    /// Gibt die Anzahl der versendeten Nachrichten zurueck.
    pub fn tick(&self) -> usize {
        let mut gesendet = 0;

        for session in self.registry.alle() {
            let user_id = session.user_id();
            let auftraege = session.warteschlange().leeren();
            if auftraege.is_empty() {
                continue;
            }

            let mut aktive = self.aktive.entry(user_id).or_default();
            for auftrag in auftraege {
                match auftrag {
                    PeerAuftrag::Abonnieren {
                        stream_key,
                        optionen,
                    } => {
                        if aktive.contains(&stream_key) {
                            // Bereits abonniert – idempotent
                            continue;
                        }
                        let nachricht = ControlMessage::subscribe(stream_key, optionen);
                        if self.broadcaster.an_user_senden(&user_id, nachricht) {
                            aktive.insert(stream_key);
                            gesendet += 1;
                        }
                    }
                    PeerAuftrag::Trennen { stream_key } => {
                        if !aktive.remove(&stream_key) {
                            // Nie abonniert – idempotent
                            continue;
                        }
                        let nachricht = ControlMessage::unsubscribe(stream_key);
                        if self.broadcaster.an_user_senden(&user_id, nachricht) {
                            gesendet += 1;
                        }
                    }
                }
            }
        }

        if gesendet > 0 {
            tracing::debug!(gesendet, "Queue-Abgleich abgeschlossen");
        }
        gesendet
    }

    /// Verwirft den Abonnement-Zustand einer getrennten Session
    pub fn client_entfernt(&self, user_id: &UserId) {
        self.aktive.remove(user_id);
    }

    /// Startet den periodischen Abgleich als Hintergrund-Task
    pub fn starten(self: Arc<Self>, intervall: Duration) -> tokio::task::JoinHandle<()> {
        let abgleich = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(intervall);
            loop {
                ticker.tick().await;
                abgleich.tick();
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nahklang_protocol::control::{ControlPayload, VoicePeerOptions};

    struct TestAufbau {
        registry: SessionRegistry,
        broadcaster: EventBroadcaster,
        abgleich: QueueAbgleich,
    }

    fn aufbau() -> TestAufbau {
        let registry = SessionRegistry::neu();
        let broadcaster = EventBroadcaster::neu();
        let abgleich = QueueAbgleich::neu(registry.clone(), broadcaster.clone());
        TestAufbau {
            registry,
            broadcaster,
            abgleich,
        }
    }

    #[tokio::test]
    async fn abonnement_wird_versendet() {
        let t = aufbau();
        let uid = UserId::new();
        let session = t.registry.registrieren(uid);
        let mut rx = t.broadcaster.registrieren(uid);

        let key = StreamKey::new();
        session.warteschlange().abonnieren(key, VoicePeerOptions::default());

        assert_eq!(t.abgleich.tick(), 1);
        let nachricht = rx.try_recv().unwrap();
        match nachricht.payload {
            ControlPayload::VoiceSubscribe(p) => assert_eq!(p.stream_key, key),
            andere => panic!("Unerwarteter Payload: {:?}", andere),
        }
    }

    #[tokio::test]
    async fn doppeltes_abonnement_ueber_ticks_ist_idempotent() {
        let t = aufbau();
        let uid = UserId::new();
        let session = t.registry.registrieren(uid);
        let mut rx = t.broadcaster.registrieren(uid);

        let key = StreamKey::new();
        session.warteschlange().abonnieren(key, VoicePeerOptions::default());
        t.abgleich.tick();
        assert!(rx.try_recv().is_ok());

        // Derselbe Stream erneut eingereiht (z.B. Wiederholung) – No-op
        session.warteschlange().abonnieren(key, VoicePeerOptions::default());
        assert_eq!(t.abgleich.tick(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn trennung_nach_abonnement() {
        let t = aufbau();
        let uid = UserId::new();
        let session = t.registry.registrieren(uid);
        let mut rx = t.broadcaster.registrieren(uid);

        let key = StreamKey::new();
        session.warteschlange().abonnieren(key, VoicePeerOptions::default());
        t.abgleich.tick();
        let _ = rx.try_recv();

        session.warteschlange().trennen(key);
        assert_eq!(t.abgleich.tick(), 1);
        let nachricht = rx.try_recv().unwrap();
        assert!(matches!(
            nachricht.payload,
            ControlPayload::VoiceUnsubscribe(p) if p.stream_key == key
        ));
    }

    #[tokio::test]
    async fn trennung_ohne_aktives_abonnement_ist_noop() {
        let t = aufbau();
        let uid = UserId::new();
        let session = t.registry.registrieren(uid);
        let mut rx = t.broadcaster.registrieren(uid);

        session.warteschlange().trennen(StreamKey::new());
        assert_eq!(t.abgleich.tick(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fifo_reihenfolge_pro_session() {
        let t = aufbau();
        let uid = UserId::new();
        let session = t.registry.registrieren(uid);
        let mut rx = t.broadcaster.registrieren(uid);

        let a = StreamKey::new();
        let b = StreamKey::new();
        session.warteschlange().abonnieren(a, VoicePeerOptions::default());
        session.warteschlange().abonnieren(b, VoicePeerOptions::default());

        t.abgleich.tick();
        let erste = rx.try_recv().unwrap();
        let zweite = rx.try_recv().unwrap();
        assert!(matches!(erste.payload, ControlPayload::VoiceSubscribe(p) if p.stream_key == a));
        assert!(matches!(zweite.payload, ControlPayload::VoiceSubscribe(p) if p.stream_key == b));
    }

    #[tokio::test]
    async fn client_entfernt_verwirft_abonnement_zustand() {
        let t = aufbau();
        let uid = UserId::new();
        let session = t.registry.registrieren(uid);
        let mut rx = t.broadcaster.registrieren(uid);

        let key = StreamKey::new();
        session.warteschlange().abonnieren(key, VoicePeerOptions::default());
        t.abgleich.tick();
        let _ = rx.try_recv();

        t.abgleich.client_entfernt(&uid);

        // Nach Reconnect darf dasselbe Abonnement wieder gesendet werden
        session.warteschlange().abonnieren(key, VoicePeerOptions::default());
        assert_eq!(t.abgleich.tick(), 1);
    }
}

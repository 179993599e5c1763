//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Bausteine als Arc-Referenzen, die sicher zwischen
//! tokio-Tasks geteilt werden koennen, und stellt die Verbindungs-
//! Lebenszyklus-Operationen bereit.

use nahklang_core::types::{BetriebsModus, ServerId, UserId};
use nahklang_protocol::control::ControlMessage;
use nahklang_voice::filters::FilterRegistry;
use nahklang_voice::registry::SessionRegistry;
use nahklang_voice::session::VoiceSession;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::broadcast::EventBroadcaster;
use crate::engine::PeerEngine;
use crate::error::{SignalingError, SignalingResult};
use crate::proximity::NaeheAbgleich;
use crate::tick::QueueAbgleich;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Server-ID (unveraenderlich nach dem Start)
    pub server_id: ServerId,
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale Clients
    pub max_clients: u32,
    /// Betriebsmodus (Peer-Operationen nur im raeumlichen Modus)
    pub modus: BetriebsModus,
    /// Intervall des Queue-Abgleichs in Millisekunden
    pub tick_intervall_ms: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_id: ServerId::new(),
            server_name: "Nahklang Server".to_string(),
            max_clients: 512,
            modus: BetriebsModus::Raeumlich,
            tick_intervall_ms: 250,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Session-Registry (Identitaet -> lebende Session)
    pub registry: SessionRegistry,
    /// Ausgehende Nachrichten-Zustellung
    pub broadcaster: EventBroadcaster,
    /// Hoerbarkeits-Filter (append-only)
    pub filter: Arc<FilterRegistry>,
    /// Peer-Beziehungs-Engine
    pub engine: PeerEngine,
    /// Naehe-Abgleich (uebernimmt externe Reichweiten-Ergebnisse)
    pub naehe: NaeheAbgleich,
    /// Queue-Abgleich (Konsument der Peer-Queues)
    pub abgleich: Arc<QueueAbgleich>,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let registry = SessionRegistry::neu();
        let broadcaster = EventBroadcaster::neu();
        let filter = Arc::new(FilterRegistry::neu());
        let engine = PeerEngine::neu(
            registry.clone(),
            broadcaster.clone(),
            Arc::clone(&filter),
            config.modus,
        );
        let naehe = NaeheAbgleich::neu(registry.clone());
        let abgleich = Arc::new(QueueAbgleich::neu(registry.clone(), broadcaster.clone()));

        Arc::new(Self {
            config: Arc::new(config),
            registry,
            broadcaster,
            filter,
            engine,
            naehe,
            abgleich,
            start_time: Instant::now(),
        })
    }

    /// Registriert einen neuen Client: Session plus Empfangs-Queue
    ///
    /// Die Session ist danach noch NICHT bereit; Bereitschaft wird erst
    /// gesetzt wenn der Client Voice-Chat aktiviert hat.
    pub fn client_verbinden(
        &self,
        user_id: UserId,
    ) -> SignalingResult<(Arc<VoiceSession>, mpsc::Receiver<ControlMessage>)> {
        if self.registry.anzahl() as u32 >= self.config.max_clients
            && !self.registry.ist_registriert(&user_id)
        {
            return Err(SignalingError::ServerVoll);
        }

        let session = self.registry.registrieren(user_id);
        let rx = self.broadcaster.registrieren(user_id);
        Ok((session, rx))
    }

    /// Trennt einen Client und raeumt alle Zustaende auf
    ///
    /// Eifrige Bereinigung: die Identitaet verschwindet aus den
    /// Peer-Mengen aller verbleibenden Sessions, die Queue und der
    /// Abonnement-Zustand verfallen.
    pub fn client_trennen(&self, user_id: &UserId) {
        self.broadcaster.entfernen(user_id);
        self.registry.entfernen(user_id);
        self.abgleich.client_entfernt(user_id);
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

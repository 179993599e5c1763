//! Event-Broadcaster – Sendet Control-Nachrichten an Clients
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen
//! Clients. Die Engine und der Queue-Abgleich adressieren hierueber
//! einzelne Verbindungen; die eigentliche Zustellung uebernimmt die
//! Verbindungs-Task die aus der Queue liest.

use dashmap::DashMap;
use nahklang_core::types::UserId;
use nahklang_protocol::control::ControlMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub user_id: UserId,
    pub tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

/// Zentraler Broadcaster fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Client-Sender, indiziert nach UserId
    clients: DashMap<UserId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert einen neuen Client und gibt seine Empfangs-Queue zurueck
    ///
    /// Die Verbindungs-Task liest aus dieser Queue und stellt zu.
    pub fn registrieren(&self, user_id: UserId) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.clients.insert(user_id, ClientSender { user_id, tx });
        tracing::debug!(user_id = %user_id, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Client aus dem Broadcaster
    pub fn entfernen(&self, user_id: &UserId) {
        self.inner.clients.remove(user_id);
        tracing::debug!(user_id = %user_id, "Client aus Broadcaster entfernt");
    }

    /// Sendet eine Nachricht an einen einzelnen Client
    ///
    /// Gibt `true` zurueck wenn der Client gefunden und die Nachricht
    /// eingereiht wurde.
    pub fn an_user_senden(&self, user_id: &UserId, nachricht: ControlMessage) -> bool {
        match self.inner.clients.get(user_id) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(user_id = %user_id, "Senden an unbekannten Client");
                false
            }
        }
    }

    /// Sendet eine Nachricht an alle verbundenen Clients
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, nachricht: ControlMessage) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|entry| {
            if entry.value().senden(nachricht.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Gibt die Anzahl der registrierten Clients zurueck
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob ein Client registriert ist
    pub fn ist_registriert(&self, user_id: &UserId) -> bool {
        self.inner.clients.contains_key(user_id)
    }
}

impl Default for EventBroadcaster {
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

    fn test_nachricht(id: u32) -> ControlMessage {
        ControlMessage::ping(id, 12345)
    }

    #[tokio::test]
    async fn registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let uid = UserId::new();

        let mut rx = broadcaster.registrieren(uid);
        assert!(broadcaster.ist_registriert(&uid));

        let gesendet = broadcaster.an_user_senden(&uid, test_nachricht(1));
        assert!(gesendet);

        let empfangen = rx.try_recv().expect("Nachricht muss vorhanden sein");
        assert_eq!(empfangen.request_id, 1);
    }

    #[tokio::test]
    async fn senden_an_unbekannten_client() {
        let broadcaster = EventBroadcaster::neu();
        assert!(!broadcaster.an_user_senden(&UserId::new(), test_nachricht(1)));
    }

    #[tokio::test]
    async fn an_alle_senden() {
        let broadcaster = EventBroadcaster::neu();

        let uids: Vec<UserId> = (0..5).map(|_| UserId::new()).collect();
        let mut receivers: Vec<_> = uids
            .iter()
            .map(|uid| broadcaster.registrieren(*uid))
            .collect();

        let gesendet = broadcaster.an_alle_senden(test_nachricht(99));
        assert_eq!(gesendet, 5);

        for rx in &mut receivers {
            assert!(rx.try_recv().is_ok());
        }
    }

    #[tokio::test]
    async fn entfernter_client_empfaengt_nichts() {
        let broadcaster = EventBroadcaster::neu();
        let uid = UserId::new();
        let _rx = broadcaster.registrieren(uid);

        broadcaster.entfernen(&uid);
        assert!(!broadcaster.ist_registriert(&uid));
        assert!(!broadcaster.an_user_senden(&uid, test_nachricht(2)));
    }
}

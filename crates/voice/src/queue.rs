//! Peer-Queue – Puffer fuer ausstehende Abonnement-Auftraege
//!
//! Die Engine reiht Abonnieren/Trennen-Auftraege hier ein statt sie sofort
//! zu versenden; der periodische Queue-Abgleich konsumiert die Eintraege.
//! So verschmelzen schnell aufeinanderfolgende Aufrufe statt redundante
//! Abonnement-Nachrichten auszuloesen.
//!
//! Ordnungsgarantie: Eintraege werden in Aufrufreihenfolge eingereiht und
//! genau einmal konsumiert. WANN ein Auftrag wirkt entscheidet der
//! Abgleich, nicht die Engine.

use nahklang_core::types::StreamKey;
use nahklang_protocol::control::VoicePeerOptions;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Ein ausstehender Auftrag in der Peer-Queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAuftrag {
    /// Stream abonnieren
    Abonnieren {
        stream_key: StreamKey,
        optionen: VoicePeerOptions,
    },
    /// Stream-Abonnement trennen
    Trennen { stream_key: StreamKey },
}

/// FIFO-Puffer der ausstehenden Auftraege einer Session
///
/// Append-only aus Sicht der Engine; der Abgleich ist der einzige
/// Konsument und leert die Queue pro Tick vollstaendig.
#[derive(Debug, Default)]
pub struct PeerQueue {
    auftraege: Mutex<VecDeque<PeerAuftrag>>,
}

impl PeerQueue {
    /// Erstellt eine neue leere Queue
    pub fn neu() -> Self {
        Self {
            auftraege: Mutex::new(VecDeque::new()),
        }
    }

    /// Reiht ein Abonnement ein
    ///
    /// Ein bereits ausstehendes Abonnement fuer denselben Stream wird
    /// nicht dupliziert; seine Optionen werden auf den neuesten Stand
    /// gebracht (die juengsten Optionen gewinnen).
    pub fn abonnieren(&self, stream_key: StreamKey, optionen: VoicePeerOptions) {
        let mut q = self.auftraege.lock();
        for auftrag in q.iter_mut() {
            if let PeerAuftrag::Abonnieren {
                stream_key: key,
                optionen: alte,
            } = auftrag
            {
                if *key == stream_key {
                    *alte = optionen;
                    return;
                }
            }
        }
        q.push_back(PeerAuftrag::Abonnieren {
            stream_key,
            optionen,
        });
    }

    /// Reiht eine Trennung ein
    ///
    /// Steht fuer denselben Stream noch ein unverarbeitetes Abonnement
    /// aus, heben sich beide auf: das Abonnement wird verworfen und keine
    /// Trennung eingereiht. Doppelte Trennungen verschmelzen.
    pub fn trennen(&self, stream_key: StreamKey) {
        let mut q = self.auftraege.lock();

        let vorher = q.len();
        q.retain(|auftrag| {
            !matches!(auftrag, PeerAuftrag::Abonnieren { stream_key: key, .. } if *key == stream_key)
        });
        if q.len() < vorher {
            // Abonnement stand noch aus – es ist nie wirksam geworden
            return;
        }

        let schon_vorhanden = q
            .iter()
            .any(|auftrag| matches!(auftrag, PeerAuftrag::Trennen { stream_key: key } if *key == stream_key));
        if !schon_vorhanden {
            q.push_back(PeerAuftrag::Trennen { stream_key });
        }
    }

    /// Entnimmt alle ausstehenden Auftraege in Einreihungsreihenfolge
    pub fn leeren(&self) -> Vec<PeerAuftrag> {
        self.auftraege.lock().drain(..).collect()
    }

    /// Anzahl der ausstehenden Auftraege
    pub fn anzahl(&self) -> usize {
        self.auftraege.lock().len()
    }

    /// Prueft ob die Queue leer ist
    pub fn ist_leer(&self) -> bool {
        self.auftraege.lock().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abonnieren_und_leeren() {
        let q = PeerQueue::neu();
        let key = StreamKey::new();
        q.abonnieren(key, VoicePeerOptions::default());

        assert_eq!(q.anzahl(), 1);
        let auftraege = q.leeren();
        assert_eq!(auftraege.len(), 1);
        assert!(matches!(
            auftraege[0],
            PeerAuftrag::Abonnieren { stream_key, .. } if stream_key == key
        ));
        assert!(q.ist_leer());
    }

    #[test]
    fn doppeltes_abonnement_verschmilzt() {
        let q = PeerQueue::neu();
        let key = StreamKey::new();
        q.abonnieren(key, VoicePeerOptions::default());
        q.abonnieren(key, VoicePeerOptions::statisch(false));

        let auftraege = q.leeren();
        assert_eq!(auftraege.len(), 1, "Nur ein Eintrag pro Stream");
        // Die juengsten Optionen gewinnen
        match &auftraege[0] {
            PeerAuftrag::Abonnieren { optionen, .. } => {
                assert!(!optionen.spatial_audio);
                assert!(!optionen.visible);
            }
            andere => panic!("Unerwarteter Auftrag: {:?}", andere),
        }
    }

    #[test]
    fn trennen_hebt_ausstehendes_abonnement_auf() {
        let q = PeerQueue::neu();
        let key = StreamKey::new();
        q.abonnieren(key, VoicePeerOptions::default());
        q.trennen(key);

        // Abonnement wurde nie wirksam, beide Auftraege entfallen
        assert!(q.ist_leer());
    }

    #[test]
    fn trennen_ohne_abonnement_wird_eingereiht() {
        let q = PeerQueue::neu();
        let key = StreamKey::new();
        q.trennen(key);
        q.trennen(key);

        let auftraege = q.leeren();
        assert_eq!(auftraege.len(), 1, "Doppelte Trennungen verschmelzen");
        assert_eq!(auftraege[0], PeerAuftrag::Trennen { stream_key: key });
    }

    #[test]
    fn reihenfolge_bleibt_erhalten() {
        let q = PeerQueue::neu();
        let a = StreamKey::new();
        let b = StreamKey::new();
        q.abonnieren(a, VoicePeerOptions::default());
        q.abonnieren(b, VoicePeerOptions::default());

        let auftraege = q.leeren();
        assert!(matches!(auftraege[0], PeerAuftrag::Abonnieren { stream_key, .. } if stream_key == a));
        assert!(matches!(auftraege[1], PeerAuftrag::Abonnieren { stream_key, .. } if stream_key == b));
    }
}

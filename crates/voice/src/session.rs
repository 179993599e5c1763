//! Voice-Session – Zustand eines einzelnen Clients
//!
//! Verwaltet pro Client:
//! - Bereitschafts-Flag (verbunden UND Voice-Chat aktiviert)
//! - StreamKey des ausgehenden Audio-Streams
//! - die beiden Peer-Mengen (Naehe, global/statisch)
//! - die Peer-Queue fuer ausstehende Abonnement-Auftraege
//!
//! Beide Peer-Mengen liegen hinter EINEM Mutex. Die Befoerderung eines
//! Naehe-Peers zum statischen Peer (pruefen -> verschieben) muss atomar
//! gegenueber der nebenlaeufigen Naehe-Neuberechnung sein; ein einzelner
//! Lock pro Session stellt das sicher.

use nahklang_core::types::{StreamKey, UserId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::queue::PeerQueue;

// ---------------------------------------------------------------------------
// Peer-Mengen
// ---------------------------------------------------------------------------

/// Die beiden Beziehungsmengen einer Session
///
/// `naehe` wird von der externen Naehe-Neuberechnung gespeist und ist
/// fluechtig; `global` enthaelt explizit deklarierte Beziehungen und
/// bleibt bis zur expliziten Entfernung bestehen.
#[derive(Debug, Default)]
pub struct PeerSets {
    /// Identitaeten in Hoerreichweite (fluechtig)
    pub naehe: HashSet<UserId>,
    /// Explizit deklarierte statische Beziehungen (persistent)
    pub global: HashSet<UserId>,
}

/// Ergebnis eines statischen Eintrags (atomar unter dem Session-Lock)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatischerEintrag {
    /// Identitaet war bereits globaler Peer – nichts zu tun
    BereitsGlobal,
    /// Identitaet war Naehe-Peer und wurde nach global verschoben;
    /// das Audio-Abonnement existiert bereits
    Befoerdert,
    /// Identitaet war kein Peer und wurde neu eingetragen;
    /// ein Abonnement muss eingereiht werden
    NeuEingetragen,
}

/// Differenz einer Naehe-Uebernahme
#[derive(Debug, Default)]
pub struct NaeheDiff {
    /// Identitaeten die neu in Reichweite gekommen sind
    pub eingetreten: Vec<UserId>,
    /// Identitaeten die die Reichweite verlassen haben
    pub verlassen: Vec<UserId>,
}

// ---------------------------------------------------------------------------
// VoiceSession
// ---------------------------------------------------------------------------

/// Voice-Zustand eines verbundenen Clients
///
/// Wird von der SessionRegistry als `Arc<VoiceSession>` gehalten und
/// zwischen Engine, Naehe-Abgleich und Queue-Abgleich geteilt.
pub struct VoiceSession {
    /// Identitaet des Clients
    user_id: UserId,
    /// Handle auf den eigenen ausgehenden Audio-Stream
    stream_key: StreamKey,
    /// true sobald der Client verbunden ist UND Voice-Chat aktiviert hat
    bereit: AtomicBool,
    /// Die beiden Peer-Mengen unter einem gemeinsamen Lock
    peers: Mutex<PeerSets>,
    /// Ausstehende Abonnement-/Trenn-Auftraege
    warteschlange: PeerQueue,
}

impl VoiceSession {
    /// Erstellt eine neue, noch nicht bereite Session
    pub fn neu(user_id: UserId) -> Self {
        Self {
            user_id,
            stream_key: StreamKey::new(),
            bereit: AtomicBool::new(false),
            peers: Mutex::new(PeerSets::default()),
            warteschlange: PeerQueue::neu(),
        }
    }

    /// Identitaet des Clients
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// StreamKey des eigenen ausgehenden Streams
    pub fn stream_key(&self) -> StreamKey {
        self.stream_key
    }

    /// Prueft ob die Session bereit ist
    pub fn ist_bereit(&self) -> bool {
        self.bereit.load(Ordering::Acquire)
    }

    /// Setzt das Bereitschafts-Flag
    pub fn bereit_setzen(&self, bereit: bool) {
        self.bereit.store(bereit, Ordering::Release);
        tracing::debug!(user_id = %self.user_id, bereit, "Bereitschaft geaendert");
    }

    /// Zugriff auf die Peer-Queue dieser Session
    pub fn warteschlange(&self) -> &PeerQueue {
        &self.warteschlange
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Prueft ob die Identitaet in irgendeiner Beziehungsmenge steht
    pub fn ist_peer(&self, id: &UserId) -> bool {
        let p = self.peers.lock();
        p.naehe.contains(id) || p.global.contains(id)
    }

    /// Prueft ob die Identitaet ein Naehe-Peer ist
    pub fn ist_naehe_peer(&self, id: &UserId) -> bool {
        self.peers.lock().naehe.contains(id)
    }

    /// Prueft ob die Identitaet ein globaler (statischer) Peer ist
    pub fn ist_globaler_peer(&self, id: &UserId) -> bool {
        self.peers.lock().global.contains(id)
    }

    /// Momentaufnahme der Naehe-Peers (fuer Logs und Tests)
    pub fn naehe_peers(&self) -> HashSet<UserId> {
        self.peers.lock().naehe.clone()
    }

    /// Momentaufnahme der globalen Peers (fuer Logs und Tests)
    pub fn globale_peers(&self) -> HashSet<UserId> {
        self.peers.lock().global.clone()
    }

    // -----------------------------------------------------------------------
    // Mutationen (alle unter dem einen Peer-Mengen-Lock)
    // -----------------------------------------------------------------------

    /// Traegt eine Identitaet als statischen Peer ein
    ///
    /// Entscheidet atomar zwischen den drei Faellen: bereits global
    /// (No-op), Naehe-Peer (Befoerderung: aus `naehe` entfernen, in
    /// `global` eintragen) und unbekannt (neu in `global`). Die
    /// Fallentscheidung und die Verschiebung geschehen unter demselben
    /// Lock, damit eine gleichzeitige Naehe-Demotion die Identitaet nicht
    /// zwischen den Mengen verlieren kann.
    pub fn statisch_eintragen(&self, id: UserId) -> StatischerEintrag {
        let mut p = self.peers.lock();
        if p.global.contains(&id) {
            return StatischerEintrag::BereitsGlobal;
        }
        if p.naehe.remove(&id) {
            p.global.insert(id);
            return StatischerEintrag::Befoerdert;
        }
        p.global.insert(id);
        StatischerEintrag::NeuEingetragen
    }

    /// Entfernt eine Identitaet aus der globalen Menge
    ///
    /// Gibt `true` zurueck wenn sie enthalten war. Naehe-Eintraege bleiben
    /// unberuehrt – die gehoeren der Naehe-Neuberechnung.
    pub fn statisch_austragen(&self, id: &UserId) -> bool {
        self.peers.lock().global.remove(id)
    }

    /// Uebernimmt das Ergebnis einer Naehe-Neuberechnung
    ///
    /// Diff und Anwendung geschehen unter einem Lock-Zugriff. Identitaeten
    /// die bereits globale Peers sind werden nicht als Naehe-Eintritt
    /// gewertet – die statische Beziehung ist naehe-unabhaengig.
    pub fn naehe_uebernehmen(&self, aktuelle: &HashSet<UserId>) -> NaeheDiff {
        let mut p = self.peers.lock();

        let eingetreten: Vec<UserId> = aktuelle
            .iter()
            .filter(|id| !p.naehe.contains(*id) && !p.global.contains(*id))
            .copied()
            .collect();
        let verlassen: Vec<UserId> = p
            .naehe
            .iter()
            .filter(|id| !aktuelle.contains(*id))
            .copied()
            .collect();

        for id in &eingetreten {
            p.naehe.insert(*id);
        }
        for id in &verlassen {
            p.naehe.remove(id);
        }

        NaeheDiff {
            eingetreten,
            verlassen,
        }
    }

    /// Entfernt eine Identitaet aus beiden Mengen
    ///
    /// Wird beim Disconnect des Gegenuebers von der Registry-Bereinigung
    /// aufgerufen.
    pub fn peer_austragen_alle(&self, id: &UserId) {
        let mut p = self.peers.lock();
        p.naehe.remove(id);
        p.global.remove(id);
    }
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("user_id", &self.user_id)
            .field("stream_key", &self.stream_key)
            .field("bereit", &self.ist_bereit())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn menge(ids: &[UserId]) -> HashSet<UserId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn neue_session_ist_nicht_bereit() {
        let s = VoiceSession::neu(UserId::new());
        assert!(!s.ist_bereit());
        s.bereit_setzen(true);
        assert!(s.ist_bereit());
    }

    #[test]
    fn statisch_eintragen_neu() {
        let s = VoiceSession::neu(UserId::new());
        let peer = UserId::new();

        assert_eq!(s.statisch_eintragen(peer), StatischerEintrag::NeuEingetragen);
        assert!(s.ist_globaler_peer(&peer));
        assert!(s.ist_peer(&peer));
        assert!(!s.ist_naehe_peer(&peer));
    }

    #[test]
    fn statisch_eintragen_befoerdert_naehe_peer() {
        let s = VoiceSession::neu(UserId::new());
        let peer = UserId::new();
        s.naehe_uebernehmen(&menge(&[peer]));
        assert!(s.ist_naehe_peer(&peer));

        assert_eq!(s.statisch_eintragen(peer), StatischerEintrag::Befoerdert);
        // Nach der Befoerderung darf die Naehe-Menge den Peer nicht mehr fuehren
        assert!(!s.ist_naehe_peer(&peer));
        assert!(s.ist_globaler_peer(&peer));
    }

    #[test]
    fn statisch_eintragen_doppelt_ist_noop() {
        let s = VoiceSession::neu(UserId::new());
        let peer = UserId::new();

        assert_eq!(s.statisch_eintragen(peer), StatischerEintrag::NeuEingetragen);
        assert_eq!(s.statisch_eintragen(peer), StatischerEintrag::BereitsGlobal);
        assert_eq!(s.globale_peers().len(), 1);
    }

    #[test]
    fn statisch_austragen_nur_global() {
        let s = VoiceSession::neu(UserId::new());
        let naehe_peer = UserId::new();
        s.naehe_uebernehmen(&menge(&[naehe_peer]));

        // Naehe-Peer ist kein globaler Peer – Austragen ist ein No-op
        assert!(!s.statisch_austragen(&naehe_peer));
        assert!(s.ist_naehe_peer(&naehe_peer));

        let global_peer = UserId::new();
        s.statisch_eintragen(global_peer);
        assert!(s.statisch_austragen(&global_peer));
        assert!(!s.ist_peer(&global_peer));
    }

    #[test]
    fn naehe_uebernehmen_diff() {
        let s = VoiceSession::neu(UserId::new());
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();

        let diff = s.naehe_uebernehmen(&menge(&[a, b]));
        assert_eq!(diff.eingetreten.len(), 2);
        assert!(diff.verlassen.is_empty());

        // a bleibt, b verlaesst, c kommt hinzu
        let diff = s.naehe_uebernehmen(&menge(&[a, c]));
        assert_eq!(diff.eingetreten, vec![c]);
        assert_eq!(diff.verlassen, vec![b]);
        assert_eq!(s.naehe_peers(), menge(&[a, c]));
    }

    #[test]
    fn naehe_uebernehmen_ueberspringt_globale_peers() {
        let s = VoiceSession::neu(UserId::new());
        let peer = UserId::new();
        s.statisch_eintragen(peer);

        // Der globale Peer kommt in Reichweite – kein Naehe-Eintritt
        let diff = s.naehe_uebernehmen(&menge(&[peer]));
        assert!(diff.eingetreten.is_empty());
        assert!(!s.ist_naehe_peer(&peer));
        assert!(s.ist_globaler_peer(&peer));
    }

    #[test]
    fn peer_austragen_alle_raeumt_beide_mengen() {
        let s = VoiceSession::neu(UserId::new());
        let a = UserId::new();
        let b = UserId::new();
        s.naehe_uebernehmen(&menge(&[a]));
        s.statisch_eintragen(b);

        s.peer_austragen_alle(&a);
        s.peer_austragen_alle(&b);
        assert!(!s.ist_peer(&a));
        assert!(!s.ist_peer(&b));
    }
}

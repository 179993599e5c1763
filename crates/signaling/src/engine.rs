//! Peer-Engine – Beziehungs- und Options-Verwaltung
//!
//! Die API-Oberflaeche fuer Peer-Beziehungen: Abfragen, explizite
//! statische Beziehungen, Options-Propagierung und die Filter-Registry.
//!
//! ## Nebenlaeufigkeit
//! Die Engine haelt nie zwei Session-Locks gleichzeitig. Querlesende
//! Zugriffe (Bereitschaft, StreamKey des Peers) sind kurze, unabhaengig
//! gesperrte Operationen die VOR der Mutation der Besitzer-Session
//! abgeschlossen sind; das beidseitige Muster kann dadurch nicht
//! verklemmen. Die Fallentscheidung beim statischen Eintrag (bereits
//! global / Befoerderung / neu) trifft die Session atomar unter ihrem
//! eigenen Lock, siehe `VoiceSession::statisch_eintragen`.

use nahklang_core::types::{BetriebsModus, UserId};
use nahklang_protocol::control::{ControlMessage, VoicePeerOptions};
use nahklang_voice::filters::{FilterRegistry, PeerFilter};
use nahklang_voice::registry::SessionRegistry;
use nahklang_voice::session::{StatischerEintrag, VoiceSession};
use std::sync::Arc;

use crate::broadcast::EventBroadcaster;
use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Modus-Waechter
// ---------------------------------------------------------------------------

/// Kapselt die Betriebsmodus-Pruefung der Engine
///
/// Der Modus wird einmal bei Konstruktion injiziert; jede Operation ruft
/// `pruefen` statt den Modus selbst zu vergleichen.
#[derive(Debug, Clone, Copy)]
pub struct ModusWaechter {
    modus: BetriebsModus,
}

impl ModusWaechter {
    /// Erstellt einen Waechter fuer den gegebenen Modus
    pub fn neu(modus: BetriebsModus) -> Self {
        Self { modus }
    }

    /// Schlaegt fehl wenn Peer-Operationen im Modus nicht verfuegbar sind
    pub fn pruefen(&self) -> SignalingResult<()> {
        match self.modus {
            BetriebsModus::Raeumlich => Ok(()),
            andere => Err(SignalingError::ModusNichtUnterstuetzt(andere)),
        }
    }
}

// ---------------------------------------------------------------------------
// PeerEngine
// ---------------------------------------------------------------------------

/// Beziehungs-Engine fuer Voice-Peers
///
/// Alle Identitaeten werden ueber die Registry zur lebenden Session
/// aufgeloest; vom Aufrufer gehaltene Referenzen koennen veraltet sein.
#[derive(Clone)]
pub struct PeerEngine {
    registry: SessionRegistry,
    broadcaster: EventBroadcaster,
    filter: Arc<FilterRegistry>,
    waechter: ModusWaechter,
}

impl PeerEngine {
    /// Erstellt eine neue Engine
    pub fn neu(
        registry: SessionRegistry,
        broadcaster: EventBroadcaster,
        filter: Arc<FilterRegistry>,
        modus: BetriebsModus,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            filter,
            waechter: ModusWaechter::neu(modus),
        }
    }

    /// Loest eine Identitaet auf oder schlaegt fehl
    fn session(&self, id: &UserId) -> SignalingResult<Arc<VoiceSession>> {
        self.registry
            .session(id)
            .ok_or(SignalingError::SessionNichtGefunden(*id))
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Prueft ob `peer` in irgendeiner Beziehungsmenge von `besitzer` steht
    ///
    /// Eine getrennte Besitzer-Identitaet liest sich als "kein Peer",
    /// nicht als Fehler.
    pub fn ist_peer(&self, besitzer: &UserId, peer: &UserId) -> SignalingResult<bool> {
        self.waechter.pruefen()?;
        Ok(self
            .registry
            .session(besitzer)
            .map(|s| s.ist_peer(peer))
            .unwrap_or(false))
    }

    /// Prueft ob `peer` ein Naehe-Peer von `besitzer` ist
    pub fn ist_naehe_peer(&self, besitzer: &UserId, peer: &UserId) -> SignalingResult<bool> {
        self.waechter.pruefen()?;
        Ok(self
            .registry
            .session(besitzer)
            .map(|s| s.ist_naehe_peer(peer))
            .unwrap_or(false))
    }

    /// Prueft ob `peer` ein globaler (statischer) Peer von `besitzer` ist
    pub fn ist_globaler_peer(&self, besitzer: &UserId, peer: &UserId) -> SignalingResult<bool> {
        self.waechter.pruefen()?;
        Ok(self
            .registry
            .session(besitzer)
            .map(|s| s.ist_globaler_peer(peer))
            .unwrap_or(false))
    }

    // -----------------------------------------------------------------------
    // Options-Propagierung
    // -----------------------------------------------------------------------

    /// Propagiert neue Render-Optionen fuer einen bestehenden Peer
    ///
    /// Loest die LEBENDE Session des Peers auf, liest deren StreamKey und
    /// sendet ein Options-Update an die Verbindung des Besitzers. Der
    /// Besitzer wendet die Optionen damit gegen den richtigen entfernten
    /// Stream an. Kein lokaler Zustand wird veraendert.
    pub fn peer_optionen_aktualisieren(
        &self,
        besitzer: &UserId,
        peer: &UserId,
        optionen: VoicePeerOptions,
    ) -> SignalingResult<()> {
        self.waechter.pruefen()?;

        let besitzer_session = self.session(besitzer)?;
        if !besitzer_session.ist_peer(peer) {
            return Err(SignalingError::UnbekannterPeer(*peer));
        }

        let peer_session = self.session(peer)?;
        let nachricht = ControlMessage::options_update(peer_session.stream_key(), optionen);

        if !self.broadcaster.an_user_senden(besitzer, nachricht) {
            return Err(SignalingError::SendFehler);
        }

        tracing::debug!(
            besitzer = %besitzer,
            peer = %peer,
            stream_key = %peer_session.stream_key(),
            "Peer-Optionen propagiert"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statische Beziehungen
    // -----------------------------------------------------------------------

    /// Traegt eine statische (naehe-unabhaengige) Peer-Beziehung ein
    ///
    /// Statische Peers sind per Konstruktion nicht raeumlich; nur die
    /// Sichtbarkeit ist waehlbar. Drei Faelle:
    /// - bereits global: No-op, es wird insbesondere kein zweites
    ///   Abonnement eingereiht
    /// - Naehe-Peer: Befoerderung – der Audio-Fluss existiert schon, nur
    ///   die Optionen werden nachgereicht und der Eintrag wandert von der
    ///   Naehe- in die globale Menge
    /// - unbekannt: Eintrag in die globale Menge plus Abonnement-Auftrag
    ///   auf der Queue des Besitzers
    ///
    /// Mit `beidseitig` entsteht die Gegenkante durch genau einen
    /// rekursiven Aufruf mit `beidseitig = false`.
    pub fn statischen_peer_hinzufuegen(
        &self,
        besitzer: &UserId,
        peer: &UserId,
        sichtbar: bool,
        beidseitig: bool,
    ) -> SignalingResult<()> {
        self.waechter.pruefen()?;

        let optionen = VoicePeerOptions::statisch(sichtbar);
        let besitzer_session = self.session(besitzer)?;
        let peer_session = self.session(peer)?;

        // Alle Pruefungen VOR der ersten Mutation
        if !besitzer_session.ist_bereit() || !peer_session.ist_bereit() {
            return Err(SignalingError::NichtBereit);
        }

        match besitzer_session.statisch_eintragen(*peer) {
            StatischerEintrag::BereitsGlobal => {
                tracing::debug!(besitzer = %besitzer, peer = %peer, "Peer bereits global – No-op");
            }
            StatischerEintrag::Befoerdert => {
                // Abonnement existiert bereits durch die Naehe-Beziehung;
                // nur die neuen Optionen nachreichen
                self.peer_optionen_aktualisieren(besitzer, peer, optionen)?;
                tracing::info!(besitzer = %besitzer, peer = %peer, "Naehe-Peer zu statischem Peer befoerdert");
            }
            StatischerEintrag::NeuEingetragen => {
                besitzer_session
                    .warteschlange()
                    .abonnieren(peer_session.stream_key(), optionen);
                tracing::info!(besitzer = %besitzer, peer = %peer, "Statischer Peer eingetragen, Abonnement eingereiht");
            }
        }

        if beidseitig {
            self.statischen_peer_hinzufuegen(peer, besitzer, sichtbar, false)?;
        }
        Ok(())
    }

    /// Entfernt eine statische Peer-Beziehung
    ///
    /// Wirkt nur wenn die Identitaet aktuell GLOBALER Peer ist; reine
    /// Naehe-Beziehungen gehoeren der Naehe-Neuberechnung und bleiben
    /// unberuehrt (No-op). Bei Erfolg wird eine Trennung mit dem
    /// StreamKey des Peers eingereiht.
    pub fn statischen_peer_entfernen(
        &self,
        besitzer: &UserId,
        peer: &UserId,
        beidseitig: bool,
    ) -> SignalingResult<()> {
        self.waechter.pruefen()?;

        let besitzer_session = self.session(besitzer)?;
        if besitzer_session.statisch_austragen(peer) {
            match self.registry.session(peer) {
                Some(peer_session) => {
                    besitzer_session
                        .warteschlange()
                        .trennen(peer_session.stream_key());
                    tracing::info!(besitzer = %besitzer, peer = %peer, "Statischer Peer entfernt, Trennung eingereiht");
                }
                None => {
                    // Peer-Session bereits weg; der Stream ist mit ihr gestorben
                    tracing::debug!(besitzer = %besitzer, peer = %peer, "Peer-Session bereits getrennt");
                }
            }
        }

        if beidseitig {
            self.statischen_peer_entfernen(peer, besitzer, false)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Filter-Registry
    // -----------------------------------------------------------------------

    /// Registriert einen Hoerbarkeits-Filter (append-only)
    pub fn filter_registrieren(&self, filter: Arc<dyn PeerFilter>) {
        self.filter.registrieren(filter);
    }

    /// Gibt die vollstaendige, geordnete Filter-Registry zurueck
    pub fn alle_filter(&self) -> Vec<Arc<dyn PeerFilter>> {
        self.filter.alle()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! nahklang-signaling – Peer-Beziehungs-Engine und Session-Synchronisation
//!
//! Kernstueck des Servers: verfolgt welche Clients welche anderen Clients
//! hoeren, unterscheidet automatisch berechnete Naehe-Beziehungen von
//! explizit deklarierten statischen Beziehungen, erzwingt Bereitschafts-
//! Vorbedingungen und propagiert Options-Aenderungen an die richtige
//! Verbindung. Zwei unabhaengige Pfade (Naehe-Neuberechnung und explizite
//! API-Aufrufe) mutieren dieselben Sessions; die lokale und entfernte
//! Sicht eines Clients duerfen dabei nie auseinanderlaufen.

pub mod broadcast;
pub mod engine;
pub mod error;
pub mod proximity;
pub mod server_state;
pub mod tick;

pub use broadcast::EventBroadcaster;
pub use engine::{ModusWaechter, PeerEngine};
pub use error::{SignalingError, SignalingResult};
pub use proximity::NaeheAbgleich;
pub use server_state::{SignalingConfig, SignalingState};
pub use tick::QueueAbgleich;

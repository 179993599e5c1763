//! nahklang-voice – Session-Substrat
//!
//! In-Memory-Zustand aller aktiven Voice-Sessions: Bereitschaft,
//! StreamKeys, die beiden Peer-Mengen und die Peer-Queue. Die
//! Beziehungslogik selbst lebt in nahklang-signaling; dieses Crate
//! stellt die thread-sicheren Bausteine bereit.

pub mod filters;
pub mod queue;
pub mod registry;
pub mod session;

pub use filters::{FilterRegistry, PeerFilter};
pub use queue::{PeerAuftrag, PeerQueue};
pub use registry::SessionRegistry;
pub use session::{NaeheDiff, PeerSets, StatischerEintrag, VoiceSession};

//! nahklang-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use nahklang_signaling::{SignalingConfig, SignalingState};
use std::time::Duration;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Signaling-Zustand aufbauen (Registry, Broadcaster, Engine)
    /// 2. Queue-Abgleich starten
    /// 3. TCP-Listener starten (Control-Protokoll)
    /// 4. Auf Ctrl-C / SIGTERM warten
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            modus = %self.config.voice.modus,
            "Server startet"
        );

        let signaling_config = SignalingConfig {
            server_name: self.config.server.name.clone(),
            max_clients: self.config.server.max_clients,
            modus: self.config.voice.modus,
            tick_intervall_ms: self.config.voice.tick_intervall_ms,
            ..SignalingConfig::default()
        };
        let state = SignalingState::neu(signaling_config);

        let abgleich_task = std::sync::Arc::clone(&state.abgleich)
            .starten(Duration::from_millis(state.config.tick_intervall_ms));
        tracing::info!(
            intervall_ms = state.config.tick_intervall_ms,
            "Queue-Abgleich gestartet"
        );

        tracing::info!(
            adresse = %self.config.tcp_bind_adresse(),
            "TCP-Listener bereit (Platzhalter)"
        );

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!(
            uptime_sek = state.uptime_sek(),
            "Shutdown-Signal empfangen, Server wird beendet"
        );
        abgleich_task.abort();

        Ok(())
    }
}

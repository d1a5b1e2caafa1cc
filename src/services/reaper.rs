// src/services/reaper.rs

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::services::HoldService;

// O reaper é o único comportamento de longa duração do núcleo: uma varredura
// periódica que libera reservas vencidas usando exatamente as mesmas
// primitivas públicas de qualquer outro chamador — nunca um atalho
// privilegiado no banco.
pub fn spawn(hold_service: HoldService, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(intervalo_s = interval.as_secs(), "reaper de reservas iniciado");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match hold_service.sweep_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(liberadas = n, "reaper: reservas vencidas liberadas"),
                Err(e) => tracing::warn!("reaper: falha na varredura: {}", e),
            }
        }
    })
}

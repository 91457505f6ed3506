//! Gestor de conectividad WiFi.
//!
//! Implementa la máquina de estados
//! `Disconnected → ConnectingPrimary → ConnectingSecondary → Connected`, con
//! `Connected → Disconnected` cuando el sondeo periódico detecta la pérdida del enlace.
//!
//! Las dos redes se prueban siempre en el mismo orden (personal, luego empresarial).
//! Si ambas fallan se asume la radio comprometida y se reinicia el proceso completo.
//! Los reintentos posteriores a una pérdida de enlace se espacian con retroceso exponencial.
//!
//! Un único contexto (la tarea de subida) conduce las transiciones; el resto del
//! sistema sólo lee la instantánea publicada en [`ConnectivityHandle`].


use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, warn};
use crate::config::wifi::{POLL_SPACING, PRIMARY_ATTEMPTS, RESTART_GRACE, SECONDARY_ATTEMPTS};
use super::domain::{
    ActiveNetwork, Backoff, ConnectivityHandle, ConnectivityState, Credentials, LinkStatus,
    Restarter, WifiError, WifiRadio,
};


pub struct ConnectivityManager<R: WifiRadio> {
    radio: R,
    primary: Credentials,
    secondary: Credentials,
    handle: Arc<ConnectivityHandle>,
    restarter: Arc<dyn Restarter>,
    backoff: Backoff,
    last_attempt: Option<Instant>,
    active: ActiveNetwork,
}


impl<R: WifiRadio> ConnectivityManager<R> {
    pub fn new(radio: R,
               primary: Credentials,
               secondary: Credentials,
               handle: Arc<ConnectivityHandle>,
               restarter: Arc<dyn Restarter>) -> Self {
        Self {
            radio,
            primary,
            secondary,
            handle,
            restarter,
            backoff: Backoff::new(),
            last_attempt: None,
            active: ActiveNetwork::None,
        }
    }

    /// Intenta la red principal y luego la alternativa.
    ///
    /// # Retorno
    /// * `Ok(red)`: La red con la que se logró la conexión.
    /// * `Err(WifiError::AllNetworksFailed)`: Ambas fallaron; ya se solicitó el reinicio.
    pub async fn connect_with_fallback(&mut self) -> Result<ActiveNetwork, WifiError> {

        if self.try_network(ActiveNetwork::Primary).await {
            self.on_connected(ActiveNetwork::Primary);
            return Ok(ActiveNetwork::Primary);
        }

        if self.try_network(ActiveNetwork::Fallback).await {
            self.on_connected(ActiveNetwork::Fallback);
            return Ok(ActiveNetwork::Fallback);
        }

        error!("Error: fallaron todas las conexiones WiFi. Reiniciando...");
        self.active = ActiveNetwork::None;
        self.handle.mark_disconnected();
        sleep(RESTART_GRACE).await;
        self.restarter.restart();
        Err(WifiError::AllNetworksFailed)
    }

    /// Sondeo periódico del enlace.
    ///
    /// Si el enlace cayó y ya pasó el retardo de retroceso desde el último intento,
    /// vuelve a conectar. Si tras el intento sigue sin enlace, el retardo se duplica.
    pub async fn check_connection(&mut self) -> Result<(), WifiError> {

        if self.radio.status() == LinkStatus::Connected {
            if !self.handle.is_connected() {
                self.publish_connected();
            }
            return Ok(());
        }

        if self.handle.is_connected() {
            warn!("Warning: conexión WiFi perdida");
            self.active = ActiveNetwork::None;
            self.handle.mark_disconnected();
        }

        let now = Instant::now();
        let due = self
            .last_attempt
            .is_none_or(|last| now.duration_since(last) >= self.backoff.current());
        if !due {
            return Ok(());
        }

        self.last_attempt = Some(now);
        info!("Info: reconectando WiFi...");
        let result = self.connect_with_fallback().await;

        if self.radio.status() != LinkStatus::Connected {
            let next = self.backoff.fail();
            debug!("Debug: próximo intento de reconexión en {:?}", next);
        }

        result.map(|_| ())
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    pub fn ssid(&self) -> String {
        self.handle.snapshot().ssid
    }

    pub fn ip(&self) -> String {
        self.handle.snapshot().ip
    }

    pub fn is_using_primary(&self) -> bool {
        self.active == ActiveNetwork::Primary
    }

    pub fn backoff(&self) -> Duration {
        self.backoff.current()
    }

    async fn try_network(&mut self, network: ActiveNetwork) -> bool {
        let (credentials, state, attempts, label) = match network {
            ActiveNetwork::Primary => {
                (&self.primary, ConnectivityState::ConnectingPrimary, PRIMARY_ATTEMPTS, "WPA2-Personal")
            }
            _ => {
                (&self.secondary, ConnectivityState::ConnectingSecondary, SECONDARY_ATTEMPTS, "WPA2-Enterprise")
            }
        };

        info!("Info: intentando red {} ({})", credentials.ssid(), label);
        self.handle.mark_connecting(state);
        self.radio.disconnect();
        self.radio.begin(credentials);

        for attempt in 1..=attempts {
            if self.radio.status() == LinkStatus::Connected {
                return true;
            }
            sleep(POLL_SPACING).await;
            debug!("Debug: esperando asociación ({}/{})", attempt, attempts);
        }

        self.radio.status() == LinkStatus::Connected
    }

    fn on_connected(&mut self, network: ActiveNetwork) {
        self.active = network;
        self.backoff.reset();
        self.publish_connected();
        match network {
            ActiveNetwork::Primary => info!("Info: conectado a la red principal"),
            _ => info!("Info: conectado a la red alternativa (empresarial)"),
        }
    }

    fn publish_connected(&self) {
        let ip = self.radio.local_ip();
        info!("Info: dirección IP {}", ip);
        self.handle.mark_connected(self.radio.ssid(), ip);
    }
}

//! Dominio de conectividad WiFi.
//!
//! Contiene las credenciales de las dos redes, el contrato del driver de radio,
//! el cálculo puro del retroceso exponencial y el estado compartido que se
//! publica hacia las demás tareas.


use std::sync::RwLock;
use thiserror::Error;
use tokio::time::Duration;
use crate::config::wifi::{BACKOFF_CEILING, BACKOFF_FLOOR};


/// Credenciales de red, en orden de prioridad: personal primero, empresarial después.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// WPA2-Personal.
    Personal { ssid: String, password: String },
    /// WPA2-Enterprise.
    Enterprise { ssid: String, identity: String, username: String, password: String },
}


impl Credentials {
    pub fn ssid(&self) -> &str {
        match self {
            Credentials::Personal { ssid, .. } => ssid,
            Credentials::Enterprise { ssid, .. } => ssid,
        }
    }
}


impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Personal { ssid, .. } => f
                .debug_struct("Personal")
                .field("ssid", ssid)
                .finish_non_exhaustive(),
            Credentials::Enterprise { ssid, identity, .. } => f
                .debug_struct("Enterprise")
                .field("ssid", ssid)
                .field("identity", identity)
                .finish_non_exhaustive(),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Idle,
    Connecting,
    Connected,
    Failed,
}


/// Driver de radio. Sólo lo usa el gestor de conectividad.
pub trait WifiRadio: Send {
    /// Inicia la asociación con las credenciales dadas (no bloquea).
    fn begin(&mut self, credentials: &Credentials);
    fn disconnect(&mut self);
    fn status(&self) -> LinkStatus;
    fn ssid(&self) -> String;
    fn local_ip(&self) -> String;
}


/// Reinicio del proceso completo cuando ambas redes fallan.
pub trait Restarter: Send + Sync {
    fn restart(&self);
}


#[derive(Debug, Error, PartialEq, Eq)]
pub enum WifiError {
    #[error("fallaron la red principal y la alternativa")]
    AllNetworksFailed,
}


/// Red activa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveNetwork {
    Primary,
    Fallback,
    None,
}


/// Estados de la máquina de conexión.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectivityState {
    Disconnected,
    ConnectingPrimary,
    ConnectingSecondary,
    Connected,
}


/// Retroceso exponencial entre reintentos de reconexión.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}


impl Backoff {
    pub const fn new() -> Self {
        Self::with_bounds(BACKOFF_FLOOR, BACKOFF_CEILING)
    }

    pub const fn with_bounds(floor: Duration, ceiling: Duration) -> Self {
        Self { current: floor, floor, ceiling }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Duplica el retardo sin superar el techo.
    pub fn next_delay(current: Duration, ceiling: Duration) -> Duration {
        current.saturating_mul(2).min(ceiling)
    }

    /// Registra un fallo y devuelve el retardo que aplicará al próximo intento.
    pub fn fail(&mut self) -> Duration {
        self.current = Self::next_delay(self.current, self.ceiling);
        self.current
    }

    pub fn reset(&mut self) -> Duration {
        self.current = self.floor;
        self.current
    }
}


impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}


/// Instantánea inmutable de conectividad para el reporte de estado.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    pub state: ConnectivityState,
    pub connected: bool,
    pub ssid: String,
    pub ip: String,
}


impl ConnectivitySnapshot {
    fn disconnected(state: ConnectivityState) -> Self {
        Self { state, connected: false, ssid: String::new(), ip: String::new() }
    }
}


/// Estado de conectividad compartido.
///
/// Un único escritor (el gestor de conectividad); lectores en cualquier tarea.
/// Estado, bandera, SSID e IP se publican juntos bajo el mismo `RwLock`, que sólo
/// se toma para copiar o reemplazar la instantánea completa.
#[derive(Debug)]
pub struct ConnectivityHandle {
    current: RwLock<ConnectivitySnapshot>,
}


impl ConnectivityHandle {
    pub fn new() -> Self {
        Self { current: RwLock::new(ConnectivitySnapshot::disconnected(ConnectivityState::Disconnected)) }
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_connected(&self) -> bool {
        self.current.read().unwrap_or_else(|e| e.into_inner()).connected
    }

    pub fn mark_connecting(&self, state: ConnectivityState) {
        self.publish(ConnectivitySnapshot::disconnected(state));
    }

    pub fn mark_connected(&self, ssid: String, ip: String) {
        self.publish(ConnectivitySnapshot { state: ConnectivityState::Connected, connected: true, ssid, ip });
    }

    pub fn mark_disconnected(&self) {
        self.publish(ConnectivitySnapshot::disconnected(ConnectivityState::Disconnected));
    }

    fn publish(&self, snapshot: ConnectivitySnapshot) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }
}


impl Default for ConnectivityHandle {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_ceiling() {
        let mut backoff = Backoff::new();
        let mut delays = vec![backoff.current()];
        for _ in 0..5 {
            delays.push(backoff.fail());
        }
        let millis: Vec<u128> = delays.iter().map(|d| d.as_millis()).collect();
        assert_eq!(millis, vec![500, 1000, 2000, 4000, 4000, 4000]);
    }

    #[test]
    fn success_resets_to_the_floor() {
        let mut backoff = Backoff::new();
        backoff.fail();
        backoff.fail();
        assert_eq!(backoff.reset(), Duration::from_millis(500));
        assert_eq!(backoff.fail(), Duration::from_millis(1000));
    }

    #[test]
    fn next_delay_is_pure() {
        let ceiling = Duration::from_millis(4000);
        assert_eq!(Backoff::next_delay(Duration::from_millis(500), ceiling), Duration::from_millis(1000));
        assert_eq!(Backoff::next_delay(Duration::from_millis(3000), ceiling), ceiling);
    }

    #[test]
    fn handle_publishes_consistent_snapshots() {
        let handle = ConnectivityHandle::new();
        assert!(!handle.snapshot().connected);

        handle.mark_connecting(ConnectivityState::ConnectingSecondary);
        assert_eq!(handle.snapshot().state, ConnectivityState::ConnectingSecondary);

        handle.mark_connected("campus".to_string(), "10.0.0.7".to_string());
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, ConnectivityState::Connected);
        assert!(snapshot.connected);
        assert_eq!(snapshot.ssid, "campus");
        assert_eq!(snapshot.ip, "10.0.0.7");

        handle.mark_disconnected();
        let snapshot = handle.snapshot();
        assert!(!snapshot.connected);
        assert!(snapshot.ssid.is_empty());
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_snapshot() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let handle = Arc::new(ConnectivityHandle::new());
        let stop = Arc::new(AtomicBool::new(false));

        let writer = {
            let handle = handle.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    handle.mark_connecting(ConnectivityState::ConnectingPrimary);
                    handle.mark_connected("casa".to_string(), "10.0.0.7".to_string());
                    handle.mark_disconnected();
                }
            })
        };

        for _ in 0..200_000 {
            let snapshot = handle.snapshot();
            assert_eq!(snapshot.connected, snapshot.state == ConnectivityState::Connected, "{:?}", snapshot);
            assert_eq!(snapshot.connected, !snapshot.ssid.is_empty(), "{:?}", snapshot);
            assert_eq!(snapshot.connected, !snapshot.ip.is_empty(), "{:?}", snapshot);
        }

        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let credentials = Credentials::Personal {
            ssid: "casa".to_string(),
            password: "muy-secreto".to_string(),
        };
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("casa"));
        assert!(!printed.contains("muy-secreto"));
    }
}

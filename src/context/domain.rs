//! Definición del Contexto de Aplicación (Shared State).
//!
//! Este módulo implementa el patrón de **Estado Compartido** entre las tareas del nodo.
//! El `AppContext` agrupa los recursos que deben ser accesibles por múltiples tareas
//! concurrentes (configuración, estado de sincronización, conectividad y reloj monotónico).
//! Se crea una sola vez en el arranque y se clona (barato, todo es `Arc`) hacia cada tarea.


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::time::Instant;
use crate::system::domain::System;
use crate::wifi::domain::ConnectivityHandle;


#[derive(Clone, Debug)]
pub struct AppContext {
    pub system: Arc<System>,
    pub sync: Arc<SyncStatus>,
    pub connectivity: Arc<ConnectivityHandle>,
    pub uptime: Uptime,
}


impl AppContext {
    pub fn new(system: System) -> Self {
        Self {
            system: Arc::new(system),
            sync: Arc::new(SyncStatus::new()),
            connectivity: Arc::new(ConnectivityHandle::new()),
            uptime: Uptime::start(),
        }
    }
}


/// Reloj monotónico del nodo, en milisegundos desde el arranque.
#[derive(Clone, Copy, Debug)]
pub struct Uptime {
    boot: Instant,
}


impl Uptime {
    pub fn start() -> Self {
        Self { boot: Instant::now() }
    }

    pub fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }
}


/// Estado de sincronización observado por el reporte de estado.
///
/// Cada campo tiene un único escritor:
/// * `last_sync_ms` y `store_ready`: la tarea de subida.
/// * `dropped`: el muestreador, cuando la cola de lecturas está llena.
///
/// Los lectores aceptan valores ligeramente atrasados.
#[derive(Debug, Default)]
pub struct SyncStatus {
    last_sync_ms: AtomicU64,
    dropped: AtomicU32,
    store_ready: AtomicBool,
}


impl SyncStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un envío exitoso. `0` está reservado para "nunca", por eso se guarda al menos 1.
    pub fn record_sync(&self, now_ms: u64) {
        self.last_sync_ms.store(now_ms.max(1), Ordering::Release);
    }

    pub fn last_sync_ms(&self) -> u64 {
        self.last_sync_ms.load(Ordering::Acquire)
    }

    /// Incrementa el contador de lecturas descartadas y devuelve el total.
    pub fn record_drop(&self) -> u32 {
        self.dropped.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Acquire)
    }

    pub fn set_store_ready(&self, ready: bool) {
        self.store_ready.store(ready, Ordering::Release);
    }

    pub fn store_ready(&self) -> bool {
        self.store_ready.load(Ordering::Acquire)
    }
}


#[cfg(test)]
impl AppContext {
    pub fn for_tests() -> Self {
        Self::new(System::for_tests())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_starts_as_never_synced() {
        let status = SyncStatus::new();
        assert_eq!(status.last_sync_ms(), 0);
        assert_eq!(status.dropped(), 0);
        assert!(!status.store_ready());
    }

    #[test]
    fn drop_counter_accumulates() {
        let status = SyncStatus::new();
        assert_eq!(status.record_drop(), 1);
        assert_eq!(status.record_drop(), 2);
        assert_eq!(status.dropped(), 2);
    }

    #[test]
    fn sync_at_boot_instant_is_not_confused_with_never() {
        let status = SyncStatus::new();
        status.record_sync(0);
        assert_eq!(status.last_sync_ms(), 1);
        status.record_sync(12_000);
        assert_eq!(status.last_sync_ms(), 12_000);
    }

    #[tokio::test(start_paused = true)]
    async fn uptime_follows_the_runtime_clock() {
        let uptime = Uptime::start();
        tokio::time::sleep(tokio::time::Duration::from_millis(1500)).await;
        assert_eq!(uptime.now_ms(), 1500);
    }
}

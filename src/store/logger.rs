//! Almacén sin conexión: registra cada actualización en el log en lugar de subirla.
//!
//! Se usa cuando no hay host de Firebase configurado.


use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use super::domain::{RemoteStore, StoreError};


#[derive(Debug, Default)]
pub struct LoggerStore {
    updates: u64,
}


impl LoggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn updates(&self) -> u64 {
        self.updates
    }
}


#[async_trait]
impl RemoteStore for LoggerStore {
    fn is_ready(&self) -> bool {
        true
    }

    async fn service(&mut self) {}

    async fn update(&mut self, path: &str, body: &Value) -> Result<(), StoreError> {
        self.updates += 1;
        let records = body.as_object().map_or(0, |m| m.len());
        info!("Info: store(LOG) actualización #{} en '{}' con {} registros", self.updates, path, records);
        debug!("Debug: store(LOG) cuerpo {}", body);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logger_store_is_always_ready_and_counts_updates() {
        let mut store = LoggerStore::new();
        store.service().await;
        assert!(store.is_ready());

        store.update("", &serde_json::json!({ "/sensors/gas/x": { "value": 1 } })).await.unwrap();
        store.update("", &serde_json::json!({})).await.unwrap();
        assert_eq!(store.updates(), 2);
    }
}

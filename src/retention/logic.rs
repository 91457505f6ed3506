//! Limpieza por antigüedad de las colecciones remotas.
//!
//! Se ejecuta como tarea puntual (modo `cleanup` del binario), no como parte del
//! ciclo del nodo. Una falla en una colección se registra y la limpieza sigue con
//! la siguiente; el reporte final indica qué colecciones fallaron.


use tracing::{error, info, instrument};
use crate::config::retention::RETENTION;
use crate::store::domain::{collection_path, collection_segments, StoreError};
use super::domain::{expired_records, CleanupReport, RecordStore};


async fn cleanup_collection<S: RecordStore>(store: &S,
                                            segment: &str,
                                            cutoff_ms: u64) -> Result<usize, StoreError> {

    let path = collection_path(segment);
    let collection = store.fetch(&path).await?;
    if collection.is_null() {
        info!("Info: colección '{}' vacía", segment);
        return Ok(0);
    }

    let expired = expired_records(&collection, cutoff_ms);
    let total = collection.as_object().map_or(0, |records| records.len());

    for key in &expired {
        store.delete(&format!("{}/{}", path, key)).await?;
    }

    info!("Info: colección '{}': {} de {} registros eliminados", segment, expired.len(), total);
    Ok(expired.len())
}


/// Elimina de todas las colecciones los registros anteriores a `now_ms - RETENTION`.
#[instrument(name = "run_cleanup", skip(store))]
pub async fn cleanup<S: RecordStore>(store: &S, now_ms: u64) -> CleanupReport {
    let cutoff_ms = now_ms.saturating_sub(RETENTION.as_millis() as u64);
    info!("Info: eliminando registros anteriores a {} ms", cutoff_ms);

    let mut report = CleanupReport::default();
    for segment in collection_segments() {
        match cleanup_collection(store, segment, cutoff_ms).await {
            Ok(deleted) => report.deleted += deleted,
            Err(e) => {
                error!("Error: limpieza de '{}' fallida: {}", segment, e);
                report.failed.push(segment);
            }
        }
    }

    info!("Info: limpieza terminada, {} registros eliminados, {} colecciones con error",
          report.deleted, report.failed.len());
    report
}


#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;
    const NOW_MS: u64 = 10 * DAY_MS;

    #[derive(Default)]
    struct MemoryStore {
        collections: Mutex<HashMap<String, Value>>,
        broken: Vec<&'static str>,
        fetches: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn with(mut self, segment: &str, records: Value) -> Self {
            self.collections.get_mut().unwrap().insert(collection_path(segment), records);
            self
        }

        fn remaining(&self, segment: &str) -> Vec<String> {
            let collections = self.collections.lock().unwrap();
            let mut keys: Vec<String> = collections
                .get(&collection_path(segment))
                .and_then(Value::as_object)
                .map(|records| records.keys().cloned().collect())
                .unwrap_or_default();
            keys.sort();
            keys
        }

        fn is_broken(&self, path: &str) -> bool {
            self.broken.iter().any(|segment| path.starts_with(&collection_path(segment)))
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn fetch(&self, path: &str) -> Result<Value, StoreError> {
            self.fetches.lock().unwrap().push(path.to_string());
            if self.is_broken(path) {
                return Err(StoreError::Rejected(500));
            }
            Ok(self.collections.lock().unwrap().get(path).cloned().unwrap_or(Value::Null))
        }

        async fn delete(&self, path: &str) -> Result<(), StoreError> {
            self.deletes.lock().unwrap().push(path.to_string());
            let (collection, key) = path.rsplit_once('/').unwrap();
            if let Some(records) = self
                .collections
                .lock()
                .unwrap()
                .get_mut(collection)
                .and_then(Value::as_object_mut)
            {
                records.remove(key);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn records_older_than_three_days_are_removed() {
        let store = MemoryStore::default()
            .with("light", json!({
                "-old": { "value": 1, "timestamp": NOW_MS - 4 * DAY_MS },
                "-new": { "value": 2, "timestamp": NOW_MS - 2 * DAY_MS },
                "-raw": { "value": 3 },
            }))
            .with("motion", json!({
                "-old": { "timestamp": NOW_MS - 3 * DAY_MS - 1 },
            }));

        let report = cleanup(&store, NOW_MS).await;

        assert!(report.is_success());
        assert_eq!(report.deleted, 2);
        assert_eq!(store.remaining("light"), vec!["-new".to_string(), "-raw".to_string()]);
        assert!(store.remaining("motion").is_empty());
        assert!(store.deletes.lock().unwrap().contains(&"sensors/light/-old".to_string()));
    }

    #[tokio::test]
    async fn a_failing_collection_does_not_stop_the_others() {
        let mut store = MemoryStore::default()
            .with("gas", json!({ "-old": { "value": 1, "timestamp": 0 } }))
            .with("humidity", json!({ "-old": { "value": 50.0, "timestamp": 0 } }));
        store.broken = vec!["gas"];

        let report = cleanup(&store, NOW_MS).await;

        assert!(!report.is_success());
        assert_eq!(report.failed, vec!["gas"]);
        assert_eq!(report.deleted, 1);
        assert!(store.remaining("humidity").is_empty());
        assert_eq!(store.remaining("gas"), vec!["-old".to_string()]);
    }

    #[tokio::test]
    async fn every_written_collection_is_visited() {
        let store = MemoryStore::default();
        let report = cleanup(&store, NOW_MS).await;

        assert!(report.is_success());
        assert_eq!(report.deleted, 0);

        let fetches = store.fetches.lock().unwrap();
        assert_eq!(fetches.len(), 9);
        for segment in ["light", "gas", "flame", "soil-moisture", "sound",
                        "temperature", "humidity", "motion", "vibration"] {
            assert!(fetches.contains(&format!("sensors/{}", segment)), "{}", segment);
        }
    }
}

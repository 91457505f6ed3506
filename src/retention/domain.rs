//! Dominio de la limpieza por antigüedad de las colecciones remotas.
//!
//! Cada colección `sensors/<canal>` es un mapa `push id -> registro`. Un registro
//! vence cuando su `timestamp` numérico (ms, asignado por el servidor) es menor
//! que el corte. Los registros sin marca numérica se conservan.


use async_trait::async_trait;
use serde_json::Value;
use crate::store::domain::StoreError;


/// Acceso de lectura y borrado por ruta sobre la base remota.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Contenido de `path`, o `Value::Null` si no existe.
    async fn fetch(&self, path: &str) -> Result<Value, StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}


/// Claves de los registros vencidos de una colección.
pub fn expired_records(collection: &Value, cutoff_ms: u64) -> Vec<String> {
    let Some(records) = collection.as_object() else {
        return Vec::new();
    };

    records
        .iter()
        .filter(|(_, record)| {
            record
                .get("timestamp")
                .and_then(Value::as_u64)
                .is_some_and(|timestamp| timestamp < cutoff_ms)
        })
        .map(|(key, _)| key.clone())
        .collect()
}


#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: Vec<&'static str>,
}


impl CleanupReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_records_older_than_the_cutoff_expire() {
        let collection = json!({
            "-a": { "value": 1, "timestamp": 999 },
            "-b": { "value": 2, "timestamp": 1000 },
            "-c": { "value": 3, "timestamp": 5000 },
        });

        assert_eq!(expired_records(&collection, 1000), vec!["-a".to_string()]);
    }

    #[test]
    fn records_without_a_numeric_timestamp_are_kept() {
        let collection = json!({
            "-a": { "value": 1 },
            "-b": { "timestamp": { ".sv": "timestamp" } },
            "-c": { "timestamp": "ayer" },
            "-d": 7,
        });

        assert!(expired_records(&collection, u64::MAX).is_empty());
    }

    #[test]
    fn missing_collection_has_nothing_to_expire() {
        assert!(expired_records(&Value::Null, 1000).is_empty());
    }
}

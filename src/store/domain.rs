//! Dominio del almacén remoto.
//!
//! Define el contrato del cliente de la base remota y la construcción de los
//! registros que se suben: un registro agregado por canal para cada lote de
//! lecturas, y un registro individual por evento.
//!
//! # Formato
//! Cada registro se direcciona como `/sensors/<canal>/<push id>` y lleva un
//! marcador de marca temporal asignada por el servidor:
//!
//! ```json
//! { "/sensors/light/-Nx3...": { "value": 1834, "timestamp": { ".sv": "timestamp" } } }
//! ```
//!
//! Todos los registros de un lote viajan en una única actualización multi-ruta atómica.


use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use crate::events::domain::{Event, EventKind};
use crate::sensors::domain::{AnalogChannel, Reading};
use super::push_id::PushIdGenerator;


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("almacén remoto no listo")]
    NotReady,
    #[error("error serializando registro: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("error de transporte: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("el servidor rechazó la actualización (HTTP {0})")]
    Rejected(u16),
}


/// Cliente de la base remota.
///
/// `service` debe invocarse con regularidad, haya o no envíos, para mantener
/// su máquina de estados interna.
#[async_trait]
pub trait RemoteStore: Send {
    fn is_ready(&self) -> bool;

    async fn service(&mut self);

    /// Actualización atómica multi-ruta relativa a `path`.
    async fn update(&mut self, path: &str, body: &Value) -> Result<(), StoreError>;
}


#[derive(Debug, Clone, Copy, Serialize)]
struct ServerTimestamp {
    #[serde(rename = ".sv")]
    sv: &'static str,
}


const SERVER_TIMESTAMP: ServerTimestamp = ServerTimestamp { sv: "timestamp" };


#[derive(Debug, Serialize)]
struct ValueRecord<T: Serialize> {
    value: T,
    timestamp: ServerTimestamp,
}


#[derive(Debug, Serialize)]
struct EventRecord {
    timestamp: ServerTimestamp,
}


/// Agregados de un lote de lecturas.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub light: u16,
    pub gas: u16,
    pub flame: u16,
    pub soil_moisture: u16,
    /// Máximo de la amplitud de sonido: actividad pico del lote.
    pub sound_peak: u16,
    /// Promedio sobre las muestras válidas, con un decimal.
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}


impl BatchSummary {

    /// Calcula los agregados. Devuelve `None` para un lote vacío.
    pub fn from_readings(batch: &[Reading]) -> Option<Self> {
        if batch.is_empty() {
            return None;
        }

        let mean = |channel: AnalogChannel| -> u16 {
            let sum: u64 = batch.iter().map(|r| u64::from(r.channel(channel))).sum();
            (sum / batch.len() as u64) as u16
        };

        let sound_peak = batch.iter().map(|r| r.sound_amplitude).max().unwrap_or(0);

        Some(Self {
            light: mean(AnalogChannel::Light),
            gas: mean(AnalogChannel::Gas),
            flame: mean(AnalogChannel::Flame),
            soil_moisture: mean(AnalogChannel::SoilMoisture),
            sound_peak,
            temperature: valid_mean(batch.iter().map(|r| (r.temperature, r.temperature_valid))),
            humidity: valid_mean(batch.iter().map(|r| (r.humidity, r.humidity_valid))),
        })
    }

    fn channel_value(&self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::Light => self.light,
            AnalogChannel::Gas => self.gas,
            AnalogChannel::Flame => self.flame,
            AnalogChannel::SoilMoisture => self.soil_moisture,
            AnalogChannel::Sound => self.sound_peak,
        }
    }
}


fn valid_mean(samples: impl Iterator<Item = (f32, bool)>) -> Option<f64> {
    let (sum, count) = samples
        .filter(|&(_, valid)| valid)
        .fold((0.0_f64, 0_u32), |(sum, count), (value, _)| (sum + f64::from(value), count + 1));

    (count > 0).then(|| round_one_decimal(sum / f64::from(count)))
}


/// Redondeo a un decimal, mitad al par.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}


pub const TEMPERATURE_SEGMENT: &str = "temperature";
pub const HUMIDITY_SEGMENT: &str = "humidity";


/// Ruta de la colección de un canal: `sensors/<canal>`.
pub fn collection_path(segment: &str) -> String {
    format!("sensors/{}", segment)
}


/// Segmentos de todas las colecciones que escribe el nodo.
pub fn collection_segments() -> Vec<&'static str> {
    AnalogChannel::ALL
        .iter()
        .map(|c| c.as_str())
        .chain([TEMPERATURE_SEGMENT, HUMIDITY_SEGMENT])
        .chain(EventKind::ALL.iter().map(|k| k.as_str()))
        .collect()
}


fn record_path(segment: &str, key: &str) -> String {
    format!("/{}/{}", collection_path(segment), key)
}


/// Construye la actualización multi-ruta de un lote.
pub fn build_batch_update(summary: &BatchSummary,
                          ids: &mut PushIdGenerator) -> Result<Value, StoreError> {

    let mut update = Map::new();

    for channel in AnalogChannel::ALL {
        let record = ValueRecord { value: summary.channel_value(channel), timestamp: SERVER_TIMESTAMP };
        update.insert(record_path(channel.as_str(), &ids.next()), serde_json::to_value(record)?);
    }

    if let Some(temperature) = summary.temperature {
        let record = ValueRecord { value: temperature, timestamp: SERVER_TIMESTAMP };
        update.insert(record_path(TEMPERATURE_SEGMENT, &ids.next()), serde_json::to_value(record)?);
    }

    if let Some(humidity) = summary.humidity {
        let record = ValueRecord { value: humidity, timestamp: SERVER_TIMESTAMP };
        update.insert(record_path(HUMIDITY_SEGMENT, &ids.next()), serde_json::to_value(record)?);
    }

    Ok(Value::Object(update))
}


/// Construye la actualización de un evento individual.
pub fn build_event_update(event: &Event,
                          ids: &mut PushIdGenerator) -> Result<Value, StoreError> {

    let mut update = Map::new();
    let record = EventRecord { timestamp: SERVER_TIMESTAMP };
    update.insert(record_path(event.kind.as_str(), &ids.next()), serde_json::to_value(record)?);
    Ok(Value::Object(update))
}

//! Dominio de la tarea de subida: el lote en memoria y el temporizador de envío.
//!
//! El lote pertenece en exclusiva a la tarea de subida. Un lote se envía cuando
//! está lleno o cuando venció el intervalo de subida, lo que ocurra primero; si el
//! envío falla, las lecturas se conservan para el próximo intento.


use tokio::time::{Duration, Instant};
use crate::sensors::domain::Reading;


#[derive(Debug, Clone)]
pub struct Batch {
    readings: Vec<Reading>,
    capacity: usize,
}


impl Batch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { readings: Vec::with_capacity(capacity), capacity }
    }

    /// Agrega una lectura. Devuelve `false` si el lote ya estaba lleno.
    pub fn push(&mut self, reading: Reading) -> bool {
        if self.is_full() {
            return false;
        }
        self.readings.push(reading);
        true
    }

    pub fn is_full(&self) -> bool {
        self.readings.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}


/// Temporizador del envío por intervalo.
///
/// Tras un envío fallido el lote lleno deja de disparar por sí solo: el próximo
/// intento espera el intervalo completo, lo que acota la frecuencia de reintentos.
#[derive(Debug, Clone, Copy)]
pub struct UploadTimer {
    last_attempt: Instant,
    interval: Duration,
    retrying: bool,
}


impl UploadTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { last_attempt: now, interval, retrying: false }
    }

    pub fn interval_elapsed(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_attempt) >= self.interval
    }

    /// Lote no vacío y (lleno sin fallo pendiente, o intervalo vencido).
    pub fn should_send(&self, batch: &Batch, now: Instant) -> bool {
        !batch.is_empty() && ((batch.is_full() && !self.retrying) || self.interval_elapsed(now))
    }

    /// Envío exitoso, o intervalo vencido sin poder enviar.
    pub fn reset(&mut self, now: Instant) {
        self.last_attempt = now;
    }

    pub fn record_success(&mut self, now: Instant) {
        self.last_attempt = now;
        self.retrying = false;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.last_attempt = now;
        self.retrying = true;
    }
}

use tokio::sync::mpsc;
use tracing::{debug, warn};
use crate::channels::domain::{offer, QueueError};
use super::domain::{Debouncer, Event, EventKind};


/// Procesa una palabra de notificación ya vaciada.
///
/// Cada tipo presente en `bits` se evalúa de forma independiente contra su propio
/// temporizador de antirrebote. Un evento admitido se encola sin bloquear; si la cola
/// está llena se descarta (no se reintenta).
///
/// # Retorno
/// Cantidad de eventos encolados.
pub fn handle_event_notifications(bits: u32,
                                  now_ms: u64,
                                  debouncer: &mut Debouncer,
                                  tx: &mpsc::Sender<Event>) -> usize {

    let mut queued = 0;

    for kind in EventKind::ALL {
        if bits & kind.bit() == 0 {
            continue;
        }
        if !debouncer.admit(kind, now_ms) {
            debug!("Debug: evento {} suprimido por antirrebote", kind.as_str());
            continue;
        }

        match offer(tx, Event { kind, timestamp_ms: now_ms }) {
            Ok(()) => {
                debug!("Debug: evento {} encolado", kind.as_str());
                queued += 1;
            }
            Err(QueueError::Full) => warn!("Warning: cola de eventos llena, evento {} descartado", kind.as_str()),
            Err(QueueError::Closed) => warn!("Warning: cola de eventos cerrada, evento {} descartado", kind.as_str()),
        }
    }

    queued
}

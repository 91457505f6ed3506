//! Eventos discretos (movimiento, vibración) originados por interrupciones.
//!
//! El camino de una interrupción es:
//! 1. El manejador de la interrupción llama a [`EventNotifier::on_pulse`], que sólo
//!    hace un OR atómico sobre una palabra de notificación (sin bloqueos ni asignaciones).
//! 2. El muestreador, una vez por ciclo, vacía la palabra con [`EventNotifier::take`].
//! 3. Cada bit activo pasa por el [`Debouncer`] antes de convertirse en un [`Event`].


use std::sync::atomic::{AtomicU32, Ordering};
use crate::config::events::DEBOUNCE_WINDOW_MS;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Motion,
    Vibration,
}


impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Motion, EventKind::Vibration];

    /// Bit asignado en la palabra de notificación.
    pub const fn bit(self) -> u32 {
        match self {
            EventKind::Motion => 1 << 0,
            EventKind::Vibration => 1 << 1,
        }
    }

    /// Segmento de ruta en la base remota.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Motion => "motion",
            EventKind::Vibration => "vibration",
        }
    }

    const fn index(self) -> usize {
        match self {
            EventKind::Motion => 0,
            EventKind::Vibration => 1,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp_ms: u64,
}


/// Palabra de notificación escrita desde contexto de interrupción.
#[derive(Debug, Default)]
pub struct EventNotifier {
    pending: AtomicU32,
}


impl EventNotifier {
    pub const fn new() -> Self {
        Self { pending: AtomicU32::new(0) }
    }

    /// Wait-free: apto para manejadores de interrupción.
    pub fn on_pulse(&self, kind: EventKind) {
        self.pending.fetch_or(kind.bit(), Ordering::Release);
    }

    /// Devuelve y limpia los bits pendientes.
    pub fn take(&self) -> u32 {
        self.pending.swap(0, Ordering::AcqRel)
    }
}


/// Temporizadores de antirrebote, uno por tipo de evento.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u64,
    last_admitted: [Option<u64>; 2],
}


impl Debouncer {
    pub fn new() -> Self {
        Self::with_window(DEBOUNCE_WINDOW_MS)
    }

    pub fn with_window(window_ms: u64) -> Self {
        Self { window_ms, last_admitted: [None; 2] }
    }

    /// Admite el evento si pasó la ventana desde el último admitido del mismo tipo.
    pub fn admit(&mut self, kind: EventKind, now_ms: u64) -> bool {
        let slot = &mut self.last_admitted[kind.index()];
        let admitted = match *slot {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.window_ms,
        };
        if admitted {
            *slot = Some(now_ms);
        }
        admitted
    }
}


impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

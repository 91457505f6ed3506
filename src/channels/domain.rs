use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use crate::config::queues::{EVENT_QUEUE_CAPACITY, READING_QUEUE_CAPACITY};
use crate::events::domain::Event;
use crate::sensors::domain::Reading;


/// Colas acotadas que desacoplan el muestreador (productor) de la tarea de subida (consumidor).
pub struct Channels {
    pub sampler_to_uploader_reading: mpsc::Sender<Reading>,
    pub uploader_from_sampler_reading: mpsc::Receiver<Reading>,

    pub sampler_to_uploader_event: mpsc::Sender<Event>,
    pub uploader_from_sampler_event: mpsc::Receiver<Event>,
}


impl Channels {
    pub fn new() -> Channels {
        Self::with_capacity(READING_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(readings: usize, events: usize) -> Channels {
        let (s_to_u_reading, u_from_s_reading) = mpsc::channel::<Reading>(readings);
        let (s_to_u_event, u_from_s_event) = mpsc::channel::<Event>(events);

        Self {
            sampler_to_uploader_reading: s_to_u_reading,
            uploader_from_sampler_reading: u_from_s_reading,
            sampler_to_uploader_event: s_to_u_event,
            uploader_from_sampler_event: u_from_s_event,
        }
    }
}


#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("cola llena")]
    Full,
    #[error("cola cerrada")]
    Closed,
}


/// Encola sin bloquear. Con la cola llena el elemento nuevo se descarta.
pub fn offer<T>(tx: &mpsc::Sender<T>, item: T) -> Result<(), QueueError> {
    tx.try_send(item).map_err(|e| match e {
        TrySendError::Full(_) => QueueError::Full,
        TrySendError::Closed(_) => QueueError::Closed,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backpressure_keeps_first_c_items_in_order() {
        let (tx, mut rx) = mpsc::channel::<u32>(4);

        let mut accepted = Vec::new();
        let mut dropped = 0;
        for i in 0..10 {
            match offer(&tx, i) {
                Ok(()) => accepted.push(i),
                Err(QueueError::Full) => dropped += 1,
                Err(QueueError::Closed) => panic!("la cola no debería estar cerrada"),
            }
        }

        assert_eq!(accepted, vec![0, 1, 2, 3]);
        assert_eq!(dropped, 6);

        let mut drained = Vec::new();
        while let Ok(item) = rx.try_recv() {
            drained.push(item);
        }
        assert_eq!(drained, accepted);
    }

    #[test]
    fn space_frees_up_after_dequeue() {
        let (tx, mut rx) = mpsc::channel::<u32>(1);
        assert_eq!(offer(&tx, 1), Ok(()));
        assert_eq!(offer(&tx, 2), Err(QueueError::Full));
        assert_eq!(rx.try_recv().ok(), Some(1));
        assert_eq!(offer(&tx, 3), Ok(()));
    }

    #[test]
    fn closed_queue_is_reported() {
        let (tx, rx) = mpsc::channel::<u32>(1);
        drop(rx);
        assert_eq!(offer(&tx, 1), Err(QueueError::Closed));
    }

    #[test]
    fn default_capacities() {
        let channels = Channels::new();
        assert_eq!(channels.sampler_to_uploader_reading.max_capacity(), READING_QUEUE_CAPACITY);
        assert_eq!(channels.sampler_to_uploader_event.max_capacity(), EVENT_QUEUE_CAPACITY);
    }
}

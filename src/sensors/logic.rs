//! Lógica de muestreo periódico.
//!
//! La tarea de muestreo corre con período fijo sobre un calendario absoluto
//! (`tokio::time::interval`: el próximo despertar es el anterior más el período),
//! de modo que la cadencia no deriva aunque el trabajo de cada ciclo varíe.
//!
//! # Ciclo
//! 1. Lee cada canal analógico una vez; el canal de sonido se muestrea durante una
//!    ventana fija y se reduce a amplitud pico a pico.
//! 2. Lee el sensor de clima y marca cada valor como válido o inválido.
//! 3. Encola la lectura sin bloquear; si la cola está llena, cuenta el descarte.
//! 4. Vacía las notificaciones de interrupción pendientes (antirrebote incluido).


use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use crate::channels::domain::{offer, QueueError};
use crate::config::sampling::{ADC_MAX, SAMPLE_PERIOD, SOUND_WINDOW, SOUND_YIELD_EVERY};
use crate::context::domain::{AppContext, SyncStatus, Uptime};
use crate::events::domain::{Debouncer, Event, EventNotifier};
use crate::events::logic::handle_event_notifications;
use super::domain::{clamp_adc, is_valid_humidity, is_valid_temperature, AnalogChannel, Reading, SensorBus};


const SUB_SAMPLE_PAUSE: Duration = Duration::from_millis(1);


/// Muestrea el canal de sonido durante `window` y devuelve la amplitud pico a pico.
///
/// Cada `SOUND_YIELD_EVERY` sub-lecturas cede el control al planificador para no
/// acaparar el hilo del runtime.
pub async fn sample_sound_amplitude<B: SensorBus>(bus: &mut B, window: Duration) -> u16 {
    let deadline = Instant::now() + window;
    let mut min = ADC_MAX;
    let mut max = 0;
    let mut reads: u32 = 0;

    while Instant::now() < deadline {
        let value = clamp_adc(bus.read_channel(AnalogChannel::Sound));
        min = min.min(value);
        max = max.max(value);
        reads += 1;

        if reads % SOUND_YIELD_EVERY == 0 {
            sleep(SUB_SAMPLE_PAUSE).await;
        }
    }

    if reads == 0 {
        return 0;
    }
    debug!("Debug: sonido min={} max={} muestras={}", min, max, reads);
    max - min
}


/// Arma la lectura de un ciclo completo.
pub async fn take_reading<B: SensorBus>(bus: &mut B, uptime: &Uptime) -> Reading {
    let light = clamp_adc(bus.read_channel(AnalogChannel::Light));
    let gas = clamp_adc(bus.read_channel(AnalogChannel::Gas));
    let flame = clamp_adc(bus.read_channel(AnalogChannel::Flame));
    let soil_moisture = clamp_adc(bus.read_channel(AnalogChannel::SoilMoisture));
    let sound_amplitude = sample_sound_amplitude(bus, SOUND_WINDOW).await;

    let (temperature, humidity) = bus.read_climate();

    Reading {
        light,
        gas,
        flame,
        soil_moisture,
        sound_amplitude,
        temperature,
        temperature_valid: is_valid_temperature(temperature),
        humidity,
        humidity_valid: is_valid_humidity(humidity),
        timestamp_ms: uptime.now_ms(),
    }
}


/// Encola la lectura sin bloquear; con la cola llena la descarta y la cuenta.
pub fn enqueue_reading(tx: &mpsc::Sender<Reading>,
                       reading: Reading,
                       sync: &SyncStatus) -> Result<(), QueueError> {

    match offer(tx, reading) {
        Ok(()) => {
            debug!(
                "Debug: lectura encolada luz={} gas={} llama={} suelo={} sonido={}",
                reading.light, reading.gas, reading.flame, reading.soil_moisture, reading.sound_amplitude
            );
            if reading.temperature_valid && reading.humidity_valid {
                debug!("Debug: temperatura={:.1}°C humedad={:.1}%", reading.temperature, reading.humidity);
            }
            Ok(())
        }
        Err(QueueError::Full) => {
            let total = sync.record_drop();
            warn!("Warning: cola de lecturas llena, lectura descartada. Total descartadas: {}", total);
            Err(QueueError::Full)
        }
        Err(QueueError::Closed) => Err(QueueError::Closed),
    }
}


/// Ejecuta el bucle de muestreo.
///
/// # Argumentos
/// * `bus`: Acceso a los sensores.
/// * `tx_reading`: Cola de lecturas hacia la tarea de subida.
/// * `tx_event`: Cola de eventos hacia la tarea de subida.
/// * `notifier`: Palabra de notificación escrita por las interrupciones.
/// * `app_context`: Contexto compartido (reloj y contador de descartes).
#[instrument(
    name = "run_sampler_task",
    skip(bus, tx_reading, tx_event, notifier, app_context)
)]
pub async fn sampler_task<B: SensorBus>(mut bus: B,
                                        tx_reading: mpsc::Sender<Reading>,
                                        tx_event: mpsc::Sender<Event>,
                                        notifier: Arc<EventNotifier>,
                                        app_context: AppContext) {

    info!("Info: tarea de muestreo creada");

    let mut ticker = interval(SAMPLE_PERIOD);
    let mut debouncer = Debouncer::new();

    loop {
        ticker.tick().await;

        let reading = take_reading(&mut bus, &app_context.uptime).await;
        if let Err(QueueError::Closed) = enqueue_reading(&tx_reading, reading, &app_context.sync) {
            error!("Error: cola de lecturas cerrada");
            break;
        }

        let bits = notifier.take();
        if bits != 0 {
            handle_event_notifications(bits, app_context.uptime.now_ms(), &mut debouncer, &tx_event);
        }
    }

    info!("Info: tarea de muestreo finalizada");
}


pub fn start_sampler<B: SensorBus + 'static>(bus: B,
                                             to_uploader_reading: mpsc::Sender<Reading>,
                                             to_uploader_event: mpsc::Sender<Event>,
                                             notifier: Arc<EventNotifier>,
                                             ctx: AppContext) {

    info!("Info: iniciando tarea de muestreo");
    tokio::spawn(async move {
        sampler_task(
            bus,
            to_uploader_reading,
            to_uploader_event,
            notifier,
            ctx,
        ).await;
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::domain::EventKind;

    /// Bus determinista: el canal de sonido recorre una rampa, el resto es fijo.
    struct FakeBus {
        sound: Vec<u16>,
        cursor: usize,
        climate: (f32, f32),
    }

    impl FakeBus {
        fn new(climate: (f32, f32)) -> Self {
            Self { sound: vec![2000, 2400, 1900, 2100], cursor: 0, climate }
        }
    }

    impl SensorBus for FakeBus {
        fn read_channel(&mut self, channel: AnalogChannel) -> u16 {
            match channel {
                AnalogChannel::Light => 100,
                AnalogChannel::Gas => 200,
                AnalogChannel::Flame => 5000,
                AnalogChannel::SoilMoisture => 400,
                AnalogChannel::Sound => {
                    let value = self.sound[self.cursor % self.sound.len()];
                    self.cursor += 1;
                    value
                }
            }
        }

        fn read_climate(&mut self) -> (f32, f32) {
            self.climate
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sound_window_reduces_to_peak_to_peak() {
        let mut bus = FakeBus::new((20.0, 50.0));
        let amplitude = sample_sound_amplitude(&mut bus, SOUND_WINDOW).await;
        assert_eq!(amplitude, 500);
        assert!(bus.cursor > SOUND_YIELD_EVERY as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_window_yields_zero() {
        let mut bus = FakeBus::new((20.0, 50.0));
        assert_eq!(sample_sound_amplitude(&mut bus, Duration::ZERO).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_climate_values_are_kept_but_flagged() {
        let mut bus = FakeBus::new((f32::NAN, 140.0));
        let reading = take_reading(&mut bus, &Uptime::start()).await;

        assert!(reading.temperature.is_nan());
        assert!(!reading.temperature_valid);
        assert_eq!(reading.humidity, 140.0);
        assert!(!reading.humidity_valid);
        assert_eq!(reading.flame, ADC_MAX);
        assert_eq!(reading.light, 100);
    }

    #[test]
    fn full_reading_queue_counts_drops() {
        let (tx, _rx) = mpsc::channel(2);
        let sync = SyncStatus::new();

        for _ in 0..5 {
            let _ = enqueue_reading(&tx, Reading::default(), &sync);
        }

        assert_eq!(sync.dropped(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_keeps_a_fixed_cadence_and_forwards_events() {
        let ctx = AppContext::for_tests();
        let (tx_reading, mut rx_reading) = mpsc::channel(100);
        let (tx_event, mut rx_event) = mpsc::channel(10);
        let notifier = Arc::new(EventNotifier::new());

        notifier.on_pulse(EventKind::Vibration);
        let handle = tokio::spawn(sampler_task(
            FakeBus::new((21.5, 40.0)),
            tx_reading,
            tx_event,
            notifier.clone(),
            ctx,
        ));

        sleep(Duration::from_millis(3500)).await;
        handle.abort();

        let mut stamps = Vec::new();
        while let Ok(reading) = rx_reading.try_recv() {
            assert!(reading.temperature_valid && reading.humidity_valid);
            stamps.push(reading.timestamp_ms);
        }
        assert_eq!(stamps.len(), 4);
        for pair in stamps.windows(2) {
            assert_eq!(pair[1] - pair[0], SAMPLE_PERIOD.as_millis() as u64);
        }

        let event = rx_event.try_recv().expect("vibración encolada");
        assert_eq!(event.kind, EventKind::Vibration);
        assert!(rx_event.try_recv().is_err());
    }
}

//! Hardware simulado para correr el nodo en una máquina de desarrollo.
//!
//! Cada tipo implementa uno de los contratos de hardware del nodo
//! ([`SensorBus`], [`WifiRadio`], [`Display`], [`Restarter`]) y registra su
//! actividad con `tracing`. Las interrupciones de los sensores de pulso se
//! emulan con un hilo del sistema que escribe en el [`EventNotifier`], igual que
//! lo haría una rutina de interrupción.


use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};
use crate::config::display::{COLS, ROWS};
use crate::config::sampling::ADC_MAX;
use crate::config::wifi::RESTART_EXIT_CODE;
use crate::display::domain::{Display, Glyph};
use crate::events::domain::{EventKind, EventNotifier};
use crate::sensors::domain::{AnalogChannel, SensorBus};
use crate::wifi::domain::{Credentials, LinkStatus, Restarter, WifiRadio};


/// Bus de sensores con señales deterministas que varían lentamente.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    step: u32,
}


impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Onda triangular entre `base` y `base + span`.
    fn wave(&self, base: u16, span: u16, period: u32) -> u16 {
        let phase = self.step % period;
        let half = period / 2;
        let rising = if phase < half { phase } else { period - phase };
        let offset = (u32::from(span) * rising / half.max(1)) as u16;
        (base + offset).min(ADC_MAX)
    }
}


impl SensorBus for SimulatedBus {
    fn read_channel(&mut self, channel: AnalogChannel) -> u16 {
        self.step = self.step.wrapping_add(1);
        match channel {
            AnalogChannel::Light => self.wave(1200, 1800, 600),
            AnalogChannel::Gas => self.wave(300, 250, 240),
            AnalogChannel::Flame => self.wave(3900, 150, 90),
            AnalogChannel::SoilMoisture => self.wave(1800, 600, 1200),
            AnalogChannel::Sound => self.wave(1700, 700, 14),
        }
    }

    /// Cada 25 lecturas el sensor de clima "falla" y devuelve `NaN`.
    fn read_climate(&mut self) -> (f32, f32) {
        if self.step % 25 == 0 {
            debug!("[SIM CLIMA] lectura fallida");
            return (f32::NAN, f32::NAN);
        }
        let temperature = 14.0 + f32::from(self.wave(0, 80, 900)) / 10.0;
        let humidity = 55.0 + f32::from(self.wave(0, 250, 700)) / 10.0;
        (temperature, humidity)
    }
}


/// Radio que asocia con cualquier red tras unos sondeos.
///
/// Con `drop_every > 0`, una vez asociada reporta `Failed` cada `drop_every`
/// sondeos para simular la pérdida del enlace.
#[derive(Debug)]
pub struct SimulatedRadio {
    polls_to_connect: u32,
    drop_every: u32,
    polls: AtomicU32,
    current: Option<String>,
}


impl SimulatedRadio {
    pub fn new(polls_to_connect: u32, drop_every: u32) -> Self {
        Self { polls_to_connect, drop_every, polls: AtomicU32::new(0), current: None }
    }
}


impl WifiRadio for SimulatedRadio {
    fn begin(&mut self, credentials: &Credentials) {
        debug!("[SIM RADIO] asociando con {:?}", credentials);
        self.current = Some(credentials.ssid().to_string());
        self.polls.store(0, Ordering::Relaxed);
    }

    fn disconnect(&mut self) {
        self.current = None;
    }

    fn status(&self) -> LinkStatus {
        if self.current.is_none() {
            return LinkStatus::Idle;
        }
        let polls = self.polls.fetch_add(1, Ordering::Relaxed) + 1;
        if polls <= self.polls_to_connect {
            return LinkStatus::Connecting;
        }

        let associated = polls - self.polls_to_connect;
        if self.drop_every > 0 && associated % self.drop_every == 0 {
            debug!("[SIM RADIO] enlace perdido");
            return LinkStatus::Failed;
        }
        LinkStatus::Connected
    }

    fn ssid(&self) -> String {
        self.current.clone().unwrap_or_default()
    }

    fn local_ip(&self) -> String {
        match self.current {
            Some(_) => "192.168.4.23".to_string(),
            None => String::new(),
        }
    }
}


/// Pantalla de texto que vuelca cada cuadro al log cuando cambia.
#[derive(Debug)]
pub struct ConsoleDisplay {
    rows: Vec<Vec<char>>,
    last_frame: String,
}


impl ConsoleDisplay {
    pub fn new() -> Self {
        Self { rows: vec![vec![' '; COLS]; ROWS], last_frame: String::new() }
    }

    fn put(&mut self, row: usize, col: usize, text: impl Iterator<Item = char>) {
        let Some(line) = self.rows.get_mut(row) else {
            return;
        };
        for (cell, c) in line.iter_mut().skip(col).zip(text) {
            *cell = c;
        }
    }

    fn contents(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|line| line.iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}


impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}


impl Display for ConsoleDisplay {
    fn clear(&mut self) {
        for line in self.rows.iter_mut() {
            line.fill(' ');
        }
    }

    fn write_at(&mut self, row: usize, col: usize, text: &str) {
        self.put(row, col, text.chars());
    }

    fn write_glyph(&mut self, row: usize, col: usize, glyph: Glyph) {
        self.put(row, col, std::iter::once(glyph.symbol()));
    }

    fn flush(&mut self) {
        let frame = self.contents().join(" | ");
        if frame != self.last_frame {
            info!("[LCD] {}", frame);
            self.last_frame = frame;
        }
    }
}


/// Emula las interrupciones de movimiento y vibración con un hilo propio.
pub fn start_pulse_simulator(notifier: Arc<EventNotifier>,
                             period: Duration) -> io::Result<JoinHandle<()>> {

    thread::Builder::new()
        .name("pulse-simulator".to_string())
        .spawn(move || {
            let mut round: u64 = 0;
            loop {
                thread::sleep(period);
                round += 1;
                let kind = if round % 3 == 0 { EventKind::Vibration } else { EventKind::Motion };
                notifier.on_pulse(kind);
            }
        })
}


/// Reinicia el proceso completo saliendo con un código que el supervisor reconoce.
#[derive(Debug, Default)]
pub struct ProcessRestarter;


impl Restarter for ProcessRestarter {
    fn restart(&self) {
        error!("Error: reinicio solicitado, saliendo con código {}", RESTART_EXIT_CODE);
        std::process::exit(RESTART_EXIT_CODE);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::domain::{is_valid_humidity, is_valid_temperature};

    #[test]
    fn simulated_signals_stay_in_range() {
        let mut bus = SimulatedBus::new();
        for _ in 0..2000 {
            for channel in AnalogChannel::ALL {
                assert!(bus.read_channel(channel) <= ADC_MAX);
            }
            let (temperature, humidity) = bus.read_climate();
            if !temperature.is_nan() {
                assert!(is_valid_temperature(temperature));
                assert!(is_valid_humidity(humidity));
            }
        }
    }

    #[test]
    fn simulated_radio_associates_after_polls() {
        let mut radio = SimulatedRadio::new(2, 0);
        assert_eq!(radio.status(), LinkStatus::Idle);

        radio.begin(&Credentials::Personal { ssid: "casa".to_string(), password: "x".to_string() });
        assert_eq!(radio.status(), LinkStatus::Connecting);
        assert_eq!(radio.status(), LinkStatus::Connecting);
        assert_eq!(radio.status(), LinkStatus::Connected);
        assert_eq!(radio.ssid(), "casa");

        radio.disconnect();
        assert_eq!(radio.status(), LinkStatus::Idle);
        assert!(radio.local_ip().is_empty());
    }

    #[test]
    fn simulated_radio_drops_the_link_periodically() {
        let mut radio = SimulatedRadio::new(1, 3);
        radio.begin(&Credentials::Personal { ssid: "casa".to_string(), password: "x".to_string() });

        let seen: Vec<LinkStatus> = (0..7).map(|_| radio.status()).collect();
        assert_eq!(seen, vec![
            LinkStatus::Connecting,
            LinkStatus::Connected,
            LinkStatus::Connected,
            LinkStatus::Failed,
            LinkStatus::Connected,
            LinkStatus::Connected,
            LinkStatus::Failed,
        ]);

        radio.begin(&Credentials::Personal { ssid: "casa".to_string(), password: "x".to_string() });
        assert_eq!(radio.status(), LinkStatus::Connecting);
    }

    #[test]
    fn console_display_composes_rows() {
        let mut display = ConsoleDisplay::new();
        display.clear();
        display.write_glyph(1, 0, Glyph::Ip);
        display.write_at(1, 1, " 10.0.0.1");
        display.write_at(3, 18, "overflow");

        let rows = display.contents();
        assert_eq!(rows[1], "# 10.0.0.1");
        assert_eq!(rows[3], "                  ov");
        assert!(rows[0].is_empty());
    }

    #[test]
    fn pulse_simulator_raises_notifications() {
        let notifier = Arc::new(EventNotifier::new());
        let _handle = start_pulse_simulator(notifier.clone(), Duration::from_millis(5)).unwrap();

        let mut seen = 0;
        for _ in 0..200 {
            thread::sleep(Duration::from_millis(5));
            seen |= notifier.take();
            if seen == EventKind::Motion.bit() | EventKind::Vibration.bit() {
                break;
            }
        }
        assert_eq!(seen, EventKind::Motion.bit() | EventKind::Vibration.bit());
    }
}

//! Dominio de muestreo: la lectura de un ciclo y el contrato del bus de sensores.


use crate::config::sampling::{ADC_MAX, HUMIDITY_RANGE, TEMPERATURE_RANGE};


/// Canales analógicos (ADC de 12 bits, 0-4095).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    Light,
    Gas,
    Flame,
    SoilMoisture,
    Sound,
}


impl AnalogChannel {
    pub const ALL: [AnalogChannel; 5] = [
        AnalogChannel::Light,
        AnalogChannel::Gas,
        AnalogChannel::Flame,
        AnalogChannel::SoilMoisture,
        AnalogChannel::Sound,
    ];

    /// Segmento de ruta en la base remota.
    pub const fn as_str(self) -> &'static str {
        match self {
            AnalogChannel::Light => "light",
            AnalogChannel::Gas => "gas",
            AnalogChannel::Flame => "flame",
            AnalogChannel::SoilMoisture => "soil-moisture",
            AnalogChannel::Sound => "sound",
        }
    }
}


/// Acceso al hardware de sensores.
///
/// Debe poder llamarse desde la tarea de muestreo sin bloquear más allá de una
/// sub-lectura individual.
pub trait SensorBus: Send {
    /// Lectura cruda de un canal analógico en `0..=4095`.
    fn read_channel(&mut self, channel: AnalogChannel) -> u16;

    /// Temperatura (°C) y humedad (%) del sensor digital combinado. `NaN` indica fallo de lectura.
    fn read_climate(&mut self) -> (f32, f32);
}


/// Instantánea de un ciclo de muestreo.
///
/// Inmutable una vez capturada; se copia por valor a la cola de lecturas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub light: u16,
    pub gas: u16,
    pub flame: u16,
    pub soil_moisture: u16,
    /// Amplitud pico a pico dentro de la ventana de sonido.
    pub sound_amplitude: u16,
    pub temperature: f32,
    pub temperature_valid: bool,
    pub humidity: f32,
    pub humidity_valid: bool,
    /// Milisegundos monotónicos desde el arranque.
    pub timestamp_ms: u64,
}


impl Reading {
    pub fn channel(&self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::Light => self.light,
            AnalogChannel::Gas => self.gas,
            AnalogChannel::Flame => self.flame,
            AnalogChannel::SoilMoisture => self.soil_moisture,
            AnalogChannel::Sound => self.sound_amplitude,
        }
    }
}


pub fn clamp_adc(raw: u16) -> u16 {
    raw.min(ADC_MAX)
}


fn in_range(value: f32, (low, high): (f32, f32)) -> bool {
    !value.is_nan() && value >= low && value <= high
}


pub fn is_valid_temperature(value: f32) -> bool {
    in_range(value, TEMPERATURE_RANGE)
}


pub fn is_valid_humidity(value: f32) -> bool {
    in_range(value, HUMIDITY_RANGE)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_never_valid() {
        assert!(!is_valid_temperature(f32::NAN));
        assert!(!is_valid_humidity(f32::NAN));
    }

    #[test]
    fn range_limits_are_inclusive() {
        assert!(is_valid_temperature(-40.0));
        assert!(is_valid_temperature(80.0));
        assert!(!is_valid_temperature(80.1));
        assert!(is_valid_humidity(0.0));
        assert!(is_valid_humidity(100.0));
        assert!(!is_valid_humidity(-0.5));
    }

    #[test]
    fn channel_accessor_maps_fields() {
        let reading = Reading {
            light: 1,
            gas: 2,
            flame: 3,
            soil_moisture: 4,
            sound_amplitude: 5,
            ..Reading::default()
        };
        let values: Vec<u16> = AnalogChannel::ALL.iter().map(|&c| reading.channel(c)).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn adc_values_are_clamped() {
        assert_eq!(clamp_adc(5000), 4095);
        assert_eq!(clamp_adc(17), 17);
    }
}

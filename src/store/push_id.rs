//! Claves de registro ordenables cronológicamente.
//!
//! 8 caracteres de tiempo (milisegundos en base 64) seguidos de 12 caracteres
//! aleatorios. El alfabeto está en orden ASCII, por lo que el orden lexicográfico
//! de las claves coincide con el orden de generación.


use chrono::Utc;
use uuid::Uuid;


const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Bytes de un UUID v4 que no llevan bits fijos de versión o variante.
const UUID_RANDOM_BYTES: [usize; RANDOM_CHARS] = [0, 1, 2, 3, 4, 5, 7, 9, 10, 11, 12, 13];


#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: Option<u64>,
    last_random: [u8; RANDOM_CHARS],
}


impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clave para el instante actual del reloj de pared.
    pub fn next(&mut self) -> String {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_at(now_ms)
    }

    /// Clave para `now_ms`. Un reloj que retrocede reutiliza el último tiempo.
    pub fn next_at(&mut self, now_ms: u64) -> String {
        let now = match self.last_time {
            Some(last) if now_ms < last => last,
            _ => now_ms,
        };

        if self.last_time == Some(now) {
            self.increment_random();
        } else {
            self.fill_random();
        }
        self.last_time = Some(now);

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut time_chars = [0u8; TIME_CHARS];
        let mut remaining = now;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(time_chars.iter().map(|&c| c as char));
        id.extend(self.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }

    fn fill_random(&mut self) {
        let bytes = Uuid::new_v4().into_bytes();
        for (slot, &index) in self.last_random.iter_mut().zip(UUID_RANDOM_BYTES.iter()) {
            *slot = bytes[index] % 64;
        }
    }

    fn increment_random(&mut self) {
        for digit in self.last_random.iter_mut().rev() {
            if *digit == 63 {
                *digit = 0;
            } else {
                *digit += 1;
                break;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_time_prefix_and_random_suffix() {
        let mut ids = PushIdGenerator::new();
        let id = ids.next_at(0);
        assert_eq!(id.len(), 20);
        assert_eq!(&id[..8], "--------");
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn same_millisecond_ids_are_strictly_increasing() {
        let mut ids = PushIdGenerator::new();
        let generated: Vec<String> = (0..1000).map(|_| ids.next_at(1_700_000_000_000)).collect();

        for pair in generated.windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
            assert_eq!(pair[0][..8], pair[1][..8]);
        }
    }

    #[test]
    fn later_time_sorts_after() {
        let mut ids = PushIdGenerator::new();
        let first = ids.next_at(1_700_000_000_000);
        let second = ids.next_at(1_700_000_000_001);
        assert!(first < second);
    }

    #[test]
    fn clock_stepping_back_reuses_last_time() {
        let mut ids = PushIdGenerator::new();
        let first = ids.next_at(1_700_000_000_500);
        let second = ids.next_at(1_700_000_000_000);
        assert_eq!(first[..8], second[..8]);
        assert!(first < second);
    }
}

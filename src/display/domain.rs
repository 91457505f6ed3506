//! Dominio del reporte de estado.
//!
//! El contenido de la pantalla se calcula con una función pura ([`render`]) a
//! partir de una instantánea del estado; dibujarlo es un paso aparte que toma el
//! bus de la pantalla con espera acotada.
//!
//! # Disposición (4 filas × 20 columnas)
//! ```text
//! W casa-del-bosque
//! I 192.168.1.50
//! C Cloud:OK            (o "CL:OK Drop:3" si hubo descartes)
//! S Sync:12s ago        ("Sync:Never" / "Sync:Just now")
//! ```


use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::debug;
use crate::config::display::{COLS, ROWS};
use crate::context::domain::AppContext;


const SSID_MAX_CHARS: usize = 18;
const INIT_MESSAGE: &str = "Initializing...";


/// Íconos de la columna 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Wifi,
    Ip,
    Cloud,
    Sync,
}


impl Glyph {
    /// Representación para pantallas de texto.
    pub const fn symbol(self) -> char {
        match self {
            Glyph::Wifi => '^',
            Glyph::Ip => '#',
            Glyph::Cloud => '*',
            Glyph::Sync => '~',
        }
    }
}


/// Pantalla de caracteres.
pub trait Display: Send {
    fn clear(&mut self);
    fn write_at(&mut self, row: usize, col: usize, text: &str);
    fn write_glyph(&mut self, row: usize, col: usize, glyph: Glyph);

    /// Fin de cuadro. Las pantallas con buffer propio lo vuelcan aquí.
    fn flush(&mut self) {}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRow {
    pub glyph: Glyph,
    pub text: String,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub rows: [FrameRow; ROWS],
}


/// Estado observado en un instante, ya filtrado por conectividad.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub ssid: Option<String>,
    pub ip: Option<String>,
    pub store_ready: bool,
    /// `0` = nunca sincronizado.
    pub last_sync_ms: u64,
    pub dropped: u32,
    pub now_ms: u64,
}


impl StatusSnapshot {
    pub fn capture(ctx: &AppContext) -> Self {
        let connectivity = ctx.connectivity.snapshot();
        let (ssid, ip) = if connectivity.connected {
            (Some(connectivity.ssid), Some(connectivity.ip))
        } else {
            (None, None)
        };

        Self {
            ssid,
            ip,
            store_ready: ctx.sync.store_ready(),
            last_sync_ms: ctx.sync.last_sync_ms(),
            dropped: ctx.sync.dropped(),
            now_ms: ctx.uptime.now_ms(),
        }
    }
}


fn fit(text: String) -> String {
    text.chars().take(COLS - 1).collect()
}


fn ok_or_no(ready: bool) -> &'static str {
    if ready { "OK" } else { "NO" }
}


/// Calcula el cuadro a mostrar. Función pura.
pub fn render(snapshot: &StatusSnapshot) -> Frame {
    let wifi = match snapshot.ssid.as_deref().filter(|s| !s.is_empty()) {
        Some(ssid) => format!(" {}", ssid.chars().take(SSID_MAX_CHARS).collect::<String>()),
        None => " Disconnected".to_string(),
    };

    let ip = match snapshot.ip.as_deref().filter(|s| !s.is_empty()) {
        Some(ip) => format!(" {}", ip),
        None => " N/A".to_string(),
    };

    let cloud = if snapshot.dropped > 0 {
        format!(" CL:{} Drop:{}", ok_or_no(snapshot.store_ready), snapshot.dropped)
    } else {
        format!(" Cloud:{}", ok_or_no(snapshot.store_ready))
    };

    let sync = if snapshot.last_sync_ms == 0 {
        " Sync:Never".to_string()
    } else {
        match snapshot.now_ms.saturating_sub(snapshot.last_sync_ms) / 1000 {
            0 => " Sync:Just now".to_string(),
            secs => format!(" Sync:{}s ago", secs),
        }
    };

    Frame {
        rows: [
            FrameRow { glyph: Glyph::Wifi, text: fit(wifi) },
            FrameRow { glyph: Glyph::Ip, text: fit(ip) },
            FrameRow { glyph: Glyph::Cloud, text: fit(cloud) },
            FrameRow { glyph: Glyph::Sync, text: fit(sync) },
        ],
    }
}


/// Pantalla compartida detrás del mutex del bus.
pub struct SharedDisplay<D: Display> {
    inner: Arc<Mutex<D>>,
}


impl<D: Display> Clone for SharedDisplay<D> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}


impl<D: Display> SharedDisplay<D> {
    pub fn new(display: D) -> Self {
        Self { inner: Arc::new(Mutex::new(display)) }
    }

    /// Dibuja el cuadro si el bus se obtiene dentro de `lock_timeout`.
    /// Si no, el cuadro se omite y devuelve `false`.
    pub async fn draw(&self, frame: &Frame, lock_timeout: Duration) -> bool {
        let Ok(mut display) = timeout(lock_timeout, self.inner.lock()).await else {
            debug!("Debug: bus de pantalla ocupado, cuadro omitido");
            return false;
        };

        display.clear();
        for (row, line) in frame.rows.iter().enumerate() {
            display.write_glyph(row, 0, line.glyph);
            display.write_at(row, 1, &line.text);
        }
        display.flush();
        true
    }

    pub async fn show_init_message(&self, lock_timeout: Duration) -> bool {
        let Ok(mut display) = timeout(lock_timeout, self.inner.lock()).await else {
            return false;
        };

        display.clear();
        display.write_at(0, 0, INIT_MESSAGE);
        display.flush();
        true
    }

    #[cfg(test)]
    pub fn inner(&self) -> Arc<Mutex<D>> {
        self.inner.clone()
    }
}

//! Tarea de reporte de estado: refresca la pantalla cada `STATUS_PERIOD`.


use tokio::time::interval;
use tracing::{info, instrument};
use crate::config::display::{LOCK_TIMEOUT, STATUS_PERIOD};
use crate::context::domain::AppContext;
use super::domain::{render, Display, SharedDisplay, StatusSnapshot};


/// Ejecuta el bucle de reporte.
///
/// Sólo lee estado compartido; un cuadro que no obtiene el bus a tiempo se omite
/// y el siguiente tick vuelve a intentarlo.
#[instrument(name = "run_reporter_task", skip(display, app_context))]
pub async fn reporter_task<D: Display>(display: SharedDisplay<D>, app_context: AppContext) {

    info!("Info: tarea de reporte creada");
    let mut ticker = interval(STATUS_PERIOD);

    loop {
        ticker.tick().await;
        let frame = render(&StatusSnapshot::capture(&app_context));
        display.draw(&frame, LOCK_TIMEOUT).await;
    }
}


pub fn start_reporter<D: Display + 'static>(display: SharedDisplay<D>, ctx: AppContext) {
    info!("Info: iniciando tarea de reporte");
    tokio::spawn(async move {
        reporter_task(display, ctx).await;
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};
    use crate::display::domain::tests::MemoryDisplay;

    #[tokio::test(start_paused = true)]
    async fn reporter_reflects_shared_state() {
        let ctx = AppContext::for_tests();
        let shared = SharedDisplay::new(MemoryDisplay::default());

        ctx.connectivity.mark_connected("casa".to_string(), "10.0.0.2".to_string());
        ctx.sync.set_store_ready(true);
        ctx.sync.record_drop();

        let handle = tokio::spawn(reporter_task(shared.clone(), ctx.clone()));
        sleep(Duration::from_millis(1_100)).await;
        handle.abort();

        let inner = shared.inner();
        let display = inner.lock().await;
        assert_eq!(display.frames, 3);
        assert_eq!(display.lines[0], "^ casa");
        assert_eq!(display.lines[1], "# 10.0.0.2");
        assert_eq!(display.lines[2], "* CL:OK Drop:1");
        assert_eq!(display.lines[3], "~ Sync:Never");
    }
}

//! Lógica de la tarea de subida.
//!
//! Único consumidor de ambas colas y único dueño del gestor de conectividad y del
//! cliente del almacén remoto.
//!
//! # Ciclo
//! 1. Mantiene el cliente remoto (`service`) y publica si está listo.
//! 2. Cada `CHECK_INTERVAL` sondea el enlace WiFi (reconexión con retroceso).
//! 3. Si el lote no está lleno, espera una lectura un tiempo acotado.
//! 4. Envía el lote si corresponde; si falla, lo conserva.
//! 5. Vacía la cola de eventos: cada uno se envía solo o se descarta.


use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, instrument, warn};
use crate::config::upload::{RECEIVE_WAIT, UPLOADER_YIELD};
use crate::config::wifi::CHECK_INTERVAL;
use crate::context::domain::AppContext;
use crate::events::domain::Event;
use crate::sensors::domain::Reading;
use crate::store::domain::{build_batch_update, build_event_update, BatchSummary, RemoteStore, StoreError};
use crate::store::push_id::PushIdGenerator;
use crate::wifi::domain::WifiRadio;
use crate::wifi::logic::ConnectivityManager;
use super::domain::{Batch, UploadTimer};


async fn send_batch<S: RemoteStore>(store: &mut S,
                                    batch: &Batch,
                                    ids: &mut PushIdGenerator) -> Result<(), StoreError> {

    let Some(summary) = BatchSummary::from_readings(batch.readings()) else {
        return Ok(());
    };
    let body = build_batch_update(&summary, ids)?;
    store.update("", &body).await
}


async fn drain_events<S: RemoteStore>(rx_event: &mut mpsc::Receiver<Event>,
                                      store: &mut S,
                                      ids: &mut PushIdGenerator) {

    while let Ok(event) = rx_event.try_recv() {
        if !store.is_ready() {
            warn!("Warning: evento {} descartado, almacén no listo", event.kind.as_str());
            continue;
        }

        let result = match build_event_update(&event, ids) {
            Ok(body) => store.update("", &body).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => info!("Info: evento {} enviado", event.kind.as_str()),
            Err(e) => error!("Error: no se pudo enviar el evento {}: {}", event.kind.as_str(), e),
        }
    }
}


/// Ejecuta el bucle de subida.
///
/// Termina cuando la cola de lecturas se cierra y el lote pendiente quedó vacío.
///
/// # Argumentos
/// * `manager`: Gestor de conectividad (esta tarea es su único conductor).
/// * `store`: Cliente del almacén remoto.
/// * `rx_reading`: Cola de lecturas desde el muestreador.
/// * `rx_event`: Cola de eventos desde el muestreador.
/// * `app_context`: Configuración del lote y estado de sincronización compartido.
#[instrument(
    name = "run_uploader_task",
    skip(manager, store, rx_reading, rx_event, app_context)
)]
pub async fn uploader_task<R: WifiRadio, S: RemoteStore>(mut manager: ConnectivityManager<R>,
                                                         mut store: S,
                                                         mut rx_reading: mpsc::Receiver<Reading>,
                                                         mut rx_event: mpsc::Receiver<Event>,
                                                         app_context: AppContext) {

    info!("Info: tarea de subida creada");

    match manager.connect_with_fallback().await {
        Ok(_) => info!(
            "Info: enlace en {} ({}) por la red {}",
            manager.ssid(),
            manager.ip(),
            if manager.is_using_primary() { "principal" } else { "alternativa" }
        ),
        Err(e) => error!("Error: conexión inicial fallida: {}", e),
    }

    let mut batch = Batch::new(app_context.system.batch_size);
    let mut timer = UploadTimer::new(app_context.system.upload_interval, Instant::now());
    let mut ids = PushIdGenerator::new();
    let mut last_wifi_check = Instant::now();
    let mut readings_open = true;

    loop {
        store.service().await;
        app_context.sync.set_store_ready(store.is_ready());

        if last_wifi_check.elapsed() >= CHECK_INTERVAL {
            last_wifi_check = Instant::now();
            if let Err(e) = manager.check_connection().await {
                error!("Error: reconexión fallida: {}. Próximo intento en {:?}", e, manager.backoff());
            }
        }

        if readings_open && !batch.is_full() {
            match timeout(RECEIVE_WAIT, rx_reading.recv()).await {
                Ok(Some(reading)) => {
                    batch.push(reading);
                    debug!("Debug: lectura agregada al lote ({})", batch.len());
                }
                Ok(None) => {
                    warn!("Warning: cola de lecturas cerrada");
                    readings_open = false;
                }
                Err(_) => {}
            }
        }

        let now = Instant::now();
        if timer.should_send(&batch, now) {
            if manager.is_connected() && store.is_ready() {
                match send_batch(&mut store, &batch, &mut ids).await {
                    Ok(()) => {
                        info!("Info: lote de {} lecturas enviado", batch.len());
                        batch.clear();
                        app_context.sync.record_sync(app_context.uptime.now_ms());
                        timer.record_success(now);
                    }
                    Err(e) => {
                        error!("Error: envío de lote fallido, se conserva ({} lecturas): {}", batch.len(), e);
                        timer.record_failure(now);
                    }
                }
            } else if timer.interval_elapsed(now) {
                debug!("Debug: envío omitido, sin enlace o almacén no listo");
                timer.reset(now);
            }
        }

        drain_events(&mut rx_event, &mut store, &mut ids).await;

        if !readings_open && batch.is_empty() {
            break;
        }

        sleep(UPLOADER_YIELD).await;
    }

    info!("Info: tarea de subida finalizada");
}


pub fn start_uploader<R, S>(manager: ConnectivityManager<R>,
                            store: S,
                            from_sampler_reading: mpsc::Receiver<Reading>,
                            from_sampler_event: mpsc::Receiver<Event>,
                            ctx: AppContext)
where
    R: WifiRadio + 'static,
    S: RemoteStore + 'static,
{
    info!("Info: iniciando tarea de subida");
    tokio::spawn(async move {
        uploader_task(
            manager,
            store,
            from_sampler_reading,
            from_sampler_event,
            ctx,
        ).await;
    });
}

use std::sync::Arc;
use tracing::{error, info, warn};
use crate::channels::domain::Channels;
use crate::config::display::LOCK_TIMEOUT;
use crate::config::simulation::{PULSE_PERIOD, RADIO_DROP_EVERY, RADIO_POLLS_TO_CONNECT};
use crate::context::domain::AppContext;
use crate::display::domain::SharedDisplay;
use crate::display::logic::start_reporter;
use crate::events::domain::EventNotifier;
use crate::hal::{start_pulse_simulator, ConsoleDisplay, ProcessRestarter, SimulatedBus, SimulatedRadio};
use crate::retention::logic::cleanup;
use crate::sensors::logic::start_sampler;
use crate::store::firebase::FirebaseStore;
use crate::store::logger::LoggerStore;
use crate::system::domain::{init_tracing, CleanupConfig, System};
use crate::uploader::logic::start_uploader;
use crate::wifi::logic::ConnectivityManager;

mod channels;
mod config;
mod context;
mod display;
mod events;
mod hal;
mod retention;
mod sensors;
mod store;
mod system;
mod uploader;
mod wifi;


#[tokio::main]
async fn main() {
    match std::env::args().nth(1).as_deref() {
        Some("cleanup") => run_cleanup().await,
        _ => run_node().await,
    }
}


/// Limpieza puntual de registros vencidos. Termina con código 1 si alguna colección falló.
async fn run_cleanup() {

    let config = match CleanupConfig::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: configuración inválida: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.environment, &config.rust_log);

    let store = match FirebaseStore::new(&config.firebase_host, Some(config.firebase_auth.clone())) {
        Ok(store) => store,
        Err(e) => {
            error!("Error: no se pudo crear el cliente de Firebase: {}", e);
            std::process::exit(1);
        }
    };

    let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let report = cleanup(&store, now_ms).await;
    if !report.is_success() {
        std::process::exit(1);
    }
}


async fn run_node() {

    let system = match System::new() {
        Ok(system) => system,
        Err(e) => {
            eprintln!("Error: configuración inválida: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&system.environment, &system.rust_log);
    system.log_summary();

    let channels = Channels::new();
    let app_context = AppContext::new(system);

    let display = SharedDisplay::new(ConsoleDisplay::new());
    display.show_init_message(LOCK_TIMEOUT).await;

    let notifier = Arc::new(EventNotifier::new());
    if let Err(e) = start_pulse_simulator(notifier.clone(), PULSE_PERIOD) {
        warn!("Warning: no se pudo iniciar el simulador de pulsos: {}", e);
    }

    start_sampler(SimulatedBus::new(),
                  channels.sampler_to_uploader_reading,
                  channels.sampler_to_uploader_event,
                  notifier,
                  app_context.clone());

    let manager = ConnectivityManager::new(SimulatedRadio::new(RADIO_POLLS_TO_CONNECT, RADIO_DROP_EVERY),
                                           app_context.system.primary.clone(),
                                           app_context.system.secondary.clone(),
                                           app_context.connectivity.clone(),
                                           Arc::new(ProcessRestarter));

    match app_context.system.firebase_host.as_deref() {
        Some(host) => match FirebaseStore::new(host, app_context.system.firebase_auth.clone()) {
            Ok(store) => start_uploader(manager,
                                        store,
                                        channels.uploader_from_sampler_reading,
                                        channels.uploader_from_sampler_event,
                                        app_context.clone()),
            Err(e) => {
                error!("Error: no se pudo crear el cliente de Firebase: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("Warning: FIREBASE_HOST_URL no definido, las subidas sólo se registran en el log");
            start_uploader(manager,
                           LoggerStore::new(),
                           channels.uploader_from_sampler_reading,
                           channels.uploader_from_sampler_event,
                           app_context.clone());
        }
    }

    start_reporter(display, app_context.clone());

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Info: señal de apagado recibida"),
        Err(e) => error!("Error: esperando señal de apagado: {}", e),
    }
}

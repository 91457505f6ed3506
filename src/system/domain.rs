//! Módulo de configuración central y gestión del entorno de ejecución.
//!
//! Este módulo actúa como la fuente única de verdad para la configuración del nodo.
//! Se encarga de leer las variables de entorno (credenciales WiFi, almacén remoto),
//! establecer valores por defecto y configurar el sistema de logs.
//!
//! # Funcionalidades Principales
//! * **Carga de Configuración:** Lee de `.env` en desarrollo y variables de sistema en producción.
//! * **Observabilidad:** Configura `tracing_subscriber` para logs estructurados o legibles.


use std::env;
use std::str::FromStr;
use thiserror::Error;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use crate::config::upload::{BATCH_SIZE, UPLOAD_INTERVAL};
use crate::wifi::domain::Credentials;


/// Errores de carga de configuración.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("{0} no está configurada")]
    MissingVar(&'static str),
    #[error("{name} debe ser un número: {value}")]
    InvalidVar { name: &'static str, value: String },
}


/// Representa la configuración global del nodo y el estado del entorno.
#[derive(Debug, Clone)]
pub struct System {
    /// Red principal (WPA2-Personal). **Requerido**.
    pub primary: Credentials,

    /// Red alternativa (WPA2-Enterprise). **Requerido**.
    pub secondary: Credentials,

    /// URL de la base de datos remota (ej. `https://nodo.firebaseio.com`).
    /// Si no está definida, las subidas se registran en el log.
    pub firebase_host: Option<String>,

    /// Token legado de autenticación para la base remota.
    pub firebase_auth: Option<String>,

    /// Cantidad de lecturas por lote.
    /// Por defecto: `10`.
    pub batch_size: usize,

    /// Intervalo máximo entre envíos de un lote incompleto.
    /// Por defecto: `10` segundos.
    pub upload_interval: Duration,

    /// Entorno de ejecución actual (`development`, `staging`, `production`).
    pub environment: String,

    /// Nivel de detalle de los logs (ej. `info`, `debug`, `warn`).
    pub rust_log: String,
}


impl System {

    /// Carga la configuración desde las variables de entorno.
    ///
    /// # Comportamiento
    /// * Si `ENVIRONMENT` es "development", intenta cargar un archivo `.env`.
    /// * Falla si falta alguna credencial WiFi o si un valor numérico no es válido.
    pub fn new() -> Result<Self, SystemError> {

        let environment = load_environment();

        let primary = Credentials::Personal {
            ssid: require("PRIMARY_WIFI_SSID")?,
            password: require("PRIMARY_WIFI_PASSWORD")?,
        };

        let secondary = Credentials::Enterprise {
            ssid: require("SECONDARY_WIFI_SSID")?,
            identity: require("SECONDARY_WIFI_IDENTITY")?,
            username: require("SECONDARY_WIFI_USERNAME")?,
            password: require("SECONDARY_WIFI_PASSWORD")?,
        };

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| default_log_level(&environment).to_string());

        Ok(System {
            primary,
            secondary,
            firebase_host: env::var("FIREBASE_HOST_URL").ok().filter(|h| !h.is_empty()),
            firebase_auth: env::var("FIREBASE_AUTH_TOKEN").ok(),
            batch_size: parse_or("BATCH_SIZE", BATCH_SIZE)?.max(1),
            upload_interval: Duration::from_secs(
                parse_or("UPLOAD_INTERVAL_SECS", UPLOAD_INTERVAL.as_secs())?
            ),
            rust_log,
            environment,
        })
    }

    pub fn log_summary(&self) {
        info!("Info: configuración cargada");
        info!("  red principal   : {}", self.primary.ssid());
        info!("  red alternativa : {}", self.secondary.ssid());
        info!("  base remota     : {}", self.firebase_host.as_deref().unwrap_or("(offline)"));
        info!("  lote            : {} lecturas / {:?}", self.batch_size, self.upload_interval);
        info!("  entorno         : {}", self.environment);
    }
}


/// Configuración del modo de limpieza por antigüedad.
///
/// No necesita credenciales WiFi: corre en un host con acceso directo a la base.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub firebase_host: String,
    pub firebase_auth: String,
    pub environment: String,
    pub rust_log: String,
}


impl CleanupConfig {

    /// Falla si falta `FIREBASE_HOST_URL` o `FIREBASE_AUTH_TOKEN`.
    pub fn new() -> Result<Self, SystemError> {
        let environment = load_environment();
        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| default_log_level(&environment).to_string());

        Ok(CleanupConfig {
            firebase_host: require("FIREBASE_HOST_URL")?,
            firebase_auth: require("FIREBASE_AUTH_TOKEN")?,
            environment,
            rust_log,
        })
    }
}


/// Lee `ENVIRONMENT` y, en desarrollo, carga `.env`.
fn load_environment() -> String {
    let environment = env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "development".into());

    if environment == "development" {
        dotenv::dotenv().ok();
    }
    environment
}


fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "development" => "debug",
        "staging" => "info",
        _ => "warn",
    }
}


fn require(name: &'static str) -> Result<String, SystemError> {
    env::var(name).map_err(|_| SystemError::MissingVar(name))
}


fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, SystemError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| SystemError::InvalidVar { name, value }),
        Err(_) => Ok(default),
    }
}


/// Inicializa el sistema de trazabilidad y logs (Tracing).
///
/// Configura el formato de salida basándose en el entorno:
/// * **Production**: Salida JSON (para logs estructurados).
/// * **Development/Otros**: Salida "Pretty" (colores y formato legible).
pub fn init_tracing(environment: &str, rust_log: &str) {

    let filter = EnvFilter::try_new(rust_log)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if environment == "production" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}


#[cfg(test)]
impl System {
    pub fn for_tests() -> Self {
        Self {
            primary: Credentials::Personal {
                ssid: "casa".to_string(),
                password: "secreto".to_string(),
            },
            secondary: Credentials::Enterprise {
                ssid: "campus".to_string(),
                identity: "anon".to_string(),
                username: "alumno".to_string(),
                password: "clave".to_string(),
            },
            firebase_host: None,
            firebase_auth: None,
            batch_size: BATCH_SIZE,
            upload_interval: UPLOAD_INTERVAL,
            environment: "test".to_string(),
            rust_log: "debug".to_string(),
        }
    }
}

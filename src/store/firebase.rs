//! Cliente REST de Firebase Realtime Database.
//!
//! Las actualizaciones multi-ruta se envían como `PATCH <host>/<ruta>.json?auth=<token>`.
//! La disponibilidad se determina con un sondeo liviano (`GET /.json?shallow=true`)
//! que `service` repite cada `READY_CHECK_INTERVAL` mientras el almacén no esté listo.
//!
//! Para la limpieza por antigüedad también expone lectura (`GET`) y borrado
//! (`DELETE`) por ruta, independientes de la disponibilidad del ciclo de subida.


use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::config::store::{READY_CHECK_INTERVAL, REQUEST_TIMEOUT};
use crate::retention::domain::RecordStore;
use super::domain::{RemoteStore, StoreError};


pub struct FirebaseStore {
    client: Client,
    base_url: String,
    auth: Option<String>,
    ready: bool,
    last_check: Option<Instant>,
}


impl FirebaseStore {
    pub fn new(host: &str, auth: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            auth,
            ready: false,
            last_check: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    /// Un rechazo de credenciales invalida la disponibilidad y fuerza un nuevo sondeo.
    fn rejected(&mut self, status: StatusCode) -> StoreError {
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!("Warning: credenciales rechazadas por Firebase (HTTP {})", status.as_u16());
            self.ready = false;
        }
        StoreError::Rejected(status.as_u16())
    }

    async fn check_reachable(&mut self) -> Result<(), StoreError> {
        let request = self
            .client
            .get(self.url(""))
            .query(&[("shallow", "true")]);

        let response = self.with_auth(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}


#[async_trait]
impl RemoteStore for FirebaseStore {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn service(&mut self) {
        if self.ready {
            return;
        }

        let due = self.last_check.is_none_or(|last| last.elapsed() >= READY_CHECK_INTERVAL);
        if !due {
            return;
        }
        self.last_check = Some(Instant::now());

        match self.check_reachable().await {
            Ok(()) => {
                info!("Info: Firebase listo en {}", self.base_url);
                self.ready = true;
            }
            Err(e) => warn!("Warning: Firebase no disponible: {}", e),
        }
    }

    async fn update(&mut self, path: &str, body: &Value) -> Result<(), StoreError> {
        if !self.ready {
            return Err(StoreError::NotReady);
        }

        let request = self.client.patch(self.url(path)).json(body);
        let response = match self.with_auth(request).send().await {
            Ok(response) => response,
            Err(e) => {
                self.ready = false;
                return Err(StoreError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(self.rejected(status));
        }

        debug!("Debug: actualización aceptada en '{}'", path);
        Ok(())
    }
}


#[async_trait]
impl RecordStore for FirebaseStore {
    async fn fetch(&self, path: &str) -> Result<Value, StoreError> {
        let request = self.client.get(self.url(path));
        let response = self.with_auth(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected(status.as_u16()));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let request = self.client.delete(self.url(path));
        let response = self.with_auth(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected(status.as_u16()));
        }
        debug!("Debug: registro '{}' eliminado", path);
        Ok(())
    }
}

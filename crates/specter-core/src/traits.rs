use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    catalog::PluginCatalog,
    dispatch::WorkerContext,
    sample::{Sample, SampleRecord},
    session::SessionId,
    settings::StoreConfig,
};

/// Label con el que se marcan los contenedores de workers de un namespace.
pub const NAMESPACE_LABEL: &str = "io.specter.namespace";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub state: String,
}

impl ContainerSummary {
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.labels.get(NAMESPACE_LABEL).map(String::as_str) == Some(namespace)
    }

    /// Primer nombre sin la `/` inicial, o el id si no tiene nombre.
    pub fn display_name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOptions {
    pub force: bool,
    pub volumes: bool,
    pub links: bool,
}

impl RemoveOptions {
    pub const FORCE_ALL: RemoveOptions = RemoveOptions {
        force: true,
        volumes: true,
        links: true,
    };
}

/// Todo lo que necesita un worker para analizar la muestra y escribir sus
/// resultados directamente en el backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub plugin: String,
    pub category: String,
    pub image: String,
    pub sample_hash: String,
    pub session_id: SessionId,
    pub logs: bool,
    pub store: StoreConfig,
    pub colocated: bool,
}

/// Runtime de contenedores.
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    async fn list(&self, include_stopped: bool) -> Result<Vec<ContainerSummary>>;

    async fn remove(&self, id: &str, opts: RemoveOptions) -> Result<()>;

    /// Copia la muestra al volumen compartido, nombrada por su hash.
    async fn copy_to_volume(&self, sample: &Sample) -> Result<()>;

    /// Lanza un worker y espera a que termine.
    async fn start_worker(&self, spec: &WorkerSpec) -> Result<()>;

    async fn is_running(&self, name: &str) -> Result<bool>;

    async fn start_database(&self, store: &StoreConfig, logs: bool) -> Result<()>;
}

/// Backend de documentos donde se guardan muestras y resultados.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Crea el índice si todavía no existe.
    async fn init(&self) -> Result<()>;

    async fn store_sample_metadata(&self, record: &SampleRecord) -> Result<SessionId>;
}

#[async_trait]
pub trait PluginRegistry: Send + Sync {
    async fn check_all_installed(&self, catalog: &PluginCatalog) -> bool;

    async fn install_enabled_missing(&self, catalog: &PluginCatalog) -> Result<()>;

    /// Consultas de reputación por hash (plugins de categoría `intel`).
    async fn run_baseline_lookups(
        &self,
        catalog: &PluginCatalog,
        session_id: &SessionId,
        context: &WorkerContext,
    ) -> Result<()>;
}

#[async_trait]
pub trait MimeResolver: Send + Sync {
    async fn resolve(&self, content_hash: &str) -> Result<String>;
}

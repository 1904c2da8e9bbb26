use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{Level, debug, error, info, instrument, warn};

use crate::{
    catalog::PluginCatalog,
    confirm::{Confirm, ConsoleConfirm},
    dispatch::{WorkerContext, WorkerDispatcher},
    error::ScanError,
    gate::PluginAvailabilityGate,
    plugin::PluginTask,
    reconcile::StaleStateReconciler,
    sample::Sample,
    session::ScanReport,
    settings::{DockerSettings, ScanOptions, StoreConfig},
    traits::{ContainerDriver, MimeResolver, PluginRegistry, SampleStore},
};

/// Comprueba la ruta antes de tocar ningún colaborador.
///
/// - Vacía: `Ok(None)`, no hay nada que escanear.
/// - No existe: [`ScanError::Preflight`].
pub fn preflight(path: &str) -> Result<Option<PathBuf>, ScanError> {
    if path.is_empty() {
        return Ok(None);
    }
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(ScanError::Preflight(path));
    }
    Ok(Some(path))
}

/// Se invoca con la muestra recién hasheada, antes de copiarla al volumen.
pub type StagedHook = Arc<dyn Fn(&Sample) + Send + Sync>;

/// Orquesta un escaneo completo de una muestra.
pub struct SessionCoordinator {
    namespace: String,
    store_config: StoreConfig,
    docker: DockerSettings,
    catalog: PluginCatalog,
    driver: Arc<dyn ContainerDriver>,
    store: Arc<dyn SampleStore>,
    registry: Arc<dyn PluginRegistry>,
    resolver: Arc<dyn MimeResolver>,
    confirm: Arc<dyn Confirm>,
    on_staged: Option<StagedHook>,
}

impl SessionCoordinator {
    pub fn builder() -> SessionCoordinatorBuilder {
        SessionCoordinatorBuilder::default()
    }

    /// Punto de entrada con la semántica del comando `scan`: una ruta vacía
    /// se registra como error y termina sin hacer nada.
    pub async fn scan_path(
        &self,
        path: &str,
        opts: &ScanOptions,
    ) -> Result<Option<ScanReport>, ScanError> {
        match preflight(path)? {
            Some(path) => self.scan(&path, opts).await.map(Some),
            None => {
                error!("please supply a valid file to scan");
                Ok(None)
            }
        }
    }

    #[instrument(level = Level::INFO, skip_all, fields(path = %path.display()))]
    pub async fn scan(&self, path: &Path, opts: &ScanOptions) -> Result<ScanReport, ScanError> {
        StaleStateReconciler::new(self.driver.clone(), self.namespace.clone())
            .cleanup()
            .await?;

        let colocated = self.store_config.is_colocated();
        self.prepare_backend(colocated, opts.logs).await?;

        PluginAvailabilityGate::new(self.registry.clone(), self.confirm.clone())
            .ensure(&self.catalog)
            .await;

        let sample = self.stage(path).await?;

        let record = sample.record(&self.catalog.plugins_by_category(), unix_now());
        let session_id = self
            .store
            .store_sample_metadata(&record)
            .await
            .map_err(ScanError::Persistence)?;
        info!(session = %session_id, sha256 = sample.content_hash(), "sample stored");

        let context = WorkerContext {
            sample_hash: sample.content_hash().to_string(),
            lookup_hash: sample.lookup_hash().to_string(),
            logs: opts.logs,
            store: self.store_config.clone(),
            colocated,
        };

        if let Err(e) = self
            .registry
            .run_baseline_lookups(&self.catalog, &session_id, &context)
            .await
        {
            warn!(error = %format!("{e:#}"), "baseline lookups failed");
        }

        // Sin mime no se despacha nada, aunque haya plugins que aceptan `*`.
        let mime = self
            .resolver
            .resolve(sample.content_hash())
            .await
            .map_err(ScanError::MimeResolution)?;
        let sample = sample.with_mime(mime.clone());

        debug!(mime = %mime, "looking for plugins that will run on sample");
        let selected = self.catalog.select_for_mime(&mime, opts.enabled_only);
        for plugin in &selected {
            debug!(" - {}", plugin.name);
        }
        let dispatched: Vec<String> = selected.iter().map(|p| p.name.clone()).collect();

        let tasks = selected
            .into_iter()
            .map(|d| PluginTask::new(d, session_id.clone()))
            .collect();

        WorkerDispatcher::new(self.driver.clone(), context)
            .run(tasks, &session_id)
            .await;

        Ok(ScanReport {
            session_id,
            sample,
            dispatched,
        })
    }

    /// Levanta la base de datos si specter la gestiona y prepara el índice.
    async fn prepare_backend(&self, colocated: bool, logs: bool) -> Result<(), ScanError> {
        if colocated {
            let running = self
                .driver
                .is_running(&self.docker.database_container)
                .await
                .map_err(ScanError::Backend)?;
            if !running {
                error!("database is NOT running, starting now...");
                self.driver
                    .start_database(&self.store_config, logs)
                    .await
                    .map_err(ScanError::Backend)?;
            }
        }

        self.store.init().await.map_err(ScanError::Backend)
    }

    async fn stage(&self, path: &Path) -> Result<Sample, ScanError> {
        let staging = |source| ScanError::Staging {
            path: path.to_path_buf(),
            source,
        };

        let sample = Sample::stage(path).await.map_err(staging)?;
        debug!(sha1 = sample.lookup_hash(), sha256 = sample.content_hash(), "sample hashed");
        if let Some(hook) = &self.on_staged {
            hook(&sample);
        }
        self.driver.copy_to_volume(&sample).await.map_err(staging)?;
        Ok(sample)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Default)]
pub struct SessionCoordinatorBuilder {
    namespace: Option<String>,
    store_config: StoreConfig,
    docker: DockerSettings,
    catalog: PluginCatalog,
    driver: Option<Arc<dyn ContainerDriver>>,
    store: Option<Arc<dyn SampleStore>>,
    registry: Option<Arc<dyn PluginRegistry>>,
    resolver: Option<Arc<dyn MimeResolver>>,
    confirm: Option<Arc<dyn Confirm>>,
    on_staged: Option<StagedHook>,
}

/// Falta un colaborador obligatorio al construir el coordinador.
#[derive(Debug, thiserror::Error)]
#[error("session coordinator is missing its {0}")]
pub struct MissingCollaborator(&'static str);

impl SessionCoordinatorBuilder {
    pub fn settings(mut self, settings: &crate::settings::Settings) -> Self {
        self.namespace = Some(settings.namespace.clone());
        self.store_config = settings.store.clone();
        self.docker = settings.docker.clone();
        self
    }

    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn driver(mut self, driver: Arc<dyn ContainerDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn store(mut self, store: Arc<dyn SampleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn PluginRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn MimeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn on_staged(mut self, hook: impl Fn(&Sample) + Send + Sync + 'static) -> Self {
        self.on_staged = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<SessionCoordinator, MissingCollaborator> {
        Ok(SessionCoordinator {
            namespace: self.namespace.unwrap_or_else(|| "specter".into()),
            store_config: self.store_config,
            docker: self.docker,
            catalog: self.catalog,
            driver: self.driver.ok_or(MissingCollaborator("container driver"))?,
            store: self.store.ok_or(MissingCollaborator("sample store"))?,
            registry: self.registry.ok_or(MissingCollaborator("plugin registry"))?,
            resolver: self.resolver.ok_or(MissingCollaborator("mime resolver"))?,
            confirm: self.confirm.unwrap_or_else(|| Arc::new(ConsoleConfirm)),
            on_staged: self.on_staged,
        })
    }
}

use std::sync::Arc;

use tracing::{Instrument, Level, debug, error, info_span, instrument, warn};

use crate::{
    barrier::{CompletionBarrier, CompletionToken},
    plugin::{PluginDescriptor, PluginTask},
    session::SessionId,
    settings::StoreConfig,
    traits::{ContainerDriver, WorkerSpec},
};

/// Datos comunes a todos los workers de una sesión.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub sample_hash: String,
    /// Digest que se consulta en las fuentes de inteligencia.
    pub lookup_hash: String,
    pub logs: bool,
    pub store: StoreConfig,
    pub colocated: bool,
}

impl WorkerContext {
    pub fn spec_for(&self, plugin: &PluginDescriptor, session_id: &SessionId) -> WorkerSpec {
        WorkerSpec {
            plugin: plugin.name.clone(),
            category: plugin.category.clone(),
            image: plugin.image.clone(),
            sample_hash: self.sample_hash.clone(),
            session_id: session_id.clone(),
            logs: self.logs,
            store: self.store.clone(),
            colocated: self.colocated,
        }
    }

    /// Como [`spec_for`](Self::spec_for), pero apuntando al hash de consulta.
    pub fn lookup_for(&self, plugin: &PluginDescriptor, session_id: &SessionId) -> WorkerSpec {
        WorkerSpec {
            sample_hash: self.lookup_hash.clone(),
            ..self.spec_for(plugin, session_id)
        }
    }
}

/// Lanza un worker por tarea, todos a la vez, y espera a que terminen.
///
/// Los resultados no vuelven por aquí: cada plugin los escribe en el backend
/// bajo `(plugin, session_id)`. El fallo de un worker sólo se registra en el
/// log; no cancela a los demás ni cambia el resultado de `run`.
pub struct WorkerDispatcher {
    driver: Arc<dyn ContainerDriver>,
    context: WorkerContext,
}

impl WorkerDispatcher {
    pub fn new(driver: Arc<dyn ContainerDriver>, context: WorkerContext) -> Self {
        WorkerDispatcher { driver, context }
    }

    /// Sin límite de concurrencia ni timeout: un worker colgado bloquea la espera.
    #[instrument(level = Level::INFO, skip(self, tasks), fields(session = %session_id, workers = tasks.len()))]
    pub async fn run(&self, tasks: Vec<PluginTask>, session_id: &SessionId) {
        let (barrier, tokens) = CompletionBarrier::new(tasks.len());

        for (task, token) in tasks.into_iter().zip(tokens) {
            debug!(plugin = task.name(), "RUNNING plugin");
            let spec = self.context.spec_for(&task.descriptor, session_id);
            let span = info_span!("worker", plugin = %spec.plugin);
            tokio::spawn(run_worker(self.driver.clone(), task, spec, token).instrument(span));
        }

        barrier.wait().await;
        debug!("Done with plugins.");
    }
}

async fn run_worker(
    driver: Arc<dyn ContainerDriver>,
    mut task: PluginTask,
    spec: WorkerSpec,
    token: CompletionToken,
) {
    // El token se suelta al salir, pase lo que pase.
    let _token = token;

    if let Err(e) = task.start() {
        warn!(error = %e, "skipping worker");
        return;
    }

    let result = driver.start_worker(&spec).await;
    match &result {
        Ok(()) => debug!("plugin finished"),
        Err(e) => error!(error = %format!("{e:#}"), "plugin failed"),
    }

    if let Err(e) = task.finish(result.is_ok()) {
        warn!(error = %e, "inconsistent task state");
    }
}

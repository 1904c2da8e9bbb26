use std::sync::Arc;

use tracing::{Level, debug, info, instrument};

use crate::{
    error::ReconciliationError,
    traits::{ContainerDriver, RemoveOptions},
};

/// Elimina los workers que dejó una ejecución anterior interrumpida.
pub struct StaleStateReconciler {
    driver: Arc<dyn ContainerDriver>,
    namespace: String,
}

impl StaleStateReconciler {
    pub fn new(driver: Arc<dyn ContainerDriver>, namespace: impl Into<String>) -> Self {
        StaleStateReconciler {
            driver,
            namespace: namespace.into(),
        }
    }

    /// Borra (forzado, con volúmenes y links) cada contenedor del namespace.
    ///
    /// No es best-effort: el primer borrado que falla aborta la llamada y los
    /// contenedores restantes quedan intactos.
    #[instrument(level = Level::INFO, skip(self), fields(namespace = %self.namespace))]
    pub async fn cleanup(&self) -> Result<(), ReconciliationError> {
        let containers = self
            .driver
            .list(true)
            .await
            .map_err(ReconciliationError::List)?;

        let mut removed = 0usize;
        for container in containers.iter().filter(|c| c.in_namespace(&self.namespace)) {
            debug!(id = %container.id, name = container.display_name(), "removing stale worker");
            self.driver
                .remove(&container.id, RemoveOptions::FORCE_ALL)
                .await
                .map_err(|source| ReconciliationError::Remove {
                    name: container.display_name().to_string(),
                    source,
                })?;
            removed += 1;
        }

        if removed > 0 {
            info!(removed, "stale workers removed");
        }
        Ok(())
    }
}

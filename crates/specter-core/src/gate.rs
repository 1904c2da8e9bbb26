use std::sync::Arc;

use tracing::{Level, debug, info, instrument, warn};

use crate::{catalog::PluginCatalog, confirm::Confirm, traits::PluginRegistry};

pub const INSTALL_PROMPT: &str = "All enabled plugins are not installed, would you like to install them now? \
     [Warning] This can take a while if it is the first time you have ran specter.";

/// Comprueba que las imágenes de los plugins habilitados existen y, si no,
/// ofrece instalarlas. Se invoca una sola vez por sesión, antes del despacho.
pub struct PluginAvailabilityGate {
    registry: Arc<dyn PluginRegistry>,
    confirm: Arc<dyn Confirm>,
}

impl PluginAvailabilityGate {
    pub fn new(registry: Arc<dyn PluginRegistry>, confirm: Arc<dyn Confirm>) -> Self {
        PluginAvailabilityGate { registry, confirm }
    }

    /// Devuelve si todos los plugins habilitados ya estaban instalados.
    /// Con una respuesta negativa, o si la instalación falla, el escaneo
    /// sigue con los plugins que haya.
    #[instrument(level = Level::DEBUG, skip_all)]
    pub async fn ensure(&self, catalog: &PluginCatalog) -> bool {
        if self.registry.check_all_installed(catalog).await {
            debug!("All enabled plugins are installed.");
            return true;
        }

        let confirm = self.confirm.clone();
        let accepted = tokio::task::spawn_blocking(move || confirm.confirm(INSTALL_PROMPT))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "confirmation prompt failed");
                false
            });

        if !accepted {
            warn!("continuing without installing missing plugins");
            return false;
        }

        info!("installing enabled plugins");
        if let Err(e) = self.registry.install_enabled_missing(catalog).await {
            warn!(error = %format!("{e:#}"), "plugin installation failed, continuing with installed plugins");
        }
        false
    }
}

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use specter_core::{
    DockerSettings, PluginCatalog, Sample, SessionId, StoreConfig, WorkerContext,
    traits::{
        ContainerDriver, ContainerSummary, MimeResolver, PluginRegistry, RemoveOptions, WorkerSpec,
    },
};
use tracing::{Level, debug, info, instrument, warn};

use crate::{error::DockerError, ps::parse_ps, specs::Specs};

/// Categoría de los plugins que consultan reputación por hash.
pub const INTEL_CATEGORY: &str = "intel";

/// Adaptador sobre el CLI de docker (o cualquier binario compatible).
#[derive(Debug, Clone)]
pub struct DockerCli {
    docker: DockerSettings,
    namespace: String,
}

impl DockerCli {
    pub fn new(docker: DockerSettings, namespace: impl Into<String>) -> Self {
        DockerCli {
            docker,
            namespace: namespace.into(),
        }
    }

    fn specs(&self) -> Specs<'_> {
        Specs::new(&self.docker, &self.namespace)
    }

    async fn image_present(&self, image: &str) -> bool {
        match self.specs().image_present(image).run().await {
            Ok(_) => true,
            Err(e) => {
                debug!(image, error = %e, "image not available");
                false
            }
        }
    }

    /// Ignora el error si el objeto ya existía.
    async fn ensure_exists(&self, spec: crate::command::CommandSpec) -> Result<(), DockerError> {
        match spec.run().await {
            Err(e) if e.is_conflict() => Ok(()),
            other => other.map(|_| ()),
        }
    }
}

#[async_trait]
impl ContainerDriver for DockerCli {
    async fn list(&self, include_stopped: bool) -> Result<Vec<ContainerSummary>> {
        let output = self.specs().list_containers(include_stopped).run().await?;
        Ok(parse_ps(&output)?)
    }

    async fn remove(&self, id: &str, opts: RemoveOptions) -> Result<()> {
        self.specs().remove_container(id, opts).run().await?;
        Ok(())
    }

    #[instrument(level = Level::DEBUG, skip_all, fields(sha256 = sample.content_hash()))]
    async fn copy_to_volume(&self, sample: &Sample) -> Result<()> {
        let specs = self.specs();
        self.ensure_exists(specs.create_volume())
            .await
            .context("failed to create sample volume")?;

        let hash = sample.content_hash();
        let staging = format!("{}-staging-{}", self.namespace, &hash[..hash.len().min(12)]);
        specs.create_staging_container(&staging).run().await?;

        // El contenedor auxiliar se borra aunque la copia falle.
        let copied = specs.copy_into(&staging, &sample.path, hash).run().await;
        let removed = specs
            .remove_container(&staging, RemoveOptions::FORCE_ALL)
            .run()
            .await;

        copied.with_context(|| format!("failed to copy {} into volume", sample.path.display()))?;
        if let Err(e) = removed {
            warn!(container = %staging, error = %e, "staging container left behind");
        }
        Ok(())
    }

    async fn start_worker(&self, spec: &WorkerSpec) -> Result<()> {
        self.specs()
            .run_worker(spec)
            .run()
            .await
            .with_context(|| format!("plugin {} failed", spec.plugin))?;
        Ok(())
    }

    async fn is_running(&self, name: &str) -> Result<bool> {
        match self.specs().inspect_running(name).run().await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(level = Level::INFO, skip_all, fields(container = %self.docker.database_container))]
    async fn start_database(&self, _store: &StoreConfig, logs: bool) -> Result<()> {
        let specs = self.specs();
        self.ensure_exists(specs.create_network())
            .await
            .context("failed to create docker network")?;

        // Si el contenedor existe pero está parado basta con arrancarlo.
        match specs.start_container(&self.docker.database_container).run().await {
            Ok(_) => {
                info!("database container restarted");
                return Ok(());
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e).context("failed to start database container"),
        }

        if !self.image_present(&self.docker.database_image).await {
            specs
                .pull_image(&self.docker.database_image, logs)
                .run()
                .await
                .context("failed to pull database image")?;
        }
        specs
            .run_database()
            .run()
            .await
            .context("failed to run database container")?;
        info!("database container created");
        Ok(())
    }
}

#[async_trait]
impl PluginRegistry for DockerCli {
    async fn check_all_installed(&self, catalog: &PluginCatalog) -> bool {
        for plugin in catalog.enabled() {
            if !self.image_present(&plugin.image).await {
                return false;
            }
        }
        true
    }

    #[instrument(level = Level::INFO, skip_all)]
    async fn install_enabled_missing(&self, catalog: &PluginCatalog) -> Result<()> {
        for plugin in catalog.enabled() {
            if self.image_present(&plugin.image).await {
                continue;
            }
            info!(plugin = %plugin.name, image = %plugin.image, "pulling plugin image");
            self.specs()
                .pull_image(&plugin.image, true)
                .run()
                .await
                .with_context(|| format!("failed to install plugin {}", plugin.name))?;
        }
        Ok(())
    }

    #[instrument(level = Level::DEBUG, skip_all, fields(session = %session_id))]
    async fn run_baseline_lookups(
        &self,
        catalog: &PluginCatalog,
        session_id: &SessionId,
        context: &WorkerContext,
    ) -> Result<()> {
        let intel: Vec<_> = catalog
            .in_category(INTEL_CATEGORY)
            .filter(|p| p.enabled)
            .collect();

        let mut failed = 0;
        for plugin in &intel {
            debug!(plugin = %plugin.name, "hash lookup");
            let spec = context.lookup_for(plugin, session_id);
            if let Err(e) = self.specs().run_lookup(&spec).run().await {
                warn!(plugin = %plugin.name, error = %e, "hash lookup failed");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(DockerError::Lookups {
                failed,
                total: intel.len(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl MimeResolver for DockerCli {
    async fn resolve(&self, content_hash: &str) -> Result<String> {
        let output = self
            .specs()
            .detect_mime(content_hash)
            .run()
            .await
            .context("failed to run fileinfo")?;
        let mime = output.trim();
        if mime.is_empty() {
            return Err(anyhow!("fileinfo returned no mime type for {content_hash}"));
        }
        Ok(mime.to_string())
    }
}

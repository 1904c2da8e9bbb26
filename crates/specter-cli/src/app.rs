use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use specter_core::{
    AlwaysNo, AlwaysYes, Confirm, ConsoleConfirm, PluginCatalog, SessionCoordinator, Settings,
};
use specter_docker::DockerCli;
use specter_elastic::ElasticStore;
use specter_paths::SpecterPaths;
use tracing::info;

/// Manifiesto que se deja en la carpeta de configuración en el primer uso.
pub const DEFAULT_MANIFEST: &str = include_str!("../plugins.toml");

/// Qué hacer cuando faltan imágenes de plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPolicy {
    Ask,
    Always,
    Never,
}

impl InstallPolicy {
    pub fn from_flags(yes: bool, no_install: bool) -> Self {
        match (yes, no_install) {
            (true, _) => InstallPolicy::Always,
            (false, true) => InstallPolicy::Never,
            (false, false) => InstallPolicy::Ask,
        }
    }

    pub fn confirm(self) -> Arc<dyn Confirm> {
        match self {
            InstallPolicy::Ask => Arc::new(ConsoleConfirm),
            InstallPolicy::Always => Arc::new(AlwaysYes),
            InstallPolicy::Never => Arc::new(AlwaysNo),
        }
    }
}

pub fn manifest_path(settings: &Settings, paths: &SpecterPaths) -> PathBuf {
    settings
        .plugins_file
        .clone()
        .unwrap_or_else(|| paths.plugins_file.clone())
}

/// Carga el catálogo. Un manifiesto indicado en la configuración tiene que
/// existir; el de la ruta por defecto se crea si falta.
pub fn load_catalog(settings: &Settings, paths: &SpecterPaths) -> Result<PluginCatalog> {
    if settings.plugins_file.is_none() && paths.seed_plugins(DEFAULT_MANIFEST)? {
        info!(path = %paths.plugins_file.display(), "wrote default plugin manifest");
    }

    let path = manifest_path(settings, paths);
    PluginCatalog::from_file(&path)
        .with_context(|| format!("failed to load plugin manifest {}", path.display()))
}

pub fn build_coordinator(
    settings: &Settings,
    catalog: PluginCatalog,
    policy: InstallPolicy,
) -> Result<SessionCoordinator> {
    let docker = Arc::new(DockerCli::new(settings.docker.clone(), settings.namespace.clone()));
    let store = Arc::new(ElasticStore::new(settings.store.clone())?);

    let coordinator = SessionCoordinator::builder()
        .settings(settings)
        .catalog(catalog)
        .driver(docker.clone())
        .store(store)
        .registry(docker.clone())
        .resolver(docker)
        .confirm(policy.confirm())
        .on_staged(|sample| println!("{}", sample.to_markdown_table()))
        .build()?;
    Ok(coordinator)
}

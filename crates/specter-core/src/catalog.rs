use std::{collections::BTreeMap, collections::HashSet, path::Path};

use serde::Deserialize;

use crate::{error::ConfigError, plugin::PluginDescriptor};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "plugin")]
    plugins: Vec<PluginDescriptor>,
}

/// Registro en memoria de los plugins conocidos, en orden de registro.
/// Es de sólo lectura mientras dura un escaneo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginCatalog {
    plugins: Vec<PluginDescriptor>,
}

impl PluginCatalog {
    pub fn new(plugins: Vec<PluginDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for p in &plugins {
            if !seen.insert(p.name.as_str()) {
                return Err(ConfigError::DuplicatePlugin(p.name.clone()));
            }
        }
        Ok(PluginCatalog { plugins })
    }

    /// Parsea un manifiesto TOML con tablas `[[plugin]]`.
    pub fn from_toml_str(manifest: &str) -> Result<Self, ConfigError> {
        let manifest: Manifest = toml::from_str(manifest)?;
        Self::new(manifest.plugins)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter()
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter().filter(|p| p.enabled)
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a PluginDescriptor> {
        self.plugins.iter().filter(move |p| p.category == category)
    }

    /// Plugins cuyo conjunto de mime types acepta `mime`, conservando el
    /// orden de registro. Una lista vacía es un resultado válido.
    pub fn select_for_mime(&self, mime: &str, enabled_only: bool) -> Vec<PluginDescriptor> {
        self.plugins
            .iter()
            .filter(|p| !enabled_only || p.enabled)
            .filter(|p| p.accepts(mime))
            .cloned()
            .collect()
    }

    /// Categoría → nombres de los plugins habilitados.
    pub fn plugins_by_category(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for p in self.enabled() {
            out.entry(p.category.clone()).or_default().push(p.name.clone());
        }
        out
    }
}

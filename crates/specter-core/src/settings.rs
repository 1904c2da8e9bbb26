use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefijo de las variables de entorno: `SPECTER_STORE__URL`, `SPECTER_DOCKER__BINARY`...
pub const ENV_PREFIX: &str = "SPECTER";

/// Backend de almacenamiento (Elasticsearch). Cada campo se puede
/// sobrescribir de forma independiente desde fichero o entorno.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub index: String,
    pub type_name: String,
    pub url: String,
    pub username: String,
    pub password: String,
}

impl StoreConfig {
    /// URL por defecto: si nadie configuró un backend, specter levanta el suyo.
    pub const LOCAL_URL: &'static str = "http://localhost:9200";

    /// El backend corre como contenedor gestionado por specter.
    pub fn is_colocated(&self) -> bool {
        self.url.eq_ignore_ascii_case(Self::LOCAL_URL)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            index: "specter".into(),
            type_name: "samples".into(),
            url: Self::LOCAL_URL.into(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Parámetros del runtime de contenedores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DockerSettings {
    /// Binario del runtime (`docker`, `podman`...)
    pub binary: String,
    /// Volumen donde se deja la muestra para los workers
    pub volume: String,
    /// Red compartida entre workers y base de datos
    pub network: String,
    pub database_container: String,
    pub database_image: String,
    /// Imagen utilitaria usada para resolver el mime type
    pub fileinfo_image: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        DockerSettings {
            binary: "docker".into(),
            volume: "specter".into(),
            network: "specter".into(),
            database_container: "specter-elasticsearch".into(),
            database_image: "blacktop/elasticsearch:6".into(),
            fileinfo_image: "malice/fileinfo".into(),
        }
    }
}

/// Configuración completa. Se construye una sola vez y se pasa por referencia.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Etiqueta reservada con la que se marcan los workers
    pub namespace: String,
    /// Manifiesto de plugins; si es `None` se usa el de la ruta de configuración
    pub plugins_file: Option<PathBuf>,
    pub store: StoreConfig,
    pub docker: DockerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            namespace: "specter".into(),
            plugins_file: None,
            store: StoreConfig::default(),
            docker: DockerSettings::default(),
        }
    }
}

impl Settings {
    /// Carga defaults → `file` (opcional, TOML) → entorno del proceso.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, None)
    }

    /// Igual que [`Settings::load`], pero con las variables de entorno dadas
    /// en lugar de las del proceso.
    pub fn load_with_env(
        file: Option<&Path>,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            let path = path.to_string_lossy().into_owned();
            builder = builder.add_source(File::new(&path, FileFormat::Toml).required(false));
        }

        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(vars);

        let cfg = builder.add_source(env).build().map_err(ConfigError::Parse)?;
        let settings = cfg.try_deserialize::<Settings>().map_err(ConfigError::Parse)?;
        Ok(settings)
    }
}

/// Opciones de una invocación concreta.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), default)]
pub struct ScanOptions {
    /// Los workers emiten sus logs al terminal
    pub logs: bool,
    /// Sólo se despachan plugins habilitados
    pub enabled_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            logs: false,
            enabled_only: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_point_to_a_colocated_backend() {
        let settings = Settings::load_with_env(None, Some(vars(&[]))).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.store.is_colocated());
        assert!(!settings.store.has_credentials());
    }

    #[test]
    fn colocation_ignores_url_case() {
        let store = StoreConfig {
            url: "HTTP://LOCALHOST:9200".into(),
            ..StoreConfig::default()
        };
        assert!(store.is_colocated());

        let remote = StoreConfig {
            url: "https://search.internal:9200".into(),
            ..StoreConfig::default()
        };
        assert!(!remote.is_colocated());
    }

    #[test]
    fn env_overrides_each_field_independently() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
namespace = "lab"

[store]
url = "https://search.internal:9200"
index = "triage"
username = "analyst"
password = "from-file"
"#
        )
        .unwrap();

        let env = vars(&[
            ("SPECTER_STORE__PASSWORD", "from-env"),
            ("SPECTER_STORE__TYPE_NAME", "files"),
        ]);
        let settings = Settings::load_with_env(Some(file.path()), Some(env)).unwrap();

        assert_eq!(settings.namespace, "lab");
        assert_eq!(settings.store.url, "https://search.internal:9200");
        assert_eq!(settings.store.index, "triage");
        assert_eq!(settings.store.username, "analyst");
        assert_eq!(settings.store.password, "from-env");
        assert_eq!(settings.store.type_name, "files");
        assert_eq!(settings.docker, DockerSettings::default());
    }

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            Settings::load_with_env(Some(dir.path().join("settings.toml").as_path()), Some(vars(&[]))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn scan_options_builder_keeps_defaults() {
        let opts = ScanOptionsBuilder::default().logs(true).build().unwrap();
        assert!(opts.logs);
        assert!(opts.enabled_only);
    }
}

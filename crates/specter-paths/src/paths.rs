use std::{env, fs::File, path::PathBuf};

use directories::ProjectDirs;

use crate::{errors::Error, fs_utils};

/// Nombre de la ENV var para override de ruta base (modo “portable”)
pub const ENV_BASE_DIR: &str = "SPECTER_BASE_DIR";

/// Contenedor de todas las rutas y ficheros importantes de specter
#[derive(Debug, Clone)]
pub struct SpecterPaths {
    // config_dir
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub plugins_file: PathBuf,

    // data_dir
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,

    // cache_dir
    pub cache_dir: PathBuf,

    // lock_file
    pub lock_file: PathBuf,
}

impl SpecterPaths {
    /// Resuelve las rutas leyendo `SPECTER_BASE_DIR` del entorno del proceso.
    pub fn new() -> Result<Self, Error> {
        Self::with_base(env::var_os(ENV_BASE_DIR).map(PathBuf::from))
    }

    /// Resuelve las rutas bajo `base` o, si es `None`, bajo los directorios del usuario.
    pub fn with_base(base: Option<PathBuf>) -> Result<Self, Error> {
        let (config_dir, data_dir, cache_dir) = match base {
            Some(b) => (b.join("config"), b.join("data"), b.join("cache")),
            None => {
                let proj = ProjectDirs::from("io", "specter", "specter").ok_or(Error::NoHome)?;
                (
                    proj.config_dir().to_path_buf(),
                    proj.data_dir().to_path_buf(),
                    proj.cache_dir().to_path_buf(),
                )
            }
        };

        let paths = SpecterPaths {
            settings_file: config_dir.join("settings.toml"),
            plugins_file: config_dir.join("plugins.toml"),
            config_dir,

            logs_dir: data_dir.join("logs"),
            lock_file: data_dir.join("specter.lock"),
            data_dir,

            cache_dir,
        };

        paths.ensure_structure()?;
        paths.validate_structure()?;

        Ok(paths)
    }

    /// Adquiere el lock de escaneo. Dos escaneos simultáneos se borrarían
    /// mutuamente los workers al reconciliar, así que sólo puede haber uno.
    /// Mantén vivo el File retornado para conservar el lock.
    pub fn lock(&self) -> Result<File, Error> {
        fs_utils::try_lock_file(&self.lock_file)
    }
}

impl SpecterPaths {
    /// Deja un manifiesto de plugins inicial si el usuario aún no tiene uno.
    pub fn seed_plugins(&self, manifest: &str) -> Result<bool, Error> {
        fs_utils::seed_file(&self.plugins_file, manifest)
    }

    /// Se asegura de que los dirs básicos existen. Los ficheros de
    /// configuración son opcionales y no se crean.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.config_dir)?;
        fs_utils::ensure_dir(&self.data_dir)?;
        fs_utils::ensure_dir(&self.cache_dir)?;
        fs_utils::ensure_dir(&self.logs_dir)?;
        Ok(())
    }

    /// Valida que cada dir existe Y es escribible. Si falta, lo intenta crear.
    pub fn validate_structure(&self) -> Result<(), Error> {
        for dir in [&self.config_dir, &self.data_dir, &self.cache_dir, &self.logs_dir] {
            if !dir.exists() {
                fs_utils::ensure_dir(dir)?;
            }
            fs_utils::check_writable(dir)?;
        }
        Ok(())
    }
}

//! Crate `specter_paths`: rutas de configuración, datos y lock de specter

mod errors;
mod fs_utils;
mod paths;

pub use errors::Error;
pub use paths::{ENV_BASE_DIR, SpecterPaths};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn base_override_lays_out_structure() {
        let tmp = tempdir().unwrap();
        let paths = SpecterPaths::with_base(Some(tmp.path().to_path_buf())).unwrap();

        assert_eq!(paths.config_dir, tmp.path().join("config"));
        assert_eq!(paths.settings_file, tmp.path().join("config").join("settings.toml"));
        assert_eq!(paths.plugins_file, tmp.path().join("config").join("plugins.toml"));
        assert_eq!(paths.lock_file, tmp.path().join("data").join("specter.lock"));

        assert!(paths.config_dir.exists());
        assert!(paths.data_dir.exists());
        assert!(paths.cache_dir.exists());
        assert!(paths.logs_dir.exists());

        // Los ficheros de configuración no se crean solos
        assert!(!paths.settings_file.exists());
        assert!(!paths.plugins_file.exists());
    }

    #[test]
    fn validate_structure_recreates_missing_dirs() {
        let tmp = tempdir().unwrap();
        let paths = SpecterPaths::with_base(Some(tmp.path().to_path_buf())).unwrap();

        std::fs::remove_dir_all(&paths.cache_dir).unwrap();
        assert!(!paths.cache_dir.exists());

        paths.validate_structure().unwrap();
        assert!(paths.cache_dir.exists());
    }

    #[test]
    fn second_lock_is_rejected_while_first_is_held() {
        let tmp = tempdir().unwrap();
        let paths = SpecterPaths::with_base(Some(tmp.path().to_path_buf())).unwrap();

        let first = paths.lock().unwrap();
        assert!(paths.lock_file.exists());

        match paths.lock() {
            Err(Error::Locked(p)) => assert!(p.ends_with("specter.lock")),
            other => panic!("Esperaba Locked, obtuve {other:?}"),
        }

        drop(first);
        assert!(paths.lock().is_ok());
    }

    #[test]
    fn seeded_manifest_never_overwrites_user_edits() {
        let tmp = tempdir().unwrap();
        let paths = SpecterPaths::with_base(Some(tmp.path().to_path_buf())).unwrap();

        assert!(paths.seed_plugins("# defaults\n").unwrap());
        std::fs::write(&paths.plugins_file, "# mine\n").unwrap();

        assert!(!paths.seed_plugins("# defaults\n").unwrap());
        assert_eq!(std::fs::read_to_string(&paths.plugins_file).unwrap(), "# mine\n");
    }
}

use fs2::FileExt;
use std::{fs, fs::OpenOptions, io, path::Path};

use tracing::{Level, instrument};

use crate::errors::Error;

/// Asegura que la carpeta `path` existe (creándola recursivamente si hace falta).
#[instrument(level = Level::TRACE, err)]
pub fn ensure_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Asegura que el fichero `path` existe (creando su carpeta padre si hace falta).
#[instrument(level = Level::TRACE, err)]
pub fn ensure_file(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    if !path.exists() {
        fs::File::create(path)?;
    }

    Ok(())
}

/// Escribe `contents` en `path` sólo si el fichero no existe.
/// Devuelve si se ha escrito.
#[instrument(level = Level::TRACE, skip(contents), err)]
pub fn seed_file(path: &Path, contents: &str) -> Result<bool, Error> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)?;
    Ok(true)
}

/// Intenta adquirir un lock exclusivo sobre `path` sin bloquear.
/// Mientras el `File` devuelto siga vivo, el lock se mantiene.
#[instrument(level = Level::TRACE, err)]
pub fn try_lock_file(path: &Path) -> Result<fs::File, Error> {
    ensure_file(path)?;
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(Error::Locked(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Verifica que `path` es escribible.
#[instrument(level = Level::TRACE, err)]
pub fn check_writable(path: &Path) -> Result<(), Error> {
    let meta = fs::metadata(path)?;
    if meta.permissions().readonly() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("No write permission for {}", path.display()),
        )
        .into());
    }
    Ok(())
}

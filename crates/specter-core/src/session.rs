use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Identificador opaco que asigna el backend al persistir la muestra.
/// Todo el trabajo de una invocación queda asociado a él.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resumen de un escaneo completado. Los resultados de cada plugin no pasan
/// por aquí: viven en el backend bajo `(plugin, session_id)`.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub session_id: SessionId,
    pub sample: Sample,
    /// Plugins despachados, en orden de registro
    pub dispatched: Vec<String>,
}

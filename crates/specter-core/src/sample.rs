use std::{
    collections::BTreeMap,
    fmt::Write as _,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
}

impl Digests {
    /// Calcula los digests leyendo el fichero por bloques.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut file =
            std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut sha512 = Sha512::new();
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            let n = file
                .read(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            if n == 0 {
                break;
            }
            md5.update(&buf[..n]);
            sha1.update(&buf[..n]);
            sha256.update(&buf[..n]);
            sha512.update(&buf[..n]);
        }

        Ok(Digests {
            md5: hex::encode(md5.finalize()),
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
            sha512: hex::encode(sha512.finalize()),
        })
    }
}

/// La muestra enviada a analizar. Una vez preparada no cambia; el mime type
/// se adjunta produciendo un valor nuevo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub digests: Digests,
    pub mime: Option<String>,
}

impl Sample {
    /// Lee metadatos y calcula los digests de `path` fuera del runtime async.
    pub async fn stage(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::stage_blocking(path)).await?
    }

    fn stage_blocking(path: PathBuf) -> Result<Self> {
        let meta = std::fs::metadata(&path).with_context(|| format!("stat {}", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("{} is not a regular file", path.display());
        }

        let digests = Digests::from_path(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| digests.sha256.clone());

        Ok(Sample {
            name,
            size: meta.len(),
            digests,
            mime: None,
            path,
        })
    }

    pub fn with_mime(self, mime: impl Into<String>) -> Self {
        Sample {
            mime: Some(mime.into()),
            ..self
        }
    }

    /// Hash con el que los workers localizan la muestra en el volumen.
    pub fn content_hash(&self) -> &str {
        &self.digests.sha256
    }

    /// Hash para las fuentes de reputación (NSRL y similares indexan por SHA1).
    pub fn lookup_hash(&self) -> &str {
        &self.digests.sha1
    }

    pub fn record(
        &self,
        plugins_by_category: &BTreeMap<String, Vec<String>>,
        scanned_at: u64,
    ) -> SampleRecord {
        let plugins = plugins_by_category
            .iter()
            .map(|(category, names)| {
                let slots = names
                    .iter()
                    .map(|n| (n.clone(), serde_json::Value::Null))
                    .collect();
                (category.clone(), slots)
            })
            .collect();

        SampleRecord {
            name: self.name.clone(),
            path: self.path.display().to_string(),
            size: self.size,
            md5: self.digests.md5.clone(),
            sha1: self.digests.sha1.clone(),
            sha256: self.digests.sha256.clone(),
            sha512: self.digests.sha512.clone(),
            mime: self.mime.clone(),
            plugins,
            scanned_at,
        }
    }

    pub fn to_markdown_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#### File");
        let _ = writeln!(out, "| Field | Value |");
        let _ = writeln!(out, "|-------|-------|");
        let _ = writeln!(out, "| Name | {} |", self.name);
        let _ = writeln!(out, "| Size | {} B |", self.size);
        let _ = writeln!(out, "| MD5 | {} |", self.digests.md5);
        let _ = writeln!(out, "| SHA1 | {} |", self.digests.sha1);
        let _ = writeln!(out, "| SHA256 | {} |", self.digests.sha256);
        let _ = writeln!(out, "| SHA512 | {} |", self.digests.sha512);
        if let Some(mime) = &self.mime {
            let _ = writeln!(out, "| Mime | {} |", mime);
        }
        out
    }
}

/// Documento que se persiste al inicio del escaneo. `plugins` deja un hueco
/// por categoría y plugin donde cada worker escribirá sus resultados.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
    pub mime: Option<String>,
    pub plugins: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    pub scanned_at: u64,
}

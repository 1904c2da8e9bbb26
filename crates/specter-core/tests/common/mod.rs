#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use specter_core::{
    Confirm, PluginCatalog, Sample, SampleRecord, SessionId, StoreConfig, WorkerContext,
    traits::{
        ContainerDriver, ContainerSummary, MimeResolver, NAMESPACE_LABEL, PluginRegistry,
        RemoveOptions, SampleStore, WorkerSpec,
    },
};

pub const MANIFEST: &str = r#"
[[plugin]]
name = "nsrl"
category = "intel"
image = "malice/nsrl"
mime = ["hash"]

[[plugin]]
name = "clamav"
category = "av"
image = "malice/clamav"
mime = ["*"]

[[plugin]]
name = "pdf"
category = "document"
image = "malice/pdf"
mime = ["application/pdf"]

[[plugin]]
name = "fprot"
category = "av"
image = "malice/fprot"
mime = ["*"]

[[plugin]]
name = "pe"
category = "exe"
image = "malice/pe"
mime = ["application/x-dosexec"]
"#;

pub fn catalog() -> PluginCatalog {
    PluginCatalog::from_toml_str(MANIFEST).unwrap()
}

pub fn container(id: &str, name: &str, namespace: Option<&str>) -> ContainerSummary {
    let mut labels = BTreeMap::new();
    if let Some(ns) = namespace {
        labels.insert(NAMESPACE_LABEL.to_string(), ns.to_string());
    }
    ContainerSummary {
        id: id.into(),
        names: vec![format!("/{name}")],
        labels,
        state: "exited".into(),
    }
}

/// Resultado que un worker deja en el backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
    pub plugin: String,
    pub session_id: SessionId,
    pub ok: bool,
}

#[derive(Default)]
pub struct FakeStore {
    pub fail_store: bool,
    pub inits: AtomicUsize,
    pub samples: Mutex<Vec<SampleRecord>>,
    pub results: Mutex<Vec<WorkerRecord>>,
}

impl FakeStore {
    pub fn writes(&self) -> usize {
        self.samples.lock().unwrap().len() + self.results.lock().unwrap().len()
    }
}

#[async_trait]
impl SampleStore for FakeStore {
    async fn init(&self) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn store_sample_metadata(&self, record: &SampleRecord) -> Result<SessionId> {
        if self.fail_store {
            bail!("index_not_found_exception");
        }
        let mut samples = self.samples.lock().unwrap();
        samples.push(record.clone());
        Ok(SessionId::from(format!("session-{}", samples.len())))
    }
}

/// Driver en memoria: registra cada llamada y, como haría un plugin real,
/// escribe el resultado de cada worker directamente en el `FakeStore`.
pub struct FakeDriver {
    pub store: Arc<FakeStore>,
    pub stale: Vec<ContainerSummary>,
    pub fail_list: bool,
    pub fail_remove_id: Option<String>,
    pub failing_plugins: Vec<String>,
    pub database_running: bool,
    pub calls: AtomicUsize,
    pub removed: Mutex<Vec<String>>,
    pub remove_attempts: Mutex<Vec<String>>,
    pub copied: Mutex<Vec<String>>,
    pub started: Mutex<Vec<WorkerSpec>>,
    pub running_checks: Mutex<Vec<String>>,
    pub databases_started: AtomicUsize,
}

impl FakeDriver {
    pub fn new(store: Arc<FakeStore>) -> Self {
        FakeDriver {
            store,
            stale: vec![],
            fail_list: false,
            fail_remove_id: None,
            failing_plugins: vec![],
            database_running: true,
            calls: AtomicUsize::new(0),
            removed: Mutex::new(vec![]),
            remove_attempts: Mutex::new(vec![]),
            copied: Mutex::new(vec![]),
            started: Mutex::new(vec![]),
            running_checks: Mutex::new(vec![]),
            databases_started: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContainerDriver for FakeDriver {
    async fn list(&self, include_stopped: bool) -> Result<Vec<ContainerSummary>> {
        self.tick();
        assert!(include_stopped, "stale workers may be stopped");
        if self.fail_list {
            bail!("cannot connect to the docker daemon");
        }
        Ok(self.stale.clone())
    }

    async fn remove(&self, id: &str, opts: RemoveOptions) -> Result<()> {
        self.tick();
        assert_eq!(opts, RemoveOptions::FORCE_ALL);
        self.remove_attempts.lock().unwrap().push(id.to_string());
        if self.fail_remove_id.as_deref() == Some(id) {
            return Err(anyhow!("removal of container {id} is already in progress"));
        }
        self.removed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn copy_to_volume(&self, sample: &Sample) -> Result<()> {
        self.tick();
        self.copied.lock().unwrap().push(sample.content_hash().to_string());
        Ok(())
    }

    async fn start_worker(&self, spec: &WorkerSpec) -> Result<()> {
        self.tick();
        self.started.lock().unwrap().push(spec.clone());
        tokio::task::yield_now().await;

        let ok = !self.failing_plugins.contains(&spec.plugin);
        self.store.results.lock().unwrap().push(WorkerRecord {
            plugin: spec.plugin.clone(),
            session_id: spec.session_id.clone(),
            ok,
        });
        if ok { Ok(()) } else { bail!("{} exited with status 1", spec.plugin) }
    }

    async fn is_running(&self, name: &str) -> Result<bool> {
        self.tick();
        self.running_checks.lock().unwrap().push(name.to_string());
        Ok(self.database_running)
    }

    async fn start_database(&self, _: &StoreConfig, _: bool) -> Result<()> {
        self.tick();
        self.databases_started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub installed: bool,
    pub fail_install: bool,
    pub checks: AtomicUsize,
    pub installs: AtomicUsize,
    pub lookups: Mutex<Vec<(String, SessionId)>>,
}

#[async_trait]
impl PluginRegistry for FakeRegistry {
    async fn check_all_installed(&self, _: &PluginCatalog) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.installed
    }

    async fn install_enabled_missing(&self, _: &PluginCatalog) -> Result<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        if self.fail_install {
            bail!("pull access denied");
        }
        Ok(())
    }

    async fn run_baseline_lookups(
        &self,
        _: &PluginCatalog,
        session_id: &SessionId,
        context: &WorkerContext,
    ) -> Result<()> {
        self.lookups
            .lock()
            .unwrap()
            .push((context.lookup_hash.clone(), session_id.clone()));
        Ok(())
    }
}

pub struct FakeResolver {
    pub mime: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn returning(mime: &str) -> Self {
        FakeResolver {
            mime: Some(mime.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        FakeResolver {
            mime: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MimeResolver for FakeResolver {
    async fn resolve(&self, _: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mime.clone().ok_or_else(|| anyhow!("unrecognized content"))
    }
}

pub struct CountingConfirm {
    pub answer: bool,
    pub prompts: AtomicUsize,
}

impl CountingConfirm {
    pub fn answering(answer: bool) -> Self {
        CountingConfirm {
            answer,
            prompts: AtomicUsize::new(0),
        }
    }
}

impl Confirm for CountingConfirm {
    fn confirm(&self, _: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

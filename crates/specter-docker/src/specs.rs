//! Construcción de los comandos de docker que usa specter.

use std::path::Path;

use specter_core::{
    DockerSettings, SessionId, StoreConfig,
    traits::{NAMESPACE_LABEL, RemoveOptions, WorkerSpec},
};

use crate::command::CommandSpec;

/// Punto de montaje del volumen de muestras dentro de los contenedores.
pub const SAMPLE_DIR: &str = "/malware";
pub const SESSION_LABEL: &str = "io.specter.session";
pub const DATABASE_PORT: u16 = 9200;

/// Variables con las que un plugin localiza el backend y la sesión.
pub const ENV_STORE_URL: &str = "SPECTER_STORE_URL";
pub const ENV_STORE_INDEX: &str = "SPECTER_STORE_INDEX";
pub const ENV_STORE_TYPE: &str = "SPECTER_STORE_TYPE";
pub const ENV_STORE_USERNAME: &str = "SPECTER_STORE_USERNAME";
pub const ENV_STORE_PASSWORD: &str = "SPECTER_STORE_PASSWORD";
pub const ENV_SESSION_ID: &str = "SPECTER_SESSION_ID";

#[derive(Debug, Clone, Copy)]
pub struct Specs<'a> {
    docker: &'a DockerSettings,
    namespace: &'a str,
}

impl<'a> Specs<'a> {
    pub fn new(docker: &'a DockerSettings, namespace: &'a str) -> Self {
        Specs { docker, namespace }
    }

    fn docker(&self) -> CommandSpec {
        CommandSpec::new(&self.docker.binary)
    }

    fn namespace_label(&self) -> String {
        format!("{NAMESPACE_LABEL}={}", self.namespace)
    }

    fn sample_mount(&self, read_only: bool) -> String {
        let mode = if read_only { ":ro" } else { "" };
        format!("{}:{SAMPLE_DIR}{mode}", self.docker.volume)
    }

    pub fn list_containers(&self, include_stopped: bool) -> CommandSpec {
        let spec = self
            .docker()
            .args(["ps", "--no-trunc", "--format", "{{json .}}"]);
        if include_stopped { spec.arg("--all") } else { spec }
    }

    /// `links` no tiene equivalente: `docker rm --link` borra el enlace y deja
    /// el contenedor, y los workers no usan enlaces heredados.
    pub fn remove_container(&self, id: &str, opts: RemoveOptions) -> CommandSpec {
        let mut spec = self.docker().arg("rm");
        if opts.force {
            spec = spec.arg("--force");
        }
        if opts.volumes {
            spec = spec.arg("--volumes");
        }
        spec.arg(id)
    }

    pub fn create_volume(&self) -> CommandSpec {
        self.docker().args(["volume", "create", self.docker.volume.as_str()])
    }

    /// Contenedor parado que sólo sirve de destino para `docker cp`. Lleva
    /// la etiqueta del namespace, así que si queda huérfano se limpia con el
    /// resto de workers.
    pub fn create_staging_container(&self, name: &str) -> CommandSpec {
        self.docker().args([
            "container",
            "create",
            "--name",
            name,
            "--label",
            self.namespace_label().as_str(),
            "--volume",
            self.sample_mount(false).as_str(),
            self.docker.fileinfo_image.as_str(),
        ])
    }

    pub fn copy_into(&self, container: &str, source: &Path, content_hash: &str) -> CommandSpec {
        self.docker().args([
            "cp".to_string(),
            source.display().to_string(),
            format!("{container}:{SAMPLE_DIR}/{content_hash}"),
        ])
    }

    pub fn inspect_running(&self, name: &str) -> CommandSpec {
        self.docker()
            .args(["container", "inspect", "--format", "{{.State.Running}}", name])
    }

    pub fn image_present(&self, image: &str) -> CommandSpec {
        self.docker()
            .args(["image", "inspect", "--format", "{{.Id}}", image])
    }

    pub fn pull_image(&self, image: &str, logs: bool) -> CommandSpec {
        self.docker().args(["pull", image]).inherit_stdio(logs)
    }

    pub fn create_network(&self) -> CommandSpec {
        self.docker().args(["network", "create", self.docker.network.as_str()])
    }

    pub fn start_container(&self, name: &str) -> CommandSpec {
        self.docker().args(["start", name])
    }

    pub fn run_database(&self) -> CommandSpec {
        self.docker().args([
            "run".to_string(),
            "--detach".to_string(),
            "--name".to_string(),
            self.docker.database_container.clone(),
            "--network".to_string(),
            self.docker.network.clone(),
            "--publish".to_string(),
            format!("{DATABASE_PORT}:{DATABASE_PORT}"),
            self.docker.database_image.clone(),
        ])
    }

    pub fn detect_mime(&self, content_hash: &str) -> CommandSpec {
        self.docker().args([
            "run".to_string(),
            "--rm".to_string(),
            "--volume".to_string(),
            self.sample_mount(true),
            "--entrypoint".to_string(),
            "file".to_string(),
            self.docker.fileinfo_image.clone(),
            "--brief".to_string(),
            "--mime-type".to_string(),
            format!("{SAMPLE_DIR}/{content_hash}"),
        ])
    }

    /// URL del backend vista desde dentro de la red de docker.
    pub fn store_url(&self, store: &StoreConfig, colocated: bool) -> String {
        if colocated {
            format!("http://{}:{DATABASE_PORT}", self.docker.database_container)
        } else {
            store.url.clone()
        }
    }

    fn plugin_container(&self, spec: &WorkerSpec, role: &str) -> CommandSpec {
        let name = format!(
            "{}-{}-{role}-{}",
            self.namespace,
            spec.plugin,
            container_safe(&spec.session_id)
        );

        let mut cmd = self.docker().args([
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            name,
            "--label".to_string(),
            self.namespace_label(),
            "--label".to_string(),
            format!("{SESSION_LABEL}={}", spec.session_id),
        ]);
        if spec.colocated {
            cmd = cmd.args(["--network", self.docker.network.as_str()]);
        }

        // `-e NOMBRE` sin valor: docker lo toma de su propio entorno
        let mut env = vec![
            (ENV_STORE_URL, self.store_url(&spec.store, spec.colocated)),
            (ENV_STORE_INDEX, spec.store.index.clone()),
            (ENV_STORE_TYPE, spec.store.type_name.clone()),
            (ENV_SESSION_ID, spec.session_id.to_string()),
        ];
        if spec.store.has_credentials() {
            env.push((ENV_STORE_USERNAME, spec.store.username.clone()));
            env.push((ENV_STORE_PASSWORD, spec.store.password.clone()));
        }
        for (key, value) in env {
            cmd = cmd.args(["--env", key]).env(key, value);
        }

        cmd.inherit_stdio(spec.logs)
    }

    /// Worker que analiza la muestra del volumen compartido.
    pub fn run_worker(&self, spec: &WorkerSpec) -> CommandSpec {
        self.plugin_container(spec, "scan")
            .args(["--volume", self.sample_mount(true).as_str(), spec.image.as_str()])
            .arg(format!("{SAMPLE_DIR}/{}", spec.sample_hash))
    }

    /// Consulta de reputación por hash; no necesita la muestra.
    pub fn run_lookup(&self, spec: &WorkerSpec) -> CommandSpec {
        self.plugin_container(spec, "lookup")
            .args([spec.image.as_str(), "lookup", spec.sample_hash.as_str()])
    }
}

/// Los nombres de contenedor sólo admiten `[a-zA-Z0-9_.-]`.
fn container_safe(session_id: &SessionId) -> String {
    session_id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "_.-".contains(c) { c } else { '_' })
        .collect()
}

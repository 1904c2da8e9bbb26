//! Invocaciones del CLI de docker.
//!
//! Cada operación se describe primero como un [`CommandSpec`] (programa,
//! argumentos, entorno) y sólo después se ejecuta, de modo que lo que se le
//! pide a docker se puede comprobar sin daemon.

use std::{fmt, process::Stdio};

use tokio::process::Command;
use tracing::{Level, instrument};

use crate::error::DockerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables que hereda el proceso. Los secretos van aquí y no en `args`
    /// para que no aparezcan en `ps` ni en los logs.
    pub env: Vec<(String, String)>,
    /// La salida va directa al terminal en lugar de capturarse.
    pub inherit_stdio: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            inherit_stdio: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn inherit_stdio(mut self, inherit: bool) -> Self {
        self.inherit_stdio = inherit;
        self
    }

    /// Ejecuta el comando y devuelve su stdout. Con `inherit_stdio` el
    /// resultado es siempre una cadena vacía.
    #[instrument(level = Level::DEBUG, skip(self), fields(command = %self), err)]
    pub async fn run(&self) -> Result<String, DockerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let spawn_err = |source| DockerError::Spawn {
            program: self.program.clone(),
            source,
        };

        if self.inherit_stdio {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            let status = cmd.status().await.map_err(spawn_err)?;
            if !status.success() {
                return Err(DockerError::Status {
                    command: self.to_string(),
                    code: status.code(),
                    stderr: String::new(),
                });
            }
            return Ok(String::new());
        }

        let output = cmd.output().await.map_err(spawn_err)?;
        if !output.status.success() {
            return Err(DockerError::Status {
                command: self.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

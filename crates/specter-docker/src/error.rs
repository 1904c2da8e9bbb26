use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {stderr}", code.map_or("signal".to_string(), |c| format!("status {c}")))]
    Status {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unexpected output from docker: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{failed} of {total} lookups failed")]
    Lookups { failed: usize, total: usize },
}

impl DockerError {
    /// El objeto consultado no existe (`No such container`, `No such image`...).
    pub fn is_not_found(&self) -> bool {
        match self {
            DockerError::Status { stderr, .. } => {
                let stderr = stderr.to_ascii_lowercase();
                stderr.contains("no such") || stderr.contains("not found")
            }
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DockerError::Status { stderr, .. } if stderr.contains("already exists"))
    }
}

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, error::TaskStateError, session::SessionId};

/// Regla de aceptación de mime types de un plugin.
///
/// - `*` acepta cualquier mime.
/// - Un patrón con `*` (p.ej. `image/*`, `application/x-*exec`) es un glob.
/// - Cualquier otra cadena se compara exacta, sin distinguir mayúsculas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MimeMatcher {
    Any,
    Exact(String),
    Glob { pattern: String, regex: Regex },
}

impl MimeMatcher {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = pattern.trim();
        if pattern == "*" {
            return Ok(MimeMatcher::Any);
        }
        if !pattern.contains('*') {
            return Ok(MimeMatcher::Exact(pattern.to_ascii_lowercase()));
        }

        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("(?i)^{body}$")).map_err(|source| ConfigError::Matcher {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(MimeMatcher::Glob {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, mime: &str) -> bool {
        match self {
            MimeMatcher::Any => true,
            MimeMatcher::Exact(expected) => expected.eq_ignore_ascii_case(mime.trim()),
            MimeMatcher::Glob { regex, .. } => regex.is_match(mime.trim()),
        }
    }
}

impl PartialEq for MimeMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for MimeMatcher {}

impl fmt::Display for MimeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MimeMatcher::Any => f.write_str("*"),
            MimeMatcher::Exact(m) => f.write_str(m),
            MimeMatcher::Glob { pattern, .. } => f.write_str(pattern),
        }
    }
}

impl TryFrom<String> for MimeMatcher {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MimeMatcher::parse(&value)
    }
}

impl From<MimeMatcher> for String {
    fn from(value: MimeMatcher) -> Self {
        value.to_string()
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Descriptor de un plugin de análisis, tal y como aparece en el manifiesto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub category: String,
    pub image: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub mime: Vec<MimeMatcher>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PluginDescriptor {
    pub fn accepts(&self, mime: &str) -> bool {
        self.mime.iter().any(|m| m.matches(mime))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

/// Unidad de trabajo de un worker: un plugin contra una sesión.
/// Los estados sólo avanzan `Pending → Running → {Done, Failed}`.
#[derive(Debug, Clone)]
pub struct PluginTask {
    pub descriptor: PluginDescriptor,
    pub session_id: SessionId,
    state: TaskState,
}

impl PluginTask {
    pub fn new(descriptor: PluginDescriptor, session_id: SessionId) -> Self {
        PluginTask {
            descriptor,
            session_id,
            state: TaskState::Pending,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn start(&mut self) -> Result<(), TaskStateError> {
        self.transition(TaskState::Running)
    }

    pub fn finish(&mut self, succeeded: bool) -> Result<(), TaskStateError> {
        self.transition(if succeeded { TaskState::Done } else { TaskState::Failed })
    }

    fn transition(&mut self, to: TaskState) -> Result<(), TaskStateError> {
        let allowed = matches!(
            (self.state, to),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Running, TaskState::Done)
                | (TaskState::Running, TaskState::Failed)
        );
        if !allowed {
            return Err(TaskStateError {
                plugin: self.descriptor.name.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

use std::collections::BTreeMap;

use serde::Deserialize;
use specter_core::traits::ContainerSummary;

use crate::error::DockerError;

/// Una línea de `docker ps --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    names: String,
    #[serde(default)]
    labels: String,
    #[serde(default)]
    state: String,
}

impl From<PsLine> for ContainerSummary {
    fn from(line: PsLine) -> Self {
        ContainerSummary {
            id: line.id,
            names: split_list(&line.names).map(str::to_string).collect(),
            labels: parse_labels(&line.labels),
            state: line.state,
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// `a=1,b=2` → mapa. Docker no escapa las comas de los valores, así que un
/// valor con comas llega partido; las etiquetas de specter no las usan.
fn parse_labels(raw: &str) -> BTreeMap<String, String> {
    split_list(raw)
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

pub fn parse_ps(output: &str) -> Result<Vec<ContainerSummary>, DockerError> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let line: PsLine = serde_json::from_str(l)?;
            Ok::<_, DockerError>(line.into())
        })
        .collect()
}

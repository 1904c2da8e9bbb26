use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use specter_core::{SampleRecord, SessionId, StoreConfig, traits::SampleStore};
use tracing::{Level, debug, info, instrument};
use url::Url;

use crate::error::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Un contenedor recién creado tarda en aceptar conexiones.
pub const READY_ATTEMPTS: u32 = 30;
pub const READY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct Created {
    #[serde(rename = "_id")]
    id: Option<String>,
}

/// Backend de muestras sobre la API HTTP de Elasticsearch.
#[derive(Debug, Clone)]
pub struct ElasticStore {
    client: Client,
    base: Url,
    config: StoreConfig,
    ready_attempts: u32,
    ready_delay: Duration,
}

impl ElasticStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let base = base_url(&config.url)?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(ElasticStore {
            client,
            base,
            config,
            ready_attempts: READY_ATTEMPTS,
            ready_delay: READY_DELAY,
        })
    }

    pub fn with_readiness(mut self, attempts: u32, delay: Duration) -> Self {
        self.ready_attempts = attempts.max(1);
        self.ready_delay = delay;
        self
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let req = self.client.request(method, endpoint(&self.base, segments));
        if self.config.has_credentials() {
            req.basic_auth(&self.config.username, Some(&self.config.password))
        } else {
            req
        }
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub async fn wait_until_ready(&self) -> Result<(), StoreError> {
        for attempt in 1..=self.ready_attempts {
            let health = self
                .request(Method::GET, &["_cluster", "health"])
                .query(&[("wait_for_status", "yellow"), ("timeout", "5s")])
                .send()
                .await;

            match health {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => debug!(attempt, status = %resp.status(), "elasticsearch not ready"),
                Err(e) => debug!(attempt, error = %e, "elasticsearch unreachable"),
            }
            if attempt < self.ready_attempts {
                tokio::time::sleep(self.ready_delay).await;
            }
        }
        Err(StoreError::NotReady {
            attempts: self.ready_attempts,
        })
    }

    pub async fn index_exists(&self) -> Result<bool, StoreError> {
        let resp = self
            .request(Method::HEAD, &[self.config.index.as_str()])
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(status_error(resp).await),
        }
    }

    pub async fn create_index(&self) -> Result<(), StoreError> {
        let body = json!({
            "settings": { "number_of_shards": 1, "number_of_replicas": 0 }
        });
        let resp = self
            .request(Method::PUT, &[self.config.index.as_str()])
            .json(&body)
            .send()
            .await?;

        match check(resp).await {
            // Otra instancia lo creó entre la comprobación y la creación
            Err(StoreError::Status { body, .. }) if body.contains("resource_already_exists_exception") => Ok(()),
            other => other.map(|_| ()),
        }
    }

    pub async fn create_document(&self, record: &SampleRecord) -> Result<SessionId, StoreError> {
        let resp = self
            .request(Method::POST, &[self.config.index.as_str(), self.config.type_name.as_str()])
            .json(record)
            .send()
            .await?;
        let created: Created = check(resp).await?.json().await?;
        created.id.map(SessionId::from).ok_or(StoreError::MissingId)
    }
}

#[async_trait]
impl SampleStore for ElasticStore {
    #[instrument(level = Level::INFO, skip(self), fields(index = %self.config.index))]
    async fn init(&self) -> Result<()> {
        self.wait_until_ready().await?;
        if !self.index_exists().await? {
            self.create_index().await?;
            info!("index created");
        }
        Ok(())
    }

    async fn store_sample_metadata(&self, record: &SampleRecord) -> Result<SessionId> {
        Ok(self.create_document(record).await?)
    }
}

/// La URL base siempre termina en `/` para que las rutas se añadan detrás
/// de cualquier prefijo (`https://host/es/`).
fn base_url(raw: &str) -> Result<Url, StoreError> {
    let invalid = |source| StoreError::InvalidUrl {
        url: raw.to_string(),
        source,
    };
    let mut url = Url::parse(raw).map_err(invalid)?;
    if url.cannot_be_a_base() {
        return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

async fn check(resp: Response) -> Result<Response, StoreError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(status_error(resp).await)
    }
}

async fn status_error(resp: Response) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Status { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    /// Servidor HTTP mínimo: atiende una conexión por respuesta y devuelve
    /// las peticiones recibidas.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            seen
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn store(url: &str) -> ElasticStore {
        ElasticStore::new(StoreConfig {
            url: url.into(),
            ..StoreConfig::default()
        })
        .unwrap()
        .with_readiness(2, Duration::from_millis(10))
    }

    fn record() -> SampleRecord {
        SampleRecord {
            name: "evil.exe".into(),
            path: "/tmp/evil.exe".into(),
            size: 3,
            md5: "ef56".into(),
            sha1: "9a78".into(),
            sha256: "ab12".into(),
            sha512: "cd34".into(),
            mime: None,
            plugins: BTreeMap::new(),
            scanned_at: 1_700_000_000,
        }
    }

    #[test]
    fn endpoints_keep_the_base_prefix() {
        let base = base_url("https://search.internal:9200/es").unwrap();
        assert_eq!(
            endpoint(&base, &["specter", "samples"]).as_str(),
            "https://search.internal:9200/es/specter/samples"
        );

        let base = base_url("http://localhost:9200").unwrap();
        assert_eq!(
            endpoint(&base, &["_cluster", "health"]).as_str(),
            "http://localhost:9200/_cluster/health"
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(matches!(base_url("localhost"), Err(StoreError::InvalidUrl { .. })));
        assert!(matches!(base_url("mailto:a@b"), Err(StoreError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn init_creates_missing_index() {
        let (url, server) = serve(vec![
            (200, r#"{"status":"yellow"}"#),
            (404, ""),
            (200, r#"{"acknowledged":true}"#),
        ])
        .await;

        store(&url).init().await.unwrap();

        let seen = server.await.unwrap();
        assert!(seen[0].starts_with("GET /_cluster/health?wait_for_status=yellow"));
        assert!(seen[1].starts_with("HEAD /specter HTTP/1.1"));
        assert!(seen[2].starts_with("PUT /specter HTTP/1.1"));
        assert!(seen[2].contains("number_of_shards"));
    }

    #[tokio::test]
    async fn init_leaves_existing_index_alone() {
        let (url, server) = serve(vec![(200, r#"{"status":"green"}"#), (200, "")]).await;

        store(&url).init().await.unwrap();

        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_index_creation_is_not_an_error() {
        let (url, _server) = serve(vec![(
            400,
            r#"{"error":{"type":"resource_already_exists_exception"}}"#,
        )])
        .await;

        store(&url).create_index().await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_when_never_ready() {
        let (url, _server) = serve(vec![(503, "{}"), (503, "{}")]).await;

        let err = store(&url).wait_until_ready().await.unwrap_err();

        assert!(matches!(err, StoreError::NotReady { attempts: 2 }));
    }

    #[tokio::test]
    async fn stored_sample_id_becomes_the_session() {
        let (url, server) = serve(vec![(201, r#"{"_id":"AV9xq1","result":"created"}"#)]).await;
        let store = ElasticStore::new(StoreConfig {
            url,
            username: "analyst".into(),
            password: "hunter2".into(),
            ..StoreConfig::default()
        })
        .unwrap();

        let session = store.store_sample_metadata(&record()).await.unwrap();

        assert_eq!(session, SessionId::from("AV9xq1"));
        let seen = server.await.unwrap();
        assert!(seen[0].starts_with("POST /specter/samples HTTP/1.1"));
        assert!(seen[0].to_ascii_lowercase().contains("authorization: basic "));
        assert!(seen[0].contains(r#""sha256":"ab12""#));
    }

    #[tokio::test]
    async fn backend_errors_keep_the_body() {
        let (url, _server) = serve(vec![(404, r#"{"error":"index_not_found_exception"}"#)]).await;

        let err = store(&url).create_document(&record()).await.unwrap_err();

        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("index_not_found_exception"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn response_without_id_is_rejected() {
        let (url, _server) = serve(vec![(201, r#"{"result":"created"}"#)]).await;

        let err = store(&url).create_document(&record()).await.unwrap_err();

        assert!(matches!(err, StoreError::MissingId));
    }
}

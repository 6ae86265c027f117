//! Loading and caching of template and data documents by URL.
//!
//! The default loader reads `file:` URLs from disk and fetches `http:` and
//! `https:` URLs with a blocking HTTP client, decoding the body with the
//! charset named in the response's `Content-Type`.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock, RwLock};
use thiserror::Error;
use url::Url;
use xtemplate_dom::{Document, DomError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error reading URL - {url}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error reading URL - {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: DomError,
    },

    #[error("HTTP error reading URL - {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Document not found - {0}")]
    NotFound(String),

    #[error("Unsupported URL scheme - {0}")]
    UnsupportedScheme(String),

    #[error("Invalid URL - {href}")]
    InvalidUrl {
        href: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Document store unavailable: {0}")]
    Poisoned(String),
}

/// Fetches document text for a URL.
pub trait DocumentSource: Send + Sync + Debug {
    fn fetch(&self, url: &Url) -> Result<String, LoadError>;
}

/// Reads `file:` URLs from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl DocumentSource for FileSource {
    fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        if url.scheme() != "file" {
            return Err(LoadError::UnsupportedScheme(url.to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|_| LoadError::NotFound(url.to_string()))?;
        std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            url: url.to_string(),
            source,
        })
    }
}

/// Fetches `http:` and `https:` URLs. The client is built on first use unless one is supplied.
#[derive(Debug, Default)]
pub struct HttpSource {
    client: OnceLock<Client>,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        HttpSource {
            client: OnceLock::from(client),
        }
    }

    fn client(&self, url: &Url) -> Result<&Client, LoadError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder().build().map_err(|source| LoadError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoadError::UnsupportedScheme(url.to_string()));
        }
        let http_error = |source: reqwest::Error| LoadError::Http {
            url: url.to_string(),
            source,
        };
        let response = self
            .client(url)?
            .get(url.clone())
            .send()
            .map_err(http_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(url.to_string()));
        }
        log::debug!("HTTP {} for {}", response.status(), url);
        response
            .error_for_status()
            .and_then(|response| response.text())
            .map_err(http_error)
    }
}

/// Chooses a source by URL scheme.
#[derive(Debug, Clone)]
pub struct UrlSource {
    schemes: HashMap<String, Arc<dyn DocumentSource>>,
}

impl Default for UrlSource {
    fn default() -> Self {
        let http: Arc<dyn DocumentSource> = Arc::new(HttpSource::new());
        UrlSource::empty()
            .with_scheme("file", Arc::new(FileSource))
            .with_scheme("http", Arc::clone(&http))
            .with_scheme("https", http)
    }
}

impl UrlSource {
    /// `file:`, `http:` and `https:` support.
    pub fn new() -> Self {
        Self::default()
    }

    /// No schemes at all.
    pub fn empty() -> Self {
        UrlSource {
            schemes: HashMap::new(),
        }
    }

    /// Serves `scheme` from `source`, replacing any earlier registration.
    pub fn with_scheme(mut self, scheme: &str, source: Arc<dyn DocumentSource>) -> Self {
        self.schemes.insert(scheme.to_ascii_lowercase(), source);
        self
    }
}

impl DocumentSource for UrlSource {
    fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        match self.schemes.get(url.scheme()) {
            Some(source) => source.fetch(url),
            None => Err(LoadError::UnsupportedScheme(url.to_string())),
        }
    }
}

/// Serves documents registered in memory, keyed by URL string.
#[derive(Debug, Default)]
pub struct InMemorySource {
    documents: RwLock<HashMap<String, String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: &str, content: impl Into<String>) -> Result<(), LoadError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| LoadError::Poisoned("in-memory source lock poisoned".to_string()))?;
        documents.insert(url.to_string(), content.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSource for InMemorySource {
    fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| LoadError::Poisoned("in-memory source lock poisoned".to_string()))?;
        documents
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }
}

/// Parsed documents keyed by URL. Each URL is parsed at most once; the first
/// insert wins when two loaders race.
#[derive(Default)]
pub struct DocumentCache {
    documents: RwLock<HashMap<String, Arc<Document>>>,
}

impl Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("cache_size", &self.len())
            .finish()
    }
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Arc<Document>> {
        self.documents.read().ok()?.get(url).cloned()
    }

    /// Stores `document` unless the URL is already cached; returns the cached entry.
    pub fn insert(&self, url: &str, document: Arc<Document>) -> Result<Arc<Document>, LoadError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| LoadError::Poisoned("document cache lock poisoned".to_string()))?;
        Ok(Arc::clone(
            documents.entry(url.to_string()).or_insert(document),
        ))
    }

    pub fn clear(&self) {
        if let Ok(mut documents) = self.documents.write() {
            documents.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A document source paired with a shared cache.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    source: Arc<dyn DocumentSource>,
    cache: Arc<DocumentCache>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(Arc::new(UrlSource::new()))
    }
}

impl DocumentLoader {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self::with_cache(source, Arc::new(DocumentCache::new()))
    }

    pub fn with_cache(source: Arc<dyn DocumentSource>, cache: Arc<DocumentCache>) -> Self {
        DocumentLoader { source, cache }
    }

    pub fn source(&self) -> &Arc<dyn DocumentSource> {
        &self.source
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Returns the parsed document at `url`, fetching and parsing it on first use.
    pub fn load(&self, url: &Url) -> Result<Arc<Document>, LoadError> {
        let key = url.as_str();
        if let Some(document) = self.cache.get(key) {
            log::debug!("Document cache hit: {}", key);
            return Ok(document);
        }
        log::debug!("Loading document: {}", key);
        let text = self.source.fetch(url)?;
        let document = Document::parse(&text).map_err(|source| LoadError::Parse {
            url: key.to_string(),
            source,
        })?;
        self.cache.insert(key, document)
    }

    /// Fetches raw text without parsing or caching, for JSON and properties data.
    pub fn fetch_text(&self, url: &Url) -> Result<String, LoadError> {
        self.source.fetch(url)
    }
}

/// Resolves `href` against an optional base URL. Without a base the href must be absolute.
pub fn resolve_href(base: Option<&Url>, href: &str) -> Result<Url, LoadError> {
    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    resolved.map_err(|source| LoadError::InvalidUrl {
        href: href.to_string(),
        source,
    })
}

//! Local directory targets
//!
//! Local files are addressed through a synthetic `http://localhost:{port}/`
//! origin so that relative and root-relative links resolve exactly as they
//! would on a web server. Requests against that origin are answered from disk.

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};

use rand::Rng;
use url::Url;

use super::EngineError;
use super::extract::ContentKind;

/// Response to a request against the local origin
#[derive(Debug)]
pub(crate) struct LocalResponse {
    pub status: u16,
    pub kind: ContentKind,
    pub body: Option<String>,
}

impl LocalResponse {
    fn not_found() -> Self {
        Self {
            status: 404,
            kind: ContentKind::Other,
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LocalSite {
    root: PathBuf,
    origin: Url,
    directory_listing: bool,
    clean_urls: bool,
}

impl LocalSite {
    /// Build the site for `path` and return it with the URL of the scan target
    pub(crate) async fn open(
        path: &str,
        server_root: Option<&str>,
        port: Option<u16>,
        directory_listing: bool,
        clean_urls: bool,
    ) -> Result<(Self, Url), EngineError> {
        let target = canonical(path).await?;
        let target_is_dir = metadata(&target).await.is_some_and(|m| m.is_dir());
        let root = match server_root {
            Some(root) => canonical(root).await?,
            None if target_is_dir => target.clone(),
            None => target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| target.clone()),
        };

        let relative = target.strip_prefix(&root).map_err(|_| {
            EngineError::Other(format!(
                "local path '{}' is outside serverRoot '{}'",
                target.display(),
                root.display()
            ))
        })?;

        let port = port.unwrap_or_else(|| rand::rng().random_range(49152..=65535));
        let origin = Url::parse(&format!("http://localhost:{port}/")).map_err(|source| {
            EngineError::InvalidTarget {
                url: format!("http://localhost:{port}/"),
                source,
            }
        })?;

        let mut relative_url: String = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if target_is_dir && !relative_url.is_empty() {
            relative_url.push('/');
        }
        let start = origin
            .join(&relative_url)
            .map_err(|source| EngineError::InvalidTarget {
                url: relative_url.clone(),
                source,
            })?;

        log::debug!(
            "Serving local scan of {} from root {} at {}",
            target.display(),
            root.display(),
            origin
        );

        Ok((
            Self {
                root,
                origin,
                directory_listing,
                clean_urls,
            },
            start,
        ))
    }

    /// Whether `url` points at this site
    pub(crate) fn contains(&self, url: &Url) -> bool {
        url.scheme() == self.origin.scheme()
            && url.host_str() == self.origin.host_str()
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }

    /// File under the root that `url` names
    ///
    /// The URL path is percent-decoded, so an encoded `/` can smuggle in a
    /// `..` segment; any path that climbs above the root is refused.
    fn disk_path(&self, url: &Url) -> Option<PathBuf> {
        let mut file_url = Url::parse("file:///").ok()?;
        file_url.set_path(url.path());
        let absolute = file_url.to_file_path().ok()?;

        let mut relative = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    log::debug!("Refusing {url}: path leaves the server root");
                    return None;
                }
            }
        }
        Some(self.root.join(relative))
    }

    /// Answer a request from disk
    pub(crate) async fn fetch(&self, url: &Url, want_body: bool) -> LocalResponse {
        let Some(path) = self.disk_path(url) else {
            return LocalResponse::not_found();
        };

        match metadata(&path).await {
            Some(meta) if meta.is_file() => return read_file(&path, want_body).await,
            Some(meta) if meta.is_dir() => {
                let index = path.join("index.html");
                if is_file(&index).await {
                    return read_file(&index, want_body).await;
                }
                if self.directory_listing {
                    return LocalResponse {
                        status: 200,
                        kind: ContentKind::Html,
                        body: Some(directory_listing(&path).await),
                    };
                }
                return LocalResponse::not_found();
            }
            _ => {}
        }

        if self.clean_urls {
            let mut html = path.into_os_string();
            html.push(".html");
            let html = PathBuf::from(html);
            if is_file(&html).await {
                return read_file(&html, want_body).await;
            }
        }

        LocalResponse::not_found()
    }
}

async fn canonical(path: &str) -> Result<PathBuf, EngineError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|source| EngineError::LocalPath {
            path: path.to_string(),
            source,
        })
}

async fn metadata(path: &Path) -> Option<Metadata> {
    tokio::fs::metadata(path).await.ok()
}

async fn is_file(path: &Path) -> bool {
    metadata(path).await.is_some_and(|m| m.is_file())
}

async fn read_file(path: &Path, want_body: bool) -> LocalResponse {
    let kind = ContentKind::from_path(&path.to_string_lossy());
    if !want_body {
        return LocalResponse {
            status: 200,
            kind,
            body: None,
        };
    }
    match tokio::fs::read(path).await {
        Ok(bytes) => LocalResponse {
            status: 200,
            kind,
            body: Some(String::from_utf8_lossy(&bytes).into_owned()),
        },
        Err(e) => {
            log::warn!("Failed to read {}: {e}", path.display());
            LocalResponse {
                status: 500,
                kind,
                body: None,
            }
        }
    }
}

async fn directory_listing(dir: &Path) -> String {
    let mut names = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            names.push(name);
        }
    }
    names.sort();

    let mut html = String::from("<html><body><ul>\n");
    for name in names {
        let (stem, slash) = match name.strip_suffix('/') {
            Some(stem) => (stem, "/"),
            None => (name.as_str(), ""),
        };
        let href = format!("{}{slash}", urlencoding::encode(stem));
        html.push_str(&format!(
            "<li><a href=\"{href}\">{}</a></li>\n",
            html_escape::encode_text(&name)
        ));
    }
    html.push_str("</ul></body></html>\n");
    html
}

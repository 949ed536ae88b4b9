use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "nba_gameindex";
const CACHE_FILE: &str = "http_cache.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// Conditional-GET cache for text downloads, persisted as one JSON file.
///
/// A cached body is revalidated with `If-None-Match` / `If-Modified-Since`
/// on every fetch and reused on `304 Not Modified`.
#[derive(Debug)]
pub struct HttpCache {
    path: Option<PathBuf>,
    file: HttpCacheFile,
}

impl HttpCache {
    /// Opens the cache under the user cache directory, or an in-memory
    /// cache when no such directory can be resolved.
    pub fn open_default() -> Self {
        match app_cache_dir() {
            Some(dir) => Self::open(dir.join(CACHE_FILE)),
            None => Self::in_memory(),
        }
    }

    pub fn open(path: PathBuf) -> Self {
        let file = load_cache_file(&path);
        Self {
            path: Some(path),
            file,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            file: HttpCacheFile::default(),
        }
    }

    pub fn cached_body(&self, url: &str) -> Option<&str> {
        self.file.entries.get(url).map(|e| e.body.as_str())
    }

    pub fn fetch_text(&mut self, client: &Client, url: &str) -> Result<String> {
        let cached_entry = self.file.entries.get(url).cloned();

        let mut req = client.get(url);
        if let Some(entry) = cached_entry.as_ref() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = req.send().with_context(|| format!("request {url} failed"))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        if status == StatusCode::NOT_MODIFIED {
            let Some(mut entry) = cached_entry else {
                return Err(anyhow!("received 304 without cache body for {url}"));
            };
            debug!(url, "not modified; using cached body");
            entry.fetched_at = now_secs();
            let body = entry.body.clone();
            self.store(url, entry);
            return Ok(body);
        }

        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}"));
        }

        let header_text = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let entry = CacheEntry {
            body: body.clone(),
            etag: header_text(ETAG),
            last_modified: header_text(LAST_MODIFIED),
            fetched_at: now_secs(),
        };
        self.store(url, entry);
        Ok(body)
    }

    fn store(&mut self, url: &str, entry: CacheEntry) {
        self.file.version = CACHE_VERSION;
        self.file.entries.insert(url.to_string(), entry);
        if let Some(path) = self.path.as_deref()
            && let Err(err) = save_cache_file(path, &self.file)
        {
            warn!(path = %path.display(), error = %err, "could not persist http cache");
        }
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn load_cache_file(path: &Path) -> HttpCacheFile {
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(path: &Path, cache: &HttpCacheFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, path).context("swap http cache")?;
    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{CACHE_VERSION, CacheEntry, HttpCache, HttpCacheFile, save_cache_file};

    #[test]
    fn reopens_persisted_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        let mut file = HttpCacheFile {
            version: CACHE_VERSION,
            ..Default::default()
        };
        file.entries.insert(
            "https://example.test/game_dates.csv".to_string(),
            CacheEntry {
                body: "GAME_ID\n1\n".to_string(),
                etag: Some("\"abc\"".to_string()),
                last_modified: None,
                fetched_at: 1,
            },
        );
        save_cache_file(&path, &file).expect("save");

        let cache = HttpCache::open(path);
        assert_eq!(
            cache.cached_body("https://example.test/game_dates.csv"),
            Some("GAME_ID\n1\n")
        );
    }

    #[test]
    fn stale_version_is_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        let raw = r#"{"version":0,"entries":{"u":{"body":"x","etag":null,"last_modified":null,"fetched_at":0}}}"#;
        std::fs::write(&path, raw).expect("write");
        let cache = HttpCache::open(path);
        assert!(cache.cached_body("u").is_none());
    }
}

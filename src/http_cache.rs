use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "atp_ingest";
const INDEX_FILE: &str = "http_cache.json";
// Season files run to a few megabytes on the raw-content host.
const REQUEST_TIMEOUT_SECS: u64 = 30;

static CLIENT: OnceCell<Client> = OnceCell::new();
static CACHE: Mutex<Option<IndexFile>> = Mutex::new(None);

/// Process-wide blocking client, built once.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct IndexFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body_file: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// Fetch a text resource with on-disk revalidation. Bodies live in per-URL
/// files (season downloads are megabytes); the index keeps the validators.
/// A 304 serves the stored body without re-downloading.
pub fn fetch_text_cached(client: &Client, url: &str) -> Result<String> {
    let cached_entry = {
        let mut guard = CACHE.lock().expect("http cache lock poisoned");
        let cache = guard.get_or_insert_with(load_index);
        cache.entries.get(url).cloned()
    };
    let cached_body = cached_entry.as_ref().and_then(read_body_file);

    let mut req = client.get(url).header(USER_AGENT, "atp-ingest/0.1");
    if let Some(entry) = cached_entry.as_ref().filter(|_| cached_body.is_some()) {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        if let (Some(entry), Some(body)) = (cached_entry, cached_body) {
            refresh_entry(url, entry);
            return Ok(body);
        }
        return Err(anyhow::anyhow!("received 304 without cache body"));
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {status}"));
    }

    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let entry = CacheEntry {
        body_file: body_file_name(url),
        etag,
        last_modified,
        fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
    };
    let _ = write_body_file(&entry, &body);
    refresh_entry(url, entry);
    Ok(body)
}

/// Cache directory for this tool: `$XDG_CACHE_HOME/atp_ingest`, falling
/// back to `~/.cache/atp_ingest`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn body_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut name = String::with_capacity(40);
    for byte in digest.iter().take(16) {
        name.push_str(&format!("{byte:02x}"));
    }
    name.push_str(".body");
    name
}

fn read_body_file(entry: &CacheEntry) -> Option<String> {
    let dir = app_cache_dir()?;
    fs::read_to_string(dir.join(&entry.body_file)).ok()
}

fn write_body_file(entry: &CacheEntry, body: &str) -> Result<()> {
    let Some(dir) = app_cache_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&dir).ok();
    let path = dir.join(&entry.body_file);
    let tmp = path.with_extension("body.tmp");
    fs::write(&tmp, body).context("write cache body")?;
    fs::rename(&tmp, &path).context("swap cache body")?;
    Ok(())
}

fn refresh_entry(url: &str, entry: CacheEntry) {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_index);
    cache.version = CACHE_VERSION;
    cache.entries.insert(url.to_string(), entry);
    let _ = save_index(cache);
}

fn load_index() -> IndexFile {
    let Some(dir) = app_cache_dir() else {
        return IndexFile::default();
    };
    let Ok(raw) = fs::read_to_string(dir.join(INDEX_FILE)) else {
        return IndexFile::default();
    };
    let index = serde_json::from_str::<IndexFile>(&raw).unwrap_or_default();
    if index.version != CACHE_VERSION {
        return IndexFile::default();
    }
    index
}

fn save_index(index: &IndexFile) -> Result<()> {
    let Some(dir) = app_cache_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&dir).ok();
    let path = dir.join(INDEX_FILE);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(index).context("serialize http cache index")?;
    fs::write(&tmp, json).context("write http cache index")?;
    fs::rename(&tmp, &path).context("swap http cache index")?;
    Ok(())
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

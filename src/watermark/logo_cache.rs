//! Logo loading with a time-bounded in-memory cache.
//!
//! Logos are fetched from HTTPS URLs or local files, decoded once into RGBA
//! and shared read-only between every image processed while the entry is
//! fresh.
//!
//! # Supported Sources
//!
//! - `https://cdn.example.com/logo.png` - fetched with `reqwest`
//! - `file:///srv/assets/logo.png` or `/srv/assets/logo.png` - read from disk
//!
//! # Caching
//!
//! Each lookup first sweeps every entry older than the TTL (30 minutes by
//! default), then answers from the map or loads on a miss. Entries are
//! inserted whole after a successful decode and never modified afterwards.
//! Failed loads leave no trace in the map.
//!
//! # Limits
//!
//! Logo bodies are capped while they stream in, and the header dimensions are
//! checked against [`LogoCacheConfig::limits`] before any pixel is decoded.
//!
//! # Example
//!
//! ```ignore
//! use watermill::watermark::logo_cache::{LogoCache, LogoCacheConfig};
//!
//! let cache = LogoCache::new(LogoCacheConfig::default())?;
//! let logo = cache.get_or_load("https://cdn.example.com/logo.png").await?;
//! ```

use super::WatermarkError;
use crate::image_optimizer::{validate_dimensions, validate_file_size, SecurityConfig};
use async_trait::async_trait;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, RgbaImage};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default lifetime of a cached logo.
pub const DEFAULT_LOGO_TTL: Duration = Duration::from_secs(30 * 60);

/// Default bound on a single logo fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on the encoded size of a logo.
pub const DEFAULT_MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

/// Default cap on logo width and height.
pub const DEFAULT_MAX_LOGO_DIMENSION: u32 = 4096;

/// Default cap on logo pixel count.
pub const DEFAULT_MAX_LOGO_PIXELS: u64 = 16 * 1024 * 1024;

/// Configuration for the logo cache.
#[derive(Debug, Clone)]
pub struct LogoCacheConfig {
    /// Time-to-live for cached logos.
    pub ttl: Duration,
    /// Upper bound for fetching one logo on a cache miss.
    pub fetch_timeout: Duration,
    /// Size and dimension limits for fetched logos.
    pub limits: SecurityConfig,
}

impl LogoCacheConfig {
    /// Limits sized for a brand mark rather than a photo.
    pub fn default_limits() -> SecurityConfig {
        SecurityConfig {
            max_source_width: DEFAULT_MAX_LOGO_DIMENSION,
            max_source_height: DEFAULT_MAX_LOGO_DIMENSION,
            max_source_pixels: DEFAULT_MAX_LOGO_PIXELS,
            max_source_file_size: DEFAULT_MAX_LOGO_BYTES,
        }
    }
}

impl Default for LogoCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_LOGO_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            limits: Self::default_limits(),
        }
    }
}

/// Parsed location of a logo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoSource {
    /// HTTPS URL source.
    Https(String),
    /// Local file path.
    File(PathBuf),
}

impl LogoSource {
    /// Parse a source string.
    ///
    /// Plain `http://` is rejected so logos are never fetched in the clear.
    pub fn parse(source: &str) -> Result<Self, WatermarkError> {
        let source = source.trim();
        if source.starts_with("https://") {
            Ok(LogoSource::Https(source.to_string()))
        } else if let Some(path) = source.strip_prefix("file://") {
            if path.is_empty() {
                return Err(WatermarkError::FetchError(format!(
                    "Invalid file source: {source}"
                )));
            }
            Ok(LogoSource::File(PathBuf::from(path)))
        } else if source.starts_with('/') {
            Ok(LogoSource::File(PathBuf::from(source)))
        } else {
            Err(WatermarkError::FetchError(format!(
                "Unsupported logo source: {source}. Use https://, file:// or an absolute path"
            )))
        }
    }

    /// Get a cache key for this source.
    pub fn cache_key(&self) -> String {
        match self {
            LogoSource::Https(url) => url.clone(),
            LogoSource::File(path) => format!("file://{}", path.display()),
        }
    }
}

/// Decoded logo shared between renders.
///
/// Cloning is cheap and keeps pointing at the same pixel buffer.
#[derive(Clone)]
pub struct LogoHandle {
    image: Arc<RgbaImage>,
}

impl std::fmt::Debug for LogoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogoHandle")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .finish()
    }
}

impl LogoHandle {
    /// Wrap a decoded image. Empty images are rejected.
    pub fn from_image(image: DynamicImage) -> Result<Self, WatermarkError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(WatermarkError::DecodeError(
                "logo has no pixels".to_string(),
            ));
        }
        Ok(Self {
            image: Arc::new(image.to_rgba8()),
        })
    }

    /// Decode logo bytes. `name_hint` is used for format detection when the
    /// magic bytes are not recognised.
    pub fn decode(data: &[u8], name_hint: &str) -> Result<Self, WatermarkError> {
        Self::decode_with_limits(data, name_hint, &LogoCacheConfig::default_limits())
    }

    /// Decode logo bytes, refusing payloads or headers beyond `limits`.
    ///
    /// Dimensions come from the image header, so an oversized logo is
    /// rejected without allocating its pixel buffer.
    pub fn decode_with_limits(
        data: &[u8],
        name_hint: &str,
        limits: &SecurityConfig,
    ) -> Result<Self, WatermarkError> {
        validate_file_size(data.len(), limits)
            .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;

        let format = detect_image_format(data, name_hint)?;
        let (width, height) = ImageReader::with_format(Cursor::new(data), format)
            .into_dimensions()
            .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;
        validate_dimensions(width, height, limits)
            .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;

        let image = image::load_from_memory_with_format(data, format)
            .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;
        Self::from_image(image)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.image.width() as f64 / self.image.height() as f64
    }

    /// True when both handles share the same decoded buffer.
    pub fn ptr_eq(&self, other: &LogoHandle) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

/// Time source for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Fetches raw logo bytes from a source.
#[async_trait]
pub trait LogoLoader: Send + Sync {
    async fn load(&self, source: &LogoSource) -> Result<Vec<u8>, WatermarkError>;
}

/// Loader for HTTPS URLs and local files.
///
/// Bodies larger than `max_bytes` are refused: by `Content-Length` or file
/// metadata when known, otherwise as soon as the streamed body crosses it.
#[derive(Clone)]
pub struct DefaultLogoLoader {
    http_client: reqwest::Client,
    max_bytes: usize,
}

impl DefaultLogoLoader {
    /// # Errors
    ///
    /// Returns `WatermarkError::ConfigError` if the HTTP client cannot be created.
    pub fn new(request_timeout: Duration) -> Result<Self, WatermarkError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                WatermarkError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            max_bytes: DEFAULT_MAX_LOGO_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn too_large(&self, size: impl std::fmt::Display) -> WatermarkError {
        WatermarkError::FetchError(format!(
            "logo is {} bytes, limit is {}",
            size, self.max_bytes
        ))
    }

    async fn fetch_from_https(&self, url: &str) -> Result<Vec<u8>, WatermarkError> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| WatermarkError::FetchError(format!("HTTP fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(WatermarkError::FetchError(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(self.too_large(length));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WatermarkError::FetchError(format!("Failed to read HTTP body: {e}")))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(format!("at least {}", body.len() + chunk.len())));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, WatermarkError> {
        let read_error = |e: std::io::Error| {
            WatermarkError::FetchError(format!("Failed to read {}: {e}", path.display()))
        };

        let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
        if metadata.len() > self.max_bytes as u64 {
            return Err(self.too_large(metadata.len()));
        }
        tokio::fs::read(path).await.map_err(read_error)
    }
}

#[async_trait]
impl LogoLoader for DefaultLogoLoader {
    async fn load(&self, source: &LogoSource) -> Result<Vec<u8>, WatermarkError> {
        match source {
            LogoSource::Https(url) => self.fetch_from_https(url).await,
            LogoSource::File(path) => self.read_file(path).await,
        }
    }
}

struct LogoCacheEntry {
    source_key: String,
    handle: LogoHandle,
    loaded_at: Instant,
}

impl LogoCacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.loaded_at) < ttl
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub load_failures: u64,
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    load_failures: AtomicU64,
}

/// Logo cache keyed by source.
pub struct LogoCache {
    entries: RwLock<HashMap<String, LogoCacheEntry>>,
    ttl: Duration,
    fetch_timeout: Duration,
    limits: SecurityConfig,
    clock: Arc<dyn Clock>,
    loader: Arc<dyn LogoLoader>,
    counters: CacheCounters,
}

impl LogoCache {
    /// Cache backed by the system clock and [`DefaultLogoLoader`].
    pub fn new(config: LogoCacheConfig) -> Result<Self, WatermarkError> {
        let loader = DefaultLogoLoader::new(config.fetch_timeout)?
            .with_max_bytes(config.limits.max_source_file_size);
        Ok(Self::with_parts(
            config,
            Arc::new(loader),
            Arc::new(SystemClock),
        ))
    }

    /// Cache with an injected loader and clock.
    pub fn with_parts(
        config: LogoCacheConfig,
        loader: Arc<dyn LogoLoader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: config.ttl,
            fetch_timeout: config.fetch_timeout,
            limits: config.limits,
            clock,
            loader,
            counters: CacheCounters::default(),
        }
    }

    /// Return the logo for `source_key`, loading it on a miss.
    ///
    /// Expired entries are swept before the lookup. On a miss the logo is
    /// fetched under the configured timeout and decoded; only a fully
    /// decoded logo is inserted. If a concurrent miss inserted the same key
    /// first, its handle is returned instead of ours.
    pub async fn get_or_load(&self, source_key: &str) -> Result<LogoHandle, WatermarkError> {
        let source = match LogoSource::parse(source_key) {
            Ok(source) => source,
            Err(e) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        let key = source.cache_key();

        {
            let mut entries = self.entries.write();
            let evicted = sweep(&mut entries, self.clock.now(), self.ttl);
            if evicted > 0 {
                tracing::debug!(evicted = evicted, "Evicted expired logos");
            }
            if let Some(entry) = entries.get(&key) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.handle.clone());
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let handle = match self.load(&source, &key).await {
            Ok(handle) => handle,
            Err(e) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        tracing::debug!(
            source = %key,
            width = handle.width(),
            height = handle.height(),
            "Cached logo"
        );

        let loaded_at = self.clock.now();
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| LogoCacheEntry {
                source_key: key,
                handle,
                loaded_at,
            });
        Ok(entry.handle.clone())
    }

    async fn load(&self, source: &LogoSource, key: &str) -> Result<LogoHandle, WatermarkError> {
        let bytes = tokio::time::timeout(self.fetch_timeout, self.loader.load(source))
            .await
            .map_err(|_| WatermarkError::Timeout {
                source: key.to_string(),
                after: self.fetch_timeout,
            })??;

        LogoHandle::decode_with_limits(&bytes, key, &self.limits)
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write();
        sweep(&mut entries, self.clock.now(), self.ttl)
    }

    /// Whether a fresh entry exists for `source_key`.
    pub fn contains(&self, source_key: &str) -> bool {
        let Ok(source) = LogoSource::parse(source_key) else {
            return false;
        };
        let now = self.clock.now();
        self.entries
            .read()
            .get(&source.cache_key())
            .map(|entry| entry.is_fresh(now, self.ttl))
            .unwrap_or(false)
    }

    /// Keys currently stored, including ones that expired but were not swept yet.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.source_key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear all cached logos.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            load_failures: self.counters.load_failures.load(Ordering::Relaxed),
        }
    }
}

fn sweep(entries: &mut HashMap<String, LogoCacheEntry>, now: Instant, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.is_fresh(now, ttl));
    before - entries.len()
}

/// Detect image format from bytes or filename extension.
fn detect_image_format(data: &[u8], path: &str) -> Result<ImageFormat, WatermarkError> {
    if let Ok(format) = image::guess_format(data) {
        return Ok(format);
    }

    let ext = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('.')
        .next()
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::WebP),
        _ => Err(WatermarkError::DecodeError(format!(
            "Unsupported image format: {ext}"
        ))),
    }
}

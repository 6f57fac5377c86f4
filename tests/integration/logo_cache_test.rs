//! Logo cache behaviour against real files and the default loader

use super::test_images::logo_png;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use watermill::watermark::{
    Clock, DefaultLogoLoader, LogoCache, LogoCacheConfig, LogoLoader, ManualClock, WatermarkError,
};

const TTL: Duration = Duration::from_secs(30 * 60);

fn cache_with_clock() -> (LogoCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let config = LogoCacheConfig {
        ttl: TTL,
        fetch_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let loader: Arc<dyn LogoLoader> =
        Arc::new(DefaultLogoLoader::new(config.fetch_timeout).unwrap());
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    (LogoCache::with_parts(config, loader, clock_dyn), clock)
}

#[tokio::test]
async fn test_ttl_governs_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logo.png");
    std::fs::write(&path, logo_png()).unwrap();
    let source = path.to_string_lossy().into_owned();

    let (cache, clock) = cache_with_clock();
    let first = cache.get_or_load(&source).await.unwrap();
    assert_eq!((first.width(), first.height()), (80, 40));

    // The file disappearing does not matter while the entry is fresh
    std::fs::remove_file(&path).unwrap();
    clock.advance(TTL - Duration::from_secs(1));
    let second = cache.get_or_load(&source).await.unwrap();
    assert!(first.ptr_eq(&second));

    // At the TTL the entry is swept and a fresh load is attempted
    clock.advance(Duration::from_secs(1));
    let err = cache.get_or_load(&source).await.unwrap_err();
    assert!(matches!(err, WatermarkError::FetchError(_)));
    assert!(cache.is_empty());

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.load_failures), (1, 2, 1));
}

#[tokio::test]
async fn test_file_url_and_path_share_entry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("brand.png");
    std::fs::write(&path, logo_png()).unwrap();
    let plain = path.to_string_lossy().into_owned();
    let url = format!("file://{}", plain);

    let (cache, _clock) = cache_with_clock();
    let a = cache.get_or_load(&plain).await.unwrap();
    let b = cache.get_or_load(&url).await.unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_plain_http_rejected() {
    let (cache, _clock) = cache_with_clock();
    let err = cache
        .get_or_load("http://cdn.example.com/logo.png")
        .await
        .unwrap_err();
    assert!(matches!(err, WatermarkError::FetchError(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_concurrent_uploads_share_one_logo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logo.png");
    std::fs::write(&path, logo_png()).unwrap();
    let source = path.to_string_lossy().into_owned();

    let (cache, _clock) = cache_with_clock();
    let cache = Arc::new(cache);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let source = source.clone();
            tokio::spawn(async move { cache.get_or_load(&source).await })
        })
        .collect();

    let mut logos = Vec::new();
    for handle in handles {
        logos.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(cache.len(), 1);
    let cached = cache.get_or_load(&source).await.unwrap();
    assert!(logos.iter().all(|logo| logo.ptr_eq(&cached)));
}

use crate::import::AssetError;
use futures::future::BoxFuture;
use futures::FutureExt;
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Fetches and decodes raster assets by URL
pub trait ImageLoader: Send + Sync {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<RgbaImage, AssetError>>;
}

/// Loads `file://` URLs and plain paths from the local disk.
/// Reading and decoding run on a worker thread so polling never blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageLoader;

#[cfg(not(target_arch = "wasm32"))]
impl ImageLoader for FileImageLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<RgbaImage, AssetError>> {
        let path = url.strip_prefix("file://").unwrap_or(url).to_owned();
        let url = url.to_owned();
        let (sender, receiver) = futures::channel::oneshot::channel();
        std::thread::spawn(move || {
            // the receiver is gone when the url was evicted meanwhile
            let _ = sender.send(read_image(path));
        });
        receiver
            .map(move |result| result.unwrap_or_else(|_| Err(AssetError::Missing(url))))
            .boxed()
    }
}

#[cfg(target_arch = "wasm32")]
impl ImageLoader for FileImageLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<RgbaImage, AssetError>> {
        futures::future::ready(Err(AssetError::Unsupported(url.to_owned()))).boxed()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_image(path: String) -> Result<RgbaImage, AssetError> {
    let bytes = std::fs::read(&path).map_err(|source| AssetError::Io { path, source })?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

#[derive(Debug, Clone)]
pub enum CacheEntry {
    Loading,
    Ready(Arc<RgbaImage>),
    Failed(String),
}

/// Completion report from [`ImageCache::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFinished {
    pub url: String,
    pub ok: bool,
}

/// True for URLs the render path must never fetch itself
pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn is_blob_url(url: &str) -> bool {
    url.starts_with("blob:")
}

/// Raster images keyed by source URL.
///
/// A URL is loaded at most once at a time: requests for a URL that is already
/// loading are dropped. Loads are futures polled cooperatively from the UI
/// thread through [`ImageCache::poll`].
pub struct ImageCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    pending: Mutex<Vec<(String, BoxFuture<'static, Result<RgbaImage, AssetError>>)>>,
    loader: Box<dyn ImageLoader>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("entries", &self.entries.lock().len())
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(Box::new(FileImageLoader))
    }
}

impl ImageCache {
    pub fn new(loader: Box<dyn ImageLoader>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            loader,
        }
    }

    /// Cached pixels for `url`. A miss starts a load and returns `None`.
    pub fn get(&self, url: &str) -> Option<Arc<RgbaImage>> {
        if let Some(entry) = self.entries.lock().get(url) {
            return match entry {
                CacheEntry::Ready(image) => Some(image.clone()),
                CacheEntry::Loading | CacheEntry::Failed(_) => None,
            };
        }
        self.request(url);
        None
    }

    /// Start loading `url` unless it is cached, in flight, remote or a session blob
    pub fn request(&self, url: &str) {
        if is_remote_url(url) {
            log::debug!("not fetching remote url from the render path: {}", url);
            return;
        }
        let mut entries = self.entries.lock();
        if entries.contains_key(url) {
            return;
        }
        if is_blob_url(url) {
            log::warn!("blob {} is not in the cache", url);
            entries.insert(url.to_owned(), CacheEntry::Failed(AssetError::Missing(url.to_owned()).to_string()));
            return;
        }
        log::debug!("loading image {}", url);
        entries.insert(url.to_owned(), CacheEntry::Loading);
        self.pending.lock().push((url.to_owned(), self.loader.load(url)));
    }

    /// Register already decoded pixels under `url`, e.g. a session `blob:` URL
    pub fn insert(&self, url: impl Into<String>, image: RgbaImage) -> Arc<RgbaImage> {
        let image = Arc::new(image);
        self.entries.lock().insert(url.into(), CacheEntry::Ready(image.clone()));
        image
    }

    pub fn entry(&self, url: &str) -> Option<CacheEntry> {
        self.entries.lock().get(url).cloned()
    }

    /// Forget `url` so the next request loads it again
    pub fn evict(&self, url: &str) {
        self.entries.lock().remove(url);
        self.pending.lock().retain(|(pending, _)| pending != url);
    }

    /// Pixels for `url`, loading a local file in place on a miss.
    /// Off-screen export uses this since it cannot wait for later frames.
    pub fn load_blocking(&self, url: &str) -> Option<Arc<RgbaImage>> {
        match self.entry(url) {
            Some(CacheEntry::Ready(image)) => return Some(image),
            Some(CacheEntry::Failed(_)) => return None,
            Some(CacheEntry::Loading) | None => {}
        }
        if is_remote_url(url) || is_blob_url(url) {
            self.request(url);
            return None;
        }
        // an in-flight load stays pending so `poll` still reports it
        let entry = match futures::executor::block_on(self.loader.load(url)) {
            Ok(image) => {
                log::info!("🖼 loaded {} for export ({}x{})", url, image.width(), image.height());
                CacheEntry::Ready(Arc::new(image))
            }
            Err(err) => {
                log::warn!("failed to load {}: {}", url, err);
                CacheEntry::Failed(err.to_string())
            }
        };
        self.entries.lock().insert(url.to_owned(), entry.clone());
        match entry {
            CacheEntry::Ready(image) => Some(image),
            CacheEntry::Loading | CacheEntry::Failed(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Poll every in-flight load once and report the ones that finished
    pub fn poll(&self) -> Vec<LoadFinished> {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let mut finished = Vec::new();
        let mut pending = self.pending.lock();
        pending.retain_mut(|(url, future)| match future.poll_unpin(&mut cx) {
            Poll::Pending => true,
            Poll::Ready(result) => {
                finished.push((url.clone(), result));
                false
            }
        });
        drop(pending);

        let mut entries = self.entries.lock();
        finished
            .into_iter()
            .map(|(url, result)| {
                let ok = result.is_ok();
                let entry = match result {
                    Ok(image) => {
                        log::info!("🖼 loaded {} ({}x{})", url, image.width(), image.height());
                        CacheEntry::Ready(Arc::new(image))
                    }
                    Err(err) => {
                        log::warn!("failed to load {}: {}", url, err);
                        CacheEntry::Failed(err.to_string())
                    }
                };
                entries.insert(url.clone(), entry);
                LoadFinished { url, ok }
            })
            .collect()
    }
}

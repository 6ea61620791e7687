//! Background-image loading off the UI thread.
//!
//! A load runs on a worker thread and hands its result back through a
//! oneshot channel that the UI polls once per frame. Starting a new load
//! raises the previous load's cancellation flag and drops its receiver, so a
//! stale result can never reach the surface.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use image::RgbaImage;
use log::{debug, info, warn};

use crate::error::ImageLoadError;

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Where a background image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    Url(String),
    /// Already in memory, e.g. a dropped file or embedded data.
    Bytes { name: String, data: Arc<[u8]> },
}

impl ImageSource {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Anything with a scheme is a URL, everything else a local path.
    pub fn parse(input: &str) -> Self {
        if input.contains("://") {
            ImageSource::Url(input.to_owned())
        } else {
            ImageSource::Path(PathBuf::from(input))
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Url(url) => url.clone(),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }

    /// File name without extension, used to name exported files.
    pub fn file_stem(&self) -> String {
        let last_segment = match self {
            ImageSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ImageSource::Url(url) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_owned(),
            ImageSource::Bytes { name, .. } => name.rsplit(['/', '\\']).next().unwrap_or_default().to_owned(),
        };

        let stem = match last_segment.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem.to_owned(),
            _ => last_segment,
        };
        if stem.is_empty() { "image".to_owned() } else { stem }
    }
}

/// Produces the raw bytes of an image source. Runs on the loader thread.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, ImageLoadError>;
}

/// Reads local files and in-memory data. Remote URLs are left to the host,
/// which can plug in its own [`ImageFetcher`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFetcher;

impl ImageFetcher for LocalFetcher {
    fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, ImageLoadError> {
        match source {
            ImageSource::Path(path) => Ok(std::fs::read(path)?),
            ImageSource::Bytes { data, .. } => Ok(data.to_vec()),
            ImageSource::Url(url) => match url.strip_prefix("file://") {
                Some(path) => Ok(std::fs::read(path)?),
                None => Err(ImageLoadError::Unsupported(url.clone())),
            },
        }
    }
}

/// A decoded image ready to install as background.
#[derive(Debug)]
pub struct LoadedImage {
    pub source: ImageSource,
    pub image: RgbaImage,
}

#[derive(Debug)]
pub enum LoadPoll {
    /// Nothing in flight.
    Idle,
    Pending,
    Ready(LoadedImage),
    Failed {
        source: ImageSource,
        error: ImageLoadError,
    },
}

struct PendingLoad {
    generation: u64,
    source: ImageSource,
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
    receiver: oneshot::Receiver<Result<RgbaImage, ImageLoadError>>,
}

impl PendingLoad {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

pub struct ImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
    timeout: Duration,
    generation: u64,
    pending: Option<PendingLoad>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("timeout", &self.timeout)
            .field("generation", &self.generation)
            .field("pending", &self.pending.as_ref().map(|p| p.source.display_name()))
            .finish()
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(Arc::new(LocalFetcher), DEFAULT_LOAD_TIMEOUT)
    }
}

impl ImageLoader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, timeout: Duration) -> Self {
        Self {
            fetcher,
            timeout,
            generation: 0,
            pending: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts loading `source`, superseding any load still in flight.
    pub fn start(&mut self, source: ImageSource) -> Result<u64, ImageLoadError> {
        self.start_at(source, Instant::now())
    }

    pub fn start_at(&mut self, source: ImageSource, now: Instant) -> Result<u64, ImageLoadError> {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let (sender, receiver) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let fetcher = Arc::clone(&self.fetcher);
        let worker_source = source.clone();
        let worker_cancelled = Arc::clone(&cancelled);
        std::thread::Builder::new()
            .name(format!("image-load-{generation}"))
            .spawn(move || {
                let result = fetch_and_decode(fetcher.as_ref(), &worker_source, &worker_cancelled);
                if worker_cancelled.load(Ordering::SeqCst) {
                    debug!("Dropping result of superseded load {generation}");
                    return;
                }
                // The receiver is gone if the load was superseded meanwhile.
                let _ = sender.send(result);
            })?;

        info!("Loading image {} (load {generation})", source.display_name());
        self.pending = Some(PendingLoad {
            generation,
            source,
            deadline: now + self.timeout,
            cancelled,
            receiver,
        });
        Ok(generation)
    }

    /// Invalidates the in-flight load, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("Cancelling load {} of {}", pending.generation, pending.source.display_name());
            pending.cancel();
        }
    }

    pub fn poll(&mut self) -> LoadPoll {
        self.poll_at(Instant::now())
    }

    /// Non-blocking check of the in-flight load against the clock `now`.
    pub fn poll_at(&mut self, now: Instant) -> LoadPoll {
        let Some(pending) = self.pending.as_mut() else {
            return LoadPoll::Idle;
        };

        let outcome = match pending.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) if now >= pending.deadline => Some(Err(ImageLoadError::Timeout { after: self.timeout })),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(ImageLoadError::Cancelled)),
        };

        let Some(result) = outcome else {
            return LoadPoll::Pending;
        };

        let Some(pending) = self.pending.take() else {
            return LoadPoll::Idle;
        };
        pending.cancel();
        match result {
            Ok(image) => LoadPoll::Ready(LoadedImage {
                source: pending.source,
                image,
            }),
            Err(error) => {
                warn!("Load {} of {} failed: {error}", pending.generation, pending.source.display_name());
                LoadPoll::Failed {
                    source: pending.source,
                    error,
                }
            }
        }
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn fetch_and_decode(
    fetcher: &dyn ImageFetcher,
    source: &ImageSource,
    cancelled: &AtomicBool,
) -> Result<RgbaImage, ImageLoadError> {
    let bytes = fetcher.fetch(source)?;
    if cancelled.load(Ordering::SeqCst) {
        return Err(ImageLoadError::Cancelled);
    }
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_strips_directories_queries_and_extensions() {
        assert_eq!(ImageSource::Path("/tmp/claims/roof.jpg".into()).file_stem(), "roof");
        assert_eq!(
            ImageSource::Url("https://cdn.example.com/a/b/kitchen.png?sig=1".into()).file_stem(),
            "kitchen"
        );
        assert_eq!(ImageSource::from_bytes("", Vec::<u8>::new()).file_stem(), "image");
        assert_eq!(ImageSource::from_bytes(".hidden", Vec::<u8>::new()).file_stem(), ".hidden");
    }

    #[test]
    fn parse_distinguishes_urls_from_paths() {
        assert_eq!(
            ImageSource::parse("file:///tmp/a.png"),
            ImageSource::Url("file:///tmp/a.png".into())
        );
        assert_eq!(ImageSource::parse("shots/a.png"), ImageSource::Path("shots/a.png".into()));
    }

    #[test]
    fn remote_urls_need_a_host_fetcher() {
        let err = LocalFetcher
            .fetch(&ImageSource::Url("https://example.com/x.png".into()))
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::Unsupported(_)));
    }
}

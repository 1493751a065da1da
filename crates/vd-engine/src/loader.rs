//! Single-flight, lazily initialised access to the transcoding engine.
//!
//! [`EngineLoader`] is an explicit cell with three live states:
//!
//! - `Unloaded` — nothing has asked for the engine yet.
//! - `Loading` — one shared load future exists; every caller awaits it.
//! - `Ready` — the handle is cached for the lifetime of the loader.
//!
//! A failed load parks the cell in `Failed`. Nothing retries on its own;
//! the host calls [`EngineLoader::reload`] to start a fresh attempt.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use vd_core::config::EngineConfig;
use vd_core::events::{EventBus, EventPayload};
use vd_core::{Error, Result};

use crate::engine::{EngineHandle, FfmpegEngine, TranscodeEngine};

type LoadOutcome = std::result::Result<EngineHandle, String>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;
type Factory = Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn TranscodeEngine>>> + Send + Sync>;

static GLOBAL: OnceLock<EngineLoader> = OnceLock::new();

enum LoadState {
    Unloaded,
    Loading(SharedLoad),
    Ready(EngineHandle),
    Failed(String),
}

/// Observable summary of the loader's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderStatus {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

struct LoaderInner {
    factory: Factory,
    state: Mutex<LoadState>,
    loads_started: AtomicUsize,
    events: OnceLock<Arc<EventBus>>,
}

impl LoaderInner {
    fn publish(&self, payload: EventPayload) {
        if let Some(bus) = self.events.get() {
            bus.publish(payload);
        }
    }

    fn settle(&self, outcome: &LoadOutcome) {
        let mut state = self.state.lock();
        match outcome {
            Ok(handle) => {
                tracing::info!("Transcoding engine ready: {}", handle.name());
                *state = LoadState::Ready(handle.clone());
                drop(state);
                self.publish(EventPayload::EngineReady {
                    engine: handle.name().to_string(),
                });
            }
            Err(message) => {
                tracing::error!("Transcoding engine failed to load: {message}");
                *state = LoadState::Failed(message.clone());
                drop(state);
                self.publish(EventPayload::EngineLoadFailed {
                    error: message.clone(),
                });
            }
        }
    }
}

/// Process-scoped owner of the one [`EngineHandle`].
///
/// Cloning the loader shares the same cell.
#[derive(Clone)]
pub struct EngineLoader {
    inner: Arc<LoaderInner>,
}

impl EngineLoader {
    /// Create a loader around an async engine factory. The factory runs at
    /// most once per successful load.
    pub fn new<F, Fut, E>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<E>> + Send + 'static,
        E: TranscodeEngine + 'static,
    {
        let factory: Factory = Arc::new(move || {
            let pending = factory();
            async move {
                let engine = pending.await?;
                Ok(Arc::new(engine) as Arc<dyn TranscodeEngine>)
            }
            .boxed()
        });

        Self {
            inner: Arc::new(LoaderInner {
                factory,
                state: Mutex::new(LoadState::Unloaded),
                loads_started: AtomicUsize::new(0),
                events: OnceLock::new(),
            }),
        }
    }

    /// A loader that discovers and starts ffmpeg.
    pub fn ffmpeg(config: EngineConfig) -> Self {
        Self::new(move || {
            let config = config.clone();
            async move { FfmpegEngine::load(&config).await }
        })
    }

    /// The process-wide ffmpeg loader. `config` is only consulted by the
    /// first call.
    pub fn global(config: &EngineConfig) -> EngineLoader {
        GLOBAL
            .get_or_init(|| EngineLoader::ffmpeg(config.clone()))
            .clone()
    }

    /// Publish load lifecycle events on `bus`. Only the first bus sticks.
    pub fn attach_events(&self, bus: Arc<EventBus>) {
        let _ = self.inner.events.set(bus);
    }

    /// Resolve the shared engine handle, starting the load if nobody has.
    ///
    /// Concurrent callers await the same in-flight load. After a failure
    /// this returns [`Error::EngineLoad`] immediately until [`reload`] is
    /// called.
    ///
    /// [`reload`]: EngineLoader::reload
    pub async fn acquire(&self) -> Result<EngineHandle> {
        let pending = {
            let mut state = self.inner.state.lock();
            match &*state {
                LoadState::Ready(handle) => return Ok(handle.clone()),
                LoadState::Failed(message) => return Err(Error::EngineLoad(message.clone())),
                LoadState::Loading(pending) => pending.clone(),
                LoadState::Unloaded => {
                    let pending = self.start_load();
                    *state = LoadState::Loading(pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(Error::EngineLoad)
    }

    /// Clear a failed load and try again. A loader that is loading or
    /// ready is left alone and simply awaited.
    pub async fn reload(&self) -> Result<EngineHandle> {
        {
            let mut state = self.inner.state.lock();
            if let LoadState::Failed(_) = *state {
                tracing::info!("Retrying transcoding engine load");
                *state = LoadState::Unloaded;
            }
        }
        self.acquire().await
    }

    /// Start loading in the background once the runtime is otherwise idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_idle_load(&self) -> tokio::task::JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            if let Err(e) = loader.acquire().await {
                tracing::warn!("Background engine load failed: {e}");
            }
        })
    }

    /// The handle if loading has finished, without waiting.
    pub fn handle(&self) -> Option<EngineHandle> {
        match &*self.inner.state.lock() {
            LoadState::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == LoaderStatus::Ready
    }

    pub fn status(&self) -> LoaderStatus {
        match &*self.inner.state.lock() {
            LoadState::Unloaded => LoaderStatus::Unloaded,
            LoadState::Loading(_) => LoaderStatus::Loading,
            LoadState::Ready(_) => LoaderStatus::Ready,
            LoadState::Failed(_) => LoaderStatus::Failed,
        }
    }

    /// Message of the last failed load, until a reload starts.
    pub fn load_error(&self) -> Option<String> {
        match &*self.inner.state.lock() {
            LoadState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// How many times the factory has been invoked.
    pub fn loads_started(&self) -> usize {
        self.inner.loads_started.load(Ordering::SeqCst)
    }

    /// Whether two loaders share one cell.
    pub fn ptr_eq(&self, other: &EngineLoader) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn start_load(&self) -> SharedLoad {
        self.inner.loads_started.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(EventPayload::EngineLoadStarted);
        tracing::info!("Loading transcoding engine");

        let factory = Arc::clone(&self.inner.factory);
        let cell: Weak<LoaderInner> = Arc::downgrade(&self.inner);
        async move {
            let outcome: LoadOutcome = factory()
                .await
                .map(EngineHandle::new)
                .map_err(|e| e.to_string());
            if let Some(inner) = cell.upgrade() {
                inner.settle(&outcome);
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for EngineLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLoader")
            .field("status", &self.status())
            .field("loads_started", &self.loads_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::TranscodeCommand;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Notify;

    struct NullEngine;

    #[async_trait]
    impl TranscodeEngine for NullEngine {
        fn name(&self) -> &str {
            "null"
        }
        async fn write_file(&self, _name: &str, _data: Bytes) -> Result<()> {
            Ok(())
        }
        async fn exec(&self, _command: &TranscodeCommand) -> Result<()> {
            Ok(())
        }
        async fn read_file(&self, _name: &str) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn gated_loader(gate: Arc<Notify>) -> EngineLoader {
        EngineLoader::new(move || {
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok(NullEngine)
            }
        })
    }

    /// Fails on the first `failures` calls, then succeeds.
    fn flaky_loader(failures: usize) -> EngineLoader {
        let calls = Arc::new(AtomicUsize::new(0));
        EngineLoader::new(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < failures {
                    Err(Error::tool("ffmpeg", "not found"))
                } else {
                    Ok(NullEngine)
                }
            }
        })
    }

    #[tokio::test]
    async fn starts_unloaded_and_lazy() {
        let loader = flaky_loader(0);
        assert_eq!(loader.status(), LoaderStatus::Unloaded);
        assert!(loader.handle().is_none());
        assert_eq!(loader.loads_started(), 0);
    }

    #[tokio::test]
    async fn concurrent_acquire_shares_one_load() {
        let gate = Arc::new(Notify::new());
        let loader = gated_loader(gate.clone());

        let first = loader.acquire();
        let second = loader.acquire();
        tokio::pin!(first, second);

        assert!(futures::poll!(&mut first).is_pending());
        assert!(futures::poll!(&mut second).is_pending());
        assert_eq!(loader.status(), LoaderStatus::Loading);
        assert!(loader.handle().is_none());

        gate.notify_one();
        let a = first.await.unwrap();
        let b = second.await.unwrap();

        assert!(a.ptr_eq(&b));
        assert_eq!(loader.loads_started(), 1);
        assert_eq!(loader.status(), LoaderStatus::Ready);
    }

    #[tokio::test]
    async fn ready_handle_is_cached() {
        let loader = flaky_loader(0);
        let a = loader.acquire().await.unwrap();
        let b = loader.acquire().await.unwrap();
        assert!(a.ptr_eq(&b));
        assert!(loader.handle().unwrap().ptr_eq(&a));
        assert_eq!(loader.loads_started(), 1);
    }

    #[tokio::test]
    async fn failure_is_sticky_until_reload() {
        let loader = flaky_loader(1);

        assert_matches!(loader.acquire().await, Err(Error::EngineLoad(m)) if m.contains("not found"));
        assert_eq!(loader.status(), LoaderStatus::Failed);
        assert_matches!(loader.load_error(), Some(m) if m.contains("not found"));

        assert_matches!(loader.acquire().await, Err(Error::EngineLoad(_)));
        assert_eq!(loader.loads_started(), 1);

        let handle = loader.reload().await.unwrap();
        assert_eq!(loader.loads_started(), 2);
        assert!(loader.load_error().is_none());
        assert!(loader.handle().unwrap().ptr_eq(&handle));
    }

    #[tokio::test]
    async fn reload_when_ready_does_not_load_again() {
        let loader = flaky_loader(0);
        let a = loader.acquire().await.unwrap();
        let b = loader.reload().await.unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(loader.loads_started(), 1);
    }

    #[tokio::test]
    async fn idle_load_runs_in_background() {
        let loader = flaky_loader(0);
        loader.spawn_idle_load().await.unwrap();
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn idle_load_failure_is_logged_not_raised() {
        let loader = flaky_loader(1);
        loader.spawn_idle_load().await.unwrap();
        assert_eq!(loader.status(), LoaderStatus::Failed);
    }

    #[tokio::test]
    async fn clones_share_the_cell() {
        let loader = flaky_loader(0);
        let other = loader.clone();
        loader.acquire().await.unwrap();
        assert!(other.is_ready());
        assert!(loader.ptr_eq(&other));
    }

    #[tokio::test]
    async fn lifecycle_events_published() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let loader = flaky_loader(0);
        loader.attach_events(bus);

        loader.acquire().await.unwrap();

        assert_eq!(rx.try_recv().unwrap().payload, EventPayload::EngineLoadStarted);
        assert_eq!(
            rx.try_recv().unwrap().payload,
            EventPayload::EngineReady {
                engine: "null".into()
            }
        );
    }

    #[test]
    fn global_loader_is_process_wide() {
        let a = EngineLoader::global(&EngineConfig::default());
        let b = EngineLoader::global(&EngineConfig::default());
        assert!(a.ptr_eq(&b));
    }
}

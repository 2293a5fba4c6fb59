//! Compiler engine handle
//!
//! The engine is loaded lazily, at most once per [`CompilerContext`]. All
//! callers that race on a load await the same attempt and see its outcome,
//! success or failure. A failed or timed-out load leaves the context empty
//! so the next call tries again.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use synth_core::config::CompilerSettings;
use synth_core::{Error, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Something that accepts a standard JSON input and returns standard JSON output
#[async_trait]
pub trait CompilerEngine: Send + Sync {
    /// Version string reported by the engine
    async fn version(&self) -> Result<String>;

    /// Compile a standard JSON input document
    async fn compile(&self, input: &str) -> Result<String>;
}

/// Produces a ready engine
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn CompilerEngine>>;
}

/// `solc` binary driven through `--standard-json`
#[derive(Debug, Clone)]
pub struct SolcProcess {
    path: PathBuf,
    version: String,
}

impl SolcProcess {
    pub fn new(path: PathBuf, version: String) -> Self {
        Self { path, version }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl CompilerEngine for SolcProcess {
    async fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn compile(&self, input: &str) -> Result<String> {
        let mut child = Command::new(&self.path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Io(format!("Failed to spawn {}: {}", self.path.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| Error::Io(format!("Failed to write compiler input: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Io(format!("Failed to read compiler output: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Io(format!(
                "Compiler exited with {} and no output: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

/// Locates `solc` and checks that it runs
#[derive(Debug, Clone, Default)]
pub struct SolcLoader {
    path: Option<PathBuf>,
}

impl SolcLoader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn binary(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("solc"))
    }
}

/// Pull the version out of `solc --version` output
fn parse_version(stdout: &str) -> String {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Version:"))
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| stdout.trim().to_string())
}

#[async_trait]
impl EngineLoader for SolcLoader {
    async fn load(&self) -> Result<Arc<dyn CompilerEngine>> {
        let binary = self.binary();
        debug!(path = %binary.display(), "Checking solc");

        let output = Command::new(&binary)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::engine(format!("Failed to run {}: {}", binary.display(), e)))?;

        if !output.status.success() {
            return Err(Error::engine(format!(
                "{} --version exited with {}",
                binary.display(),
                output.status
            )));
        }

        let version = parse_version(&String::from_utf8_lossy(&output.stdout));
        info!(path = %binary.display(), version = %version, "Loaded solc");

        Ok(Arc::new(SolcProcess::new(binary, version)))
    }
}

/// Outcome of one load attempt, shared by every caller waiting on it
type LoadOutcome = std::result::Result<Arc<dyn CompilerEngine>, String>;
type PendingLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// Bound on a single load when none is configured
const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

enum EngineState {
    Empty,
    Loading(PendingLoad),
    Ready(Arc<dyn CompilerEngine>),
}

/// Shared, lazily-initialized compiler engine
pub struct CompilerContext {
    loader: Arc<dyn EngineLoader>,
    load_timeout: Duration,
    state: Mutex<EngineState>,
}

impl CompilerContext {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            state: Mutex::new(EngineState::Empty),
        }
    }

    /// Context that loads `solc` from the configured path
    pub fn from_settings(settings: &CompilerSettings) -> Self {
        Self::new(Arc::new(SolcLoader::new(settings.solc_path.clone())))
            .with_load_timeout(Duration::from_secs(settings.timeout_secs))
    }

    /// Context around an engine that is already loaded
    pub fn with_engine(engine: Arc<dyn CompilerEngine>) -> Self {
        Self {
            loader: Arc::new(PreloadedEngine(engine.clone())),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            state: Mutex::new(EngineState::Ready(engine)),
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }

    /// The engine, loading it on first use
    pub async fn engine(&self) -> Result<Arc<dyn CompilerEngine>> {
        let pending = {
            let mut state = self.lock_state();
            match &*state {
                EngineState::Ready(engine) => return Ok(engine.clone()),
                EngineState::Loading(pending) => pending.clone(),
                EngineState::Empty => {
                    let pending = self.start_load();
                    *state = EngineState::Loading(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.clone().await;

        {
            let mut state = self.lock_state();
            let settles_this_attempt = matches!(&*state, EngineState::Loading(current) if current.ptr_eq(&pending));
            if settles_this_attempt {
                *state = match &outcome {
                    Ok(engine) => EngineState::Ready(engine.clone()),
                    Err(_) => EngineState::Empty,
                };
            }
        }

        outcome.map_err(|reason| {
            warn!(error = %reason, "Compiler engine failed to load");
            Error::EngineUnavailable(reason)
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.lock_state(), EngineState::Ready(_))
    }

    /// Load the engine now instead of on first compile
    pub async fn preload(&self) -> Result<()> {
        self.engine().await.map(|_| ())
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_load(&self) -> PendingLoad {
        let loader = self.loader.clone();
        let window = self.load_timeout;

        async move {
            match tokio::time::timeout(window, loader.load()).await {
                Ok(Ok(engine)) => Ok(engine),
                Ok(Err(Error::EngineUnavailable(reason))) => Err(reason),
                Ok(Err(other)) => Err(other.to_string()),
                Err(_) => Err(format!("compiler did not load within {}s", window.as_secs())),
            }
        }
        .boxed()
        .shared()
    }
}

struct PreloadedEngine(Arc<dyn CompilerEngine>);

#[async_trait]
impl EngineLoader for PreloadedEngine {
    async fn load(&self) -> Result<Arc<dyn CompilerEngine>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubEngine;

    #[async_trait]
    impl CompilerEngine for StubEngine {
        async fn version(&self) -> Result<String> {
            Ok("0.8.24".to_string())
        }

        async fn compile(&self, _input: &str) -> Result<String> {
            Ok("{}".to_string())
        }
    }

    /// Loader that fails its first `failures` attempts
    struct CountingLoader {
        attempts: AtomicUsize,
        failures: usize,
    }

    impl CountingLoader {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                attempts: AtomicUsize::new(0),
                failures,
            })
        }
    }

    #[async_trait]
    impl EngineLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn CompilerEngine>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if attempt < self.failures {
                Err(Error::Io("binary missing".to_string()))
            } else {
                Ok(Arc::new(StubEngine))
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let loader = CountingLoader::new(0);
        let context = Arc::new(CompilerContext::new(loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let context = context.clone();
                tokio::spawn(async move { context.engine().await.map(|_| ()) })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
        assert!(context.is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_failed_load() {
        let loader = CountingLoader::new(usize::MAX);
        let context = Arc::new(CompilerContext::new(loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let context = context.clone();
                tokio::spawn(async move { context.engine().await.map(|_| ()) })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(matches!(result, Err(Error::EngineUnavailable(ref reason)) if reason.contains("binary missing")));
        }

        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
        assert!(!context.is_ready());

        // the failed attempt is not cached
        assert!(context.engine().await.is_err());
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 2);
    }

    /// Loader whose load never finishes
    struct HangingLoader;

    #[async_trait]
    impl EngineLoader for HangingLoader {
        async fn load(&self) -> Result<Arc<dyn CompilerEngine>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_load_times_out() {
        let context = CompilerContext::new(Arc::new(HangingLoader)).with_load_timeout(Duration::from_secs(2));

        let result = context.engine().await;
        assert!(matches!(result, Err(Error::EngineUnavailable(ref reason)) if reason.contains("within 2s")));
        assert!(!context.is_ready());
    }

    #[test]
    fn test_from_settings_bounds_load_by_compile_timeout() {
        let settings = CompilerSettings {
            timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(CompilerContext::from_settings(&settings).load_timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_on_next_call() {
        let loader = CountingLoader::new(1);
        let context = CompilerContext::new(loader.clone());

        let first = context.engine().await;
        assert!(matches!(first, Err(Error::EngineUnavailable(_))));
        assert!(first.err().unwrap().is_retryable());
        assert!(!context.is_ready());

        context.preload().await.unwrap();
        assert!(context.is_ready());
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 2);

        // loaded engines are reused
        let engine = context.engine().await.unwrap();
        assert_eq!(engine.version().await.unwrap(), "0.8.24");
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_engine_is_ready_immediately() {
        let context = CompilerContext::with_engine(Arc::new(StubEngine));
        assert!(context.is_ready());
        assert!(context.engine().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_unavailable() {
        let loader = SolcLoader::new(Some(PathBuf::from("/nonexistent/solc-binary")));
        let context = CompilerContext::new(Arc::new(loader));

        assert!(matches!(context.engine().await, Err(Error::EngineUnavailable(_))));
    }

    #[test]
    fn test_parse_version() {
        let stdout = "solc, the solidity compiler commandline interface\nVersion: 0.8.24+commit.e11b9ed9.Linux.g++\n";
        assert_eq!(parse_version(stdout), "0.8.24+commit.e11b9ed9.Linux.g++");
        assert_eq!(parse_version("0.8.20\n"), "0.8.20");
    }
}

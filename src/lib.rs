pub mod agent_core;
pub mod commands;
pub mod config;
pub mod inference;
pub mod storage;
pub mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use agent_core::{resolve_project, ClientState};
use config::{expand_tilde, AppConfig, LoggingConfig, StorageBackend};
use inference::InferenceClient;
use storage::{Project, RestStore, SqliteStore, WorkspaceStore};

/// Return the platform-standard data directory for WindCode.
///
/// - macOS: `~/Library/Application Support/windcode/`
/// - Windows: `{FOLDERID_RoamingAppData}\windcode\`
/// - Linux: `$XDG_DATA_HOME/windcode/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.windcode/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("windcode");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".windcode")
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Initialize the tracing subscriber: writes structured logs to the data directory.
///
/// On each startup:
/// 1. Rotates existing logs (windcode.log → .1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh windcode.log with a line-flushing writer.
/// 3. Logs a startup banner with the data directory path.
///
/// Logs go to the file only; the terminal belongs to the REPL.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> std::io::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("windcode.log");

    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let writer = FlushingWriter::new(log_file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("windcode=debug,warn")
        } else {
            EnvFilter::new(&config.filter)
        }
    });

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(std::io::Error::other)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== WindCode starting ==="
    );

    Ok(log_path)
}

/// Rotate log files: `windcode.log` → `windcode.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Application Context ────────────────────────────────────────────────────

/// Everything a command needs: config, store, model client and the open project.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn WorkspaceStore>,
    pub inference: Arc<InferenceClient>,
    pub project: Project,
}

impl AppContext {
    /// Open the store, build the inference client and resolve the project.
    ///
    /// Project id precedence: `project_override`, then `workspace.project_id`,
    /// then the id cached in `state.json`. A newly created project is cached.
    pub async fn bootstrap(config: AppConfig, project_override: Option<String>) -> anyhow::Result<Self> {
        let store = open_store(&config)?;
        let inference = Arc::new(
            InferenceClient::from_config(&config.inference)
                .context("failed to build inference client")?,
        );

        let state_path = ClientState::default_path();
        let mut state = ClientState::load_or_default(&state_path);
        let preferred = project_override
            .or_else(|| config.workspace.project_id.clone())
            .or_else(|| state.project_id.clone());

        let (project, created) = resolve_project(store.as_ref(), preferred.as_deref())
            .await
            .context("failed to open project")?;

        if created || state.project_id.as_deref() != Some(project.id.as_str()) {
            state.project_id = Some(project.id.clone());
            if let Err(e) = state.save(&state_path) {
                tracing::warn!(error = %e, path = %state_path.display(), "failed to cache project id");
            }
        }

        Ok(Self {
            config,
            store,
            inference,
            project,
        })
    }
}

/// Open the configured persistence backend.
pub fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn WorkspaceStore>> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = match &config.storage.sqlite_path {
                Some(p) => expand_tilde(p),
                None => {
                    let dir = data_dir();
                    std::fs::create_dir_all(&dir)
                        .with_context(|| format!("failed to create {}", dir.display()))?;
                    dir.join("windcode.db").to_string_lossy().into_owned()
                }
            };
            let store = SqliteStore::open(&path)
                .with_context(|| format!("failed to open database at {path}"))?;
            tracing::info!(db_path = %path, "sqlite store opened");
            Ok(Arc::new(store))
        }
        StorageBackend::Rest => {
            let url = config
                .storage
                .rest_url()
                .context("storage.rest_url is required for the rest backend")?;
            let key = config
                .storage
                .rest_anon_key()
                .context("storage.rest_anon_key is required for the rest backend")?;
            let store = RestStore::new(url, key)?;
            tracing::info!(url = %url, "rest store configured");
            Ok(Arc::new(store))
        }
    }
}

use radioinfo_core::{
    local_now, CoreError, LoggingConfig, RadioInfoConfig, RefreshConfig, RefreshController,
    ScheduleRefresher, ScheduleStore, StoreEvent,
};
use radioinfo_sr::{SrProviderConfig, SrRadioProvider, SR_CONFIG_TEMPLATE};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Tracing must be up before the config is validated, so peek at [logging] first
    init_tracing(requested_log_file());

    // Load config or create template on first run
    let provider_templates: &[&str] = &[SR_CONFIG_TEMPLATE];
    let config = match RadioInfoConfig::load_or_create(Some(provider_templates)) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a config template at {}. Review it and start radioinfo again.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let sr_config = match SrProviderConfig::from_providers(&config.providers) {
        Ok(Some(sr_config)) => sr_config,
        Ok(None) => {
            info!("No [providers.sr] section, using defaults");
            SrProviderConfig::default()
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let provider = match SrRadioProvider::new(&sr_config, Some(cancel_token.clone())) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("Failed to create Sveriges Radio provider: {e}");
            std::process::exit(1);
        }
    };
    info!("Using schedule provider at {}", sr_config.base_url);

    let controller = Arc::new(RefreshController::new(ScheduleStore::new(), provider));

    runtime.block_on(run(config.refresh, controller, cancel_token));
    info!("Shutdown complete");
}

/// Load channels, select the startup channel and keep schedules fresh until cancelled
async fn run(
    refresh: RefreshConfig,
    controller: Arc<RefreshController>,
    cancel_token: CancellationToken,
) {
    // Subscribe before the first fetch so no early event is missed
    let rx = controller.store().events();
    let events = tokio::spawn(log_store_events(
        Arc::clone(&controller),
        rx,
        cancel_token.clone(),
    ));

    let _observer = controller.add_model_observer(|| debug!("Schedule model changed"));

    if let Err(e) = controller.fetch_channels().await {
        error!("Failed to fetch channel list: {}", e);
        cancel_token.cancel();
        let _ = events.await;
        return;
    }
    info!("Loaded {} channels", controller.channels().len());

    if let Err(e) = controller.select_channel(refresh.initial_channel).await {
        warn!(
            "Failed to load schedule for channel {}: {}",
            refresh.initial_channel, e
        );
    }

    let refresher = Arc::new(ScheduleRefresher::new(
        Arc::clone(&controller),
        refresh.interval(),
        Some(cancel_token.clone()),
    ));
    let handle = refresher.start();

    cancel_token.cancelled().await;
    let _ = handle.await;
    let _ = events.await;
}

/// Log store events and what is airing on the selected channel.
///
/// Events already queued on `rx` are drained before cancellation is honoured.
/// Returns the number of events handled.
async fn log_store_events(
    controller: Arc<RefreshController>,
    mut rx: broadcast::Receiver<StoreEvent>,
    cancel_token: CancellationToken,
) -> usize {
    let mut handled = 0;

    loop {
        let event = tokio::select! {
            biased;
            event = rx.recv() => event,
            () = cancel_token.cancelled() => break,
        };

        match event {
            Ok(StoreEvent::ChannelsReplaced { channel_count }) => {
                handled += 1;
                debug!("Channel map replaced ({} channels)", channel_count);
                log_now_airing(&controller);
            }
            Ok(StoreEvent::SelectionChanged { channel_id }) => {
                handled += 1;
                info!("Selected channel {}", channel_id);
                log_now_airing(&controller);
            }
            Err(RecvError::Closed) => {
                info!("Store event channel closed");
                break;
            }
            Err(RecvError::Lagged(n)) => {
                info!("Missed {} store events", n);
            }
        }
    }

    debug!("Store event logger stopped after {} events", handled);
    handled
}

fn log_now_airing(controller: &RefreshController) {
    let channel_id = controller.store().selected_channel_id();
    let Some(channel) = controller.channel(channel_id) else {
        return;
    };

    let schedule = channel.schedule();
    if schedule.is_empty() {
        return;
    }

    match schedule.airing_at(local_now()) {
        Some(program) => info!(
            "Now on {}: {} ({} - {})",
            channel.name(),
            program.title,
            program.start_time.format("%H:%M"),
            program.end_time.format("%H:%M")
        ),
        None => info!(
            "Nothing airing on {} ({} programs cached)",
            channel.name(),
            schedule.len()
        ),
    }
}

/// Log file to write to, if `[logging] enabled = true` in the config file.
///
/// A missing or unparsable config means console-only logging; the real
/// config load reports the problem once tracing is up.
fn requested_log_file() -> Option<PathBuf> {
    #[derive(serde::Deserialize)]
    struct LoggingSection {
        #[serde(default)]
        logging: LoggingConfig,
    }

    let content = std::fs::read_to_string(RadioInfoConfig::config_path()).ok()?;
    let section: LoggingSection = toml::from_str(&content).ok()?;
    section.logging.enabled.then(radioinfo_core::log_file_path)
}

/// Install the console layer plus an appending file layer when `log_file` is set
fn init_tracing(log_file: Option<PathBuf>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));

    let mut file_error = None;
    let file_layer = log_file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false),
            ),
            Err(e) => {
                file_error = Some(e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        match file_error {
            Some(e) => warn!("Logging to console only, cannot open {}: {e}", path.display()),
            None => info!("Appending logs to {}", path.display()),
        }
    }
}

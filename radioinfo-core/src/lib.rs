pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod paths;
pub mod provider;
pub mod refresher;
pub mod schedule;
pub mod store;
pub mod time;

pub use channel::{Channel, ChannelId, ChannelMap};
pub use config::{
    build_config_template, LoggingConfig, ProvidersConfig, RadioInfoConfig, RefreshConfig,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use controller::RefreshController;
pub use error::{CoreError, ProviderError};
pub use observer::{Observer, ObserverHandle, ObserverRegistry};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use provider::{
    channel_map_from_listings, schedule_from_episodes, ChannelListing, ScheduleProvider,
    ScheduledEpisode,
};
pub use refresher::{ScheduleRefresher, DEFAULT_REFRESH_INTERVAL};
pub use schedule::{Program, Schedule, NO_ICON, WINDOW_FUTURE_HOURS, WINDOW_PAST_HOURS};
pub use store::{ScheduleStore, StoreEvent, DEFAULT_SELECTED_CHANNEL_ID};
pub use time::{local_now, naive_local_from_millis};

use crate::channel::{Channel, ChannelId, ChannelMap};
use crate::observer::{ObserverHandle, ObserverRegistry};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

/// Channel selected before anything else asks for one
pub const DEFAULT_SELECTED_CHANNEL_ID: ChannelId = 1;

/// Events emitted by the schedule store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The channel map was replaced
    ChannelsReplaced { channel_count: usize },
    /// A channel was selected
    SelectionChanged { channel_id: ChannelId },
}

/// Owner of the channel map and the selected channel id.
///
/// The map is swapped as a whole and handed out as immutable snapshots, so a
/// reader never sees a half-installed update. Map reads and swaps share one
/// short lock that is never held across I/O; the selection lives in its own
/// atomic and never waits on the map.
pub struct ScheduleStore {
    channels: Mutex<Arc<ChannelMap>>,
    selected_channel: AtomicU32,
    observers: ObserverRegistry,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl ScheduleStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a store pre-seeded with channels
    #[must_use]
    pub fn with_channels(channels: ChannelMap) -> Arc<Self> {
        let store = Self::default();
        *store.lock_channels() = Arc::new(channels);
        Arc::new(store)
    }

    /// Subscribe to store events
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    /// Register a callback fired synchronously after every mutation
    pub fn add_observer<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.register(Arc::new(observer))
    }

    /// Snapshot of the current channel map
    #[must_use]
    pub fn channels(&self) -> Arc<ChannelMap> {
        Arc::clone(&*self.lock_channels())
    }

    /// Look up one channel in the current map
    #[must_use]
    pub fn channel(&self, channel_id: ChannelId) -> Option<Channel> {
        self.lock_channels().get(&channel_id).cloned()
    }

    /// Replace the channel map and notify observers on the calling thread
    pub fn set_channels(&self, channels: ChannelMap) {
        let channel_count = channels.len();
        *self.lock_channels() = Arc::new(channels);
        debug!("Installed channel map with {} channels", channel_count);

        self.observers.notify();
        let _ = self
            .event_tx
            .send(StoreEvent::ChannelsReplaced { channel_count });
    }

    /// Currently selected channel id
    #[must_use]
    pub fn selected_channel_id(&self) -> ChannelId {
        self.selected_channel.load(Ordering::SeqCst)
    }

    /// Select a channel and notify observers.
    ///
    /// The id is not checked against the channel map.
    pub fn set_selected_channel_id(&self, channel_id: ChannelId) {
        self.selected_channel.store(channel_id, Ordering::SeqCst);
        debug!("Selected channel {}", channel_id);

        self.observers.notify();
        let _ = self
            .event_tx
            .send(StoreEvent::SelectionChanged { channel_id });
    }

    fn lock_channels(&self) -> std::sync::MutexGuard<'_, Arc<ChannelMap>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScheduleStore {
    fn default() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            channels: Mutex::new(Arc::new(ChannelMap::new())),
            selected_channel: AtomicU32::new(DEFAULT_SELECTED_CHANNEL_ID),
            observers: ObserverRegistry::new(),
            event_tx,
        }
    }
}

impl std::fmt::Debug for ScheduleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleStore")
            .field("channels", &self.lock_channels().len())
            .field("selected_channel", &self.selected_channel_id())
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

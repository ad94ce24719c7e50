//! Refresh orchestration between a [`ScheduleProvider`] and the [`ScheduleStore`].

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelId, ChannelMap};
use crate::error::{CoreError, Result};
use crate::observer::ObserverHandle;
use crate::provider::{channel_map_from_listings, schedule_from_episodes, ScheduleProvider};
use crate::schedule::{Program, Schedule};
use crate::store::ScheduleStore;

/// Proof that the caller holds the refresh lock
type RefreshGuard<'a> = MutexGuard<'a, ()>;

/// Fetches channels and schedules and installs them into the store.
///
/// Schedule refreshes (single channel, lazy on selection, or bulk) are
/// serialized by one refresh lock held across the provider round-trip and
/// the install. At most one of them is in flight at a time, and each shows
/// up to observers as a single map replacement. Provider failures abort
/// before anything is installed, leaving the store exactly as it was.
pub struct RefreshController {
    store: Arc<ScheduleStore>,
    provider: Arc<dyn ScheduleProvider>,
    refresh_lock: Mutex<()>,
}

impl RefreshController {
    /// Create a new refresh controller
    ///
    /// # Arguments
    /// * `store` - Store the controller installs refreshed data into
    /// * `provider` - Remote source of channel lists and schedules
    pub fn new(store: Arc<ScheduleStore>, provider: Arc<dyn ScheduleProvider>) -> Self {
        Self {
            store,
            provider,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The store this controller writes to
    #[must_use]
    pub const fn store(&self) -> &Arc<ScheduleStore> {
        &self.store
    }

    /// Fetch the channel list and install it with empty schedules.
    ///
    /// This replaces the whole map and does not take the refresh lock.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the channel list cannot be fetched; the
    /// store is left untouched.
    pub async fn fetch_channels(&self) -> Result<()> {
        info!("Fetching channel list from {}", self.provider.name());

        let listings = self.provider.list_channels().await.map_err(|e| {
            warn!("Provider {} failed to list channels: {}", self.provider.name(), e);
            CoreError::from(e)
        })?;

        let channels = channel_map_from_listings(listings);
        info!("Fetched {} channels", channels.len());
        self.store.set_channels(channels);
        Ok(())
    }

    /// Select a channel, fetching its schedule if it has none yet.
    ///
    /// A channel holding any programs is not refetched here, even if they are
    /// stale. Unknown ids are selected without fetching anything.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the lazy fetch fails. The selection
    /// still changes.
    pub async fn select_channel(&self, channel_id: ChannelId) -> Result<()> {
        self.store.set_selected_channel_id(channel_id);

        if !self.schedule_is_empty(channel_id) {
            return Ok(());
        }

        let guard = self.refresh_lock.lock().await;
        if !self.schedule_is_empty(channel_id) {
            debug!(
                "Schedule for channel {} was filled while waiting for the refresh lock",
                channel_id
            );
            return Ok(());
        }
        self.refresh_channel(&guard, channel_id).await
    }

    /// Fetch and install the schedule of one channel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownChannel`] if the channel is not in the
    /// store, or the provider error if the fetch fails. Either way the store
    /// is unchanged.
    pub async fn fetch_schedule(&self, channel_id: ChannelId) -> Result<()> {
        let guard = self.refresh_lock.lock().await;
        self.refresh_channel(&guard, channel_id).await
    }

    /// Refetch every non-empty schedule and install the result in one update.
    ///
    /// Channels with empty schedules are carried over as they are.
    ///
    /// # Errors
    ///
    /// Returns the first provider error. Nothing is installed in that case,
    /// including schedules that were fetched successfully before it.
    pub async fn update_cached_schedules(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.channels();
        let mut channels = ChannelMap::with_capacity(current.len());
        let mut refreshed = 0_usize;

        for (&channel_id, channel) in current.iter() {
            if channel.has_empty_schedule() {
                channels.insert(channel_id, channel.clone());
                continue;
            }

            let schedule = self.fetch_remote_schedule(channel_id).await?;
            channels.insert(channel_id, channel.with_schedule(schedule));
            refreshed += 1;
        }

        self.store.set_channels(channels);
        info!(
            "Refreshed {} cached schedules ({} channels total)",
            refreshed,
            current.len()
        );
        Ok(())
    }

    /// Snapshot of all channels
    #[must_use]
    pub fn channels(&self) -> Arc<ChannelMap> {
        self.store.channels()
    }

    /// Get one channel
    #[must_use]
    pub fn channel(&self, channel_id: ChannelId) -> Option<Channel> {
        self.store.channel(channel_id)
    }

    /// Get the schedule of one channel
    #[must_use]
    pub fn schedule(&self, channel_id: ChannelId) -> Option<Arc<Schedule>> {
        self.store.channel(channel_id).map(|channel| channel.schedule())
    }

    /// Programs of the currently selected channel, if that channel is known
    #[must_use]
    pub fn selected_channel_schedule(&self) -> Option<Vec<Program>> {
        self.schedule(self.store.selected_channel_id())
            .map(|schedule| schedule.programs())
    }

    /// Check if a known channel has an empty schedule.
    ///
    /// Unknown ids report `false`, so selecting them never triggers a fetch.
    #[must_use]
    pub fn schedule_is_empty(&self, channel_id: ChannelId) -> bool {
        self.store
            .channel(channel_id)
            .is_some_and(|channel| channel.has_empty_schedule())
    }

    /// Register an observer on the underlying store
    pub fn add_model_observer<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.add_observer(observer)
    }

    async fn refresh_channel(
        &self,
        _guard: &RefreshGuard<'_>,
        channel_id: ChannelId,
    ) -> Result<()> {
        if self.store.channel(channel_id).is_none() {
            return Err(CoreError::UnknownChannel { channel_id });
        }

        let schedule = self.fetch_remote_schedule(channel_id).await?;
        let programs = schedule.len();

        let mut channels = (*self.store.channels()).clone();
        let Some(entry) = channels.get_mut(&channel_id) else {
            // The channel list was replaced while the schedule was in flight
            warn!(
                "Channel {} is no longer listed, dropping its fetched schedule",
                channel_id
            );
            return Ok(());
        };
        *entry = entry.with_schedule(schedule);

        self.store.set_channels(channels);
        info!(
            "Installed schedule for channel {} ({} programs)",
            channel_id, programs
        );
        Ok(())
    }

    async fn fetch_remote_schedule(&self, channel_id: ChannelId) -> Result<Schedule> {
        debug!(
            "Fetching schedule for channel {} from {}",
            channel_id,
            self.provider.name()
        );

        let episodes = self.provider.schedule(channel_id).await.map_err(|e| {
            warn!(
                "Provider {} failed to fetch schedule for channel {}: {}",
                self.provider.name(),
                channel_id,
                e
            );
            CoreError::from(e)
        })?;

        Ok(schedule_from_episodes(episodes))
    }
}

impl std::fmt::Debug for RefreshController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshController")
            .field("store", &self.store)
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

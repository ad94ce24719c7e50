use crate::channel::{Channel, ChannelId, ChannelMap};
use crate::error::ProviderError;
use crate::schedule::{Program, Schedule};
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// A channel as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelListing {
    pub id: ChannelId,
    pub name: String,
}

impl ChannelListing {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One raw schedule entry as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEpisode {
    /// Provider-assigned episode id
    pub episode_id: i64,
    pub title: String,
    pub description: String,
    /// Naive local start time
    pub start_time: NaiveDateTime,
    /// Naive local end time
    pub end_time: NaiveDateTime,
    /// Image URL, if the provider has one
    pub icon: Option<String>,
}

impl ScheduledEpisode {
    /// Convert into a [`Program`], substituting the no-icon sentinel when needed
    #[must_use]
    pub fn into_program(self) -> Program {
        Program::new(
            self.episode_id,
            self.title,
            self.description,
            self.start_time,
            self.end_time,
            self.icon,
        )
    }
}

/// Build a channel map with empty schedules, keeping the listing order.
///
/// A later duplicate id replaces the earlier entry's name but keeps its
/// position.
#[must_use]
pub fn channel_map_from_listings(listings: impl IntoIterator<Item = ChannelListing>) -> ChannelMap {
    listings
        .into_iter()
        .map(|listing| (listing.id, Channel::unscheduled(listing.id, listing.name)))
        .collect()
}

/// Build a schedule from raw episodes, applying the acceptance window
#[must_use]
pub fn schedule_from_episodes(episodes: impl IntoIterator<Item = ScheduledEpisode>) -> Schedule {
    Schedule::from_programs(episodes.into_iter().map(ScheduledEpisode::into_program))
}

/// Trait for remote schedule providers
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Fetch the full channel list
    async fn list_channels(&self) -> Result<Vec<ChannelListing>, ProviderError>;

    /// Fetch the combined schedule entries for one channel
    async fn schedule(&self, channel_id: ChannelId) -> Result<Vec<ScheduledEpisode>, ProviderError>;
}

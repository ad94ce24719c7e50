//! Sveriges Radio (<https://api.sr.se>) schedule provider.

pub mod config;

pub use config::{SrProviderConfig, CONFIG_TEMPLATE as SR_CONFIG_TEMPLATE, PROVIDER_NAME};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use radioinfo_core::{
    local_now, naive_local_from_millis, ChannelId, ChannelListing, CoreError, ProviderError,
    ScheduleProvider, ScheduledEpisode,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Sveriges Radio schedule provider
pub struct SrRadioProvider {
    client: ClientWithMiddleware,
    base_url: Url,
    cancel_token: CancellationToken,
}

impl SrRadioProvider {
    /// Create a provider from its config section.
    ///
    /// In-flight requests fail with [`ProviderError::Interrupted`] once
    /// `cancel_token` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created.
    pub fn new(
        config: &SrProviderConfig,
        cancel_token: Option<CancellationToken>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let base_url = parse_base_url(&config.base_url)?;

        // Base client with timeout
        let base_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("RadioInfo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::IoFailure {
                reason: e.to_string(),
            })?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url,
            cancel_token: cancel_token.unwrap_or_default(),
        })
    }

    /// Create a provider against the public API with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, CoreError> {
        Self::new(&SrProviderConfig::default(), None)
    }

    /// Fetch the schedule for the day before, the day of and the day after `day`.
    ///
    /// Entries are concatenated in that order.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the three requests.
    pub async fn schedule_around(
        &self,
        channel_id: ChannelId,
        day: NaiveDate,
    ) -> Result<Vec<ScheduledEpisode>, ProviderError> {
        let yesterday = self.fetch_day(channel_id, day - TimeDelta::days(1)).await?;
        let today = self.fetch_day(channel_id, day).await?;
        let tomorrow = self.fetch_day(channel_id, day + TimeDelta::days(1)).await?;

        let episodes: Vec<_> = yesterday
            .into_iter()
            .chain(today)
            .chain(tomorrow)
            .filter_map(|entry| entry.into_episode(channel_id))
            .collect();

        debug!(
            "SR returned {} scheduled episodes for channel {}",
            episodes.len(),
            channel_id
        );
        Ok(episodes)
    }

    async fn fetch_day(
        &self,
        channel_id: ChannelId,
        date: NaiveDate,
    ) -> Result<Vec<SrScheduleEntry>, ProviderError> {
        let mut url = self.endpoint("scheduledepisodes")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("channelid", &channel_id.to_string());
            query.append_pair("format", "json");
            query.append_pair("pagination", "false");
            query.append_pair("date", &date.format("%Y-%m-%d").to_string());
        }

        let response: SrScheduleResponse = self.get_json(url).await?;
        Ok(response.schedule)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::MalformedAddress {
                reason: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        debug!("SR GET: {}", url);

        let response = tokio::select! {
            biased;
            () = self.cancel_token.cancelled() => return Err(ProviderError::Interrupted),
            response = self.client.get(url).send() => response.map_err(request_error)?,
        };

        let status = response.status();
        if status.is_client_error() {
            warn!("SR rejected request with status {}", status);
            return Err(ProviderError::BadRequest {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            warn!("SR returned status {}", status);
            return Err(ProviderError::IoFailure {
                reason: format!("server returned status {status}"),
            });
        }

        tokio::select! {
            biased;
            () = self.cancel_token.cancelled() => Err(ProviderError::Interrupted),
            body = response.json::<T>() => body.map_err(|e| ProviderError::IoFailure {
                reason: format!("undecodable response body: {e}"),
            }),
        }
    }
}

#[async_trait]
impl ScheduleProvider for SrRadioProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn list_channels(&self) -> Result<Vec<ChannelListing>, ProviderError> {
        let mut url = self.endpoint("channels")?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("pagination", "false");

        let response: SrChannelsResponse = self.get_json(url).await?;
        info!("SR listed {} channels", response.channels.len());

        Ok(response
            .channels
            .into_iter()
            .map(|channel| ChannelListing::new(channel.id, channel.name))
            .collect())
    }

    async fn schedule(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<ScheduledEpisode>, ProviderError> {
        self.schedule_around(channel_id, local_now().date()).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| ProviderError::MalformedAddress {
        reason: format!("{raw}: {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::MalformedAddress {
            reason: format!("{raw} cannot be used as a base URL"),
        });
    }
    Ok(url)
}

fn request_error(error: reqwest_middleware::Error) -> ProviderError {
    match error {
        reqwest_middleware::Error::Reqwest(e) if e.is_builder() => ProviderError::MalformedAddress {
            reason: e.to_string(),
        },
        e => {
            warn!("SR request failed: {}", e);
            ProviderError::IoFailure {
                reason: e.to_string(),
            }
        }
    }
}

/// Parse an SR `/Date(<epoch millis>)/` timestamp into naive local time
fn parse_sr_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let inner = raw.strip_prefix("/Date(")?.strip_suffix(")/")?;
    // Some endpoints append a zone offset, e.g. `/Date(1691272920000+0200)/`
    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(inner.len(), |(i, _)| i);
    let millis = inner[..digits_end].parse().ok()?;
    naive_local_from_millis(millis)
}

#[derive(Debug, Deserialize)]
struct SrChannelsResponse {
    #[serde(default)]
    channels: Vec<SrChannel>,
}

/// Channel entry; other fields (image, color, liveaudio) are ignored
#[derive(Debug, Deserialize)]
struct SrChannel {
    id: ChannelId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SrScheduleResponse {
    #[serde(default)]
    schedule: Vec<SrScheduleEntry>,
}

#[derive(Debug, Deserialize)]
struct SrScheduleEntry {
    #[serde(default)]
    episodeid: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    starttimeutc: String,
    endtimeutc: String,
    #[serde(default)]
    imageurl: Option<String>,
}

impl SrScheduleEntry {
    fn into_episode(self, channel_id: ChannelId) -> Option<ScheduledEpisode> {
        let (Some(start_time), Some(end_time)) = (
            parse_sr_timestamp(&self.starttimeutc),
            parse_sr_timestamp(&self.endtimeutc),
        ) else {
            warn!(
                "Skipping SR episode {} on channel {}: bad timestamps ({}, {})",
                self.episodeid, channel_id, self.starttimeutc, self.endtimeutc
            );
            return None;
        };

        Some(ScheduledEpisode {
            episode_id: self.episodeid,
            title: self.title,
            description: self.description.unwrap_or_default(),
            start_time,
            end_time,
            icon: self.imageurl.filter(|url| !url.is_empty()),
        })
    }
}

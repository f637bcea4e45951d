// This module handles bot presence and lifecycle events.

use crate::core::modules::HubConfig;
use poise::serenity_prelude as serenity;

/// Announce the running build. Streaming when a stream URL is configured,
/// plain "playing" otherwise.
pub fn on_ready(ctx: &serenity::Context, name: &str, stream_url: Option<&str>) {
    let activity = match stream_url.map(|url| serenity::ActivityData::streaming(name, url)) {
        Some(Ok(activity)) => activity,
        Some(Err(e)) => {
            tracing::warn!("Invalid STREAM_URL, falling back to a playing status: {}", e);
            serenity::ActivityData::playing(name)
        }
        None => serenity::ActivityData::playing(name),
    };

    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Message posted to the debug channel when the bot comes up.
pub fn startup_notice(config: &HubConfig) -> String {
    format!("`{}@{}` online.", config.package_name, config.package_version)
}

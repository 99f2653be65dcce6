use async_trait::async_trait;

use crate::{
    domain::{failure::SourceError, website::SiteStats},
    usecases::command_error::CommandError,
};

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn site_stats(&self, config_id: &str) -> Result<SiteStats, SourceError>;
}

/// Counters of a site with daily series in date order.
pub async fn load_stats(
    source: &(dyn StatsSource + '_),
    config_id: &str,
) -> Result<SiteStats, CommandError> {
    let mut stats = source.site_stats(config_id).await?;
    stats.daily_visitors.sort_by(|a, b| a.date.cmp(&b.date));
    stats.daily_conversations.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(stats)
}

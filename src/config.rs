use std::time::Duration;

/// Tunables for the world grid and its spawn manager. Defaults are the
/// production values: a 1000x1000 world, a spawn wave every minute, a
/// five-minute despawn, and at most 50 creatures alive at once.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub width: u16,
    pub height: u16,
    pub spawn_interval: Duration,
    pub despawn_after: Duration,
    /// How many placements one spawn wave attempts.
    pub spawn_batch: usize,
    /// Global cap on live creatures across the whole grid.
    pub max_live: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            width: 1000,
            height: 1000,
            spawn_interval: Duration::from_secs(60),
            despawn_after: Duration::from_secs(5 * 60),
            spawn_batch: 50,
            max_live: 50,
        }
    }
}

/// Tunables for the session/transport layer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How many captured creatures a player may hold.
    pub team_capacity: usize,
    /// How many creatures a player drafts for battles at connection start.
    pub draft_size: usize,
    /// Cadence of synthetic moves while auto-roam is on.
    pub roam_tick: Duration,
    /// Roam duration used when `auto` is issued without a second count.
    pub default_auto_duration: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            team_capacity: 200,
            draft_size: 3,
            roam_tick: Duration::from_secs(2),
            default_auto_duration: Duration::from_secs(120),
        }
    }
}

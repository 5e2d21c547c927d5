//! Room configuration.

use std::time::Duration;

use mazeduel_mapgen::MapConfig;
use mazeduel_tick::TickConfig;
use serde::{Deserialize, Serialize};

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Ticks per second.
    pub tick_rate: u32,

    /// Inputs applied per player per tick. The rest wait for later ticks.
    pub input_cap: usize,

    /// Inputs a player may have queued. Anything beyond is dropped.
    pub max_pending_inputs: usize,

    /// How long a wrong or expired answer freezes the player.
    pub stun: Duration,

    /// How long a player has to answer a question.
    pub question_timeout_ms: u64,

    /// Map generation settings.
    pub map: MapConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick_rate: 15,
            input_cap: 6,
            max_pending_inputs: 64,
            stun: Duration::from_secs(2),
            question_timeout_ms: mazeduel_mapgen::DEFAULT_TIMEOUT_MS,
            map: MapConfig::default(),
        }
    }
}

impl RoomConfig {
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate)
    }
}

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;

use crate::config::GameConfig;
use crate::error::GameResult;
use crate::health::HealthHandle;
use crate::signal::{RedrawNotifier, StatusLine};
use crate::types::{MAX_HIT_POINTS, Position};
use crate::world::MapHandle;

/// Timed healing started by stepping on a heal spot.
///
/// After a grace period it heals one point per period until the player is at
/// full health or no longer stands on `spot`.
pub struct HealingCycle {
    spot: Position,
    map: MapHandle,
    health: HealthHandle,
    hit_points: watch::Receiver<u8>,
    redraw: RedrawNotifier,
    status: StatusLine,
    grace: Duration,
    period: Duration,
}

impl HealingCycle {
    pub fn new(
        spot: Position,
        map: MapHandle,
        health: HealthHandle,
        hit_points: watch::Receiver<u8>,
        redraw: RedrawNotifier,
        status: StatusLine,
        config: &GameConfig,
    ) -> Self {
        Self {
            spot,
            map,
            health,
            hit_points,
            redraw,
            status,
            grace: config.heal_grace(),
            period: config.heal_period(),
        }
    }

    fn say(&self, message: impl Into<String>) {
        self.status.set(message);
        self.redraw.notify();
    }

    /// Runs to completion and returns how many heal ticks were applied.
    pub async fn run(self) -> GameResult<u32> {
        self.say(format!(
            "You are on a healing spot! Wait {}s for it to start...",
            self.grace.as_secs()
        ));
        time::sleep(self.grace).await;

        let mut ticks = 0;
        loop {
            let position = self.map.player().await?.position;
            let hit_points = *self.hit_points.borrow();

            if position != self.spot || hit_points >= MAX_HIT_POINTS {
                if hit_points >= MAX_HIT_POINTS {
                    self.say("Fully healed!");
                } else {
                    self.say("You left the healing spot.");
                }
                info!(spot = ?self.spot, ticks, hit_points, "healing finished");
                return Ok(ticks);
            }

            let hit_points = self.health.heal(1).await?;
            ticks += 1;
            self.say(format!("Healing... hit points: {hit_points}"));

            time::sleep(self.period).await;
        }
    }

    pub fn spawn(self) -> JoinHandle<GameResult<u32>> {
        tokio::spawn(self.run())
    }
}

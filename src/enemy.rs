use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::config::GameConfig;
use crate::error::GameResult;
use crate::health::HealthHandle;
use crate::signal::PositionInbox;
use crate::types::{Behavior, Direction, Position};
use crate::world::{MapHandle, MoveRequest};

/// One enemy's private state. Only its own actor reads or writes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnemyState {
    pub position: Position,
    pub behavior: Behavior,
    pub last_known_player: Position,
}

impl EnemyState {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            behavior: Behavior::Patrol,
            last_known_player: Position::default(),
        }
    }

    /// Records a player sighting and re-evaluates the behavior right away.
    pub fn observe(&mut self, player: Position, radius: u32) -> Behavior {
        self.last_known_player = player;
        self.behavior = if self.position.manhattan(player) <= radius {
            Behavior::Chase
        } else {
            Behavior::Patrol
        };
        self.behavior
    }
}

/// What an enemy did on one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAction {
    Attacked { hit_points: u8 },
    Moved { to: Position },
    Blocked,
    Idle,
}

/// Axis-aligned unit step from `from` toward `to`. When both axes differ one
/// of them is picked at random, so the step is never diagonal.
pub fn chase_step<R: Rng + ?Sized>(from: Position, to: Position, rng: &mut R) -> (i32, i32) {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    if dx != 0 && dy != 0 {
        if rng.gen_bool(0.5) { (dx, 0) } else { (0, dy) }
    } else {
        (dx, dy)
    }
}

pub struct Enemy {
    id: usize,
    state: EnemyState,
    map: MapHandle,
    health: HealthHandle,
    inbox: PositionInbox,
    period: Duration,
    radius: u32,
    rng: StdRng,
}

impl Enemy {
    pub fn new(
        id: usize,
        position: Position,
        map: MapHandle,
        health: HealthHandle,
        inbox: PositionInbox,
        config: &GameConfig,
    ) -> Self {
        Self {
            id,
            state: EnemyState::new(position),
            map,
            health,
            inbox,
            period: config.enemy_period(),
            radius: config.visibility_radius,
            rng: config.rng(id as u64 + 1),
        }
    }

    pub fn state(&self) -> EnemyState {
        self.state
    }

    pub fn observe(&mut self, player: Position) -> Behavior {
        let before = self.state.behavior;
        let after = self.state.observe(player, self.radius);
        if before != after {
            debug!(enemy = self.id, ?before, ?after, "behavior changed");
        }
        after
    }

    /// Acts once on the behavior decided by the latest observation.
    pub async fn tick(&mut self) -> GameResult<TickAction> {
        match self.state.behavior {
            Behavior::Patrol => {
                let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
                let (dx, dy) = direction.delta();
                self.try_move(dx, dy).await
            }
            Behavior::Chase => {
                let target = self.state.last_known_player;
                if self.state.position.manhattan(target) == 1 {
                    let hit_points = self.health.damage(1).await?;
                    return Ok(TickAction::Attacked { hit_points });
                }
                let (dx, dy) = chase_step(self.state.position, target, &mut self.rng);
                self.try_move(dx, dy).await
            }
        }
    }

    async fn try_move(&mut self, dx: i32, dy: i32) -> GameResult<TickAction> {
        if dx == 0 && dy == 0 {
            return Ok(TickAction::Idle);
        }
        let dest = self.state.position.offset(dx, dy);
        let accepted = self
            .map
            .request_move(MoveRequest::enemy(self.state.position, dest))
            .await?;
        if accepted {
            self.state.position = dest;
            Ok(TickAction::Moved { to: dest })
        } else {
            Ok(TickAction::Blocked)
        }
    }

    /// Ticks on its own timer until one of the owner actors goes away.
    pub async fn run(mut self) {
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut feed_open = true;

        loop {
            tokio::select! {
                sighting = self.inbox.next(), if feed_open => match sighting {
                    Some(player) => {
                        self.observe(player);
                    }
                    None => feed_open = false,
                },
                _ = ticker.tick() => match self.tick().await {
                    Ok(action) => trace!(enemy = self.id, ?action, "tick"),
                    Err(err) => {
                        warn!(enemy = self.id, %err, "enemy stopping");
                        break;
                    }
                },
            }
        }
    }
}

pub fn spawn_enemy(enemy: Enemy) -> JoinHandle<()> {
    tokio::spawn(enemy.run())
}

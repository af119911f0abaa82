//! # Game Facade
//!
//! Starts the owner actors and one task per enemy, then turns player intents
//! into requests against them. After each intent it reads the triggered tile
//! and decides whether the game is won, lost or goes on.

use rand::Rng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;

use crate::config::GameConfig;
use crate::display::RenderView;
use crate::enemy::{Enemy, spawn_enemy};
use crate::error::GameResult;
use crate::healing::HealingCycle;
use crate::health::{HealthHandle, HealthState, spawn_health_actor};
use crate::input::InputEvent;
use crate::map::LoadedMap;
use crate::signal::{PositionFeed, RedrawNotifier, StatusLine, redraw_channel};
use crate::types::{Direction, Position, Tile};
use crate::world::{ChestOutcome, ChestRoll, MapHandle, MoveRequest, PlayerView, WorldState, spawn_map_actor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Won,
    Lost,
    Quit,
}

pub struct Game {
    config: GameConfig,
    map: MapHandle,
    health: HealthHandle,
    hit_points: watch::Receiver<u8>,
    redraw: RedrawNotifier,
    status: StatusLine,
    rng: StdRng,
    /// Only this facade moves the player, so the copy never goes stale.
    player: Position,
    healing: Option<(Position, JoinHandle<GameResult<u32>>)>,
}

impl Game {
    /// Spawns the map owner, the health owner and every enemy, and hands back
    /// what the render loop needs.
    pub fn start(map: LoadedMap, config: GameConfig) -> (Game, RenderView) {
        let (redraw, signal) = redraw_channel();
        let (status, status_view) = StatusLine::channel();

        // NOTE - Inboxes must exist before the feed moves into the map owner
        let feed = PositionFeed::new(map.player);
        let inboxes: Vec<_> = map.enemies.iter().map(|_| feed.subscribe()).collect();

        let (map_handle, _) = spawn_map_actor(
            WorldState::new(&map),
            feed,
            redraw.clone(),
            config.placement.chests as u32,
        );
        let (health, hit_points, _) = spawn_health_actor(HealthState::default(), redraw.clone());

        for (id, (position, inbox)) in map.enemies.iter().zip(inboxes).enumerate() {
            let enemy = Enemy::new(id, *position, map_handle.clone(), health.clone(), inbox, &config);
            spawn_enemy(enemy);
        }
        info!(enemies = map.enemies.len(), player = ?map.player, "game started");

        status.set("Find the key in one of the chests, then reach the trapdoor.");
        redraw.notify();

        let view = RenderView {
            map: map_handle.clone(),
            hit_points: hit_points.clone(),
            status: status_view,
            redraw: signal,
        };
        let game = Game {
            rng: config.rng(0),
            config,
            map: map_handle,
            health,
            hit_points,
            redraw,
            status,
            player: map.player,
            healing: None,
        };
        (game, view)
    }

    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    /// Read-only view of the hit points.
    pub fn hit_points(&self) -> watch::Receiver<u8> {
        self.hit_points.clone()
    }

    pub fn status(&self) -> String {
        self.status.current()
    }

    fn say(&self, message: impl Into<String>) {
        self.status.set(message);
        self.redraw.notify();
    }

    /// Routes one intent and evaluates the end conditions afterwards.
    pub async fn handle(&mut self, event: InputEvent) -> GameResult<Outcome> {
        let outcome = match event {
            InputEvent::Quit => return Ok(Outcome::Quit),
            InputEvent::Interact => self.interact().await?,
            InputEvent::Move(direction) => self.move_player(direction).await?,
        };

        let outcome = if outcome == Outcome::Continue && *self.hit_points.borrow() == 0 {
            Outcome::Lost
        } else {
            outcome
        };
        Ok(self.conclude(outcome))
    }

    /// Shows the end message for a terminal outcome; other outcomes pass through.
    pub fn conclude(&self, outcome: Outcome) -> Outcome {
        match outcome {
            Outcome::Won => {
                info!("player escaped");
                self.say("You escaped through the trapdoor! You WIN! Press ESC to quit.");
            }
            Outcome::Lost => {
                info!("player died");
                self.say("You died! Better luck next time. Press ESC to quit.");
            }
            Outcome::Continue | Outcome::Quit => {}
        }
        outcome
    }

    async fn move_player(&mut self, direction: Direction) -> GameResult<Outcome> {
        let dest = self.player.step(direction);
        if !self.map.request_move(MoveRequest::player(self.player, dest)).await? {
            return Ok(Outcome::Continue);
        }
        self.player = dest;
        let view = self.map.player().await?;
        self.on_tile(view).await
    }

    /// Effects of the tile the player just stepped onto.
    async fn on_tile(&mut self, view: PlayerView) -> GameResult<Outcome> {
        let tile = view.standing_on;
        if tile == Tile::TRAP {
            let hit_points = self.health.damage(self.config.trap_damage).await?;
            info!(at = ?view.position, hit_points, "trap triggered");
            self.say("You stepped on a trap!");
        } else if tile == Tile::HEAL_SPOT {
            self.start_healing(view.position);
        } else if tile == Tile::TRAP_DOOR {
            if view.key_captured {
                return Ok(Outcome::Won);
            }
            self.say("You cannot leave without the key.");
        }
        Ok(Outcome::Continue)
    }

    fn start_healing(&mut self, spot: Position) {
        let running = matches!(&self.healing, Some((active, task)) if *active == spot && !task.is_finished());
        if running {
            return;
        }
        let cycle = HealingCycle::new(
            spot,
            self.map.clone(),
            self.health.clone(),
            self.hit_points.clone(),
            self.redraw.clone(),
            self.status.clone(),
            &self.config,
        );
        self.healing = Some((spot, cycle.spawn()));
    }

    async fn interact(&mut self) -> GameResult<Outcome> {
        let roll = ChestRoll {
            lucky: self.rng.gen_range(0..100) < self.config.key_chance_percent,
            trapped: self.rng.gen_bool(0.5),
        };
        let Some(opening) = self.map.open_chest(roll).await? else {
            self.say(format!("Nothing to interact with at ({}, {}).", self.player.x, self.player.y));
            return Ok(Outcome::Continue);
        };

        match opening.outcome {
            ChestOutcome::Key => self.say("KEY FOUND! Now find the trapdoor."),
            ChestOutcome::Empty => {
                self.say("The chest is empty.");
                time::sleep(self.config.status_pause()).await;
            }
            ChestOutcome::Trap => {
                self.health.damage(1).await?;
                self.say("The chest was trapped!");
                time::sleep(self.config.status_pause()).await;
            }
        }
        Ok(Outcome::Continue)
    }
}

/// Resolves once the hit points reach zero; never resolves if the health
/// owner is gone.
pub async fn defeated(hit_points: &mut watch::Receiver<u8>) {
    if hit_points.wait_for(|hp| *hp == 0).await.is_err() {
        std::future::pending::<()>().await;
    }
}

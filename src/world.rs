use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{GameError, GameResult};
use crate::map::{Grid, LoadedMap};
use crate::signal::{PositionFeed, RedrawNotifier};
use crate::types::{MAILBOX_CAPACITY, MoverKind, Position, Tile};

/// Everything the map owner guards: the grid and the player's bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldState {
    pub grid: Grid,
    pub player: Position,
    /// Tile the player is standing on; the grid shows Empty under the player.
    pub last_visited: Tile,
    pub key_captured: bool,
    pub chests_opened: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    pub kind: MoverKind,
    /// Ignored for the player, whose origin is always the tracked position.
    pub origin: Position,
    pub dest: Position,
    pub moved: Tile,
}

impl MoveRequest {
    pub fn player(origin: Position, dest: Position) -> Self {
        Self {
            kind: MoverKind::Player,
            origin,
            dest,
            moved: Tile::EMPTY,
        }
    }

    pub fn enemy(origin: Position, dest: Position) -> Self {
        Self {
            kind: MoverKind::Enemy,
            origin,
            dest,
            moved: Tile::ENEMY,
        }
    }
}

/// Dice rolled by the caller before a chest is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChestRoll {
    pub lucky: bool,
    pub trapped: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChestOutcome {
    Key,
    Empty,
    Trap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChestOpening {
    pub position: Position,
    pub outcome: ChestOutcome,
    pub opened: u32,
}

/// Decides what a chest holds.
///
/// The key comes out of a lucky roll, or unconditionally from the chest that
/// brings the opened count to `guarantee_at`, as long as it is still missing.
pub fn resolve_chest(opened: u32, guarantee_at: u32, key_captured: bool, roll: ChestRoll) -> ChestOutcome {
    if !key_captured && (roll.lucky || opened == guarantee_at) {
        ChestOutcome::Key
    } else if roll.trapped {
        ChestOutcome::Trap
    } else {
        ChestOutcome::Empty
    }
}

/// Read-only view of the player for the facade and the healing cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerView {
    pub position: Position,
    pub standing_on: Tile,
    pub key_captured: bool,
}

impl WorldState {
    pub fn new(map: &LoadedMap) -> Self {
        Self {
            grid: map.grid.clone(),
            player: map.player,
            last_visited: Tile::EMPTY,
            key_captured: false,
            chests_opened: 0,
        }
    }

    /// Applies one positional request. `false` means the move was blocked and
    /// nothing changed.
    pub fn apply_move(&mut self, request: &MoveRequest) -> bool {
        let Some(dest_tile) = self.grid.get(request.dest).filter(|t| !t.blocks_movement) else {
            return false;
        };

        match request.kind {
            MoverKind::Player => {
                self.grid.set(self.player, self.last_visited);
                // NOTE - Re-read: the restored cell may be the destination itself
                self.last_visited = self.grid.get(request.dest).unwrap_or(dest_tile);
                self.grid.set(request.dest, Tile::EMPTY);
                self.player = request.dest;
            }
            MoverKind::Enemy => {
                // NOTE - The player's cell reads Empty but is occupied
                if request.dest == self.player {
                    return false;
                }
                self.grid.set(request.dest, request.moved);
                self.grid.set(request.origin, Tile::EMPTY);
            }
        }
        true
    }

    /// Opens the first chest found next to the player (Up, Down, Left, Right).
    pub fn open_adjacent_chest(&mut self, roll: ChestRoll, guarantee_at: u32) -> Option<ChestOpening> {
        let position = self
            .player
            .neighbours()
            .into_iter()
            .find(|pos| self.grid.get(*pos) == Some(Tile::CHEST))?;

        self.grid.set(position, Tile::OPENED_CHEST);
        self.chests_opened += 1;

        let outcome = resolve_chest(self.chests_opened, guarantee_at, self.key_captured, roll);
        if outcome == ChestOutcome::Key {
            self.key_captured = true;
        }

        Some(ChestOpening {
            position,
            outcome,
            opened: self.chests_opened,
        })
    }

    pub fn player_view(&self) -> PlayerView {
        PlayerView {
            position: self.player,
            standing_on: self.last_visited,
            key_captured: self.key_captured,
        }
    }
}

#[derive(Debug)]
pub(crate) enum MapCommand {
    Move {
        request: MoveRequest,
        reply: oneshot::Sender<bool>,
    },
    OpenChest {
        roll: ChestRoll,
        reply: oneshot::Sender<Option<ChestOpening>>,
    },
    Player {
        reply: oneshot::Sender<PlayerView>,
    },
    Snapshot {
        reply: oneshot::Sender<WorldState>,
    },
}

/// Cheap, cloneable access to the map owner.
#[derive(Clone, Debug)]
pub struct MapHandle {
    tx: mpsc::Sender<MapCommand>,
}

impl MapHandle {
    async fn ask<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> MapCommand) -> GameResult<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| GameError::ActorStopped("map"))?;
        response.await.map_err(|_| GameError::ActorStopped("map"))
    }

    /// Waits for the map owner to accept or reject the move.
    pub async fn request_move(&self, request: MoveRequest) -> GameResult<bool> {
        self.ask(|reply| MapCommand::Move { request, reply }).await
    }

    pub async fn open_chest(&self, roll: ChestRoll) -> GameResult<Option<ChestOpening>> {
        self.ask(|reply| MapCommand::OpenChest { roll, reply }).await
    }

    pub async fn player(&self) -> GameResult<PlayerView> {
        self.ask(|reply| MapCommand::Player { reply }).await
    }

    pub async fn snapshot(&self) -> GameResult<WorldState> {
        self.ask(|reply| MapCommand::Snapshot { reply }).await
    }
}

struct MapActor {
    state: WorldState,
    feed: PositionFeed,
    redraw: RedrawNotifier,
    chest_guarantee: u32,
    inbox: mpsc::Receiver<MapCommand>,
}

impl MapActor {
    async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            self.handle(command);
        }
        debug!("map actor stopped");
    }

    fn handle(&mut self, command: MapCommand) {
        match command {
            MapCommand::Move { request, reply } => {
                let accepted = self.state.apply_move(&request);
                if accepted && request.kind == MoverKind::Player {
                    self.feed.publish(self.state.player);
                }
                debug!(kind = ?request.kind, dest = ?request.dest, accepted, "move");
                let _ = reply.send(accepted);
                self.redraw.notify();
            }
            MapCommand::OpenChest { roll, reply } => {
                let opening = self.state.open_adjacent_chest(roll, self.chest_guarantee);
                if let Some(opening) = &opening {
                    info!(at = ?opening.position, outcome = ?opening.outcome, opened = opening.opened, "chest opened");
                    self.redraw.notify();
                }
                let _ = reply.send(opening);
            }
            MapCommand::Player { reply } => {
                let _ = reply.send(self.state.player_view());
            }
            MapCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.clone());
            }
        }
    }
}

/// Starts the map owner. Subscribe every enemy inbox to `feed` before
/// handing it over.
pub fn spawn_map_actor(
    state: WorldState,
    feed: PositionFeed,
    redraw: RedrawNotifier,
    chest_guarantee: u32,
) -> (MapHandle, JoinHandle<()>) {
    let (tx, inbox) = mpsc::channel(MAILBOX_CAPACITY);
    let actor = MapActor {
        state,
        feed,
        redraw,
        chest_guarantee,
        inbox,
    };
    (MapHandle { tx }, tokio::spawn(actor.run()))
}

#[cfg(test)]
pub(crate) fn handle_pair() -> (MapHandle, mpsc::Receiver<MapCommand>) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    (MapHandle { tx }, rx)
}

#[cfg(test)]
impl MapCommand {
    /// Answers a scripted command the way the actor would, for tests that
    /// stand in for the map owner.
    pub(crate) fn answer_move(self, accepted: bool) -> Option<MoveRequest> {
        match self {
            MapCommand::Move { request, reply } => {
                let _ = reply.send(accepted);
                Some(request)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map;
    use crate::signal::redraw_channel;
    use proptest::prelude::*;

    fn world(text: &str) -> WorldState {
        WorldState::new(&map::parse(text).unwrap())
    }

    #[test]
    fn player_swap_keeps_tiles() {
        let mut state = world("☺♣X");
        assert!(state.apply_move(&MoveRequest::player(state.player, Position::new(1, 0))));
        assert_eq!(state.last_visited, Tile::VEGETATION);
        assert_eq!(state.grid.get(Position::new(0, 0)), Some(Tile::EMPTY));
        assert_eq!(state.grid.get(Position::new(1, 0)), Some(Tile::EMPTY));

        assert!(state.apply_move(&MoveRequest::player(state.player, Position::new(2, 0))));
        assert_eq!(state.last_visited, Tile::TRAP);
        assert_eq!(state.grid.get(Position::new(1, 0)), Some(Tile::VEGETATION));
    }

    #[test]
    fn blocked_moves_change_nothing() {
        let mut state = world("▤☺⌺\n ☠ ");
        let before = state.clone();
        for dest in [Position::new(0, 0), Position::new(2, 0), Position::new(1, 1), Position::new(1, -1)] {
            assert!(!state.apply_move(&MoveRequest::player(state.player, dest)));
        }
        assert!(!state.apply_move(&MoveRequest::enemy(Position::new(1, 1), Position::new(1, 0))));
        assert_eq!(state, before);
    }

    #[test]
    fn enemy_moves_overwrite_and_clear() {
        let mut state = world("☺ \n ☠♥");
        assert!(state.apply_move(&MoveRequest::enemy(Position::new(1, 1), Position::new(2, 1))));
        assert_eq!(state.grid.get(Position::new(1, 1)), Some(Tile::EMPTY));
        assert_eq!(state.grid.get(Position::new(2, 1)), Some(Tile::ENEMY));
        assert_eq!(state.last_visited, Tile::EMPTY);
    }

    #[test]
    fn chest_key_is_guaranteed_on_the_last_chest() {
        let unlucky = ChestRoll { lucky: false, trapped: true };
        assert_eq!(resolve_chest(6, 6, false, unlucky), ChestOutcome::Key);
        assert_eq!(resolve_chest(5, 6, false, unlucky), ChestOutcome::Trap);
        assert_eq!(resolve_chest(6, 6, true, unlucky), ChestOutcome::Trap);
        let lucky = ChestRoll { lucky: true, trapped: false };
        assert_eq!(resolve_chest(1, 6, false, lucky), ChestOutcome::Key);
        assert_eq!(resolve_chest(1, 6, true, lucky), ChestOutcome::Empty);
    }

    #[test]
    fn opening_marks_the_chest() {
        let mut state = world(" ⌺ \n⌺☺ ");
        let roll = ChestRoll { lucky: false, trapped: false };
        let first = state.open_adjacent_chest(roll, 6).unwrap();
        assert_eq!(first.position, Position::new(1, 0));
        assert_eq!(first.outcome, ChestOutcome::Empty);
        assert_eq!(state.grid.get(Position::new(1, 0)), Some(Tile::OPENED_CHEST));

        let second = state.open_adjacent_chest(roll, 2).unwrap();
        assert_eq!(second.position, Position::new(0, 1));
        assert_eq!(second.outcome, ChestOutcome::Key);
        assert!(state.key_captured);
        assert_eq!(state.open_adjacent_chest(roll, 2), None);
        assert_eq!(state.chests_opened, 2);
    }

    #[tokio::test]
    async fn actor_publishes_player_moves_and_redraws() {
        let state = world("☺  ");
        let feed = PositionFeed::new(state.player);
        let mut inbox = feed.subscribe();
        assert_eq!(inbox.next().await, Some(Position::new(0, 0)));

        let (notifier, mut redraw) = redraw_channel();
        let (map, _task) = spawn_map_actor(state, feed, notifier, 6);

        assert!(map.request_move(MoveRequest::player(Position::new(0, 0), Position::new(1, 0))).await.unwrap());
        assert_eq!(inbox.next().await, Some(Position::new(1, 0)));
        assert!(redraw.try_take());

        // Rejected requests still redraw but publish nothing.
        assert!(!map.request_move(MoveRequest::player(Position::new(1, 0), Position::new(1, 1))).await.unwrap());
        assert!(redraw.try_take());
        assert_eq!(inbox.latest(), Position::new(1, 0));

        let view = map.player().await.unwrap();
        assert_eq!(view.position, Position::new(1, 0));
        assert_eq!(map.snapshot().await.unwrap().player, Position::new(1, 0));
    }

    #[tokio::test]
    async fn concurrent_enemy_moves_never_collide() {
        let state = world("☺    \n     \n☠   ☠");
        let feed = PositionFeed::new(state.player);
        let (notifier, _redraw) = redraw_channel();
        let (map, _task) = spawn_map_actor(state, feed, notifier, 6);

        let left = map.request_move(MoveRequest::enemy(Position::new(0, 2), Position::new(1, 2)));
        let right = map.request_move(MoveRequest::enemy(Position::new(4, 2), Position::new(3, 2)));
        let (left, right) = tokio::join!(left, right);
        assert!(left.unwrap() && right.unwrap());

        // Both enemies now race for (2, 2); exactly one wins.

        let first = map.request_move(MoveRequest::enemy(Position::new(1, 2), Position::new(2, 2)));
        let second = map.request_move(MoveRequest::enemy(Position::new(3, 2), Position::new(2, 2)));
        let (first, second) = tokio::join!(first, second);
        assert!(first.unwrap() ^ second.unwrap());
        assert_eq!(map.snapshot().await.unwrap().grid.count(Tile::ENEMY), 2);
    }

    #[tokio::test]
    async fn stopped_actor_is_an_error() {
        let (map, rx) = handle_pair();
        drop(rx);
        assert!(matches!(map.player().await, Err(GameError::ActorStopped("map"))));
    }

    proptest! {
        /// Walking around never duplicates or loses a tile: putting the tile
        /// under the player back into its cell reproduces the original grid.
        #[test]
        fn prop_player_walk_conserves_tiles(steps in proptest::collection::vec(0usize..4, 0..60)) {
            let original = world("▤▤▤▤▤▤\n▤☺♣ X▤\n▤♥ ♣ ▤\n▤ X⍋♣▤\n▤▤▤▤▤▤");
            let mut state = original.clone();
            for step in steps {
                let dest = state.player.step(crate::types::Direction::ALL[step]);
                let open = state.grid.can_move_to(dest);
                prop_assert_eq!(state.apply_move(&MoveRequest::player(state.player, dest)), open);
                prop_assert_eq!(state.grid.get(state.player), Some(Tile::EMPTY));

                prop_assert_eq!(Some(state.last_visited), original.grid.get(state.player));

                let mut restored = state.grid.clone();
                restored.set(state.player, state.last_visited);
                prop_assert_eq!(&restored, &original.grid);
            }
        }
    }
}

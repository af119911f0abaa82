use std::fs;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::Placement;
use crate::error::{GameError, GameResult};
use crate::types::{PLAYER_GLYPH, Position, Tile};

/// Rows of tiles as read from the map source; rows may differ in length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    tiles: Vec<Vec<Tile>>,
}

impl Grid {
    pub fn from_rows(tiles: Vec<Vec<Tile>>) -> Self {
        Self { tiles }
    }

    pub fn rows(&self) -> &[Vec<Tile>] {
        &self.tiles
    }

    pub fn row_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn row_len(&self, y: usize) -> usize {
        self.tiles.get(y).map_or(0, Vec::len)
    }

    fn index(&self, pos: Position) -> Option<(usize, usize)> {
        let y = usize::try_from(pos.y).ok()?;
        let x = usize::try_from(pos.x).ok()?;
        (x < self.row_len(y)).then_some((x, y))
    }

    pub fn get(&self, pos: Position) -> Option<Tile> {
        self.index(pos).map(|(x, y)| self.tiles[y][x])
    }

    /// Overwrites a cell; out-of-bounds writes are ignored and reported as `false`.
    pub fn set(&mut self, pos: Position, tile: Tile) -> bool {
        match self.index(pos) {
            Some((x, y)) => {
                self.tiles[y][x] = tile;
                true
            }
            None => false,
        }
    }

    /// Bounds check against the destination row, then tangibility.
    pub fn can_move_to(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|tile| !tile.blocks_movement)
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().flatten().filter(|t| **t == tile).count()
    }

    pub fn positions_of(&self, tile: Tile) -> Vec<Position> {
        let mut found = Vec::new();
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, t) in row.iter().enumerate() {
                if *t == tile {
                    found.push(Position::new(x as i32, y as i32));
                }
            }
        }
        found
    }
}

/// Everything the actors need at startup.
#[derive(Clone, Debug)]
pub struct LoadedMap {
    pub grid: Grid,
    pub player: Position,
    pub enemies: Vec<Position>,
}

impl LoadedMap {
    /// Drops traps, chests, heal spots and trapdoors on random Empty cells.
    pub fn scatter<R: Rng + ?Sized>(&mut self, placement: &Placement, rng: &mut R) -> GameResult<()> {
        self.place_randomly(Tile::TRAP, placement.traps, rng)?;
        self.place_randomly(Tile::CHEST, placement.chests, rng)?;
        self.place_randomly(Tile::HEAL_SPOT, placement.heal_spots, rng)?;
        self.place_randomly(Tile::TRAP_DOOR, placement.trap_doors, rng)?;
        Ok(())
    }

    fn place_randomly<R: Rng + ?Sized>(&mut self, tile: Tile, count: usize, rng: &mut R) -> GameResult<()> {
        // NOTE - The player start is Empty in the grid but is not free
        let free: Vec<Position> = self
            .grid
            .positions_of(Tile::EMPTY)
            .into_iter()
            .filter(|pos| *pos != self.player)
            .collect();

        if free.len() < count {
            return Err(GameError::NotEnoughRoom {
                tile: tile.name(),
                wanted: count,
            });
        }

        for pos in free.choose_multiple(rng, count) {
            self.grid.set(*pos, tile);
        }
        debug!(tile = tile.name(), count, "scattered tiles");
        Ok(())
    }
}

/// Builds the grid from map text.
///
/// `☺` marks the player start (left Empty), `☠` an enemy start, and any glyph
/// from the tile catalogue becomes that tile. Anything else is Empty.
pub fn parse(text: &str) -> GameResult<LoadedMap> {
    let mut tiles = Vec::new();
    let mut player = None;
    let mut enemies = Vec::new();

    for (y, line) in text.lines().enumerate() {
        let mut row = Vec::with_capacity(line.len());
        for (x, ch) in line.chars().enumerate() {
            let pos = Position::new(x as i32, y as i32);
            let tile = if ch == PLAYER_GLYPH && player.is_none() {
                player = Some(pos);
                Tile::EMPTY
            } else {
                Tile::from_symbol(ch).unwrap_or(Tile::EMPTY)
            };
            if tile == Tile::ENEMY {
                enemies.push(pos);
            }
            row.push(tile);
        }
        tiles.push(row);
    }

    if tiles.is_empty() {
        return Err(GameError::EmptyMap);
    }
    let player = player.ok_or(GameError::MissingPlayer)?;

    Ok(LoadedMap {
        grid: Grid::from_rows(tiles),
        player,
        enemies,
    })
}

/// Reads, parses and scatters a map file. Fails before any actor exists.
pub fn load_map<R: Rng + ?Sized>(path: &Path, placement: &Placement, rng: &mut R) -> GameResult<LoadedMap> {
    let text = fs::read_to_string(path).map_err(|source| GameError::MapRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut map = parse(&text)?;
    map.scatter(placement, rng)?;
    debug!(
        rows = map.grid.row_count(),
        enemies = map.enemies.len(),
        "map loaded"
    );
    Ok(map)
}

//! # Trapdoor Types Module
//!
//! Core value types shared by every actor: the tile catalogue, positions,
//! directions and the enemy behavior states.
//!
//! ## Key Components
//!
//! - **Tile**: immutable description of one grid cell (glyph, colors, passability)
//! - **Position / Direction**: grid coordinates and the four cardinal steps
//! - **MoverKind**: who is asking the map owner to move (player or enemy)
//! - **Behavior**: Patrol / Chase state of an enemy
//!
//! Tiles are compared by symbol only, so a tile read back from the grid
//! matches its catalogue constant regardless of how it got there.

/// NOTE - Upper bound of the player's life counter
pub const MAX_HIT_POINTS: u8 = 10;

/// NOTE - Manhattan radius within which an enemy notices the player
pub const VISIBILITY_RADIUS: u32 = 8;

/// NOTE - Depth of each owner actor's request mailbox
pub const MAILBOX_CAPACITY: usize = 100;

/// Glyph marking the player start in a map source
pub const PLAYER_GLYPH: char = '☺';
pub const PLAYER_COLOR: Color = Color::Cyan;

/// Renderer-agnostic palette used by the tile catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Default,
    Red,
    Green,
    Blue,
    Cyan,
    Wall,
    WallBackground,
    Chest,
}

/// One grid cell's appearance and passability.
#[derive(Clone, Copy, Debug)]
pub struct Tile {
    pub symbol: char,
    pub foreground: Color,
    pub background: Color,
    pub blocks_movement: bool,
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Tile {}

impl Tile {
    pub const WALL: Tile = Tile::new('▤', Color::Wall, Color::WallBackground, true);
    pub const VEGETATION: Tile = Tile::new('♣', Color::Green, Color::Default, false);
    pub const EMPTY: Tile = Tile::new(' ', Color::Default, Color::Default, false);
    pub const TRAP: Tile = Tile::new('X', Color::Red, Color::Default, false);
    pub const HEAL_SPOT: Tile = Tile::new('♥', Color::Green, Color::Default, false);
    pub const CHEST: Tile = Tile::new('⌺', Color::Chest, Color::Default, true);
    pub const OPENED_CHEST: Tile = Tile::new('⍓', Color::Red, Color::Default, true);
    pub const TRAP_DOOR: Tile = Tile::new('⍋', Color::Blue, Color::Default, false);
    pub const ENEMY: Tile = Tile::new('☠', Color::Red, Color::Default, true);

    /// Every tile a map source may spell out directly.
    pub const CATALOGUE: [Tile; 9] = [
        Tile::WALL,
        Tile::VEGETATION,
        Tile::EMPTY,
        Tile::TRAP,
        Tile::HEAL_SPOT,
        Tile::CHEST,
        Tile::OPENED_CHEST,
        Tile::TRAP_DOOR,
        Tile::ENEMY,
    ];

    pub const fn new(symbol: char, foreground: Color, background: Color, blocks_movement: bool) -> Self {
        Self {
            symbol,
            foreground,
            background,
            blocks_movement,
        }
    }

    /// Looks a glyph up in the catalogue.
    pub fn from_symbol(symbol: char) -> Option<Tile> {
        Self::CATALOGUE.into_iter().find(|tile| tile.symbol == symbol)
    }

    pub fn name(&self) -> &'static str {
        match self.symbol {
            '▤' => "wall",
            '♣' => "vegetation",
            'X' => "trap",
            '♥' => "heal spot",
            '⌺' => "chest",
            '⍓' => "opened chest",
            '⍋' => "trapdoor",
            '☠' => "enemy",
            _ => "empty",
        }
    }
}

/// Grid coordinates; `y` selects the row, `x` the column inside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonal neighbours, in Up, Down, Left, Right order.
    pub fn neighbours(self) -> [Position; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// NOTE - Who issued a positional request to the map owner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoverKind {
    Player,
    Enemy,
}

/// NOTE - Enemy behavioral states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Patrol, // NOTE - Random walk
    Chase,  // NOTE - Step toward (or strike) the last known player position
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_compare_by_symbol() {
        let recoloured = Tile::new('X', Color::Blue, Color::Blue, true);
        assert_eq!(recoloured, Tile::TRAP);
        assert_ne!(Tile::TRAP, Tile::HEAL_SPOT);
    }

    #[test]
    fn catalogue_lookup() {
        assert_eq!(Tile::from_symbol('⌺'), Some(Tile::CHEST));
        assert_eq!(Tile::from_symbol('.'), None);
        assert!(Tile::from_symbol('▤').is_some_and(|t| t.blocks_movement));
    }

    #[test]
    fn manhattan_distance() {
        let a = Position::new(2, 3);
        assert_eq!(a.manhattan(Position::new(-1, 7)), 7);
        assert_eq!(a.manhattan(a), 0);
        assert_eq!(a.step(Direction::Left), Position::new(1, 3));
    }
}

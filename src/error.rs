//! Error types for loading and running a game.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to read map {}", path.display())]
    MapRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("map source has no rows")]
    EmptyMap,

    #[error("map source has no player start glyph")]
    MissingPlayer,

    #[error("not enough empty cells to place {wanted} more {tile} tile(s)")]
    NotEnoughRoom { tile: &'static str, wanted: usize },

    #[error("failed to read config {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: &'static str },

    #[error("terminal i/o failed")]
    Terminal(#[from] io::Error),

    /// The owner task behind a handle is gone.
    #[error("{0} actor stopped")]
    ActorStopped(&'static str),
}

pub type GameResult<T> = Result<T, GameError>;

// Boucle de commandes du jeu Trapdoor
// Lit le clavier, soumet les actions à la façade et affiche la fin de partie

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trapdoor::display::{TerminalGuard, TerminalRenderer, render_loop};
use trapdoor::game::{self, Game, Outcome};
use trapdoor::input::{self, InputEvent};
use trapdoor::{GameConfig, map};

/// Trapdoor - find the key, reach the exit, avoid the skulls
#[derive(Parser, Debug)]
#[command(name = "trapdoor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Map file to play
    #[arg(default_value = "map.txt")]
    map: PathBuf,

    /// JSON file overriding game parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (overrides the config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Where log lines go; the terminal belongs to the game
    #[arg(long, default_value = "trapdoor.log")]
    log_file: PathBuf,
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    // === PHASE 1: CHARGEMENT (avant tout acteur) ===
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("cannot load config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let mut rng = config.rng(u64::MAX);
    let loaded = map::load_map(&args.map, &config.placement, &mut rng)
        .with_context(|| format!("cannot load map {}", args.map.display()))?;

    // === PHASE 2: DÉMARRAGE DES ACTEURS ET DU RENDU ===
    let _terminal = TerminalGuard::enter().context("cannot prepare the terminal")?;
    let (mut game, view) = Game::start(loaded, config);
    let renderer = tokio::spawn(async move {
        if let Err(err) = render_loop(view, TerminalRenderer::new(io::stdout())).await {
            error!(%err, "render loop stopped");
        }
    });
    let mut events = input::spawn_reader();
    let mut hit_points = game.hit_points();

    // === PHASE 3: BOUCLE PRINCIPALE ===
    let outcome = loop {
        let outcome = tokio::select! {
            event = events.recv() => match event {
                Some(event) => game.handle(event).await?,
                None => Outcome::Quit,
            },
            () = game::defeated(&mut hit_points) => game.conclude(Outcome::Lost),
        };
        if outcome != Outcome::Continue {
            break outcome;
        }
    };

    // NOTE - End screen stays up until the player quits
    if outcome != Outcome::Quit {
        while let Some(event) = events.recv().await {
            if event == InputEvent::Quit {
                break;
            }
        }
    }

    info!(?outcome, "game over");
    renderer.abort();
    // NOTE - The last frame must be written before the guard restores the terminal
    let _ = renderer.await;
    Ok(())
}

use std::io::{self, Write};

use crossterm::{
    QueueableCommand,
    cursor::{Hide, MoveTo, Show},
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use tokio::sync::watch;

use crate::error::GameResult;
use crate::signal::RedrawSignal;
use crate::types::{Color, MAX_HIT_POINTS, PLAYER_COLOR, PLAYER_GLYPH, Position};
use crate::world::{MapHandle, WorldState};

/// Everything drawn on one redraw.
#[derive(Clone, Debug)]
pub struct Frame {
    pub world: WorldState,
    pub hit_points: u8,
    pub status: String,
}

/// Read-only accessors the render collaborator needs.
#[derive(Debug)]
pub struct RenderView {
    pub map: MapHandle,
    pub hit_points: watch::Receiver<u8>,
    pub status: watch::Receiver<String>,
    pub redraw: RedrawSignal,
}

impl RenderView {
    pub async fn frame(&self) -> GameResult<Frame> {
        let world = self.map.snapshot().await?;
        Ok(Frame {
            world,
            hit_points: *self.hit_points.borrow(),
            status: self.status.borrow().clone(),
        })
    }
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame) -> io::Result<()>;
}

/// Redraws the full frame every time the redraw signal fires.
///
/// Ends when every notifier is gone; fails if the map owner stopped or the
/// renderer cannot write.
pub async fn render_loop<R: Renderer>(mut view: RenderView, mut renderer: R) -> GameResult<()> {
    while view.redraw.wait().await {
        let frame = view.frame().await?;
        renderer.render(&frame)?;
    }
    Ok(())
}

fn term_color(color: Color) -> TermColor {
    match color {
        Color::Default => TermColor::Reset,
        Color::Red => TermColor::Red,
        Color::Green => TermColor::Green,
        Color::Blue => TermColor::Blue,
        Color::Cyan => TermColor::Cyan,
        Color::Wall => TermColor::Black,
        Color::WallBackground => TermColor::DarkGrey,
        Color::Chest => TermColor::DarkYellow,
    }
}

/// Crossterm renderer over any writer (stdout in the game).
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, frame: &Frame) -> io::Result<()> {
        let out = &mut self.out;
        out.queue(Clear(ClearType::All))?;

        let rows = frame.world.grid.rows();
        for (y, row) in rows.iter().enumerate() {
            out.queue(MoveTo(0, y as u16))?;
            for (x, tile) in row.iter().enumerate() {
                if Position::new(x as i32, y as i32) == frame.world.player {
                    out.queue(SetForegroundColor(term_color(PLAYER_COLOR)))?;
                    out.queue(Print(PLAYER_GLYPH))?;
                } else {
                    out.queue(SetForegroundColor(term_color(tile.foreground)))?;
                    out.queue(SetBackgroundColor(term_color(tile.background)))?;
                    out.queue(Print(tile.symbol))?;
                }
                out.queue(ResetColor)?;
            }
        }

        // NOTE - Status bar under the map
        let bar = rows.len() as u16 + 1;
        let hearts: String = (0..MAX_HIT_POINTS)
            .map(|i| if i < frame.hit_points { '♥' } else { '·' })
            .collect();
        out.queue(MoveTo(0, bar))?;
        out.queue(SetForegroundColor(TermColor::Red))?;
        out.queue(Print(format!("Life: {hearts} {}/{MAX_HIT_POINTS}", frame.hit_points)))?;
        out.queue(ResetColor)?;
        out.queue(Print(format!(
            " | Key: {} | Chests opened: {}",
            if frame.world.key_captured { "yes" } else { "no" },
            frame.world.chests_opened
        )))?;

        out.queue(MoveTo(0, bar + 1))?;
        out.queue(Print(&frame.status))?;
        out.queue(MoveTo(0, bar + 2))?;
        out.queue(Print("WASD/arrows: move | E: interact | ESC: quit"))?;

        out.flush()
    }
}

/// Raw mode and alternate screen for the lifetime of the guard.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.queue(EnterAlternateScreen)?;
        stdout.queue(Hide)?;
        stdout.flush()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.queue(Show);
        let _ = stdout.queue(LeaveAlternateScreen);
        let _ = stdout.flush();
        let _ = disable_raw_mode();
    }
}

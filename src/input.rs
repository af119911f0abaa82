use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::warn;

use crate::types::Direction;

/// Player intents produced by the input collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Interact,
    Move(Direction),
}

/// Maps a terminal event to a player intent. WASD or arrows move, `e` or
/// Enter interacts, Esc, `q` or Ctrl-C quits.
pub fn decode(event: &Event) -> Option<InputEvent> {
    let Event::Key(KeyEvent {
        code,
        modifiers,
        kind,
        ..
    }) = event
    else {
        return None;
    };
    if *kind != KeyEventKind::Press {
        return None;
    }

    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(InputEvent::Quit),
        KeyCode::Esc => Some(InputEvent::Quit),
        KeyCode::Enter => Some(InputEvent::Interact),
        KeyCode::Up => Some(InputEvent::Move(Direction::Up)),
        KeyCode::Down => Some(InputEvent::Move(Direction::Down)),
        KeyCode::Left => Some(InputEvent::Move(Direction::Left)),
        KeyCode::Right => Some(InputEvent::Move(Direction::Right)),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Some(InputEvent::Move(Direction::Up)),
            's' => Some(InputEvent::Move(Direction::Down)),
            'a' => Some(InputEvent::Move(Direction::Left)),
            'd' => Some(InputEvent::Move(Direction::Right)),
            'e' => Some(InputEvent::Interact),
            'q' => Some(InputEvent::Quit),
            _ => None,
        },
        _ => None,
    }
}

/// Reads the terminal on a dedicated thread and forwards decoded intents.
///
/// The thread exits when the receiver is dropped (after the next key press)
/// or when the terminal cannot be read.
pub fn spawn_reader() -> mpsc::Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(event) => {
                    let Some(input) = decode(&event) else {
                        continue;
                    };
                    if tx.blocking_send(input).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "input reader stopped");
                    break;
                }
            }
        }
    });
    rx
}

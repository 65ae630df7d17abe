use anyhow::Result;
use clipstack_common::preview::truncate;
use clipstack_config::PopupAction;
use clipstack_store::{History, SyncPoller};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use unicode_width::UnicodeWidthChar;

use crate::daemon::{ClipboardHold, Daemon};
use crate::input_handler::InputHandler;

/// Longest wait for a key before the loop checks whether a refresh is due.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Rows taken by the title and key hints.
const HEADER_ROWS: u16 = 2;

/// How the popup was left.
#[derive(Debug)]
pub enum Outcome {
    /// The entry was put on the clipboard.
    Picked { text: String, hold: ClipboardHold },
    Cleared,
    Closed,
}

/// What the event loop has to do after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Stay,
    Choose(String),
    Delete(String),
    ClearAll,
    Close,
}

/// Selection state over the rendered history.
#[derive(Debug, Default)]
pub struct PopupView {
    history: History,
    selected: usize,
}

impl PopupView {
    pub fn new(history: History) -> Self {
        PopupView {
            history,
            selected: 0,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Swap in a fresh snapshot, keeping the highlighted entry if it
    /// survived, otherwise the same position.
    pub fn replace(&mut self, history: History) {
        let current = self.history.get(self.selected).map(str::to_string);
        self.selected = current
            .and_then(|text| history.iter().position(|entry| entry == text))
            .unwrap_or(self.selected);
        self.history = history;
        self.clamp();
    }

    pub fn apply(&mut self, action: PopupAction) -> Step {
        match action {
            PopupAction::Up => {
                self.selected = self.selected.saturating_sub(1);
                Step::Stay
            }
            PopupAction::Down => {
                self.selected += 1;
                self.clamp();
                Step::Stay
            }
            PopupAction::Top => {
                self.selected = 0;
                Step::Stay
            }
            PopupAction::Bottom => {
                self.selected = self.history.len().saturating_sub(1);
                Step::Stay
            }
            PopupAction::Select => self.chosen(self.selected, Step::Choose),
            PopupAction::Pick(n) => self.chosen(n.saturating_sub(1), Step::Choose),
            PopupAction::Delete => self.chosen(self.selected, Step::Delete),
            PopupAction::ClearAll => Step::ClearAll,
            PopupAction::Close => Step::Close,
        }
    }

    fn chosen(&self, index: usize, step: fn(String) -> Step) -> Step {
        match self.history.get(index) {
            Some(text) => step(text.to_string()),
            None => Step::Stay,
        }
    }

    fn clamp(&mut self) {
        self.selected = self.selected.min(self.history.len().saturating_sub(1));
    }

    /// Lines for a screen of `cols` x `rows`, header included. Returns the
    /// lines and the screen row of the highlighted entry, if visible.
    pub fn render_lines(&self, cols: u16, rows: u16, max_len: usize) -> (Vec<String>, Option<u16>) {
        let width = cols as usize;
        let mut lines = vec![
            clip(&format!(" clipstack ({} entries)", self.history.len()), width),
            clip(" enter copy  d delete  C clear all  q close", width),
        ];

        if self.history.is_empty() {
            lines.push(clip(" No clipboard history yet", width));
            return (lines, None);
        }

        let visible = rows.saturating_sub(HEADER_ROWS).max(1) as usize;
        let offset = (self.selected + 1).saturating_sub(visible);
        for (i, entry) in self.history.iter().enumerate().skip(offset).take(visible) {
            let line = format!(" {:>2}. {}", i + 1, sanitize(&truncate(entry, max_len)));
            lines.push(clip(&line, width));
        }

        let highlight = HEADER_ROWS + (self.selected - offset) as u16;
        (lines, Some(highlight))
    }
}

/// Control characters would move the cursor around; show them as spaces.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Cut `text` to at most `width` terminal columns.
fn clip(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

/// Puts the terminal into raw mode on the alternate screen and restores it
/// when dropped, including on error paths.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Run the popup until an entry is picked, history is cleared, or it is
/// closed. The terminal is restored before this returns.
pub async fn run_popup(
    daemon: &Daemon,
    poller: &SyncPoller,
    input: &InputHandler,
    max_len: usize,
) -> Result<Outcome> {
    let mut view = PopupView::new(daemon.list());
    let _guard = TerminalGuard::enter()?;
    popup_loop(daemon, poller, input, max_len, &mut view).await
}

async fn popup_loop(
    daemon: &Daemon,
    poller: &SyncPoller,
    input: &InputHandler,
    max_len: usize,
    view: &mut PopupView,
) -> Result<Outcome> {
    let mut stdout = io::stdout();
    let mut dirty = true;
    let mut next_refresh = Instant::now() + poller.interval();

    loop {
        if dirty {
            draw(&mut stdout, view, max_len)?;
            dirty = false;
        }

        let wait = next_refresh
            .saturating_duration_since(Instant::now())
            .min(INPUT_POLL);
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    let step = match input.handle_key(key_event) {
                        Some(action) => view.apply(action),
                        None => Step::Stay,
                    };
                    match step {
                        Step::Stay => dirty = true,
                        Step::Choose(text) => {
                            let hold = daemon.select(&text).await?;
                            return Ok(Outcome::Picked { text, hold });
                        }
                        Step::Delete(text) => {
                            if let Err(e) = daemon.remove(&text).await {
                                warn!("Failed to delete entry: {}", e);
                            }
                            view.replace(daemon.list());
                            dirty = true;
                        }
                        Step::ClearAll => {
                            daemon.clear().await?;
                            return Ok(Outcome::Cleared);
                        }
                        Step::Close => return Ok(Outcome::Closed),
                    }
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }

        if Instant::now() >= next_refresh {
            if let Some(snapshot) = poller.tick(view.history()) {
                debug!("History changed on disk, {} entries", snapshot.len());
                view.replace(snapshot);
                dirty = true;
            }
            next_refresh = Instant::now() + poller.interval();
        }
    }
}

fn draw(stdout: &mut impl Write, view: &PopupView, max_len: usize) -> Result<()> {
    let (cols, rows) = terminal::size()?;
    let (lines, highlight) = view.render_lines(cols, rows, max_len);

    queue!(stdout, terminal::Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        let row = row as u16;
        queue!(stdout, cursor::MoveTo(0, row))?;
        if Some(row) == highlight {
            queue!(
                stdout,
                SetAttribute(Attribute::Reverse),
                Print(line),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(stdout, Print(line))?;
        }
    }
    stdout.flush()?;
    Ok(())
}

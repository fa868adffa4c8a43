use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use common::{millis, TICK_INTERVAL_MS};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::time::MissedTickBehavior;

use crate::views::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Quit,
}

/// Takes over the terminal, runs `view` until it asks to quit, then restores the
/// terminal even if the loop failed.
pub async fn run<V: View>(view: &mut V) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal: Terminal<CrosstermBackend<Stdout>> =
        Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_app(&mut terminal, view).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Fixed-rate foreground loop: drain pending key events, advance the view, redraw.
/// Nothing in here waits on the network.
pub async fn run_app<B: Backend, V: View>(terminal: &mut Terminal<B>, view: &mut V) -> Result<()> {
    let mut ticker = tokio::time::interval(millis(TICK_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_update = Instant::now();

    loop {
        ticker.tick().await;

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(AppCommand::Quit) = view.handle_input(key) {
                return Ok(());
            }
        }

        let now = Instant::now();
        view.update(now.duration_since(last_update));
        last_update = now;

        terminal.draw(|f| view.render(f))?;
    }
}

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use datachat_core::config::AppConfig;
use datachat_core::{PageController, SessionState};
use futures::StreamExt;
use ratatui::backend::Backend;
use tracing::{debug, info};

use crate::terminal_surface::TerminalSurface;

const SCROLL_STEP: usize = 10;

/// What the key loop decided
enum Action {
    Submit(String),
    Quit,
}

/// Run the chat until the user quits. The terminal is restored on every exit
/// path, including errors.
pub async fn run(page: PageController, config: AppConfig, title: String) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &page, &config, title).await;
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    page: &PageController,
    config: &AppConfig,
    title: String,
) -> Result<()> {
    let mut state = SessionState::new();
    let mut surface = TerminalSurface::new(terminal, title, config.image_dir.clone());
    let mut events = EventStream::new();
    let mut pending: Option<String> = None;

    info!(session_id = %state.session_id(), "Session started");
    loop {
        surface.set_busy(true);
        // Failures are already shown on the surface; the session stays usable
        match page
            .run_cycle(&mut state, &mut surface, pending.as_deref())
            .await
        {
            Ok(outcome) => debug!(
                file_id = %outcome.uploaded.id,
                submitted = outcome.submitted,
                "Cycle completed"
            ),
            Err(e) => debug!(error = %e, "Cycle ended with an error"),
        }
        surface.set_busy(false);

        match read_action(&mut surface, &mut events).await? {
            Action::Submit(text) => pending = Some(text),
            Action::Quit => break,
        }
    }
    info!(session_id = %state.session_id(), turns = state.len(), "Session ended");
    Ok(())
}

async fn read_action<B: Backend>(
    surface: &mut TerminalSurface<'_, B>,
    events: &mut EventStream,
) -> Result<Action> {
    while let Some(event) = events.next().await {
        match event? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(action) = handle_key(surface, key) {
                    return Ok(action);
                }
            }
            Event::Resize(_, _) => surface.redraw(),
            _ => {}
        }
    }
    Ok(Action::Quit)
}

fn handle_key<B: Backend>(surface: &mut TerminalSurface<'_, B>, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => return Some(Action::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(Action::Quit);
        }
        KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => {
            let text = surface.take_input();
            if !text.trim().is_empty() {
                return Some(Action::Submit(text));
            }
        }
        KeyCode::PageUp => surface.scroll_up(SCROLL_STEP),
        KeyCode::PageDown => surface.scroll_down(SCROLL_STEP),
        _ => {
            surface.input.input(key);
        }
    }
    surface.redraw();
    None
}

use anyhow::Result;

use crate::usecases::{
    context::AppContext,
    contracts::{AppEventSource, ShellOrchestrator},
};

use super::{terminal::TerminalSession, view};

pub fn start(
    context: &AppContext,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    tracing::info!(
        log_level = %context.config.logging.level,
        api_base_url = %context.config.api.base_url,
        "starting TUI shell"
    );

    let mut terminal = TerminalSession::new()?;
    orchestrator.start();

    while orchestrator.state().is_running() {
        terminal.draw(|frame| view::render(frame, orchestrator.state_mut()))?;
        pump(event_source, orchestrator)?;
    }

    tracing::info!(
        session_expired = orchestrator.state().session_expired(),
        "TUI shell stopped"
    );
    Ok(())
}

/// Feeds at most one event to the orchestrator. Returns whether one was read.
fn pump(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<bool> {
    match event_source.next_event()? {
        Some(event) => {
            orchestrator.handle_event(event)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

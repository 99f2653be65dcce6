use std::{
    sync::{mpsc, Arc},
    time::Duration,
};

use anyhow::Result;
use tokio::runtime::Runtime;

use crate::{
    api::ApiClient,
    cli::{Cli, Command},
    commands::{self, CommandEnv, StdTerminal},
    domain::website::Website,
    infra::{
        self,
        config::AppConfig,
        desktop::{BrowserOpener, SystemClipboard, SystemClock},
        error::AppError,
        workspace_store::TomlWorkspaceStore,
    },
    ui,
    usecases::{
        background::{BackgroundSettings, TokioBackgroundTasks},
        bootstrap,
        context::AppContext,
        contracts::ShellOrchestrator,
        poller::BackoffPolicy,
        session::{clear_local_session, LocalSessionReset},
        shell::{DefaultShellOrchestrator, ShellOptions},
        startup::{plan_startup, StartupFlowState},
        workspace,
    },
};

const CONSOLE_SELECTION_FAILED: &str = "CONSOLE_SELECTION_FAILED";

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    match cli.command_or_default() {
        Command::Run => run_console(&context, &runtime),
        command => run_command(command, &context, &runtime),
    }
}

fn run_command(command: Command, context: &AppContext, runtime: &Runtime) -> Result<()> {
    infra::logging::init(&context.config.logging)?;

    let api = ApiClient::new(&context.config.api, context.layout.cookie_jar_file())?;
    let store = TomlWorkspaceStore::new(context.layout.workspace_file());
    let mut clipboard = SystemClipboard;
    let mut terminal = StdTerminal;

    let result = runtime.block_on(commands::execute(
        command,
        CommandEnv {
            context,
            api: &api,
            store: &store,
            clipboard: &mut clipboard,
            terminal: &mut terminal,
        },
    ));

    match result {
        Ok(output) => {
            print!("{output}");
            Ok(())
        }
        Err(error) => {
            if error.is_unauthorized() {
                forget_expired_session(context, &store);
                for line in session_expired_lines() {
                    eprintln!("{line}");
                }
            }
            Err(error.into())
        }
    }
}

fn run_console(context: &AppContext, runtime: &Runtime) -> Result<()> {
    let _log_guard = infra::logging::init_file(&context.config.logging, &context.layout.logs_dir)?;
    let startup = plan_startup(&context.layout)?;
    tracing::debug!(lock = %startup.lock_guard.path().display(), "console lock acquired");

    let api = Arc::new(ApiClient::new(
        &context.config.api,
        context.layout.cookie_jar_file(),
    )?);
    let store = TomlWorkspaceStore::new(context.layout.workspace_file());
    tracing::info!(api = %api.base_url(), "console backend");

    if startup.state == StartupFlowState::NeedsLogin {
        tracing::info!("no saved session; starting CLI login before the console");
        let grant = runtime.block_on(commands::run_login(
            &mut StdTerminal,
            api.as_ref(),
            &store,
            None,
        ))?;
        tracing::info!(
            role = grant.role.map(|role| role.as_wire()).unwrap_or("unknown"),
            "login finished, launching console"
        );
    }

    let selection = match runtime.block_on(workspace::refresh_selection(api.as_ref(), &store)) {
        Ok(selection) => selection,
        Err(error) if error.is_unauthorized() => {
            forget_expired_session(context, &store);
            for line in session_expired_lines() {
                eprintln!("{line}");
            }
            return Ok(());
        }
        Err(error) => {
            tracing::warn!(
                code = CONSOLE_SELECTION_FAILED,
                error = %error,
                "could not resolve the selected website; history stays unselected"
            );
            None
        }
    };

    let (events_tx, events_rx) = mpsc::channel();
    let tasks = TokioBackgroundTasks::new(
        runtime.handle().clone(),
        Arc::clone(&api),
        events_tx,
        background_settings(&context.config),
    );
    let expiry = LocalSessionReset::new(
        context.layout.cookie_jar_file(),
        TomlWorkspaceStore::new(context.layout.workspace_file()),
    );
    let mut orchestrator = DefaultShellOrchestrator::new(
        tasks,
        BrowserOpener,
        SystemClock,
        expiry,
        shell_options(&context.config, selection.as_ref()),
    );
    let mut event_source = ui::CrosstermEventSource::new(events_rx);

    ui::shell::start(context, &mut event_source, &mut orchestrator)?;

    // The terminal is restored by now, so guidance reaches the operator.
    if orchestrator.state().session_expired() {
        for line in session_expired_lines() {
            eprintln!("{line}");
        }
    }

    Ok(())
}

fn background_settings(config: &AppConfig) -> BackgroundSettings {
    BackgroundSettings {
        policy: BackoffPolicy::new(
            Duration::from_millis(config.polling.interval_ms),
            Duration::from_millis(config.polling.max_backoff_ms),
        ),
        history_limit: config.polling.history_limit,
    }
}

fn shell_options(config: &AppConfig, selection: Option<&Website>) -> ShellOptions {
    ShellOptions {
        config_id: selection.map(|site| site.config_id.clone()),
        website_label: selection.map(|site| site.label().to_owned()),
        reconcile_grace_ms: i64::try_from(config.send.reconcile_grace_ms).unwrap_or(i64::MAX),
    }
}

fn forget_expired_session(context: &AppContext, store: &TomlWorkspaceStore) {
    if let Err(error) = clear_local_session(&context.layout.cookie_jar_file(), store) {
        tracing::warn!(error = %error, "failed to clear expired session");
    }
}

fn session_expired_lines() -> [&'static str; 2] {
    [
        "Your session has expired and the saved login was removed.",
        "Run `livedesk login` to sign in again.",
    ]
}

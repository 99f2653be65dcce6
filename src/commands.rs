//! One-shot administrative commands and their plain-text output.

use std::{fmt::Write as _, fs, io, path::Path};

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use tracing::warn;

use crate::{
    api::ApiClient,
    cli::{Command, UsersCommand, WebsitesCommand, WidgetCommand, WidgetSaveArgs},
    domain::{
        account::{AccountsPage, AdminAccount},
        conversation::Conversation,
        failure::SourceError,
        message::{parse_timestamp, RawMessage},
        website::{SiteStats, Website, WidgetAvatar, WidgetSettings},
    },
    infra::contracts::{ClipboardWriter, WorkspaceStore},
    usecases::{
        accounts::{self, AccountsQuery},
        command_error::CommandError,
        context::AppContext,
        conversations,
        session::{self, AuthSource, Credentials, LoginGrant, WhoAmI},
        stats, websites,
        widget::{self, WidgetChanges},
        workspace::{self, WebsiteListing},
    },
};

const LOGIN_ATTEMPTS: usize = 3;

/// Everything a command may touch.
pub struct CommandEnv<'a> {
    pub context: &'a AppContext,
    pub api: &'a ApiClient,
    pub store: &'a dyn WorkspaceStore,
    pub clipboard: &'a mut dyn ClipboardWriter,
    pub terminal: &'a mut dyn LoginTerminal,
}

/// Runs a non-interactive command and returns what should be printed.
pub async fn execute(command: Command, env: CommandEnv<'_>) -> Result<String, CommandError> {
    let CommandEnv {
        context,
        api,
        store,
        clipboard,
        terminal,
    } = env;
    let history_limit = context.config.polling.history_limit;
    let default_server_url = context.config.widget.server_url.as_str();

    match command {
        Command::Run => Err(CommandError::invalid(
            "`run` starts the console; it is not a one-shot command",
        )),
        Command::Login { phone } => {
            let grant = run_login(terminal, api, store, phone).await?;
            Ok(format_login(&grant))
        }
        Command::Logout => {
            let outcome =
                session::logout(api, &context.layout.cookie_jar_file(), store).await?;
            let mut out = String::from("Logged out. Local session and selection cleared.\n");
            if !outcome.remote_acknowledged {
                out.push_str("The backend could not be reached; its session may stay valid until it expires.\n");
            }
            Ok(out)
        }
        Command::Whoami => Ok(format_whoami(&session::who_am_i(api, store).await?)),
        Command::Websites { action } => match action {
            WebsitesCommand::List => Ok(format_websites(&workspace::list_websites(api, store).await?)),
            WebsitesCommand::Add { url, name } => {
                let message =
                    websites::add_website(api, &websites::NewWebsite { url, name }).await?;
                Ok(acknowledgement("Website added.", message))
            }
            WebsitesCommand::Update {
                website,
                name,
                domain,
            } => {
                let update = websites::WebsiteUpdate {
                    key: website,
                    name,
                    domain,
                };
                let message = websites::update_website(api, &update).await?;
                Ok(acknowledgement("Website updated.", message))
            }
            WebsitesCommand::Delete { website } => {
                let deleted = websites::delete_website(api, store, &website).await?;
                Ok(format!("Deleted {} ({}).\n", deleted.label(), deleted.domain))
            }
            WebsitesCommand::Select { website } => {
                let selected = workspace::select_website(api, store, &website).await?;
                Ok(format!(
                    "Selected {} ({}), config {}.\n",
                    selected.label(),
                    selected.domain,
                    selected.config_id
                ))
            }
        },
        Command::Stats => {
            let site = workspace::require_selected_site(api, store).await?;
            let stats = stats::load_stats(api, &site.config_id).await?;
            Ok(format_stats(&site, &stats))
        }
        Command::Widget { action } => {
            let site = workspace::require_selected_site(api, store).await?;
            match action {
                WidgetCommand::Show => {
                    let settings =
                        widget::show_widget(api, &site.config_id, default_server_url).await?;
                    Ok(format_widget(&site, &settings))
                }
                WidgetCommand::Save(args) => {
                    let changes = widget_changes(args)?;
                    let (settings, message) =
                        widget::save_widget(api, &site.config_id, default_server_url, changes)
                            .await?;
                    Ok(acknowledgement("Widget saved.", message) + &format_widget(&site, &settings))
                }
                WidgetCommand::Reset => {
                    let (settings, message) =
                        widget::reset_widget(api, &site.config_id, default_server_url).await?;
                    Ok(acknowledgement("Widget reset to defaults.", message)
                        + &format_widget(&site, &settings))
                }
            }
        }
        Command::Embed { copy } => {
            let site = workspace::require_selected_site(api, store).await?;
            let snippet = widget::embed_code(
                &context.config.widget.script_url,
                default_server_url,
                &site.config_id,
            );
            let mut out = format!("{snippet}\n");
            if copy {
                match clipboard.copy_text(&snippet) {
                    Ok(()) => out.push_str("Copied to clipboard.\n"),
                    Err(error) => {
                        warn!(code = "EMBED_COPY_FAILED", error = %error, "clipboard copy failed");
                        out.push_str("Could not copy to clipboard.\n");
                    }
                }
            }
            Ok(out)
        }
        Command::Conversations { limit } => {
            let site = workspace::refresh_selection(api, store).await?;
            let config_id = site.as_ref().map(|site| site.config_id.as_str());
            let list = conversations::load_conversations(
                api,
                config_id,
                limit.unwrap_or(history_limit),
            )
            .await?;
            Ok(format_conversations(&list))
        }
        Command::Conversation {
            session_id,
            mark_read,
        } => {
            let site = workspace::refresh_selection(api, store).await?;
            let config_id = site.as_ref().map(|site| site.config_id.as_str());
            let messages =
                conversations::load_conversation_detail(api, config_id, &session_id, history_limit)
                    .await?;
            let mut out = format_conversation(&messages);
            if mark_read {
                conversations::mark_conversation_read(api, &session_id).await?;
                out.push_str("Marked as read.\n");
            }
            Ok(out)
        }
        Command::Users { action } => {
            let current = store.load()?;
            match action {
                UsersCommand::List {
                    page,
                    limit,
                    search,
                } => {
                    let query = AccountsQuery {
                        page,
                        limit,
                        search,
                    };
                    let page = accounts::list_accounts(api, &current, &query).await?;
                    Ok(format_accounts(&page, Utc::now()))
                }
                UsersCommand::SetRole { id, role } => {
                    let message = accounts::set_role(api, &current, &id, role.into()).await?;
                    Ok(acknowledgement("Role updated.", message))
                }
                UsersCommand::Ban { id } => {
                    let message = accounts::set_banned(api, &current, &id, true).await?;
                    Ok(acknowledgement("Account banned.", message))
                }
                UsersCommand::Unban { id } => {
                    let message = accounts::set_banned(api, &current, &id, false).await?;
                    Ok(acknowledgement("Account unbanned.", message))
                }
                UsersCommand::Extend { id, months } => {
                    let message = accounts::extend_expiry(api, &current, &id, months).await?;
                    Ok(acknowledgement("Expiry extended.", message))
                }
                UsersCommand::Delete { id } => {
                    let message = accounts::delete_account(api, &current, &id).await?;
                    Ok(acknowledgement("Account deleted.", message))
                }
            }
        }
    }
}

// =============================================================================
// Login prompts
// =============================================================================

pub trait LoginTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

pub struct StdTerminal;

impl LoginTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        eprintln!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        eprint!("{prompt}");
        io::stderr().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(password) => Ok(Some(password)),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

/// Prompts for credentials until the backend accepts them or attempts run out.
/// A phone given on the command line is reused for every attempt.
pub async fn run_login(
    terminal: &mut dyn LoginTerminal,
    source: &(dyn AuthSource + '_),
    store: &dyn WorkspaceStore,
    phone: Option<String>,
) -> Result<LoginGrant, CommandError> {
    let mut last_error = None;

    for attempt in 1..=LOGIN_ATTEMPTS {
        let phone = match &phone {
            Some(phone) => phone.clone(),
            None => prompt(terminal.prompt_line("Phone number: "))?,
        };
        let password = prompt(terminal.prompt_secret("Password: "))?;
        let credentials = Credentials { phone, password };

        match session::login(source, store, &credentials).await {
            Ok(grant) => return Ok(grant),
            Err(error @ (CommandError::Invalid(_) | CommandError::Source(SourceError::Rejected { .. }))) => {
                warn!(code = "LOGIN_ATTEMPT_FAILED", attempt, error = %error, "login attempt failed");
                terminal
                    .print_line(&format!("Login failed: {error}"))
                    .context("failed to write to terminal")?;
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    Err(last_error.unwrap_or_else(|| CommandError::invalid("login failed")))
}

fn prompt(answer: io::Result<Option<String>>) -> Result<String, CommandError> {
    answer
        .context("failed to read from terminal")?
        .ok_or_else(|| CommandError::invalid("login cancelled"))
}

// =============================================================================
// Output
// =============================================================================

fn acknowledgement(default: &str, message: Option<String>) -> String {
    match message.filter(|message| !message.trim().is_empty()) {
        Some(message) => format!("{message}\n"),
        None => format!("{default}\n"),
    }
}

fn format_login(grant: &LoginGrant) -> String {
    let role = grant.role.map(|role| role.as_wire()).unwrap_or("unknown");
    let mut out = format!("Logged in (role: {role}).\n");
    if grant.role.is_none() {
        out.push_str("The backend did not report a role; admin commands are left to it to refuse.\n");
    }
    out
}

fn format_whoami(who: &WhoAmI) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "email: {}", who.profile.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "phone: {}", who.profile.phone.as_deref().unwrap_or("-"));
    let _ = writeln!(
        out,
        "role: {}",
        who.workspace.role().map(|role| role.as_wire()).unwrap_or("unknown")
    );
    let _ = writeln!(
        out,
        "selected website: {}",
        who.workspace.selected_config_id().unwrap_or("none")
    );
    out
}

fn format_websites(listing: &WebsiteListing) -> String {
    if listing.websites.is_empty() {
        return "No websites yet. Add one with `livedesk websites add <url> --name <name>`.\n"
            .to_owned();
    }

    let mut out = String::new();
    for site in &listing.websites {
        let marker = if listing.selected_config_id.as_deref() == Some(site.config_id.as_str()) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{marker} {:<8} {:<24} {:<28} config {}",
            site.id,
            site.label(),
            site.domain,
            site.config_id
        );
    }
    out
}

fn format_stats(site: &Website, stats: &SiteStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", site.label(), site.domain);
    let _ = writeln!(
        out,
        "Visitors       today {:>6}   this month {:>8}",
        stats.visitors_today, stats.visitors_this_month
    );
    let _ = writeln!(
        out,
        "Page views     today {:>6}   this month {:>8}",
        stats.page_views_today, stats.page_views_this_month
    );
    let rate = stats
        .answer_rate_percent()
        .map(|rate| format!("{rate}%"))
        .unwrap_or_else(|| "-".to_owned());
    let _ = writeln!(
        out,
        "Conversations  answered {:>4}   missed {:>4}   answer rate {rate}",
        stats.conversations_answered, stats.conversations_missed
    );
    let _ = writeln!(
        out,
        "Last 7 days    visitors {:>4}   page views {:>6}",
        stats.visitors_last_7_days, stats.page_views_last_7_days
    );

    for (title, series) in [
        ("Daily visitors", &stats.daily_visitors),
        ("Daily conversations", &stats.daily_conversations),
    ] {
        if series.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for day in series {
            let _ = writeln!(out, "  {:<12} {:>6}", day.date, day.count);
        }
    }
    out
}

fn format_widget(site: &Website, settings: &WidgetSettings) -> String {
    let avatar = match &settings.avatar {
        WidgetAvatar::None => "none".to_owned(),
        WidgetAvatar::Url(url) => url.clone(),
        WidgetAvatar::Upload { file_name, .. } => format!("upload {file_name}"),
    };
    let link_contact = if settings.link_contact.is_empty() {
        "-"
    } else {
        settings.link_contact.as_str()
    };

    let mut out = String::new();
    let _ = writeln!(out, "Widget of {} (config {})", site.label(), site.config_id);
    for (label, value) in [
        ("theme color", settings.theme_color.as_str()),
        ("text color", settings.text_color.as_str()),
        ("title", settings.title.as_str()),
        ("welcome", settings.welcome_message.as_str()),
        ("position", settings.position.as_str()),
        ("history", if settings.history_enabled { "on" } else { "off" }),
        ("server url", settings.server_url.as_str()),
        ("webhook url", settings.webhook_url.as_str()),
        ("contact link", link_contact),
        ("avatar", avatar.as_str()),
    ] {
        let _ = writeln!(out, "  {label:<13} {value}");
    }
    out
}

fn format_conversations(list: &[Conversation]) -> String {
    if list.is_empty() {
        return "No conversations yet.\n".to_owned();
    }

    let mut out = String::new();
    for conversation in list {
        let unread = if conversation.unread_count > 0 {
            format!("{} unread", conversation.unread_count)
        } else {
            String::new()
        };
        let rating = conversation
            .rating
            .map(|rating| format!("rated {}", rating.clamp(0, 5)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}  {:<20} {:<24} {:>3} msgs {:<10} {}",
            format_time(&conversation.last_message_time),
            conversation.session_id,
            one_line(&conversation.customer_name, 24),
            conversation.messages.len(),
            unread,
            rating
        );
    }
    out
}

fn format_conversation(messages: &[RawMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            format_time(&message.timestamp),
            message.sender.label(),
            message.text
        );
    }
    out
}

fn format_accounts(page: &AccountsPage, now: DateTime<Utc>) -> String {
    let totals = &page.totals;
    let mut out = format!(
        "{} accounts ({} admins, {} users, {} banned)\n",
        totals.accounts, totals.admins, totals.users, totals.banned
    );
    for account in &page.accounts {
        let _ = writeln!(out, "{}", account_row(account, now));
    }
    out
}

fn account_row(account: &AdminAccount, now: DateTime<Utc>) -> String {
    let expires = if account.expire_at == "0" || account.expire_at.is_empty() {
        "never".to_owned()
    } else {
        format_time(&account.expire_at)
    };
    format!(
        "{:<8} {:<20} {:<14} {:<6} {:<8} expires {}",
        account.id,
        one_line(&account.name, 20),
        account.phone,
        account.role.as_wire(),
        account.status_at(now).label(),
        expires
    )
}

fn format_time(value: &str) -> String {
    parse_timestamp(value)
        .map(|instant| instant.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "????-??-?? ??:??".to_owned())
}

fn one_line(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Translates `widget save` flags, reading an avatar file when one is given.
fn widget_changes(args: WidgetSaveArgs) -> Result<WidgetChanges, CommandError> {
    let avatar = if args.clear_avatar {
        Some(WidgetAvatar::None)
    } else if let Some(path) = args.avatar_file {
        Some(read_avatar(&path)?)
    } else {
        args.avatar_url
            .map(|url| WidgetAvatar::Url(url.trim().to_owned()))
    };

    Ok(WidgetChanges {
        theme_color: args.theme_color,
        text_color: args.text_color,
        title: args.title,
        welcome_message: args.welcome_message,
        position: args.position,
        history_enabled: args.history_enabled,
        server_url: args.server_url,
        webhook_url: args.webhook_url,
        link_contact: args.link_contact,
        avatar,
    })
}

fn read_avatar(path: &Path) -> Result<WidgetAvatar, CommandError> {
    let bytes = fs::read(path).with_context(|| format!("failed to read avatar {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "avatar".to_owned());
    Ok(WidgetAvatar::Upload { file_name, bytes })
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::account::AccountRole;

#[derive(Debug, Parser)]
#[command(
    name = "livedesk",
    about = "Operator console for the livechat widget backend (CLI + TUI)"
)]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start TUI console
    Run,
    /// Log in with phone number and password
    Login {
        /// Phone number; prompted for when omitted
        #[arg(long)]
        phone: Option<String>,
    },
    /// End the session and forget local state
    Logout,
    /// Show the logged-in operator and selected website
    Whoami,
    /// Manage websites
    Websites {
        #[command(subcommand)]
        action: WebsitesCommand,
    },
    /// Visitor and conversation counters of the selected website
    Stats,
    /// Show or edit the chat widget of the selected website
    Widget {
        #[command(subcommand)]
        action: WidgetCommand,
    },
    /// Print the widget embed snippet of the selected website
    Embed {
        /// Also copy the snippet to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// List conversations of the selected website
    Conversations {
        /// Maximum number of history messages to fetch
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one conversation
    Conversation {
        session_id: String,
        /// Mark the conversation as read
        #[arg(long)]
        mark_read: bool,
    },
    /// Administer operator accounts (admin only)
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum WebsitesCommand {
    List,
    Add {
        url: String,
        #[arg(long)]
        name: String,
    },
    Update {
        /// Website id, config id or domain
        website: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        domain: Option<String>,
    },
    Delete {
        website: String,
    },
    /// Make a website the one the console works on
    Select {
        website: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum WidgetCommand {
    Show,
    Save(WidgetSaveArgs),
    /// Restore default appearance
    Reset,
}

#[derive(Debug, Clone, Default, Args)]
pub struct WidgetSaveArgs {
    #[arg(long)]
    pub theme_color: Option<String>,
    #[arg(long)]
    pub text_color: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub welcome_message: Option<String>,
    /// bottom-right or bottom-left
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long)]
    pub history_enabled: Option<bool>,
    #[arg(long)]
    pub server_url: Option<String>,
    #[arg(long)]
    pub webhook_url: Option<String>,
    #[arg(long)]
    pub link_contact: Option<String>,
    #[arg(long, conflicts_with_all = ["avatar_file", "clear_avatar"])]
    pub avatar_url: Option<String>,
    /// Image to upload as the widget avatar
    #[arg(long, conflicts_with = "clear_avatar")]
    pub avatar_file: Option<PathBuf>,
    #[arg(long)]
    pub clear_avatar: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum UsersCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = crate::usecases::accounts::DEFAULT_PAGE_SIZE)]
        limit: u32,
        #[arg(long, default_value = "")]
        search: String,
    },
    SetRole {
        id: String,
        #[arg(value_enum)]
        role: RoleArg,
    },
    Ban {
        id: String,
    },
    Unban {
        id: String,
    },
    /// Extend the expiry date by 1, 3, 6 or 12 months
    Extend {
        id: String,
        #[arg(long)]
        months: u32,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for AccountRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => AccountRole::Admin,
            RoleArg::User => AccountRole::User,
        }
    }
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_to_run_when_command_is_missing() {
        let cli = Cli::parse_from(["livedesk"]);

        assert!(matches!(cli.command_or_default(), Command::Run));
    }

    #[test]
    fn parses_explicit_run_command() {
        let cli = Cli::parse_from(["livedesk", "run", "--config", "custom.toml"]);

        assert!(matches!(cli.command_or_default(), Command::Run));
        assert_eq!(
            cli.config
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("custom.toml".to_owned())
        );
    }

    #[test]
    fn parses_website_update_with_optional_fields() {
        let cli = Cli::parse_from(["livedesk", "websites", "update", "shop.com", "--name", "Shop"]);

        match cli.command_or_default() {
            Command::Websites {
                action:
                    WebsitesCommand::Update {
                        website,
                        name,
                        domain,
                    },
            } => {
                assert_eq!(website, "shop.com");
                assert_eq!(name.as_deref(), Some("Shop"));
                assert_eq!(domain, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn widget_save_rejects_two_avatar_sources() {
        let result = Cli::try_parse_from([
            "livedesk",
            "widget",
            "save",
            "--avatar-url",
            "https://cdn/a.png",
            "--avatar-file",
            "a.png",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn widget_save_parses_boolean_flag_values() {
        let cli = Cli::parse_from([
            "livedesk",
            "widget",
            "save",
            "--history-enabled",
            "false",
            "--theme-color",
            "#123456",
        ]);

        match cli.command_or_default() {
            Command::Widget {
                action: WidgetCommand::Save(args),
            } => {
                assert_eq!(args.history_enabled, Some(false));
                assert_eq!(args.theme_color.as_deref(), Some("#123456"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn users_list_has_paging_defaults() {
        let cli = Cli::parse_from(["livedesk", "users", "list"]);

        match cli.command_or_default() {
            Command::Users {
                action: UsersCommand::List { page, limit, search },
            } => {
                assert_eq!(page, 1);
                assert_eq!(limit, 10);
                assert!(search.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn set_role_accepts_only_known_roles() {
        let cli = Cli::parse_from(["livedesk", "users", "set-role", "42", "admin"]);
        assert!(matches!(
            cli.command_or_default(),
            Command::Users {
                action: UsersCommand::SetRole {
                    role: RoleArg::Admin,
                    ..
                }
            }
        ));

        assert!(Cli::try_parse_from(["livedesk", "users", "set-role", "42", "owner"]).is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["livedesk", "stats", "-c", "other.toml"]);

        assert!(matches!(cli.command_or_default(), Command::Stats));
        assert!(cli.config.is_some());
    }
}

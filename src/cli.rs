//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Track library books borrowed across library cards.
///
/// Libtrack logs in to each card's library website, lists current
/// checkouts and keeps a local record of due dates and overdue books.
#[derive(Parser, Debug)]
#[command(name = "libtrack")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Database file (defaults to config `database_path`, then ./libtrack.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/libtrack/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync checkouts for every stored card (or one user's cards)
    Sync {
        /// Only sync cards owned by this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Log in with a card and print its checkouts without storing anything
    Fetch {
        /// Library card number
        number: String,
        /// Library card PIN
        pin: String,
        /// Library system identifier
        #[arg(long, default_value = "nwpl")]
        system: String,
    },

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage a user's library cards
    #[command(subcommand)]
    Card(CardCommand),

    /// Manage a user's books
    #[command(subcommand)]
    Book(BookCommand),
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a user
    Add {
        /// Display name
        name: String,
    },
    /// List users
    List,
}

/// Selects the acting user for card and book commands.
#[derive(ClapArgs, Debug, Clone)]
pub struct UserScope {
    /// Acting user id
    #[arg(long, short = 'u')]
    pub user: String,
}

#[derive(Subcommand, Debug)]
pub enum CardCommand {
    /// Register a library card
    Add {
        #[command(flatten)]
        scope: UserScope,
        /// Card number
        #[arg(long)]
        number: String,
        /// Card PIN
        #[arg(long)]
        pin: String,
        /// Label for the card
        #[arg(long)]
        name: String,
        /// Library system identifier
        #[arg(long, default_value = "nwpl")]
        system: String,
    },
    /// List the user's cards (PINs are never shown)
    List {
        #[command(flatten)]
        scope: UserScope,
    },
    /// Change a card's number, PIN or label
    Update {
        #[command(flatten)]
        scope: UserScope,
        /// Card id
        id: String,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        pin: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a card
    Remove {
        #[command(flatten)]
        scope: UserScope,
        /// Card id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BookCommand {
    /// List the user's books
    List {
        #[command(flatten)]
        scope: UserScope,
        /// Only these states (comma-separated: found,checked_out,returned,overdue)
        #[arg(long, value_delimiter = ',')]
        states: Vec<String>,
    },
    /// Add a book by hand
    Add {
        #[command(flatten)]
        scope: UserScope,
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        title: String,
        /// Cover image URL
        #[arg(long)]
        picture_url: Option<String>,
    },
    /// Set the state of one or more books
    SetState {
        #[command(flatten)]
        scope: UserScope,
        /// New state
        state: String,
        /// Book ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete a book
    Remove {
        #[command(flatten)]
        scope: UserScope,
        /// Book id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_sync_without_user() {
        let args = Args::try_parse_from(["libtrack", "sync"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(matches!(args.command, Command::Sync { user: None }));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["libtrack", "sync", "-vv", "--db", "x.db"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.db, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn test_cli_fetch_defaults_to_nwpl() {
        let args = Args::try_parse_from(["libtrack", "fetch", "12345", "6789"]).unwrap();
        match args.command {
            Command::Fetch {
                number,
                pin,
                system,
            } => {
                assert_eq!(number, "12345");
                assert_eq!(pin, "6789");
                assert_eq!(system, "nwpl");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_card_add_requires_user() {
        let result = Args::try_parse_from([
            "libtrack", "card", "add", "--number", "1", "--pin", "2", "--name", "Main",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_book_list_states_are_comma_separated() {
        let args = Args::try_parse_from([
            "libtrack",
            "book",
            "list",
            "--user",
            "u1",
            "--states",
            "overdue,checked_out",
        ])
        .unwrap();
        match args.command {
            Command::Book(BookCommand::List { scope, states }) => {
                assert_eq!(scope.user, "u1");
                assert_eq!(states, ["overdue", "checked_out"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_set_state_requires_ids() {
        let result = Args::try_parse_from(["libtrack", "book", "set-state", "-u", "u1", "returned"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["libtrack", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["libtrack"]).is_err());
    }
}

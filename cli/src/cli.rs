// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, path::PathBuf};

use clap::{ArgMatches, Command, ValueHint, arg, builder::styling, crate_version, value_parser};
use colored::Colorize;
use davsync_core::{APP_NAME, DavSync};
use futures::{FutureExt, future::BoxFuture};
use tracing_subscriber::EnvFilter;

use crate::cmd_connection::{
    CmdConnectionAdd, CmdConnectionEdit, CmdConnectionList, CmdConnectionRemove,
};
use crate::cmd_discover::CmdDiscover;
use crate::cmd_entry::{CmdEntryAdd, CmdEntryEdit, CmdEntryList, CmdEntryRemove, CmdEntryShow};
use crate::cmd_generate_completion::CmdGenerateCompletion;
use crate::cmd_sync::{CmdIndexerSync, CmdPurge, CmdSync, CmdSyncAll};
use crate::config::parse_config;
use crate::util::{arg_verbose, get_verbose};

/// Run the davsync command-line interface.
pub async fn run() -> Result<(), Box<dyn Error>> {
    match Cli::parse() {
        Ok(cli) => {
            init_tracing(cli.verbose);
            if let Err(e) = cli.run().await {
                println!("{} {}", "Error:".red(), e);
            }
        }
        Err(e) => println!("{} {}", "Error:".red(), e),
    };
    Ok(())
}

/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// Whether to log debug output
    pub verbose: bool,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(APP_NAME)
            .about("Discover and incrementally synchronize CalDAV calendars and CardDAV address books.")
            .author("Zexin Yuan <aim@yzx9.xyz>")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                arg!(-c --config [CONFIG] "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $DAVSYNC_CONFIG, then $XDG_CONFIG_HOME/davsync/config.toml \
on Linux and MacOS, %LOCALAPPDATA%/davsync/config.toml on Windows.",
                    )
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath)
                    .global(true),
            )
            .arg(arg_verbose().global(true))
            .subcommand(CmdDiscover::command())
            .subcommand(
                Command::new("connection")
                    .alias("conn")
                    .about("Manage the synchronized collections")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdConnectionAdd::command())
                    .subcommand(CmdConnectionEdit::command())
                    .subcommand(CmdConnectionRemove::command())
                    .subcommand(CmdConnectionList::command()),
            )
            .subcommand(CmdSync::command())
            .subcommand(CmdSyncAll::command())
            .subcommand(CmdIndexerSync::command())
            .subcommand(
                Command::new("entry")
                    .alias("e")
                    .about("Read and edit cached entries")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdEntryList::command())
                    .subcommand(CmdEntryShow::command())
                    .subcommand(CmdEntryAdd::command())
                    .subcommand(CmdEntryEdit::command())
                    .subcommand(CmdEntryRemove::command()),
            )
            .subcommand(CmdPurge::command())
            .subcommand(CmdGenerateCompletion::command())
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(matches)
    }

    /// Parse the specified arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdDiscover::NAME, matches)) => Discover(CmdDiscover::from(matches)),
            Some(("connection", matches)) => match matches.subcommand() {
                Some((CmdConnectionAdd::NAME, matches)) => {
                    ConnectionAdd(CmdConnectionAdd::from(matches))
                }
                Some((CmdConnectionEdit::NAME, matches)) => {
                    ConnectionEdit(CmdConnectionEdit::from(matches))
                }
                Some((CmdConnectionRemove::NAME, matches)) => {
                    ConnectionRemove(CmdConnectionRemove::from(matches))
                }
                Some((CmdConnectionList::NAME, matches)) => {
                    ConnectionList(CmdConnectionList::from(matches))
                }
                _ => unreachable!(),
            },
            Some((CmdSync::NAME, matches)) => Sync(CmdSync::from(matches)),
            Some((CmdSyncAll::NAME, _)) => SyncAll(CmdSyncAll),
            Some((CmdIndexerSync::NAME, _)) => IndexerSync(CmdIndexerSync),
            Some(("entry", matches)) => match matches.subcommand() {
                Some((CmdEntryList::NAME, matches)) => EntryList(CmdEntryList::from(matches)),
                Some((CmdEntryShow::NAME, matches)) => EntryShow(CmdEntryShow::from(matches)),
                Some((CmdEntryAdd::NAME, matches)) => EntryAdd(CmdEntryAdd::from(matches)),
                Some((CmdEntryEdit::NAME, matches)) => EntryEdit(CmdEntryEdit::from(matches)),
                Some((CmdEntryRemove::NAME, matches)) => {
                    EntryRemove(CmdEntryRemove::from(matches))
                }
                _ => unreachable!(),
            },
            Some((CmdPurge::NAME, matches)) => Purge(CmdPurge::from(matches)),
            Some((CmdGenerateCompletion::NAME, matches)) => {
                GenerateCompletion(CmdGenerateCompletion::from(matches))
            }
            _ => unreachable!(),
        };

        let config = matches.get_one("config").cloned();
        let verbose = get_verbose(&matches);
        Ok(Cli {
            config,
            verbose,
            command,
        })
    }

    /// Run the command
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config).await
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// Find collections on a server
    Discover(CmdDiscover),

    /// Register a connection
    ConnectionAdd(CmdConnectionAdd),

    /// Change a connection
    ConnectionEdit(CmdConnectionEdit),

    /// Remove connections
    ConnectionRemove(CmdConnectionRemove),

    /// List connections
    ConnectionList(CmdConnectionList),

    /// Sync one connection
    Sync(CmdSync),

    /// Sync every due connection
    SyncAll(CmdSyncAll),

    /// Sync until one connection has changes
    IndexerSync(CmdIndexerSync),

    /// List cached entries
    EntryList(CmdEntryList),

    /// Print a cached calendar object
    EntryShow(CmdEntryShow),

    /// Upload a new entry
    EntryAdd(CmdEntryAdd),

    /// Replace an entry
    EntryEdit(CmdEntryEdit),

    /// Delete an entry
    EntryRemove(CmdEntryRemove),

    /// Drop the cache of a connection
    Purge(CmdPurge),

    /// Generate shell completion
    GenerateCompletion(CmdGenerateCompletion),
}

impl Commands {
    /// Run the command with the given configuration
    #[rustfmt::skip]
    pub async fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match self {
            Discover(a)         => Self::run_with(config, |x| a.run(x).boxed()).await,
            ConnectionAdd(a)    => Self::run_with(config, |x| a.run(x).boxed()).await,
            ConnectionEdit(a)   => Self::run_with(config, |x| a.run(x).boxed()).await,
            ConnectionRemove(a) => Self::run_with(config, |x| a.run(x).boxed()).await,
            ConnectionList(a)   => Self::run_with(config, |x| a.run(x).boxed()).await,
            Sync(a)             => Self::run_with(config, |x| a.run(x).boxed()).await,
            SyncAll(a)          => Self::run_with(config, |x| a.run(x).boxed()).await,
            IndexerSync(a)      => Self::run_with(config, |x| a.run(x).boxed()).await,
            EntryList(a)        => Self::run_with(config, |x| a.run(x).boxed()).await,
            EntryShow(a)        => Self::run_with(config, |x| a.run(x).boxed()).await,
            EntryAdd(a)         => Self::run_with(config, |x| a.run(x).boxed()).await,
            EntryEdit(a)        => Self::run_with(config, |x| a.run(x).boxed()).await,
            EntryRemove(a)      => Self::run_with(config, |x| a.run(x).boxed()).await,
            Purge(a)            => Self::run_with(config, |x| a.run(x).boxed()).await,
            GenerateCompletion(a) => a.run(),
        }
    }

    async fn run_with<F>(config: Option<PathBuf>, f: F) -> Result<(), Box<dyn Error>>
    where
        F: for<'a> FnOnce(&'a DavSync) -> BoxFuture<'a, Result<(), Box<dyn Error>>>,
    {
        tracing::debug!("parsing configuration...");
        let core_config = parse_config(config).await?;
        let sync = DavSync::new(core_config).await?;

        let result = f(&sync).await;

        sync.close().await;
        result
    }
}

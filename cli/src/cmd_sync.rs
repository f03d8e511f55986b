// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command, arg};
use colored::Colorize;
use davsync_core::{DavSync, SyncOptions, SyncOutcome};

use crate::cmd_connection::{arg_id, get_id};

#[derive(Debug, Clone)]
pub struct CmdSync {
    pub id: i64,
    pub options: SyncOptions,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Synchronize one connection with its server")
            .arg(arg_id())
            .arg(arg!(-f --force "Sync even if the interval has not passed or the collection tag is unchanged"))
            .arg(arg!(--reset "Drop the cached entries and fetch everything again"))
            .arg(arg!(--"override-active" "Sync even if the connection is inactive"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        let mut options = if matches.get_flag("reset") {
            SyncOptions::reset()
        } else {
            SyncOptions::default()
        };
        options.force |= matches.get_flag("force");
        options.override_active = matches.get_flag("override-active");

        Self {
            id: get_id(matches),
            options,
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(id = self.id, ?self.options, "syncing connection...");
        let outcome = sync.sync_connection(self.id, self.options).await?;
        print_outcome(self.id, &outcome);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CmdSyncAll;

impl CmdSyncAll {
    pub const NAME: &str = "sync-all";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Synchronize every connection that is due")
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!("syncing all connections...");
        let results = sync.sync_all_connections().await?;

        let mut failed = 0;
        for (id, result) in &results {
            match result {
                Ok(outcome) => print_outcome(*id, outcome),
                Err(e) => {
                    failed += 1;
                    println!("{} {} {}", format!("[{id}]").bold(), "failed:".red(), e);
                }
            }
        }

        match failed {
            0 => Ok(()),
            n => Err(format!("{n} of {} connections failed to sync", results.len()).into()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CmdIndexerSync;

impl CmdIndexerSync {
    pub const NAME: &str = "indexer-sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Synchronize connections until one has changes, for background indexers")
            .hide(true)
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!("running indexer sync...");
        match sync.indexer_sync_all_connections().await? {
            true => println!("Synced"),
            false => println!("Nothing to sync"),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CmdPurge {
    pub id: i64,
}

impl CmdPurge {
    pub const NAME: &str = "purge";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Delete the cached entries of a connection, forcing a full fetch next time")
            .arg(arg_id())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        let removed = sync.delete_all_entries(self.id).await?;
        println!("Removed {removed} cached entries from connection {}", self.id);
        Ok(())
    }
}

fn print_outcome(id: i64, outcome: &SyncOutcome) {
    let text = match outcome {
        SyncOutcome::Synced(_) => outcome.to_string().green(),
        SyncOutcome::Unchanged => outcome.to_string().normal(),
        SyncOutcome::Skipped(_) => outcome.to_string().yellow(),
    };
    println!("{} {}", format!("[{id}]").bold(), text);
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::error::Error;

use clap::{ArgMatches, Command, arg};
use colored::Colorize;
use davsync_core::{ConnectionDraft, ConnectionType, DavSync, DiscoverResult};

use crate::util::OutputFormat;

#[derive(Debug, Clone)]
pub struct CmdDiscover {
    pub host: String,
    pub username: String,
    pub password: String,
    pub add: bool,

    pub output_format: OutputFormat,
}

impl CmdDiscover {
    pub const NAME: &str = "discover";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Find the calendars and address books offered by a server")
            .arg(arg!(host: <HOST> "Host name, email domain or URL of the server"))
            .arg(arg!(-u --username <USERNAME> "Username for basic authentication"))
            .arg(arg!(-p --password <PASSWORD> "Password for basic authentication"))
            .arg(arg!(--add "Register every collection found as a connection"))
            .arg(OutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        let get = |name: &str| matches.get_one::<String>(name).cloned().unwrap_or_default();
        Self {
            host: get("host"),
            username: get("username"),
            password: get("password"),
            add: matches.get_flag("add"),

            output_format: OutputFormat::from(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(host = %self.host, "discovering collections...");
        let found = sync
            .discover(&self.host, &self.username, &self.password)
            .await?;

        match self.output_format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "calendars": found.calendars,
                    "addressbooks": found.addressbooks,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Table => print_found(&found),
        }

        if self.add {
            let collections = found
                .calendars
                .iter()
                .map(|a| (a, ConnectionType::Calendar))
                .chain(
                    found
                        .addressbooks
                        .iter()
                        .map(|a| (a, ConnectionType::Contacts)),
                );
            for ((uri, name), kind) in collections {
                let mut draft = ConnectionDraft::new(uri.clone(), kind);
                draft.displayname.clone_from(name);
                draft.username.clone_from(&self.username);
                draft.password.clone_from(&self.password);
                let conn = sync.add_connection(draft).await?;
                println!("Added connection {} for {}", conn.id, conn.uri);
            }
        }
        Ok(())
    }
}

fn print_found(found: &DiscoverResult) {
    if found.is_empty() {
        println!("No collections found");
        return;
    }

    print_section("Calendars", &found.calendars);
    print_section("Address books", &found.addressbooks);
}

fn print_section(title: &str, items: &BTreeMap<String, String>) {
    if items.is_empty() {
        return;
    }

    println!("{}", title.bold());
    for (uri, name) in items {
        match name.is_empty() {
            true => println!("  {}", uri.cyan()),
            false => println!("  {}  {}", name, uri.cyan()),
        }
    }
}

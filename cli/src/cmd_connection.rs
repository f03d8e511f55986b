// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{Arg, ArgMatches, Command, arg, value_parser};
use colored::Color;
use davsync_core::{
    Connection, ConnectionDraft, ConnectionPatch, ConnectionType, DavSync, parse_duration,
};

use crate::table::{Column, PaddingDirection, Table};
use crate::util::{OutputFormat, format_timestamp};

#[derive(Debug, Clone)]
pub struct CmdConnectionAdd {
    pub uri: String,
    pub kind: ConnectionType,
    pub displayname: Option<String>,
    pub description: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub syncinterval: Option<i64>,
    pub write: bool,
    pub inactive: bool,

    pub output_format: OutputFormat,
}

impl CmdConnectionAdd {
    pub const NAME: &str = "add";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("new")
            .about("Register a calendar or address book collection")
            .arg(arg!(uri: <URI> "Absolute URL of the collection"))
            .arg(
                Arg::new("type")
                    .short('t')
                    .long("type")
                    .value_name("TYPE")
                    .help("Kind of collection")
                    .value_parser(value_parser!(ConnectionType))
                    .default_value("calendar"),
            )
            .arg(arg_displayname())
            .arg(arg_description())
            .arg(arg_username())
            .arg(arg_password())
            .arg(arg_interval())
            .arg(arg!(--write "Push local edits back to the server"))
            .arg(arg!(--inactive "Exclude the connection from scheduled syncs"))
            .arg(OutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            uri: matches
                .get_one::<String>("uri")
                .expect("uri is required")
                .clone(),
            kind: matches
                .get_one("type")
                .copied()
                .unwrap_or(ConnectionType::Calendar),
            displayname: get_displayname(matches),
            description: get_description(matches),
            username: get_username(matches),
            password: get_password(matches),
            syncinterval: get_interval(matches),
            write: matches.get_flag("write"),
            inactive: matches.get_flag("inactive"),

            output_format: OutputFormat::from(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(uri = %self.uri, "adding connection...");
        let mut draft = ConnectionDraft::new(self.uri, self.kind);
        draft.displayname = self.displayname.unwrap_or_default();
        draft.description = self.description.unwrap_or_default();
        draft.username = self.username.unwrap_or_default();
        draft.password = self.password.unwrap_or_default();
        draft.syncinterval = self.syncinterval;
        draft.write = self.write;
        draft.active = !self.inactive;

        let conn = sync.add_connection(draft).await?;
        print_connections(&[conn], self.output_format)
    }
}

#[derive(Debug, Clone)]
pub struct CmdConnectionEdit {
    pub id: i64,
    pub patch: ConnectionPatch,

    pub output_format: OutputFormat,
}

impl CmdConnectionEdit {
    pub const NAME: &str = "edit";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Change the settings of a connection")
            .arg(arg_id())
            .arg(arg_displayname())
            .arg(arg_description())
            .arg(arg_username())
            .arg(arg_password())
            .arg(arg_interval())
            .arg(
                arg!(--write <BOOL> "Push local edits back to the server")
                    .value_parser(value_parser!(bool)),
            )
            .arg(
                arg!(--active <BOOL> "Include the connection in scheduled syncs")
                    .value_parser(value_parser!(bool)),
            )
            .arg(OutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
            patch: ConnectionPatch {
                displayname: get_displayname(matches),
                description: get_description(matches),
                username: get_username(matches),
                password: get_password(matches),
                syncinterval: get_interval(matches),
                write: matches.get_one("write").copied(),
                active: matches.get_one("active").copied(),
            },

            output_format: OutputFormat::from(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        if self.patch.is_empty() {
            return Err("Nothing to change".into());
        }

        tracing::debug!(id = self.id, "editing connection...");
        let conn = sync.modify_connection(self.id, self.patch).await?;
        print_connections(&[conn], self.output_format)
    }
}

#[derive(Debug, Clone)]
pub struct CmdConnectionRemove {
    pub ids: Vec<i64>,
}

impl CmdConnectionRemove {
    pub const NAME: &str = "remove";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("rm")
            .about("Remove connections and their cached entries")
            .arg(arg_id().num_args(1..))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            ids: matches
                .get_many::<i64>("id")
                .expect("id is required")
                .copied()
                .collect(),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        for id in self.ids {
            tracing::debug!(id, "removing connection...");
            sync.delete_connection(id).await?;
            println!("Removed connection {id}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CmdConnectionList {
    pub output_format: OutputFormat,
}

impl CmdConnectionList {
    pub const NAME: &str = "list";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("ls")
            .about("List the configured connections")
            .arg(OutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            output_format: OutputFormat::from(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!("listing connections...");
        let conns = sync.get_connections().await?;
        print_connections(&conns, self.output_format)
    }
}

fn print_connections(conns: &[Connection], format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(conns)?),
        OutputFormat::Table => {
            let columns = [
                ConnectionColumn::Id,
                ConnectionColumn::Type,
                ConnectionColumn::Flags,
                ConnectionColumn::LastSynced,
                ConnectionColumn::Name,
                ConnectionColumn::Uri,
            ];
            print!("{}", Table::new(&columns, conns));
        }
    }
    Ok(())
}

enum ConnectionColumn {
    Id,
    Type,
    Flags,
    LastSynced,
    Name,
    Uri,
}

impl Column<Connection> for ConnectionColumn {
    fn header(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Type => "TYPE",
            Self::Flags => "FLAGS",
            Self::LastSynced => "SYNCED",
            Self::Name => "NAME",
            Self::Uri => "URI",
        }
    }

    fn format(&self, conn: &Connection) -> String {
        match self {
            Self::Id => conn.id.to_string(),
            Self::Type => conn.kind.to_string(),
            Self::Flags => format!(
                "{}{}",
                if conn.active { "a" } else { "-" },
                if conn.write { "w" } else { "-" }
            ),
            Self::LastSynced => format_timestamp((conn.lastsynced > 0).then_some(conn.lastsynced)),
            Self::Name => conn.displayname.clone(),
            Self::Uri => conn.uri.clone(),
        }
    }

    fn padding_direction(&self) -> PaddingDirection {
        match self {
            Self::Id => PaddingDirection::Right,
            _ => PaddingDirection::Left,
        }
    }

    fn get_color(&self, conn: &Connection) -> Option<Color> {
        match self {
            Self::Id | Self::Flags if !conn.active => Some(Color::BrightBlack),
            Self::Uri => Some(Color::Cyan),
            _ => None,
        }
    }
}

pub fn arg_id() -> Arg {
    arg!(id: <ID> "The id of the connection").value_parser(value_parser!(i64))
}

pub fn get_id(matches: &ArgMatches) -> i64 {
    *matches.get_one::<i64>("id").expect("id is required")
}

fn arg_displayname() -> Arg {
    arg!(-n --name <NAME> "Display name of the connection")
}

fn get_displayname(matches: &ArgMatches) -> Option<String> {
    matches.get_one("name").cloned()
}

fn arg_description() -> Arg {
    arg!(--description <DESCRIPTION> "Description of the connection")
}

fn get_description(matches: &ArgMatches) -> Option<String> {
    matches.get_one("description").cloned()
}

fn arg_username() -> Arg {
    arg!(-u --username <USERNAME> "Username for basic authentication")
}

fn get_username(matches: &ArgMatches) -> Option<String> {
    matches.get_one("username").cloned()
}

fn arg_password() -> Arg {
    arg!(-p --password <PASSWORD> "Password for basic authentication")
}

fn get_password(matches: &ArgMatches) -> Option<String> {
    matches.get_one("password").cloned()
}

fn arg_interval() -> Arg {
    fn parse_interval(s: &str) -> Result<i64, String> {
        match parse_duration(s) {
            Ok(d) if d.num_seconds() >= 0 => Ok(d.num_seconds()),
            Ok(_) => Err("Sync interval must not be negative".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    arg!(-i --interval <INTERVAL> "Minimum time between scheduled syncs, e.g. 30m, 1h, 1d")
        .value_parser(parse_interval)
}

fn get_interval(matches: &ArgMatches) -> Option<i64> {
    matches.get_one("interval").copied()
}

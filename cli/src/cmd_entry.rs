// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command, ValueHint, arg, value_parser};
use colored::Color;
use davsync_core::{AddressbookObject, CalendarObject, ConnectionType, DavSync};

use crate::cmd_connection::{arg_id, get_id};
use crate::table::{Column, Table};
use crate::util::{OutputFormat, format_timestamp, parse_timestamp, read_payload};

#[derive(Debug, Clone)]
pub struct CmdEntryList {
    pub id: i64,
    pub start: Option<i64>,
    pub end: Option<i64>,

    pub output_format: OutputFormat,
}

impl CmdEntryList {
    pub const NAME: &str = "list";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("ls")
            .about("List the cached entries of a connection")
            .arg(arg_id())
            .arg(
                arg!(--start <TIME> "Only events ending after this time")
                    .value_parser(parse_timestamp),
            )
            .arg(
                arg!(--end <TIME> "Only events starting before this time")
                    .value_parser(parse_timestamp),
            )
            .arg(OutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
            start: matches.get_one("start").copied(),
            end: matches.get_one("end").copied(),

            output_format: OutputFormat::from(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(id = self.id, "listing entries...");
        let conn = sync.get_connection(self.id).await?;
        match conn.kind {
            ConnectionType::Calendar => {
                let entries = sync
                    .get_calendar_entries(self.id, self.start, self.end)
                    .await?;
                match self.output_format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                    OutputFormat::Table => {
                        let columns = [
                            EventColumn::Start,
                            EventColumn::End,
                            EventColumn::Component,
                            EventColumn::Uri,
                            EventColumn::Uid,
                        ];
                        print!("{}", Table::new(&columns, &entries));
                    }
                }
            }
            ConnectionType::Contacts => {
                let entries = sync.get_addressbook_entries(self.id).await?;
                match self.output_format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                    OutputFormat::Table => {
                        let columns = [ContactColumn::Name, ContactColumn::Uri];
                        print!("{}", Table::new(&columns, &entries));
                    }
                }
            }
            ConnectionType::IcsFeed => {
                return Err(format!("Connection {} is a feed and has no entries", self.id).into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdEntryShow {
    pub id: i64,
    pub uid: String,
}

impl CmdEntryShow {
    pub const NAME: &str = "show";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Print the cached calendar object with the given UID")
            .arg(arg_id())
            .arg(arg!(uid: <UID> "The UID of the calendar object"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
            uid: matches
                .get_one::<String>("uid")
                .expect("uid is required")
                .clone(),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        let entry = sync
            .get_calendar_entry_by_uid(self.id, &self.uid)
            .await?
            .ok_or_else(|| format!("No calendar object with UID {}", self.uid))?;
        print!("{}", entry.calendar_data);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdEntryAdd {
    pub id: i64,
    pub file: PathBuf,
}

impl CmdEntryAdd {
    pub const NAME: &str = "add";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("new")
            .about("Upload a new iCalendar object or vCard to a writable connection")
            .arg(arg_id())
            .arg(arg_file())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
            file: get_file(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        let payload = read_payload(&self.file).await?;
        let conn = sync.get_connection(self.id).await?;
        let uri = match conn.kind {
            ConnectionType::Contacts => sync.add_addressbook_entry(self.id, &payload).await?,
            _ => sync.add_calendar_entry(self.id, &payload).await?,
        };
        println!("{uri}");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdEntryEdit {
    pub id: i64,
    pub uri: String,
    pub file: PathBuf,
}

impl CmdEntryEdit {
    pub const NAME: &str = "edit";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Replace a cached entry on the server")
            .arg(arg_id())
            .arg(arg_uri())
            .arg(arg_file())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
            uri: get_uri(matches),
            file: get_file(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        let payload = read_payload(&self.file).await?;
        let conn = sync.get_connection(self.id).await?;
        match conn.kind {
            ConnectionType::Contacts => {
                sync.edit_addressbook_entry(self.id, &self.uri, &payload)
                    .await?
            }
            _ => sync.edit_calendar_entry(self.id, &self.uri, &payload).await?,
        }
        println!("Updated {}", self.uri);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdEntryRemove {
    pub id: i64,
    pub uri: String,
}

impl CmdEntryRemove {
    pub const NAME: &str = "remove";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("rm")
            .about("Delete a cached entry on the server")
            .arg(arg_id())
            .arg(arg_uri())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            id: get_id(matches),
            uri: get_uri(matches),
        }
    }

    pub async fn run(self, sync: &DavSync) -> Result<(), Box<dyn Error>> {
        let conn = sync.get_connection(self.id).await?;
        match conn.kind {
            ConnectionType::Contacts => sync.delete_addressbook_entry(self.id, &self.uri).await?,
            _ => sync.delete_calendar_entry(self.id, &self.uri).await?,
        }
        println!("Removed {}", self.uri);
        Ok(())
    }
}

enum EventColumn {
    Start,
    End,
    Component,
    Uri,
    Uid,
}

impl Column<CalendarObject> for EventColumn {
    fn header(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::End => "END",
            Self::Component => "KIND",
            Self::Uri => "URI",
            Self::Uid => "UID",
        }
    }

    fn format(&self, entry: &CalendarObject) -> String {
        match self {
            Self::Start => format_timestamp(entry.first_occurrence),
            Self::End => format_timestamp(entry.last_occurrence),
            Self::Component => entry.component_type.clone(),
            Self::Uri => entry.uri.clone(),
            Self::Uid => entry.uid.clone(),
        }
    }

    fn get_color(&self, _entry: &CalendarObject) -> Option<Color> {
        match self {
            Self::Uid => Some(Color::BrightBlack),
            _ => None,
        }
    }
}

enum ContactColumn {
    Name,
    Uri,
}

impl Column<AddressbookObject> for ContactColumn {
    fn header(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Uri => "URI",
        }
    }

    fn format(&self, entry: &AddressbookObject) -> String {
        match self {
            Self::Name => entry.formatted_name.clone(),
            Self::Uri => entry.uri.clone(),
        }
    }
}

fn arg_uri() -> Arg {
    arg!(uri: <URI> "The resource name of the entry, as listed")
}

fn get_uri(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("uri")
        .expect("uri is required")
        .clone()
}

fn arg_file() -> Arg {
    arg!(file: <FILE> "File holding the payload, or - for stdin")
        .value_parser(value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn get_file(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("file")
        .expect("file is required")
        .clone()
}

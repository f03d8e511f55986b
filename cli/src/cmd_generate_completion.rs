// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::builder::PossibleValuesParser;
use clap::{ArgMatches, Command, ValueHint, arg, value_parser};
use clap_complete::{Shell, generate};
use clap_complete_nushell::Nushell;
use davsync_core::APP_NAME;

use crate::Cli;

const SHELLS: [&str; 6] = ["bash", "elvish", "fish", "nushell", "powershell", "zsh"];

#[derive(Debug, Clone)]
pub struct CmdGenerateCompletion {
    pub shell: String,
    pub output: Option<PathBuf>,
}

impl CmdGenerateCompletion {
    pub const NAME: &str = "generate-completion";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Print a completion script covering every davsync command")
            .hide(true)
            .arg(arg!(shell: <SHELL> "Target shell").value_parser(PossibleValuesParser::new(SHELLS)))
            .arg(
                arg!(-o --output <FILE> "Write the script to a file instead of stdout")
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            shell: matches
                .get_one::<String>("shell")
                .expect("shell is required")
                .clone(),
            output: matches.get_one("output").cloned(),
        }
    }

    pub fn run(self) -> Result<(), Box<dyn Error>> {
        tracing::debug!(shell = %self.shell, output = ?self.output, "generating shell completion...");
        match &self.output {
            Some(path) => self.write_script(&mut File::create(path)?),
            None => self.write_script(&mut io::stdout().lock()),
        }
    }

    pub fn write_script(&self, buf: &mut dyn Write) -> Result<(), Box<dyn Error>> {
        let mut cmd = Cli::command();
        match self.shell.as_str() {
            "nushell" => generate(Nushell {}, &mut cmd, APP_NAME, buf),
            other => generate(Shell::from_str(other)?, &mut cmd, APP_NAME, buf),
        }
        Ok(())
    }
}

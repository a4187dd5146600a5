//! Operator console read from stdin.
//!
//! ```text
//! ban 3            unban 3
//! dump [path]      erase snapshots
//! status           quit
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use sharedraw_core::{ActorId, Canvas, CanvasStats};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Ban(ActorId),
    Unban(ActorId),
    /// Write `dumpState` to the given file, or the configured dump path
    Dump(Option<PathBuf>),
    EraseSnapshots,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminParseError {
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an actor id")]
    MissingActor(&'static str),
    #[error("bad actor id {0:?}")]
    BadActor(String),
}

impl FromStr for AdminCommand {
    type Err = AdminParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let arg = words.next();

        let actor = |name: &'static str| -> Result<ActorId, AdminParseError> {
            let raw = arg.ok_or(AdminParseError::MissingActor(name))?;
            raw.parse().map_err(|_| AdminParseError::BadActor(raw.to_string()))
        };

        match verb {
            "ban" => Ok(Self::Ban(actor("ban")?)),
            "unban" => Ok(Self::Unban(actor("unban")?)),
            "dump" => Ok(Self::Dump(arg.map(PathBuf::from))),
            "erase" if arg == Some("snapshots") => Ok(Self::EraseSnapshots),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(AdminParseError::Unknown(line.trim().to_string())),
        }
    }
}

/// Why the console stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator asked for shutdown
    Quit,
    /// Input ended (stdin closed or redirected from /dev/null)
    InputClosed,
}

const HELP: &str =
    "commands: ban <id> | unban <id> | dump [path] | erase snapshots | status | quit";

pub struct AdminConsole {
    canvas: Canvas,
    dump_path: PathBuf,
}

impl AdminConsole {
    pub fn new(canvas: Canvas, dump_path: impl Into<PathBuf>) -> Self {
        Self {
            canvas,
            dump_path: dump_path.into(),
        }
    }

    /// Run one command, returning the reply for the operator
    pub fn execute(&self, command: AdminCommand) -> Result<String> {
        let reply = match command {
            AdminCommand::Ban(actor) => {
                if self.canvas.ban(actor) {
                    format!("banned {actor}")
                } else {
                    format!("{actor} was already banned")
                }
            }
            AdminCommand::Unban(actor) => {
                if self.canvas.unban(actor) {
                    format!("unbanned {actor}")
                } else {
                    format!("{actor} was not banned")
                }
            }
            AdminCommand::Dump(path) => {
                let path = path.unwrap_or_else(|| self.dump_path.clone());
                write_dump(&path, &self.canvas.dump_state())?;
                format!("state written to {}", path.display())
            }
            AdminCommand::EraseSnapshots => {
                format!("erased {} snapshots", self.canvas.erase_snapshots())
            }
            AdminCommand::Status => status_line(&self.canvas.stats()),
            AdminCommand::Help => HELP.to_string(),
            AdminCommand::Quit => "shutting down".to_string(),
        };
        Ok(reply)
    }

    /// Read commands until `quit` or end of input
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<ConsoleExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read console input")? {
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<AdminCommand>() {
                Ok(command) => command,
                Err(e) => {
                    reply(&mut output, &e.to_string()).await?;
                    continue;
                }
            };
            info!(?command, "admin command");

            let quit = command == AdminCommand::Quit;
            match self.execute(command) {
                Ok(text) => reply(&mut output, &text).await?,
                Err(e) => {
                    warn!("admin command failed: {e:#}");
                    reply(&mut output, &format!("error: {e:#}")).await?;
                }
            }
            if quit {
                return Ok(ConsoleExit::Quit);
            }
        }
        Ok(ConsoleExit::InputClosed)
    }
}

fn status_line(stats: &CanvasStats) -> String {
    format!(
        "version {} | {} shapes | {} markers | {} subscribers | {} banned | {} snapshots",
        stats.version, stats.shapes, stats.markers, stats.subscribers, stats.banned, stats.snapshots
    )
}

fn write_dump(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write dump to {:?}", path))
}

async fn reply<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

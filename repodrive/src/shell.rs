use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use repodrive_core::{EntryKind, RemoteStore};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::sync::clipboard::TransferMode;
use crate::sync::engine::{DirEntry, SyncEngine};
use crate::sync::paths::{Location, join_remote};
use crate::sync::tree::{Node, TreeCache};

const HELP: &str = "\
commands:
  ls                     refresh and list the current folder
  cd <DIR>               enter a folder (`..` goes up, `/` is the root)
  up                     go to the parent folder
  mkdir <NAME>           create a folder
  upload <FILE> [NAME]   upload a local file here
  cat <NAME>             print a file
  rename <OLD> <NEW>     rename a file or folder
  rm <NAME>              delete a file or folder
  copy <NAME>            put an entry on the clipboard for copying
  cut <NAME>             put an entry on the clipboard for moving
  paste                  run the clipboard against the current folder
  clip                   show the clipboard
  clear                  empty the clipboard
  help                   show this text
  exit                   leave the shell";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(String),
    #[error("`{command}` needs {missing}")]
    MissingArgument {
        command: &'static str,
        missing: &'static str,
    },
    #[error("`{0}` got too many arguments")]
    TooManyArguments(&'static str),
    #[error("unterminated quote")]
    UnterminatedQuote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ls,
    Cd(String),
    Up,
    Mkdir(String),
    Upload { file: PathBuf, name: Option<String> },
    Cat(String),
    Rename { from: String, to: String },
    Rm(String),
    Copy(String),
    Cut(String),
    Paste,
    Clip,
    Clear,
    Help,
    Exit,
}

/// Parses one input line; blank lines yield `None`. Names containing spaces
/// can be wrapped in double quotes.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, ParseError> {
    let words = split_words(line)?;
    let Some((head, args)) = words.split_first() else {
        return Ok(None);
    };
    let command = match head.as_str() {
        "ls" => no_args("ls", args, ShellCommand::Ls)?,
        "cd" => ShellCommand::Cd(one_arg("cd", "a folder", args)?),
        "up" => no_args("up", args, ShellCommand::Up)?,
        "mkdir" => ShellCommand::Mkdir(one_arg("mkdir", "a name", args)?),
        "upload" => match args {
            [file] => ShellCommand::Upload {
                file: PathBuf::from(file),
                name: None,
            },
            [file, name] => ShellCommand::Upload {
                file: PathBuf::from(file),
                name: Some(name.clone()),
            },
            [] => {
                return Err(ParseError::MissingArgument {
                    command: "upload",
                    missing: "a local file",
                });
            }
            _ => return Err(ParseError::TooManyArguments("upload")),
        },
        "cat" => ShellCommand::Cat(one_arg("cat", "a name", args)?),
        "rename" => match args {
            [from, to] => ShellCommand::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            [] | [_] => {
                return Err(ParseError::MissingArgument {
                    command: "rename",
                    missing: "an old and a new name",
                });
            }
            _ => return Err(ParseError::TooManyArguments("rename")),
        },
        "rm" => ShellCommand::Rm(one_arg("rm", "a name", args)?),
        "copy" => ShellCommand::Copy(one_arg("copy", "a name", args)?),
        "cut" => ShellCommand::Cut(one_arg("cut", "a name", args)?),
        "paste" => no_args("paste", args, ShellCommand::Paste)?,
        "clip" => no_args("clip", args, ShellCommand::Clip)?,
        "clear" => no_args("clear", args, ShellCommand::Clear)?,
        "help" | "?" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn no_args(
    command: &'static str,
    args: &[String],
    parsed: ShellCommand,
) -> Result<ShellCommand, ParseError> {
    if args.is_empty() {
        Ok(parsed)
    } else {
        Err(ParseError::TooManyArguments(command))
    }
}

fn one_arg(
    command: &'static str,
    missing: &'static str,
    args: &[String],
) -> Result<String, ParseError> {
    match args {
        [value] => Ok(value.clone()),
        [] => Err(ParseError::MissingArgument { command, missing }),
        _ => Err(ParseError::TooManyArguments(command)),
    }
}

fn split_words(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// One line per entry: a kind marker, the name, and the web link if known.
pub fn render_entries(entries: &[DirEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let marker = match entry.kind {
            EntryKind::Dir => 'd',
            EntryKind::File => '-',
        };
        out.push(marker);
        out.push_str("  ");
        out.push_str(&entry.name);
        if let Some(link) = &entry.link {
            out.push_str("  ");
            out.push_str(link);
        }
        out.push('\n');
    }
    out
}

/// Indented outline of everything the cache knows.
pub fn render_tree(tree: &TreeCache) -> String {
    fn walk(node: &Node, depth: usize, out: &mut String) {
        let Some(children) = node.children() else {
            return;
        };
        let (folders, files): (Vec<_>, Vec<_>) = children
            .iter()
            .partition(|(_, child)| child.kind() == EntryKind::Dir);
        for (name, child) in folders.into_iter().chain(files) {
            out.push_str(&"  ".repeat(depth));
            out.push_str(name);
            if child.kind() == EntryKind::Dir {
                out.push('/');
            }
            out.push('\n');
            walk(child, depth + 1, out);
        }
    }

    let mut out = String::from("/\n");
    walk(tree.root(), 1, &mut out);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interactive session: a current folder plus the engine's clipboard.
pub struct Shell<S> {
    engine: SyncEngine<S>,
    cwd: Location,
}

impl<S: RemoteStore> Shell<S> {
    pub fn new(engine: SyncEngine<S>) -> Self {
        Self {
            engine,
            cwd: Location::root(),
        }
    }

    pub fn cwd(&self) -> &Location {
        &self.cwd
    }

    pub fn engine(&self) -> &SyncEngine<S> {
        &self.engine
    }

    pub async fn execute<W: Write>(
        &mut self,
        command: ShellCommand,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        match command {
            ShellCommand::Ls => self.refresh(out).await?,
            ShellCommand::Cd(dir) => {
                let target = if dir == ".." {
                    self.cwd.parent().unwrap_or_else(Location::root)
                } else if let Some(absolute) = dir.strip_prefix('/') {
                    Location::from_remote_path(absolute)?
                } else {
                    Location::from_remote_path(&join_remote(&self.cwd.remote_path(), &dir))?
                };
                self.enter(target, out).await?;
            }
            ShellCommand::Up => {
                let target = self.cwd.parent().unwrap_or_else(Location::root);
                self.enter(target, out).await?;
            }
            ShellCommand::Mkdir(name) => {
                self.engine
                    .create_folder(&self.cwd, &name)
                    .await
                    .with_context(|| format!("mkdir {name}"))?;
                writeln!(out, "created {name}/")?;
            }
            ShellCommand::Upload { file, name } => {
                let name = match name {
                    Some(name) => name,
                    None => file
                        .file_name()
                        .and_then(|name| name.to_str())
                        .map(str::to_string)
                        .with_context(|| format!("cannot derive a name from {}", file.display()))?,
                };
                let bytes = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("read {}", file.display()))?;
                let reference = self
                    .engine
                    .upload(&self.cwd, &name, &bytes)
                    .await
                    .with_context(|| format!("upload {name}"))?;
                writeln!(out, "uploaded {} ({} bytes)", reference.path, bytes.len())?;
            }
            ShellCommand::Cat(name) => {
                let bytes = self
                    .engine
                    .fetch(&self.cwd, &name)
                    .await
                    .with_context(|| format!("cat {name}"))?;
                out.write_all(&bytes)?;
                if !bytes.ends_with(b"\n") {
                    writeln!(out)?;
                }
            }
            ShellCommand::Rename { from, to } => {
                self.engine
                    .rename(&self.cwd, &from, &to)
                    .await
                    .with_context(|| format!("rename {from} to {to}"))?;
                writeln!(out, "renamed {from} to {to}")?;
            }
            ShellCommand::Rm(name) => {
                self.engine
                    .delete(&self.cwd, &name)
                    .await
                    .with_context(|| format!("rm {name}"))?;
                writeln!(out, "deleted {name}")?;
            }
            ShellCommand::Copy(name) => self.queue(&name, TransferMode::Copy, out)?,
            ShellCommand::Cut(name) => self.queue(&name, TransferMode::Move, out)?,
            ShellCommand::Paste => {
                if self.engine.clipboard().is_empty() {
                    writeln!(out, "clipboard is empty")?;
                    return Ok(Flow::Continue);
                }
                let report = self.engine.paste(&self.cwd).await;
                for entry in &report.completed {
                    writeln!(out, "{} {}", entry.mode, entry.name)?;
                }
                for (entry, err) in &report.failed {
                    writeln!(out, "failed to {} {}: {err}", entry.mode, entry.name)?;
                }
                if report.cleared {
                    writeln!(out, "clipboard cleared")?;
                }
            }
            ShellCommand::Clip => {
                let clipboard = self.engine.clipboard();
                if clipboard.is_empty() {
                    writeln!(out, "clipboard is empty")?;
                }
                for entry in clipboard.entries() {
                    writeln!(out, "{:<5} {}/{}", entry.mode.verb(), entry.source, entry.name)?;
                }
            }
            ShellCommand::Clear => {
                self.engine.clipboard_mut().clear();
                writeln!(out, "clipboard cleared")?;
            }
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    async fn enter<W: Write>(&mut self, target: Location, out: &mut W) -> anyhow::Result<()> {
        let entries = self
            .engine
            .list_directory(&target)
            .await
            .with_context(|| format!("cd {target}"))?;
        self.cwd = target;
        out.write_all(render_entries(&entries).as_bytes())?;
        Ok(())
    }

    async fn refresh<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let entries = self
            .engine
            .list_directory(&self.cwd)
            .await
            .with_context(|| format!("ls {}", self.cwd))?;
        out.write_all(render_entries(&entries).as_bytes())?;
        Ok(())
    }

    fn queue<W: Write>(&mut self, name: &str, mode: TransferMode, out: &mut W) -> anyhow::Result<()> {
        self.engine
            .clipboard_add(&self.cwd, name, mode)
            .with_context(|| format!("{mode} {name}"))?;
        let (copies, moves) = self.engine.clipboard().counts();
        writeln!(out, "clipboard: {copies} to copy, {moves} to move")?;
        Ok(())
    }

    /// Reads commands until `exit` or end of input. Failed commands are
    /// reported and the session goes on.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        self.refresh(out).await?;
        loop {
            write!(out, "{}> ", self.cwd)?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                return Ok(());
            };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    writeln!(out, "error: {err}")?;
                    continue;
                }
            };
            match self.execute(command, out).await {
                Ok(Flow::Exit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(err) => writeln!(out, "error: {err:#}")?,
            }
        }
    }
}

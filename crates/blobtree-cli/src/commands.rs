use std::io::Read;

use anyhow::Context;
use blobtree_store::{DriverConfig, FileWriter, InMemoryDriver, StorageDriver, StorageResult};
use blobtree_types::{FileInfo, StoragePath};
use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DriverConfig::default(),
    };
    let script = match &cli.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading script from stdin")?;
            text
        }
    };

    let mut runner = Runner::new(InMemoryDriver::with_config(config), cli.format);
    let summary = runner.run_script(&script, cli.keep_going);
    if cli.format == OutputFormat::Text {
        let failed = if summary.failed > 0 {
            summary.failed.to_string().red().bold()
        } else {
            summary.failed.to_string().green()
        };
        println!("{} ok, {} failed", summary.ok.to_string().bold(), failed);
    }
    if summary.failed > 0 {
        anyhow::bail!("{} command(s) failed", summary.failed);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub ok: usize,
    pub failed: usize,
}

/// Executes script lines against one driver.
pub struct Runner {
    driver: InMemoryDriver,
    format: OutputFormat,
}

impl Runner {
    pub fn new(driver: InMemoryDriver, format: OutputFormat) -> Self {
        Self { driver, format }
    }

    /// Run every command in `script`. Blank lines and `#` comments are
    /// skipped. Stops at the first failure unless `keep_going` is set.
    pub fn run_script(&mut self, script: &str, keep_going: bool) -> Summary {
        let mut summary = Summary::default();
        for (idx, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let result = match ScriptLine::try_parse_from(line.split_whitespace()) {
                Ok(parsed) => {
                    let command = keep_spacing(parsed.command, line);
                    self.execute(command).map_err(|e| format!("{e:#}"))
                }
                Err(e) if e.kind() == ErrorKind::DisplayHelp => {
                    println!("{e}");
                    continue;
                }
                Err(e) => Err(e.to_string()),
            };
            match result {
                Ok(()) => summary.ok += 1,
                Err(message) => {
                    summary.failed += 1;
                    self.report_error(idx + 1, line, message.trim_end());
                    if !keep_going {
                        break;
                    }
                }
            }
        }
        summary
    }

    fn report_error(&self, lineno: usize, line: &str, message: &str) {
        match self.format {
            OutputFormat::Text => {
                eprintln!("{} line {lineno}: {}", "✗".red().bold(), line.dimmed());
                eprintln!("  {message}");
            }
            OutputFormat::Json => {
                println!("{}", json!({ "line": lineno, "command": line, "error": message }));
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Put(args) => self.cmd_put(args),
            Command::Get(args) => self.cmd_read(&args.path, 0),
            Command::Read(args) => self.cmd_read(&args.path, args.offset),
            Command::Write(args) => self.cmd_write(args),
            Command::Stat(args) => self.cmd_stat(args),
            Command::Ls(args) => self.cmd_ls(args),
            Command::Tree(args) => self.cmd_tree(args),
            Command::Mv(args) => self.cmd_mv(args),
            Command::Rm(args) => self.cmd_rm(args),
        }
    }

    fn cmd_put(&self, args: PutArgs) -> anyhow::Result<()> {
        let text = args.text.join(" ");
        self.driver.put_content(&args.path, text.as_bytes())?;
        self.done("put", &args.path, json!({ "size": text.len() }));
        Ok(())
    }

    fn cmd_read(&self, path: &str, offset: i64) -> anyhow::Result<()> {
        let mut content = Vec::new();
        self.driver
            .reader(path, offset)?
            .read_to_end(&mut content)
            .with_context(|| format!("reading {path}"))?;
        let text = String::from_utf8_lossy(&content);
        match self.format {
            OutputFormat::Text => println!("{text}"),
            OutputFormat::Json => println!(
                "{}",
                json!({ "path": StoragePath::new(path), "offset": offset, "content": text })
            ),
        }
        Ok(())
    }

    fn cmd_write(&self, args: WriteArgs) -> anyhow::Result<()> {
        let mut writer = self.driver.writer(&args.path, args.append)?;
        let text = args.text.join(" ");
        let staged = writer.write(text.as_bytes())?;
        if args.cancel {
            writer.cancel()?;
            self.done("cancelled", &args.path, json!({ "staged": staged }));
        } else {
            writer.commit()?;
            let size = writer.size()?;
            self.done("committed", &args.path, json!({ "staged": staged, "size": size }));
        }
        writer.close()?;
        Ok(())
    }

    fn cmd_stat(&self, args: PathArgs) -> anyhow::Result<()> {
        let info = self.driver.stat(&args.path)?;
        match self.format {
            OutputFormat::Text => {
                let kind = if info.is_dir { "directory".blue() } else { "file".normal() };
                println!(
                    "{}  {}  {} bytes  modified {}",
                    info.path.as_str().bold(),
                    kind,
                    info.size,
                    info.modified.to_rfc3339().dimmed()
                );
            }
            OutputFormat::Json => println!("{}", json!(info)),
        }
        Ok(())
    }

    fn cmd_ls(&self, args: PathArgs) -> anyhow::Result<()> {
        let children = self.driver.list(&args.path)?;
        match self.format {
            OutputFormat::Text => {
                for child in &children {
                    println!("{child}");
                }
            }
            OutputFormat::Json => println!("{}", json!(children)),
        }
        Ok(())
    }

    fn cmd_tree(&self, args: TreeArgs) -> anyhow::Result<()> {
        let mut entries = Vec::new();
        walk(&self.driver, &StoragePath::new(&args.path), 0, &mut entries)?;
        match self.format {
            OutputFormat::Text => {
                for (depth, info) in &entries {
                    let indent = "  ".repeat(*depth);
                    let name = info.path.file_name().unwrap_or("");
                    if info.is_dir {
                        println!("{indent}{}", format!("{name}/").blue().bold());
                    } else {
                        println!("{indent}{name} {}", format!("({} bytes)", info.size).dimmed());
                    }
                }
            }
            OutputFormat::Json => {
                let infos: Vec<&FileInfo> = entries.iter().map(|(_, info)| info).collect();
                println!("{}", json!(infos));
            }
        }
        Ok(())
    }

    fn cmd_mv(&self, args: MoveArgs) -> anyhow::Result<()> {
        self.driver.move_path(&args.src, &args.dst)?;
        self.done("moved", &args.src, json!({ "to": StoragePath::new(&args.dst) }));
        Ok(())
    }

    fn cmd_rm(&self, args: PathArgs) -> anyhow::Result<()> {
        self.driver.delete(&args.path)?;
        self.done("deleted", &args.path, json!({}));
        Ok(())
    }

    fn done(&self, action: &str, path: &str, detail: serde_json::Value) {
        let path = StoragePath::new(path);
        match self.format {
            OutputFormat::Text => println!("{} {action} {}", "✓".green(), path.as_str().bold()),
            OutputFormat::Json => {
                println!("{}", json!({ "action": action, "path": path, "detail": detail }))
            }
        }
    }
}

/// Replace the whitespace-split text of `put` and `write` with the raw end
/// of `line`, so runs of spaces and tabs survive. The text is always the
/// final arguments on the line.
fn keep_spacing(command: Command, line: &str) -> Command {
    match command {
        Command::Put(mut args) => {
            args.text = raw_tail(line, args.text.len());
            Command::Put(args)
        }
        Command::Write(mut args) => {
            args.text = raw_tail(line, args.text.len());
            Command::Write(args)
        }
        other => other,
    }
}

/// The last `words` whitespace-separated words of `line`, with the spacing
/// between them kept as written.
fn raw_tail(line: &str, words: usize) -> Vec<String> {
    let mut starts = Vec::new();
    let mut prev_blank = true;
    for (idx, c) in line.char_indices() {
        let blank = c.is_whitespace();
        if !blank && prev_blank {
            starts.push(idx);
        }
        prev_blank = blank;
    }
    match starts.len().checked_sub(words) {
        Some(first) if words > 0 => vec![line[starts[first]..].trim_end().to_string()],
        _ => Vec::new(),
    }
}

/// Depth-first, pre-order walk built from `stat` and `list`.
fn walk(
    driver: &dyn StorageDriver,
    path: &StoragePath,
    depth: usize,
    out: &mut Vec<(usize, FileInfo)>,
) -> StorageResult<()> {
    let info = driver.stat(path.as_str())?;
    let is_dir = info.is_dir;
    out.push((depth, info));
    if is_dir {
        for child in driver.list(path.as_str())? {
            walk(driver, &child, depth + 1, out)?;
        }
    }
    Ok(())
}

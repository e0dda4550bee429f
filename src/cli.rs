use crate::{
    app::App,
    config,
    launcher::SystemSpawner,
    library::{format_timestamp, ModFields, ModPath, ModRecord},
    query::ModQuery,
    session::Session,
    ui,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

struct GlobalOptions {
    format: OutputFormat,
    data_dir: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum CliAction {
    Ui {
        data_dir: Option<PathBuf>,
    },
    Command {
        command: CliCommand,
        format: OutputFormat,
        data_dir: Option<PathBuf>,
    },
}

#[derive(Debug, PartialEq)]
enum CliCommand {
    List {
        name: Option<String>,
        category: Option<String>,
    },
    Categories,
    Show(i64),
    Add(FieldArgs),
    Edit(i64, FieldArgs),
    Delete(i64),
    Run(i64),
    Open(i64, ModPath),
    BaseFolder(BaseFolderAction),
    Help,
    Version,
}

#[derive(Debug, PartialEq)]
enum BaseFolderAction {
    Show,
    Open,
    Set(String),
}

/// Field values given on the command line; unset flags keep the stored value.
#[derive(Debug, Default, PartialEq)]
struct FieldArgs {
    name: Option<String>,
    version: Option<String>,
    category: Option<String>,
    cover_path: Option<String>,
    bat_path: Option<String>,
    blend_path: Option<String>,
    work_path: Option<String>,
    status: Option<String>,
}

impl FieldArgs {
    fn apply(self, mut fields: ModFields) -> ModFields {
        let targets = [
            (self.name, &mut fields.name),
            (self.version, &mut fields.version),
            (self.category, &mut fields.category),
            (self.cover_path, &mut fields.cover_path),
            (self.bat_path, &mut fields.bat_path),
            (self.blend_path, &mut fields.blend_path),
            (self.work_path, &mut fields.work_path),
            (self.status, &mut fields.status),
        ];
        for (value, target) in targets {
            if let Some(value) = value {
                *target = value;
            }
        }
        fields
    }

    fn is_empty(&self) -> bool {
        *self == FieldArgs::default()
    }
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = parse_args(&args)?;
    match action {
        CliAction::Ui { data_dir } => {
            let session = open_session(data_dir)?;
            let mut app = App::new(session)?;
            ui::run(&mut app)
        }
        CliAction::Command {
            command,
            format,
            data_dir,
        } => match command {
            CliCommand::Help => {
                print_help();
                Ok(())
            }
            CliCommand::Version => {
                println!("B4RT Mod Launcher v{}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            _ => {
                let mut session = open_session(data_dir)?;
                run_command(&mut session, command, format)
            }
        },
    }
}

fn open_session(data_dir: Option<PathBuf>) -> Result<Session> {
    let data_dir = config::data_dir(data_dir.as_deref())?;
    Session::open(data_dir)
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    if matches!(args.first().map(|s| s.as_str()), Some("--help" | "-h" | "help")) {
        return Ok(CliAction::Command {
            command: CliCommand::Help,
            format: OutputFormat::Text,
            data_dir: None,
        });
    }
    if matches!(args.first().map(|s| s.as_str()), Some("--version" | "-V" | "version")) {
        return Ok(CliAction::Command {
            command: CliCommand::Version,
            format: OutputFormat::Text,
            data_dir: None,
        });
    }

    let (global, tokens) = parse_global_options(args)?;
    if tokens.is_empty() {
        return Ok(CliAction::Ui {
            data_dir: global.data_dir,
        });
    }

    let command = parse_subcommand(&tokens)?;
    Ok(CliAction::Command {
        command,
        format: global.format,
        data_dir: global.data_dir,
    })
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut format = OutputFormat::Text;
    let mut data_dir = None;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = split_flag(arg);
        match flag {
            "--format" => {
                let value = flag_value(flag, inline, &mut iter)?;
                let Some(parsed) = OutputFormat::parse(&value) else {
                    bail!("Invalid --format value: {value} (expected text or json)");
                };
                format = parsed;
            }
            "--data-dir" => {
                data_dir = Some(PathBuf::from(flag_value(flag, inline, &mut iter)?));
            }
            _ => tokens.push(arg.to_string()),
        }
    }

    Ok((GlobalOptions { format, data_dir }, tokens))
}

fn parse_subcommand(tokens: &[String]) -> Result<CliCommand> {
    let head = tokens[0].as_str();
    let rest = tokens.get(1..).unwrap_or(&[]);
    let command = match head {
        "list" | "ls" => {
            let mut name = None;
            let mut category = None;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                let (flag, inline) = split_flag(arg);
                match flag {
                    "--name" | "--filter" => name = Some(flag_value(flag, inline, &mut iter)?),
                    "--category" => category = Some(flag_value(flag, inline, &mut iter)?),
                    _ => bail!("Unknown list option: {arg}"),
                }
            }
            CliCommand::List { name, category }
        }
        "categories" => CliCommand::Categories,
        "show" => CliCommand::Show(parse_id(rest.first())?),
        "add" => {
            let fields = parse_field_args(rest, false)?;
            if fields.name.is_none() {
                bail!("add requires --name");
            }
            CliCommand::Add(fields)
        }
        "edit" => {
            let id = parse_id(rest.first())?;
            let fields = parse_field_args(rest.get(1..).unwrap_or(&[]), true)?;
            if fields.is_empty() {
                bail!("edit needs at least one field option");
            }
            CliCommand::Edit(id, fields)
        }
        "delete" | "rm" => CliCommand::Delete(parse_id(rest.first())?),
        "run" => CliCommand::Run(parse_id(rest.first())?),
        "open" => {
            let id = parse_id(rest.first())?;
            let target = rest.get(1).map(|value| value.as_str()).unwrap_or("work");
            let Some(which) = ModPath::parse(target) else {
                bail!("Unknown open target: {target} (use cover, script, blend or work)");
            };
            CliCommand::Open(id, which)
        }
        "base-folder" => {
            let sub = rest.first().map(|value| value.as_str()).unwrap_or("show");
            let action = match sub {
                "show" => BaseFolderAction::Show,
                "open" => BaseFolderAction::Open,
                "set" => {
                    let Some(path) = rest.get(1) else {
                        bail!("base-folder set requires a path");
                    };
                    BaseFolderAction::Set(path.to_string())
                }
                _ => bail!("Unknown base-folder action: {sub}"),
            };
            CliCommand::BaseFolder(action)
        }
        "help" => CliCommand::Help,
        "version" => CliCommand::Version,
        _ => bail!("Unknown command: {head} (see `modlauncher help`)"),
    };
    Ok(command)
}

fn parse_field_args(args: &[String], allow_status: bool) -> Result<FieldArgs> {
    let mut fields = FieldArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = split_flag(arg);
        let slot = match flag {
            "--name" => &mut fields.name,
            "--version" => &mut fields.version,
            "--category" => &mut fields.category,
            "--cover" => &mut fields.cover_path,
            "--script" | "--bat" => &mut fields.bat_path,
            "--blend" => &mut fields.blend_path,
            "--work" => &mut fields.work_path,
            "--status" if allow_status => &mut fields.status,
            _ => bail!("Unknown field option: {arg}"),
        };
        *slot = Some(flag_value(flag, inline, &mut iter)?);
    }
    Ok(fields)
}

fn split_flag(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
        _ => (arg, None),
    }
}

fn flag_value<'a>(
    flag: &str,
    inline: Option<&str>,
    iter: &mut impl Iterator<Item = &'a String>,
) -> Result<String> {
    if let Some(value) = inline {
        return Ok(value.to_string());
    }
    match iter.next() {
        Some(value) => Ok(value.to_string()),
        None => bail!("Missing value for {flag}"),
    }
}

fn parse_id(value: Option<&String>) -> Result<i64> {
    let Some(value) = value else {
        bail!("Missing mod id");
    };
    value
        .parse::<i64>()
        .with_context(|| format!("Invalid mod id: {value}"))
}

fn run_command(session: &mut Session, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::List { name, category } => {
            let query = ModQuery::new(name.as_deref(), category.as_deref());
            let listing = session.listing(query)?;
            match format {
                OutputFormat::Json => {
                    let items: Vec<ModItem> = listing.records.iter().map(ModItem::from).collect();
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
                OutputFormat::Text => {
                    if listing.is_empty() {
                        println!("No mods found.");
                    } else {
                        print_mod_table(&listing.records);
                    }
                }
            }
        }
        CliCommand::Categories => {
            let categories = session.categories()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&categories)?),
                OutputFormat::Text => {
                    for category in categories {
                        println!("{category}");
                    }
                }
            }
        }
        CliCommand::Show(id) => {
            let record = session.require(id)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&ModItem::from(&record))?)
                }
                OutputFormat::Text => print_mod_details(&record),
            }
        }
        CliCommand::Add(args) => {
            let fields = args.apply(ModFields::default());
            let id = session.add_mod(&fields)?;
            print_change(format, "added", id)?;
        }
        CliCommand::Edit(id, args) => {
            let current = session.require(id)?;
            let fields = args.apply(current.fields);
            session.edit_mod(id, &fields)?;
            print_change(format, "updated", id)?;
        }
        CliCommand::Delete(id) => {
            if session.delete_mod(id)? {
                print_change(format, "deleted", id)?;
            } else if format == OutputFormat::Json {
                print_change(format, "not_found", id)?;
            } else {
                println!("No mod with id {id}; nothing deleted.");
            }
        }
        CliCommand::Run(id) => {
            let started_at = session.run_mod(&mut SystemSpawner, id)?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&RunResult { id, started_at })?
                ),
                OutputFormat::Text => println!(
                    "Started mod #{id} at {}",
                    format_timestamp(started_at).unwrap_or_else(|| started_at.to_string())
                ),
            }
        }
        CliCommand::Open(id, which) => {
            let path = session.open_mod_path(&mut SystemSpawner, id, which)?;
            print_path(format, which.label(), &path)?;
        }
        CliCommand::BaseFolder(action) => {
            let path = match action {
                BaseFolderAction::Show => session.base_folder(),
                BaseFolderAction::Open => session.open_base_folder(&mut SystemSpawner)?,
                BaseFolderAction::Set(raw) => session.set_base_folder(&raw)?,
            };
            print_path(format, "base folder", &path)?;
        }
        CliCommand::Help | CliCommand::Version => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct ModItem<'a> {
    id: i64,
    name: &'a str,
    version: &'a str,
    category: &'a str,
    cover_path: &'a str,
    bat_path: &'a str,
    blend_path: &'a str,
    work_path: &'a str,
    status: &'a str,
    last_run: i64,
    last_run_label: Option<String>,
}

impl<'a> From<&'a ModRecord> for ModItem<'a> {
    fn from(record: &'a ModRecord) -> Self {
        let fields = &record.fields;
        Self {
            id: record.id,
            name: &fields.name,
            version: &fields.version,
            category: &fields.category,
            cover_path: &fields.cover_path,
            bat_path: &fields.bat_path,
            blend_path: &fields.blend_path,
            work_path: &fields.work_path,
            status: &fields.status,
            last_run: fields.last_run,
            last_run_label: fields.has_run().then(|| fields.last_run_label()),
        }
    }
}

#[derive(Serialize)]
struct ChangeResult {
    id: i64,
    action: &'static str,
}

#[derive(Serialize)]
struct RunResult {
    id: i64,
    started_at: i64,
}

#[derive(Serialize)]
struct PathResult<'a> {
    label: &'a str,
    path: String,
}

fn print_mod_table(records: &[ModRecord]) {
    println!(
        "{:>4}  {:<28} {:<8} {:<14} {:<8} {:<16}",
        "ID", "NAME", "VERSION", "CATEGORY", "STATUS", "LAST RUN"
    );
    for record in records {
        let fields = &record.fields;
        println!(
            "{:>4}  {:<28} {:<8} {:<14} {:<8} {:<16}",
            record.id,
            truncate(&fields.name, 28),
            truncate(&fields.version, 8),
            truncate(&fields.category, 14),
            truncate(&fields.status, 8),
            fields.last_run_label()
        );
    }
}

fn print_mod_details(record: &ModRecord) {
    let fields = &record.fields;
    let rows = [
        ("Id", record.id.to_string()),
        ("Name", fields.name.clone()),
        ("Version", fields.version.clone()),
        ("Category", fields.category.clone()),
        ("Status", fields.status.clone()),
        ("Last run", fields.last_run_label()),
        ("Cover", fields.cover_path.clone()),
        ("Script", fields.bat_path.clone()),
        ("Blend", fields.blend_path.clone()),
        ("Project", fields.work_path.clone()),
    ];
    for (label, value) in rows {
        let value = if value.is_empty() { "-".to_string() } else { value };
        println!("{label:<9} {value}");
    }
}

fn print_change(format: OutputFormat, action: &'static str, id: i64) -> Result<()> {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&ChangeResult { id, action })?
        ),
        OutputFormat::Text => println!("Mod #{id} {action}."),
    }
    Ok(())
}

fn print_path(format: OutputFormat, label: &str, path: &std::path::Path) -> Result<()> {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&PathResult {
                label,
                path: path.display().to_string(),
            })?
        ),
        OutputFormat::Text => println!("{label}: {}", path.display()),
    }
    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn print_help() {
    println!("B4RT Mod Launcher v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  modlauncher                         Start the terminal UI");
    println!("  modlauncher list [--name TEXT] [--category NAME]");
    println!("  modlauncher categories");
    println!("  modlauncher show <id>");
    println!("  modlauncher add --name NAME [--version V] [--category C]");
    println!("                  [--cover PATH] [--script PATH] [--blend PATH] [--work PATH]");
    println!("  modlauncher edit <id> [field options] [--status STATUS]");
    println!("  modlauncher delete <id>");
    println!("  modlauncher run <id>");
    println!("  modlauncher open <id> [cover|script|blend|work]");
    println!("  modlauncher base-folder [show|open|set <path>]");
    println!("  modlauncher help | version");
    println!();
    println!("Global options:");
    println!("  --format text|json   Output format (default: text)");
    println!("  --data-dir PATH      Use PATH instead of the default data directory");
    println!();
    println!("A category of __all__ lists every category.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|value| value.to_string()).collect()
    }

    fn command(raw: &[&str]) -> CliCommand {
        match parse_args(&args(raw)).unwrap() {
            CliAction::Command { command, .. } => command,
            CliAction::Ui { .. } => panic!("expected a command"),
        }
    }

    #[test]
    fn no_arguments_starts_ui() {
        assert_eq!(parse_args(&[]).unwrap(), CliAction::Ui { data_dir: None });
        assert_eq!(
            parse_args(&args(&["--data-dir", "/tmp/mods"])).unwrap(),
            CliAction::Ui {
                data_dir: Some(PathBuf::from("/tmp/mods"))
            }
        );
    }

    #[test]
    fn global_options_anywhere() {
        let action = parse_args(&args(&["list", "--format=json", "--category", "Rigging"])).unwrap();
        assert_eq!(
            action,
            CliAction::Command {
                command: CliCommand::List {
                    name: None,
                    category: Some("Rigging".to_string()),
                },
                format: OutputFormat::Json,
                data_dir: None,
            }
        );
        assert!(parse_args(&args(&["--format", "xml", "list"])).is_err());
    }

    #[test]
    fn add_requires_name() {
        assert!(parse_args(&args(&["add", "--version", "1.0"])).is_err());
        let CliCommand::Add(fields) = command(&["add", "--name=Jump Cycle", "--bat", "run.bat"])
        else {
            panic!("expected add");
        };
        assert_eq!(fields.name.as_deref(), Some("Jump Cycle"));
        assert_eq!(fields.bat_path.as_deref(), Some("run.bat"));
    }

    #[test]
    fn status_only_accepted_on_edit() {
        assert!(parse_args(&args(&["add", "--name", "A", "--status", "Running"])).is_err());
        assert_eq!(
            command(&["edit", "4", "--status", "Ready"]),
            CliCommand::Edit(
                4,
                FieldArgs {
                    status: Some("Ready".to_string()),
                    ..FieldArgs::default()
                }
            )
        );
        assert!(parse_args(&args(&["edit", "4"])).is_err());
    }

    #[test]
    fn ids_and_targets_are_validated() {
        assert!(parse_args(&args(&["show", "abc"])).is_err());
        assert!(parse_args(&args(&["run"])).is_err());
        assert_eq!(command(&["open", "2", "blend"]), CliCommand::Open(2, ModPath::Blend));
        assert_eq!(
            command(&["open", "2"]),
            CliCommand::Open(2, ModPath::WorkFolder)
        );
        assert!(parse_args(&args(&["open", "2", "texture"])).is_err());
    }

    #[test]
    fn base_folder_actions() {
        assert_eq!(
            command(&["base-folder"]),
            CliCommand::BaseFolder(BaseFolderAction::Show)
        );
        assert_eq!(
            command(&["base-folder", "set", "/projects"]),
            CliCommand::BaseFolder(BaseFolderAction::Set("/projects".to_string()))
        );
        assert!(parse_args(&args(&["base-folder", "set"])).is_err());
    }

    #[test]
    fn edit_merges_over_stored_fields() {
        let stored = ModFields {
            version: "1.0".to_string(),
            category: "Animation".to_string(),
            ..ModFields::named("Jump Cycle")
        };
        let merged = FieldArgs {
            version: Some("1.1".to_string()),
            ..FieldArgs::default()
        }
        .apply(stored);
        assert_eq!(merged.name, "Jump Cycle");
        assert_eq!(merged.version, "1.1");
        assert_eq!(merged.category, "Animation");
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }
}

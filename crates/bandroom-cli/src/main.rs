//! Bandroom CLI
//!
//! Command-line interface for Bandroom - students, instruments, and who has
//! which instrument.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::error;

use bandroom_core::{Config, Instrument, InventoryStore, StorageError, Student, Table};

mod commands;
mod logging;
mod output;
#[cfg(test)]
mod testing;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "bandroom")]
#[command(about = "Bandroom - music school instrument inventory")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log every SQL statement
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/bandroom/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store file and tables
    Init,
    /// Show store location and row counts
    Status,
    /// Manage students
    Student {
        #[command(subcommand)]
        command: StudentCommands,
    },
    /// Manage instruments
    Instrument {
        #[command(subcommand)]
        command: InstrumentCommands,
    },
    /// Assign an instrument to a student
    Assign {
        /// Instrument id
        instrument_id: i64,
        /// Student id
        student_id: i64,
        /// Notes about this assignment
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// List all assignments
    Assignments,
    /// Print every row of a table (instruments, students, inventory)
    Dump {
        /// Table name
        table: Table,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Add a student, or update the one with the same name and date of birth
    #[command(alias = "update")]
    Add(StudentArgs),
    /// List all students
    #[command(alias = "ls")]
    List,
}

#[derive(Args)]
struct StudentArgs {
    firstname: String,
    lastname: String,
    /// Date of birth, e.g. 04/19/1998
    dob: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    state: String,
    #[arg(long, default_value = "")]
    zip: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(short, long, default_value = "")]
    notes: String,
}

impl From<StudentArgs> for Student {
    fn from(args: StudentArgs) -> Self {
        Student {
            firstname: args.firstname,
            lastname: args.lastname,
            dob: args.dob,
            address: args.address,
            city: args.city,
            state: args.state,
            zip: args.zip,
            phone: args.phone,
            notes: args.notes,
        }
    }
}

#[derive(Subcommand)]
enum InstrumentCommands {
    /// Add an instrument, or update the one with the same serial number
    #[command(alias = "update")]
    Add {
        /// Kind of instrument, e.g. flute
        #[arg(value_name = "TYPE")]
        kind: String,
        /// Serial number
        serial_num: String,
        /// Manufacturer
        #[arg(short, long, default_value = "")]
        maker: String,
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// List all instruments
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, db_file, max_attempts, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config);

    // Any store error ends the process; there is nothing to recover here.
    match run(cli, config, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "command failed");
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e
                .downcast_ref::<StorageError>()
                .and_then(StorageError::recovery_suggestion)
            {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Load configuration and apply `--db` / `--verbose`
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;

    if let Some(ref db) = cli.db {
        config.db_file = if db.is_absolute() {
            db.clone()
        } else {
            std::env::current_dir()
                .context("Failed to resolve current directory")?
                .join(db)
        };
    }
    if cli.verbose {
        config.verbose = true;
    }
    Ok(config)
}

fn run(cli: Cli, config: Config, output: &Output) -> Result<()> {
    // Config commands work on the config file, not the store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(cli.config.as_ref(), output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key.clone(), value.clone(), cli.config.as_ref(), output)
            }
        };
    }

    let store = InventoryStore::open_with_config(config).context("Failed to open inventory store")?;

    match cli.command {
        Commands::Init => {
            output.success(&format!("Store ready at {}", store.path().display()));
            Ok(())
        }
        Commands::Status => commands::status::show(&store, output),
        Commands::Student { command } => match command {
            StudentCommands::Add(args) => commands::student::add(&store, args.into(), output),
            StudentCommands::List => commands::student::list(&store, output),
        },
        Commands::Instrument { command } => match command {
            InstrumentCommands::Add {
                kind,
                serial_num,
                maker,
                notes,
            } => {
                let instrument = Instrument {
                    kind,
                    serial_num,
                    maker,
                    notes,
                };
                commands::instrument::add(&store, instrument, output)
            }
            InstrumentCommands::List => commands::instrument::list(&store, output),
        },
        Commands::Assign {
            instrument_id,
            student_id,
            notes,
        } => commands::inventory::assign(&store, instrument_id, student_id, notes, output),
        Commands::Assignments => commands::inventory::list(&store, output),
        Commands::Dump { table } => commands::inventory::dump(&store, table, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EnvGuard;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_student_add() {
        let cli = Cli::try_parse_from([
            "bandroom",
            "student",
            "add",
            "Logan",
            "Reid",
            "04/19/1998",
            "--city",
            "Austin",
            "-n",
            "needs to practice more",
        ])
        .unwrap();

        match cli.command {
            Commands::Student {
                command: StudentCommands::Add(args),
            } => {
                let student: Student = args.into();
                assert_eq!(student.key().firstname, "Logan");
                assert_eq!(student.city, "Austin");
                assert_eq!(student.notes, "needs to practice more");
                assert_eq!(student.zip, "");
            }
            _ => panic!("expected student add"),
        }
    }

    #[test]
    fn test_parse_dump_table() {
        let cli = Cli::try_parse_from(["bandroom", "--json", "dump", "inventory"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Dump {
                table: Table::Inventory
            }
        ));

        assert!(Cli::try_parse_from(["bandroom", "dump", "sqlite_master"]).is_err());
    }

    #[test]
    fn test_db_flag_overrides_store_path() {
        let _guard = EnvGuard::clean();
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("band.db");
        let missing_config = dir.path().join("config.toml");

        let cli = Cli::try_parse_from([
            "bandroom",
            "--config",
            missing_config.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "-v",
            "status",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.db_path(), db);
        assert!(config.verbose);
    }

    #[test]
    fn test_verbose_flag_beats_environment() {
        let _guard = EnvGuard::clean();
        std::env::set_var("BANDROOM_VERBOSE", "false");
        std::env::set_var("BANDROOM_DB_FILE", "/srv/elsewhere.db");
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("band.db");
        let missing_config = dir.path().join("config.toml");

        let cli = Cli::try_parse_from([
            "bandroom",
            "--config",
            missing_config.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "-v",
            "status",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.db_path(), db);
        assert!(config.verbose);
    }

    #[test]
    fn test_run_end_to_end() {
        let _guard = EnvGuard::clean();
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("band.db");
        let output = Output::new(OutputFormat::Quiet);
        let args = |extra: &[&'static str]| {
            let mut argv: Vec<String> = vec!["bandroom".into(), "-q".into(), "--db".into()];
            argv.push(db.display().to_string());
            argv.extend(extra.iter().map(|s| s.to_string()));
            Cli::try_parse_from(argv).unwrap()
        };

        for argv in [
            &["student", "add", "Logan", "Reid", "04/19/1998"][..],
            &["instrument", "add", "flute", "12345", "--maker", "bach"][..],
            &["assign", "1", "1", "--notes", "fall term"][..],
            &["assign", "1", "1", "--notes", "fall term"][..],
        ] {
            let cli = args(argv);
            let config = load_config(&cli).unwrap();
            run(cli, config, &output).unwrap();
        }

        let store = InventoryStore::open_at(&db).unwrap();
        assert_eq!(store.count(Table::Students).unwrap(), 1);
        assert_eq!(store.count(Table::Instruments).unwrap(), 1);
        assert_eq!(store.count(Table::Inventory).unwrap(), 2);
    }
}

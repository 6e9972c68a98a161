use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use factweave::config::ContextProfile;
use factweave::types::SectionKind;
use factweave::validation::EnforcementLevel;

/// Parse section kind from string
fn parse_section(s: &str) -> Result<SectionKind, String> {
    s.parse::<SectionKind>().map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "factweave")]
#[command(
    version,
    about = "Fact-grounded documentation generator for source repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        long,
        short,
        global = true,
        env = "FACTWEAVE_CONFIG_FILE",
        help = "Use this config file instead of the global and project ones"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect facts about a repository
    Analyze {
        #[arg(help = "Repository root", default_value = ".")]
        path: PathBuf,
        #[arg(long, help = "Repository URL recorded in the facts")]
        repo_url: Option<String>,
        #[arg(long, help = "Commit recorded in the facts (default: read from .git)")]
        commit: Option<String>,
        #[arg(long, short, help = "Write facts to this file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(short = 'f', long, default_value = "json", help = "Output format: json, yaml")]
        format: String,
    },

    /// Build the context pack of one section
    Context {
        #[arg(help = "Facts document (JSON or YAML)")]
        facts: PathBuf,
        #[arg(long, short, value_parser = parse_section, help = "Section: outline, theory, practice, conclusion")]
        section: SectionKind,
        #[arg(long, help = "Context profile: fast, default, heavy")]
        profile: Option<ContextProfile>,
        #[arg(long = "synopsis", help = "Generated dependency section, named <section>.md")]
        synopses: Vec<PathBuf>,
        #[arg(long, help = "Document id (default: repository URL)")]
        document_id: Option<String>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Generate the document through an external generator program
    Generate {
        #[arg(help = "Facts document (JSON or YAML)")]
        facts: PathBuf,
        #[arg(long, help = "Generator program, called once per section")]
        command: String,
        #[arg(long = "arg", allow_hyphen_values = true, help = "Argument passed to the generator (repeatable)")]
        args: Vec<String>,
        #[arg(long, short, default_value = "docs", help = "Output directory")]
        output: PathBuf,
        #[arg(long, value_parser = parse_section, help = "Only generate this section and its dependencies")]
        only: Option<SectionKind>,
        #[arg(long, value_parser = parse_section, help = "Run the grounded editor over this section")]
        edit: Option<SectionKind>,
        #[arg(long, help = "Editor enforcement level: L1, L2, L3")]
        level: Option<EnforcementLevel>,
        #[arg(long, help = "Document id (default: repository URL)")]
        document_id: Option<String>,
    },

    /// Validate generated sections
    Check {
        #[command(subcommand)]
        action: CheckAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CheckAction {
    /// Score a practice section
    Practice {
        file: PathBuf,
        #[arg(long, help = "Fail when required checks do not pass")]
        strict: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Quality report over section files or directories of markdown files
    Quality {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, value_delimiter = ',', help = "Sections that must be present")]
        expect: Vec<String>,
        #[arg(long, help = "Fail when the report has warnings")]
        strict: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, markdown, json"
        )]
        format: String,
    },
    /// Check an editor answer against the facts its context pack offered
    Edit {
        output: PathBuf,
        #[arg(long, help = "Context pack the edit was made with")]
        pack: PathBuf,
        #[arg(long, help = "Enforcement level: L1, L2, L3 (default: from config)")]
        level: Option<EnforcementLevel>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mfactweave encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Analyze {
            path,
            repo_url,
            commit,
            output,
            format,
        } => {
            use factweave::cli::commands::analyze::AnalyzeOptions;

            let rt = Runtime::new()?;
            rt.block_on(factweave::cli::commands::analyze::run(AnalyzeOptions {
                path,
                repo_url,
                commit,
                output,
                format,
                config: cli.config.clone(),
            }))?;
        }
        Commands::Context {
            facts,
            section,
            profile,
            synopses,
            document_id,
            format,
        } => {
            use factweave::cli::commands::context::ContextOptions;

            factweave::cli::commands::context::run(ContextOptions {
                facts,
                section,
                profile,
                synopses,
                document_id,
                format,
                config: cli.config.clone(),
            })?;
        }
        Commands::Generate {
            facts,
            command,
            args,
            output,
            only,
            edit,
            level,
            document_id,
        } => {
            use factweave::cli::commands::generate::GenerateOptions;

            let rt = Runtime::new()?;
            rt.block_on(factweave::cli::commands::generate::run(GenerateOptions {
                facts,
                command,
                args,
                output,
                only,
                edit,
                level,
                document_id,
                config: cli.config.clone(),
            }))?;
        }
        Commands::Check { action } => match action {
            CheckAction::Practice {
                file,
                strict,
                format,
            } => {
                factweave::cli::commands::check::practice(&file, strict, &format, config)?;
            }
            CheckAction::Quality {
                paths,
                expect,
                strict,
                format,
            } => {
                factweave::cli::commands::check::quality(&paths, &expect, strict, &format, config)?;
            }
            CheckAction::Edit {
                output,
                pack,
                level,
            } => {
                factweave::cli::commands::check::edit(&output, &pack, level, config)?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                factweave::cli::commands::config::show(&format, config)?;
            }
            ConfigAction::Path => {
                factweave::cli::commands::config::path()?;
            }
        },
    }

    Ok(())
}

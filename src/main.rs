use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use screenshot_organiser::{
    app,
    config::{Config, Settings},
    error::ConfigError,
    models::DetailLevel,
    providers::Provider,
};

fn cli() -> Command {
    Command::new("shotshelf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watch a folder and sort screenshots into named, dated files using a vision model")
        .subcommand(
            Command::new("config")
                .about("Configuration management")
                .subcommand(Command::new("show").about("Show the configuration file"))
                .subcommand(
                    Command::new("init").about("Write a default configuration file"),
                ),
        )
        .arg(
            Arg::new("watch-dir")
                .help("Directory the screenshots land in")
                .value_parser(clap::value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("DIR")
                .help("Where organised screenshots go (default: <WATCH_DIR>/sorted)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("backup")
                .long("backup")
                .value_name("DIR")
                .help("Where originals are copied before moving (default: <WATCH_DIR>/backup)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .value_parser(["openai", "ollama"])
                .help("Vision provider"),
        )
        .arg(Arg::new("model").long("model").short('m').help("Model name"))
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Provider endpoint"),
        )
        .arg(
            Arg::new("detail")
                .long("detail")
                .value_parser(["low", "high", "auto"])
                .help("Image detail level sent to the model"),
        )
        .arg(
            Arg::new("pattern")
                .long("pattern")
                .value_name("REGEX")
                .help("Which file names count as screenshots"),
        )
        .arg(
            Arg::new("case-sensitive")
                .long("case-sensitive")
                .help("Match the pattern case-sensitively")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("watch")
                .long("watch")
                .short('w')
                .help("Keep running and process new screenshots as they appear")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-retroactive")
                .long("no-retroactive")
                .help("Skip screenshots that already exist at startup")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .help("Per-request timeout")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Use this configuration file instead of the default one")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("More logging (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let result = match matches.subcommand() {
        Some(("config", sub_matches)) => run_config_command(&matches, sub_matches),
        _ => run_organise_command(&matches).await,
    };

    if let Err(e) = result {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);

        if let Some(ConfigError::MissingApiKey) = e.downcast_ref::<ConfigError>() {
            eprintln!("\n{}", "💡 Tip: set your API key, or use a local model:".yellow());
            eprintln!("  export OPENAI_API_KEY=your_key_here");
            eprintln!("  shotshelf --provider ollama <WATCH_DIR>");
        }

        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn,screenshot_organiser=info",
        1 => "warn,screenshot_organiser=debug",
        _ => "warn,screenshot_organiser=trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

async fn run_organise_command(matches: &ArgMatches) -> Result<()> {
    let file_config = load_file_config(matches.get_one::<PathBuf>("config"))?;
    let config = file_config.unwrap_or_default().overlay(config_from_args(matches)?);
    let settings = Settings::resolve(config, std::env::var("OPENAI_API_KEY").ok())?;

    println!("{}", "📸 Screenshot Organiser".cyan().bold());
    println!("Watching: {}", settings.watch_dir.display().to_string().yellow());
    println!("Output:   {}", settings.output_dir.display().to_string().yellow());
    println!(
        "Using:    {} with model {}\n",
        settings.provider.to_string().cyan(),
        settings.model_name.yellow()
    );
    if settings.watch {
        println!("{}", "Press Ctrl-C to stop.".dimmed());
    }

    let summary = app::run(settings).await?;

    println!(
        "\n{} {} moved, {} skipped, {} failed",
        "Done:".green().bold(),
        summary.moved.to_string().green(),
        summary.skipped.to_string().yellow(),
        summary.failed.to_string().red()
    );
    Ok(())
}

fn load_file_config(explicit: Option<&PathBuf>) -> Result<Option<Config>> {
    Ok(match explicit {
        Some(path) => Some(Config::load_from(path)?),
        None => Config::load()?,
    })
}

/// Only flags the user actually passed; everything else stays `None` so the
/// config file and defaults show through.
fn config_from_args(matches: &ArgMatches) -> Result<Config> {
    let provider = matches
        .get_one::<String>("provider")
        .map(|p| p.parse::<Provider>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let detail = matches
        .get_one::<String>("detail")
        .map(|d| d.parse::<DetailLevel>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    Ok(Config {
        provider,
        model_name: matches.get_one::<String>("model").cloned(),
        base_url: matches.get_one::<String>("base-url").cloned(),
        watch_dir: matches.get_one::<PathBuf>("watch-dir").cloned(),
        output_dir: matches.get_one::<PathBuf>("output").cloned(),
        backup_dir: matches.get_one::<PathBuf>("backup").cloned(),
        detail,
        file_pattern: matches.get_one::<String>("pattern").cloned(),
        case_sensitive: matches.get_flag("case-sensitive").then_some(true),
        watch: matches.get_flag("watch").then_some(true),
        retroactive: matches.get_flag("no-retroactive").then_some(false),
        request_timeout_secs: matches.get_one::<u64>("timeout").copied(),
        ..Config::default()
    })
}

fn run_config_command(matches: &ArgMatches, sub_matches: &ArgMatches) -> Result<()> {
    let path = match matches.get_one::<PathBuf>("config") {
        Some(path) => path.clone(),
        None => Config::get_config_file_path()?,
    };

    match sub_matches.subcommand() {
        Some(("show", _)) => config_show(&path),
        Some(("init", _)) => config_init(&path),
        _ => {
            println!("{}", "Configuration Management".cyan().bold());
            println!("Available commands:");
            println!("  show - Show the configuration file");
            println!("  init - Write a default configuration file");
            println!("\nUse 'shotshelf config --help' for more information");
            Ok(())
        }
    }
}

fn config_show(path: &Path) -> Result<()> {
    println!("{}", "📋 Current Configuration".cyan().bold());
    println!("Config file: {}", path.display().to_string().yellow());

    if !path.exists() {
        println!(
            "{}",
            "No configuration file found. Run 'shotshelf config init' to create one.".yellow()
        );
        return Ok(());
    }

    let config = Config::load_from(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn config_init(path: &Path) -> Result<()> {
    if path.exists() {
        println!(
            "{} {}",
            "Configuration already exists at".yellow(),
            path.display()
        );
        return Ok(());
    }

    Config::with_defaults().save_to(path)?;
    println!(
        "{} {}",
        "✅ Wrote default configuration to".green().bold(),
        path.display()
    );
    Ok(())
}

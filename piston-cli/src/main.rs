//! Command-line front end for the clipboard demo commands.
//!
//! # Usage
//!
//! ```bash
//! # Run one command
//! piston-cli copy -e -m dirt stone
//!
//! # Run several commands against the same clipboard, one per line
//! printf 'copy stone\npaste 2\nclip show\n' | piston-cli
//!
//! # Completions for the last token, as JSON
//! piston-cli --suggest --json copy -m s
//! ```

mod commands;

use clap::Parser;
use piston::{
    init_subscriber_with_config, CommandError, CommandManager, ErrorReport, ManagerConfig,
    TracingConfig, TracingFormat, TracingListener, EMPTY,
};
use std::io::{self, BufRead};

#[derive(Parser, Debug)]
#[command(name = "piston-cli", version, about = "Run clipboard commands through piston")]
struct Cli {
    /// Log output format (pretty, compact, json)
    #[arg(long, env = "PISTON_LOG_FORMAT", default_value = "compact")]
    log_format: TracingFormat,

    /// Log level; falls back to RUST_LOG, then warn
    #[arg(long, env = "PISTON_LOG_LEVEL")]
    log_level: Option<tracing::Level>,

    /// Report errors and suggestions as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Print completions for the last token instead of running
    #[arg(long)]
    suggest: bool,

    /// Treat `--` as an ordinary token
    #[arg(long)]
    no_flag_terminator: bool,

    /// Disallow combined short flags such as `-em`
    #[arg(long)]
    no_combined_flags: bool,

    /// Name injected as the acting user; `guest` may not clear the clipboard
    #[arg(long, env = "PISTON_ACTOR", default_value = "console")]
    actor: String,

    /// Command and its arguments; read commands from stdin when empty
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

/// What a single run prints, and the process exit code.
struct Response {
    exit_code: i32,
    output: Output,
}

enum Output {
    Silent,
    Text(String),
    Json(String),
}

impl Response {
    fn from_result(result: Result<i32, CommandError>, json: bool) -> Self {
        match result {
            Ok(exit_code) => Self {
                exit_code,
                output: Output::Silent,
            },
            Err(error) => {
                let report = ErrorReport::from(&error);
                let output = if json {
                    Output::Json(report.to_json())
                } else {
                    Output::Text(error.to_string())
                };
                Self {
                    exit_code: report.exit_code,
                    output,
                }
            }
        }
    }

    fn emit(&self) {
        match &self.output {
            Output::Silent => {}
            Output::Text(message) => eprintln!("{message}"),
            Output::Json(json) => println!("{json}"),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level {
        Some(level) => Some(level),
        None if std::env::var_os("RUST_LOG").is_some() => None,
        None => Some(tracing::Level::WARN),
    };
    let logging = TracingConfig {
        level,
        format: cli.log_format,
        timestamps: false,
        ..TracingConfig::default()
    };
    if let Err(error) = init_subscriber_with_config(logging) {
        eprintln!("Failed to initialise logging: {error}");
    }

    let config = ManagerConfig {
        flag_terminator: !cli.no_flag_terminator,
        combined_flags: !cli.no_combined_flags,
    };
    let mut manager =
        match commands::build_manager(config, commands::Clipboard::default(), cli.actor.clone()) {
            Ok(manager) => manager,
            Err(error) => {
                eprintln!("Invalid command definitions: {error}");
                std::process::exit(101);
            }
        };
    manager.add_listener(TracingListener);

    if cli.suggest {
        suggest(&manager, &cli.tokens, cli.json);
        return;
    }

    if !cli.tokens.is_empty() {
        let response = Response::from_result(manager.execute(&cli.tokens), cli.json);
        response.emit();
        std::process::exit(response.exit_code);
    }

    std::process::exit(run_lines(&manager, cli.json));
}

/// Run each stdin line as a command; the exit code is that of the last line.
fn run_lines(manager: &CommandManager, json: bool) -> i32 {
    let mut exit_code = 0;
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                eprintln!("Failed to read input: {error}");
                return 101;
            }
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let response = Response::from_result(manager.execute(&tokens), json);
        response.emit();
        exit_code = response.exit_code;
    }
    exit_code
}

fn suggest(manager: &CommandManager, tokens: &[String], json: bool) {
    let suggestions = manager.suggest(&EMPTY, tokens);
    if json {
        match serde_json::to_string_pretty(&suggestions) {
            Ok(out) => println!("{out}"),
            Err(error) => eprintln!("Failed to encode suggestions: {error}"),
        }
        return;
    }
    for suggestion in suggestions {
        println!("{}", suggestion.suggestion);
    }
}

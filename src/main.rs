use std::io::{self, Read};

use clap::{Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;
use validif_lang::{
    cli::{self, CheckOptions, CheckResult, CliError},
    Rule,
};

#[derive(ClapParser)]
#[command(name = "validif")]
#[command(about = "validif - A declarative rule language for field validation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and evaluate a rule
    Check {
        /// The rule to evaluate
        rule: String,

        /// The value under test, as JSON
        #[arg(short, long)]
        value: Option<String>,

        /// JSON model the rule refers to (reads from stdin if piped)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Print a rule in canonical double-quoted form
    Canonical {
        /// The rule to normalise
        rule: String,
    },

    /// List documentation topics
    Docs,

    /// Show documentation for a specific topic
    Doc {
        /// Topic name (use 'validif docs' to list topics)
        topic: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            rule,
            value,
            input,
            pretty,
            syntax_only,
        } => run_check(rule, value, input, pretty, syntax_only),
        Commands::Canonical { rule } => Rule::parse(&rule)
            .map(|rule| println!("{}", rule.canonical_text()))
            .map_err(CliError::from),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { topic } => cli::get_doc_topic(&topic).map(|content| print!("{}", content)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    rule: String,
    value: Option<String>,
    input: Option<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        rule,
        value,
        input,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid(canonical) => println!("Syntax is valid: {}", canonical),
        CheckResult::Evaluated(outcome) => {
            let json = if pretty {
                serde_json::to_string_pretty(&outcome)
            } else {
                serde_json::to_string(&outcome)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}

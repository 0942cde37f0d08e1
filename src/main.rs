use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug, error, info};

use mdocx::browser::UnavailableBrowser;
use mdocx::document::{DocumentSink, JsonSink};
use mdocx::{Config, Error};

#[derive(Parser, Debug)]
#[command(name = "mdocx")]
#[command(about = "Convert Markdown to word-processor document elements and back")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./mdocx.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a Markdown file to document elements (JSON)
    ///
    /// This binary ships without a browser backend, so diagrams are kept as
    /// their source text instead of being rendered.
    Convert {
        /// Input Markdown file
        input: PathBuf,

        /// Output file (defaults to input name with .json extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Recover Markdown from a document's HTML rendition
    Recover {
        /// Input HTML file
        input: PathBuf,

        /// Output file (defaults to input name with .md extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the parsed blocks of a Markdown file
    Blocks {
        /// Input Markdown file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    debug!(args:? = cli; "Parsed arguments");

    if let Err(err) = run(&cli).await {
        error!("{err}");
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Command::Convert {
            input,
            output,
            pretty,
        } => {
            let config = Config::discover(cli.config.as_deref())?;
            let markdown = read(input)?;
            let base_dir = input.parent().unwrap_or(Path::new("."));

            let elements = mdocx::markdown_to_elements(
                &markdown,
                base_dir,
                &config,
                Arc::new(UnavailableBrowser),
            )
            .await;
            let bytes = JsonSink { pretty: *pretty }.write(&elements)?;

            let output = output.clone().unwrap_or_else(|| input.with_extension("json"));
            fs::write(&output, bytes).map_err(|e| Error::io(&output, e))?;
            info!(elements = elements.len(); "Document assembled");
            println!("Created {}", output.display());
        }
        Command::Recover { input, output } => {
            let html = read(input)?;
            let markdown = mdocx::markdown_from_html(&html);

            let output = output.clone().unwrap_or_else(|| input.with_extension("md"));
            fs::write(&output, markdown).map_err(|e| Error::io(&output, e))?;
            println!("Created {}", output.display());
        }
        Command::Blocks { input } => {
            let markdown = read(input)?;
            let blocks = mdocx::parse(&markdown);
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

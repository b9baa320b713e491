use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tagalong_cli::{check_cmd, load_options, render_cmd, RenderArgs};

#[derive(Parser)]
#[command(name = "tagalong", version, about = "Render declarative HTML templates")]
struct Cli {
    /// More logging (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OptionArgs {
    /// JSON file with compile options
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directive prefix (default "t-")
    #[arg(long)]
    prefix: Option<String>,
    /// Keep directives in the output so it can be rendered again
    #[arg(long)]
    preserve: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against JSON data and print the markup.
    Render {
        /// Path to the template markup
        template: PathBuf,
        /// JSON data file
        #[arg(long)]
        data: Option<PathBuf>,
        /// JSON file with scope values
        #[arg(long)]
        scope: Option<PathBuf>,
        /// Render only the node matching `#id` or a tag name
        #[arg(long)]
        selector: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Compile a template and report errors.
    Check {
        template: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Render {
            template,
            data,
            scope,
            selector,
            options,
        } => {
            let options = load_options(options.config.as_deref(), options.prefix.as_deref(), options.preserve)?;
            let html = render_cmd(&RenderArgs {
                template,
                data,
                scope,
                selector,
                options,
            })?;
            println!("{html}");
        }
        Commands::Check { template, options } => {
            let options = load_options(options.config.as_deref(), options.prefix.as_deref(), options.preserve)?;
            check_cmd(&template, options)?;
            println!("ok: {}", template.display());
        }
    }
    Ok(())
}

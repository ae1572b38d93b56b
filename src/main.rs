use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use template_interpreter::{Engine, Options, TemplateError};
use tracing::Level;

/// Render a template against a JSON context.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Template text. Ignored when --template-file is given.
    template: Option<String>,
    /// Read the template from a file
    #[arg(long, short = 't')]
    template_file: Option<PathBuf>,
    /// Context as JSON text
    #[arg(long, short = 'c')]
    context: Option<String>,
    /// Read the context JSON from a file
    #[arg(long)]
    context_file: Option<PathBuf>,
    /// Options as a JSON file, e.g. {"max_depth": 16, "escape_html": true}
    #[arg(long)]
    config: Option<PathBuf>,
    /// HTML-escape variable output (overrides the config file)
    #[arg(long)]
    escape_html: bool,
    /// Maximum block nesting (overrides the config file)
    #[arg(long)]
    max_depth: Option<usize>,
    /// Log to stderr; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(out) => print!("{out}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String, TemplateError> {
    // Build options.
    let mut opts = match &args.config {
        Some(path) => Options::from_json(&std::fs::read_to_string(path)?)?,
        None => Options::default(),
    };
    if args.escape_html {
        opts.escape_html = true;
    }
    if let Some(depth) = args.max_depth {
        opts.max_depth = depth;
    }

    let template = match (&args.template_file, &args.template) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(text)) => text.clone(),
        (None, None) => String::new(),
    };

    // Parse input JSON.
    let context: Value = match (&args.context_file, &args.context) {
        (Some(path), _) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        (None, Some(text)) => serde_json::from_str(text)?,
        (None, None) => Value::Null,
    };

    tracing::debug!(?opts, template_len = template.len(), "rendering");
    let engine = Engine::default().with_options(opts);
    Ok(engine.render(&template, &context))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => return,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

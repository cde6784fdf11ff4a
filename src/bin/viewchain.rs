use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use viewchain::{
    config::AssignmentPolicy, host, EngineConfig, Error, Interpreter, Value, ViewchainResult,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Expression to evaluate, e.g. `Text("hi").font(.title)`
    expression: Option<String>,

    /// Read the expression from a file instead
    #[arg(short, long, conflicts_with = "expression")]
    file: Option<PathBuf>,

    /// Path to an engine config file (JSON)
    #[arg(short, long, default_value = "viewchain.json")]
    config: PathBuf,

    /// Seed for `shuffle`/`shuffled`, overrides the config
    #[arg(short, long)]
    seed: Option<u64>,

    /// `strict` or `define_local`, overrides the config
    #[arg(long)]
    assignment: Option<AssignmentPolicy>,

    /// Evaluate as a value expression instead of a view chain
    #[arg(long)]
    value: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn describe(value: &Value) -> String {
    match value
        .as_artifact()
        .and_then(|artifact| artifact.downcast_ref::<host::DescribedView>())
    {
        Some(view) => view.to_string(),
        None => value.to_string(),
    }
}

fn run(cli: &Cli) -> ViewchainResult<String> {
    let mut config = if cli.config.exists() {
        EngineConfig::from_file(&cli.config)?
    } else {
        EngineConfig::default()
    };
    if let Some(seed) = cli.seed {
        config.shuffle_seed = Some(seed);
    }
    if let Some(assignment) = cli.assignment {
        config.assignment = assignment;
    }
    info!("config loaded.");
    debug!("config: {:?}", config);

    let source = match (&cli.expression, &cli.file) {
        (_, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?,
        (Some(expression), None) => expression.clone(),
        (None, None) => return Err(Error::config("no expression given")),
    };

    let mut interpreter = Interpreter::new(config);
    host::install_defaults(interpreter.registry_mut())?;

    if cli.value {
        let global = interpreter.global();
        let value = interpreter.evaluate_source(source.trim(), global)?;
        Ok(describe(&value))
    } else {
        let artifact = interpreter.render_source(source.trim())?;
        Ok(describe(&Value::Artifact(artifact)))
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

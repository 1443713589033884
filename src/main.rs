use anyhow::{Context, Result, bail};
use archgraph::architecture::ArchitectureBuilder;
use archgraph::callgraph::{CallGraphBuilder, EventBuilder};
use archgraph::config::Config;
use archgraph::contexts::ProcessContexts;
use archgraph::indexer;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Architecture and call-graph extraction for Go source trees.
#[derive(Parser, Debug)]
#[command(name = "archgraph", version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the architecture graph of a source tree
    Collect {
        /// Source root
        dir: PathBuf,

        /// Output file; `.yaml`/`.yml` selects YAML, anything else JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Build call graphs from one entry point or from a contexts file
    Callgraph {
        /// Source root
        dir: PathBuf,

        /// Entry symbol, `<package>.<Func>` or `<package>.<Type>.<Method>`
        #[arg(long, conflicts_with = "contexts", required_unless_present = "contexts")]
        entry: Option<String>,

        /// Process contexts YAML mapping events to entry points
        #[arg(long, value_name = "FILE")]
        contexts: Option<PathBuf>,

        /// Only build the events of this context
        #[arg(long, requires = "contexts")]
        context: Option<String>,

        /// Overrides `max_depth` from the configuration
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output file; `.yaml`/`.yml` selects YAML, anything else JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Collect { dir, output } => {
            config.validate()?;
            let index = indexer::index(&dir, &config.index_options())
                .with_context(|| format!("failed to index {}", dir.display()))?;
            let graph = ArchitectureBuilder::new(&index, config.architecture_options()).build();
            write_output(&graph, output.as_deref())
        }
        Command::Callgraph {
            dir,
            entry,
            contexts,
            context,
            max_depth,
            output,
        } => {
            if let Some(depth) = max_depth {
                config.max_depth = depth;
            }
            config.validate()?;
            let index = indexer::index(&dir, &config.index_options())
                .with_context(|| format!("failed to index {}", dir.display()))?;

            if let Some(entry) = entry {
                let builder = CallGraphBuilder::new(&index, config.build_options())?;
                let mut graph = builder.build(&entry)?;
                graph.sort();
                for warning in &graph.warnings {
                    info!("{warning}");
                }
                return write_output(&graph, output.as_deref());
            }

            let Some(contexts_path) = contexts else {
                bail!("either --entry or --contexts is required");
            };
            let contexts = ProcessContexts::load(&contexts_path)
                .with_context(|| format!("invalid contexts file {}", contexts_path.display()))?;
            let builder = EventBuilder::new(&index, &contexts, config.build_options())?;
            let mut set = match context {
                Some(name) => builder.build_for_context(&name)?,
                None => builder.build_all(),
            };
            for graph in set.graphs.values_mut() {
                graph.sort();
            }
            write_output(&set, output.as_deref())
        }
    }
}

fn write_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        println!("{}", serde_json::to_string_pretty(value)?);
        return Ok(());
    };

    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let data = if yaml {
        serde_yaml::to_string(value).context("failed to encode YAML")?
    } else {
        serde_json::to_string_pretty(value).context("failed to encode JSON")?
    };
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

use clap::{Parser, Subcommand};
use pkm_battle_resolver::{
    process_message, Dex, MessageOutcome, PipelineInputs, Reconciler, ResolverConfig,
    StoreSnapshot, TeamSummary,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pkm-battle-resolver", version, about = "Resolve battle declarations into battle payloads")]
struct Cli {
    /// RON config file; built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random roll, for reproducible output.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the payload for the declaration in a message.
    Resolve {
        /// File holding the agent message text.
        message: PathBuf,
        /// Store document as JSON.
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Fold pending progress deltas and print the patched store document.
    Reconcile {
        store: PathBuf,
    },
    /// Print the team summary for a store document.
    Summary {
        store: PathBuf,
    },
}

fn read_store(path: Option<&Path>) -> Result<StoreSnapshot, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(StoreSnapshot::default());
    };
    let root: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(StoreSnapshot::new(root))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pkm_battle_resolver=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    match cli.command {
        Commands::Resolve { message, store } => {
            let text = fs::read_to_string(&message)?;
            let mut snapshot = read_store(store.as_deref())?;
            let mut player = snapshot.player();
            let patch = Reconciler::new(&config.reconcile).reconcile(&mut player, &mut rng);
            snapshot.apply(&patch);

            let stored = snapshot.player();
            let inputs = PipelineInputs {
                dex: Dex::compiled(),
                config: &config,
                stored: &stored,
                world_state: snapshot.world_state(),
            };
            match process_message(&text, inputs, &mut rng)? {
                MessageOutcome::Rendered { message, .. } => println!("{}", message),
                MessageOutcome::Skipped(reason) => {
                    info!(?reason, "nothing to resolve");
                    println!("{}", text);
                }
            }
        }
        Commands::Reconcile { store } => {
            let mut snapshot = read_store(Some(&store))?;
            let mut player = snapshot.player();
            let patch = Reconciler::new(&config.reconcile).reconcile(&mut player, &mut rng);
            info!(paths = patch.len(), "reconciliation patch built");
            snapshot.apply(&patch);
            println!("{}", serde_json::to_string_pretty(snapshot.root())?);
        }
        Commands::Summary { store } => {
            let snapshot = read_store(Some(&store))?;
            let player = snapshot.player();
            println!("{}", TeamSummary::new(&player, &config.tags.declaration));
        }
    }

    Ok(())
}

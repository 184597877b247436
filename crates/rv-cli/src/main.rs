use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use num_complex::Complex64;
use rv_core::{
    COLOR_PALETTE, CancellationChecker, DeltaSet, Direction, GenerationRequest, Parameters,
    ParameterSweep, SweepReport, fulfil,
};
use rv_store::{Backend, BackendKind, Config};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "rv", about = "Revolving-number point set generator")]
struct Cli {
    /// Data directory (default: $RV_DATA_DIR, then ~/.revolving-numbers)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data dir>/rv.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured storage backend: sqlite or files
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep the whole parameter space until interrupted
    Sweep {
        /// Stop after this many passes
        #[arg(long)]
        rounds: Option<u32>,

        /// Digit length targeted by the first pass
        #[arg(long)]
        start_places: Option<u32>,
    },

    /// Generate one stream up to a digit length
    Generate {
        #[command(flatten)]
        stream: StreamArgs,

        /// Target digit length
        #[arg(long)]
        places: u32,
    },

    /// Show a stored snapshot
    Show {
        #[command(flatten)]
        stream: StreamArgs,

        /// Print the coordinates of integers with at most this many digits
        #[arg(long)]
        frame: Option<u32>,
    },

    /// Print the delta set for an angle denominator
    Deltas {
        #[arg(long, allow_negative_numbers = true)]
        denominator: i32,
    },

    /// List stored snapshots
    Stats,

    /// Delete a stored snapshot so the stream starts over
    Reset {
        #[command(flatten)]
        stream: StreamArgs,
    },
}

#[derive(Args)]
struct StreamArgs {
    /// Angle denominator d (angle pi/d), nonzero
    #[arg(long, allow_negative_numbers = true)]
    denominator: i32,

    /// Real part of the base constant
    #[arg(long, allow_negative_numbers = true)]
    re: f64,

    /// Imaginary part of the base constant
    #[arg(long, allow_negative_numbers = true)]
    im: f64,

    /// contracting or expanding
    #[arg(long, default_value = "contracting")]
    direction: Direction,
}

impl StreamArgs {
    fn params(&self) -> Result<Parameters> {
        Parameters::new(
            self.denominator,
            Complex64::new(self.re, self.im),
            self.direction,
        )
        .context("invalid stream parameters")
    }
}

fn parse_backend(s: &str) -> std::result::Result<BackendKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "sqlite" => Ok(BackendKind::Sqlite),
        "files" => Ok(BackendKind::Files),
        other => Err(format!("backend must be 'sqlite' or 'files', got '{other}'")),
    }
}

fn data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| std::env::var("RV_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(rv_store::default_base_dir)
}

fn load_config(cli: &Cli, data_dir: &Path) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            Config::load(path)
        }
        None => Config::load_from_dir(data_dir),
    }
    .context("failed to load config")?;

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    Ok(config)
}

fn open_store(data_dir: &Path, config: &Config) -> Result<Backend> {
    Backend::open(data_dir, config)
        .with_context(|| format!("failed to open store in {}", data_dir.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Sweep {
            rounds,
            start_places,
        } => cmd_sweep(&cli, *rounds, *start_places).await,
        Commands::Generate { stream, places } => cmd_generate(&cli, stream, *places),
        Commands::Show { stream, frame } => cmd_show(&cli, stream, *frame),
        Commands::Deltas { denominator } => cmd_deltas(*denominator),
        Commands::Stats => cmd_stats(&cli),
        Commands::Reset { stream } => cmd_reset(&cli, stream),
    }
}

// ---------------------------------------------------------------------------
// Interrupt handling
// ---------------------------------------------------------------------------

/// Bridges a tokio cancellation token into the sweep's polling interface.
struct TokenChecker(CancellationToken);

impl CancellationChecker for TokenChecker {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Cancel `token` on the first SIGINT or SIGTERM. Handlers are installed
/// before this returns, so a signal arriving right after is never lost.
#[cfg(unix)]
fn cancel_on_signal(token: CancellationToken) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        };
        tracing::info!("{name} received, finishing current stream");
        token.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
fn cancel_on_signal(token: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl-C received, finishing current stream");
                token.cancel();
            }
            Err(e) => tracing::warn!("failed to listen for Ctrl-C: {e}"),
        }
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_sweep(cli: &Cli, rounds: Option<u32>, start_places: Option<u32>) -> Result<()> {
    let dir = data_dir(cli);
    let mut config = load_config(cli, &dir)?;
    if rounds.is_some() {
        config.sweep.max_rounds = rounds;
    }
    if let Some(places) = start_places {
        config.sweep.start_places = places;
    }
    let store = open_store(&dir, &config)?;

    let token = CancellationToken::new();
    cancel_on_signal(token.clone())?;

    let sweep_config = config.sweep.clone();
    let checker = TokenChecker(token);
    let report = tokio::task::spawn_blocking(move || -> Result<SweepReport> {
        let sweep = ParameterSweep::new(&store, sweep_config, checker)
            .context("invalid sweep configuration")?;
        Ok(sweep.run())
    })
    .await
    .context("sweep task failed")??;

    println!("rounds:        {}", report.rounds_completed);
    println!("target places: {}", report.target_places);
    println!("streams:       {}", report.streams_visited);
    println!("advances:      {}", report.advances);
    println!("saves:         {}", report.saves);
    println!("save failures: {}", report.save_failures);
    if report.halted {
        println!("interrupted; progress saved");
    }
    if report.save_failures > 0 {
        tracing::warn!(
            "{} saves were abandoned; affected streams resume from their last good snapshot",
            report.save_failures
        );
    }
    Ok(())
}

fn cmd_generate(cli: &Cli, stream: &StreamArgs, places: u32) -> Result<()> {
    if places > u64::BITS {
        bail!("--places must be at most {}", u64::BITS);
    }
    let params = stream.params()?;
    let dir = data_dir(cli);
    let config = load_config(cli, &dir)?;
    let store = open_store(&dir, &config)?;

    let request = GenerationRequest {
        params,
        target_places: places,
    };
    let state = fulfil(&store, &request, config.sweep.persist_policy());

    println!("stream:      {params}");
    println!("n:           {}", state.n());
    println!("places:      {}", state.places());
    println!("coordinates: {}", state.coordinates().len());
    println!("window:      {}", state.window_boundary());
    Ok(())
}

fn cmd_show(cli: &Cli, stream: &StreamArgs, frame: Option<u32>) -> Result<()> {
    let params = stream.params()?;
    let dir = data_dir(cli);
    let config = load_config(cli, &dir)?;
    let store = open_store(&dir, &config)?;

    let Some(state) = store
        .load_snapshot(&params)
        .with_context(|| format!("failed to read snapshot for {params}"))?
    else {
        bail!("no snapshot for {}", params.storage_key());
    };

    match frame {
        Some(p) => {
            for c in state.frame(p, params.branch_count()) {
                println!("{},{},{}", c.re, c.im, COLOR_PALETTE[c.color_index]);
            }
        }
        None => {
            println!("stream:      {params}");
            println!("key:         {}", params.storage_key());
            println!("n:           {}", state.n());
            println!("places:      {}", state.places());
            println!("coordinates: {}", state.coordinates().len());
            println!("window:      {}", state.window_boundary());
        }
    }
    Ok(())
}

fn cmd_deltas(denominator: i32) -> Result<()> {
    if denominator == 0 {
        bail!("--denominator must be nonzero");
    }
    for (k, delta) in DeltaSet::build(denominator).iter().enumerate() {
        println!("{k:>3}  {}  {}", delta, COLOR_PALETTE[k % COLOR_PALETTE.len()]);
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let dir = data_dir(cli);
    let config = load_config(cli, &dir)?;
    let store = open_store(&dir, &config)?;
    let summaries = store.list().context("failed to list snapshots")?;

    let backend = match store.kind() {
        BackendKind::Sqlite => "sqlite",
        BackendKind::Files => "files",
    };
    println!("backend:     {backend}");
    println!("snapshots:   {}", summaries.len());
    println!(
        "coordinates: {}",
        summaries.iter().map(|s| s.coordinates).sum::<usize>()
    );
    for s in &summaries {
        println!(
            "{}  n={} places={} window={}",
            s.params.storage_key(),
            s.n,
            s.places,
            s.window_boundary
        );
    }
    Ok(())
}

fn cmd_reset(cli: &Cli, stream: &StreamArgs) -> Result<()> {
    let params = stream.params()?;
    let dir = data_dir(cli);
    let config = load_config(cli, &dir)?;
    let store = open_store(&dir, &config)?;

    if store
        .delete_snapshot(&params)
        .context("failed to delete snapshot")?
    {
        println!("deleted {}", params.storage_key());
    } else {
        println!("no snapshot for {}", params.storage_key());
    }
    Ok(())
}

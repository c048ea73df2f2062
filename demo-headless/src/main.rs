use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stefan_sim_core::{
    InitialCondition, Params, Perturbation, QualityPreset, Simulation, SinkError, Snapshot,
    SnapshotSink, StopReason, TravellingWaveProfile,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Porous-Fisher-Stefan front simulation with configurable parameters
///
/// Parameters are taken from `--config` (or the defaults), then resized by
/// `--quality`, then overridden by any explicit flag.
#[derive(Parser, Debug)]
#[command(name = "stefan-sim-headless")]
#[command(about = "Moving-boundary invasion front simulation", long_about = None)]
struct Args {
    /// JSON file with a full or partial parameter set
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resolution preset (ultra, high, medium, low)
    #[arg(short, long)]
    quality: Option<String>,

    /// CSV file of `z,u` samples for a travelling-wave initial density
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Output directory for snapshots and front.csv
    #[arg(short, long, default_value = "stefan-out")]
    out: PathBuf,

    /// Write a snapshot every N steps (0 = final only)
    #[arg(short, long, default_value_t = 100)]
    snapshot_every: usize,

    /// Interface shape (cosine, random, flat)
    #[arg(long, default_value = "cosine")]
    perturbation: String,

    /// Number of lateral modes for a random interface
    #[arg(long, default_value_t = 4)]
    modes: usize,

    /// Seed for a random interface
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Diffusivity D
    #[arg(long)]
    diffusion: Option<f64>,

    /// Nonlinearity exponent m
    #[arg(long)]
    exponent: Option<f64>,

    /// Reaction rate λ
    #[arg(long)]
    reaction_rate: Option<f64>,

    /// Inverse Stefan number κ
    #[arg(long)]
    inverse_stefan: Option<f64>,

    /// Surface tension coefficient γ
    #[arg(long)]
    surface_tension: Option<f64>,

    /// Initial front position L₀
    #[arg(long)]
    initial_offset: Option<f64>,

    /// Background density u_f
    #[arg(long)]
    background_density: Option<f64>,

    /// Crossing fraction θ below which a point is pinned to the interface density
    #[arg(long)]
    interface_threshold: Option<f64>,

    /// Limiter parameter in [1, 2]
    #[arg(long)]
    limiter_theta: Option<f64>,

    /// Domain length along x
    #[arg(long)]
    domain_length: Option<f64>,

    /// Domain width along y
    #[arg(long)]
    domain_width: Option<f64>,

    /// Grid points along x
    #[arg(long)]
    nx: Option<usize>,

    /// Grid points along y
    #[arg(long)]
    ny: Option<usize>,

    /// Time step
    #[arg(long)]
    dt: Option<f64>,

    /// Number of time steps
    #[arg(long)]
    steps: Option<usize>,

    /// Velocity extension sweeps per step
    #[arg(long)]
    velocity_iterations: Option<usize>,

    /// Reinitialisation sweeps per reinitialisation
    #[arg(long)]
    reinit_iterations: Option<usize>,

    /// Reinitialise every N steps
    #[arg(long)]
    reinit_every: Option<usize>,

    /// Convergence tolerance of the field solve
    #[arg(long)]
    field_tolerance: Option<f64>,

    /// Sweep budget of the field solve
    #[arg(long)]
    field_max_iterations: Option<usize>,

    /// Cosine perturbation amplitude ε
    #[arg(long)]
    perturbation_amplitude: Option<f64>,

    /// Cosine perturbation wavenumber q
    #[arg(long)]
    perturbation_wavenumber: Option<f64>,
}

/// Copy every flag that was given onto the parameter set
macro_rules! override_params {
    ($params:ident, $args:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $args.$field {
                $params.$field = value;
            }
        )+
    };
}

fn build_params(args: &Args) -> Result<Params, String> {
    let mut params = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("failed to parse {}: {e}", path.display()))?
        }
        None => Params::default(),
    };

    if let Some(name) = &args.quality {
        let preset = QualityPreset::from_name(name)
            .ok_or_else(|| format!("unknown quality preset '{name}'"))?;
        params = preset.apply(&params);
        info!("Using {:?} quality: {}x{} grid, dt={}", preset, params.nx, params.ny, params.dt);
    }

    override_params!(
        params,
        args,
        diffusion,
        exponent,
        reaction_rate,
        inverse_stefan,
        surface_tension,
        initial_offset,
        background_density,
        interface_threshold,
        limiter_theta,
        domain_length,
        domain_width,
        nx,
        ny,
        dt,
        steps,
        velocity_iterations,
        reinit_iterations,
        reinit_every,
        field_tolerance,
        field_max_iterations,
        perturbation_amplitude,
        perturbation_wavenumber,
    );
    Ok(params)
}

/// Read `z,u` pairs, skipping `#` comments and an optional header row
fn load_profile(path: &Path) -> Result<TravellingWaveProfile, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| format!("failed to open {}: {e}", path.display()))?;

    let mut pairs = Vec::new();
    for (k, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("{}: {e}", path.display()))?;
        match record.deserialize::<(f64, f64)>(None) {
            Ok(pair) => pairs.push(pair),
            Err(_) if k == 0 => {} // header
            Err(e) => {
                let line = record.position().map_or(0, |p| p.line());
                return Err(format!("{}:{line}: expected `z,u`: {e}", path.display()));
            }
        }
    }
    TravellingWaveProfile::from_pairs(&pairs).map_err(|e| format!("{}: {e}", path.display()))
}

fn build_perturbation(args: &Args, params: &Params) -> Result<Perturbation, String> {
    match args.perturbation.to_lowercase().as_str() {
        "cosine" | "cos" => Ok(Perturbation::from_params(params)),
        "random" => Ok(Perturbation::RandomModes {
            amplitude: params.perturbation_amplitude,
            modes: args.modes,
            seed: args.seed,
        }),
        "flat" | "none" => Ok(Perturbation::None),
        other => Err(format!("unknown perturbation '{other}'")),
    }
}

/// Writes one `x,y,u,phi,v` file per snapshot and appends to `front.csv`
struct CsvSink {
    dir: PathBuf,
    front: Writer<File>,
}

impl CsvSink {
    fn create(dir: &Path) -> csv::Result<Self> {
        fs::create_dir_all(dir)?;
        let front = Writer::from_path(dir.join("front.csv"))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            front,
        })
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> csv::Result<()> {
        let path = self.dir.join(format!("snapshot_{:06}.csv", snapshot.step));
        let mut out = Writer::from_path(path)?;
        out.write_record(["x", "y", "u", "phi", "v"])?;
        let grid = snapshot.grid;
        for (j, &y) in grid.y().iter().enumerate() {
            for (i, &x) in grid.x().iter().enumerate() {
                let idx = grid.idx(i, j);
                out.serialize((
                    x,
                    y,
                    snapshot.density.as_slice()[idx],
                    snapshot.level_set.as_slice()[idx],
                    snapshot.velocity.as_slice()[idx],
                ))?;
            }
        }
        out.flush()?;

        // Header row comes from the first serialized sample
        if let Some(front) = snapshot.front {
            self.front.serialize(front)?;
            self.front.flush()?;
        }
        Ok(())
    }
}

impl SnapshotSink for CsvSink {
    fn emit(&mut self, snapshot: &Snapshot<'_>) -> Result<(), SinkError> {
        self.write_snapshot(snapshot)
            .map_err(|e| SinkError(format!("step {}: {e}", snapshot.step)))
    }
}

fn run(args: &Args) -> Result<bool, String> {
    let params = build_params(args)?;
    let perturbation = build_perturbation(args, &params)?;
    let initial = match &args.profile {
        Some(path) => InitialCondition::Profile(load_profile(path)?),
        None => InitialCondition::Step,
    };

    println!("=== Porous-Fisher-Stefan Front ===\n");
    println!(
        "Domain {:.1} x {:.1} on {}x{} points, dt={}, {} steps",
        params.domain_length, params.domain_width, params.nx, params.ny, params.dt, params.steps
    );
    println!(
        "D={}, m={}, λ={}, κ={}, γ={}, u_f={}\n",
        params.diffusion,
        params.exponent,
        params.reaction_rate,
        params.inverse_stefan,
        params.surface_tension,
        params.background_density
    );

    let mut sim = Simulation::new(params, &initial, &perturbation).map_err(|e| e.to_string())?;
    let mut sink = CsvSink::create(&args.out)
        .map_err(|e| format!("failed to prepare {}: {e}", args.out.display()))?;

    let report = sim.run(&mut sink, args.snapshot_every);

    println!("  Step |     Time | Front pos | Amplitude");
    println!("-------|----------|-----------|----------");
    let every = args.snapshot_every.max(1);
    let samples = sim.diagnostics().samples();
    for (k, sample) in samples.iter().enumerate() {
        if sample.step % every == 0 || k + 1 == samples.len() {
            println!(
                "{:6} | {:8.3} | {:9.4} | {:9.5}",
                sample.step, sample.time, sample.position, sample.amplitude
            );
        }
    }

    println!("\n=== Simulation Complete ===");
    println!("Stopped: {:?}", report.stop_reason);
    println!("Steps: {}, final time: {:.4}", report.steps, report.time);
    println!("Snapshots written: {} to {}", report.snapshots, args.out.display());
    let warnings = sim.diagnostics().warnings();
    if !warnings.is_empty() {
        println!("Solver warnings: {}", warnings.len());
    }

    Ok(!matches!(report.stop_reason, StopReason::Failed(_)))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

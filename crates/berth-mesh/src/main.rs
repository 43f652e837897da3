//! Berth demo binary.
//!
//! Builds a mesh from configuration (or a small built-in layout), then has
//! the last entity negotiate itself a clear berth and reports the outcome.
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML, defaults when the file is absent
//!  └─ Mesh::new()            -- transport + registration
//!  └─ avoid_all_others()     -- one negotiation run on the newcomer
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use berth_core::{Address, Rect};
use berth_mesh::config::{load_config, EntityEntry};
use berth_mesh::{Entity, Mesh, PanelSurface, RandomSide, TargetSide};

#[derive(Debug, Parser)]
#[command(name = "berth-mesh", about = "Overlap-avoidance negotiation demo")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "berth.toml", env = "BERTH_CONFIG")]
    config: PathBuf,

    /// Side the negotiating entity settles toward. Overrides the config;
    /// when neither is given, a coin flip decides.
    #[arg(long, value_enum, env = "BERTH_SIDE")]
    side: Option<SideArg>,

    /// Override the negotiation iteration bound.
    #[arg(long, env = "BERTH_MAX_ITERATIONS")]
    max_iterations: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for TargetSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => TargetSide::Left,
            SideArg::Right => TargetSide::Right,
        }
    }
}

/// Layout used when the config lists no entities: two settled panels and a
/// newcomer dropped on top of them.
fn default_layout() -> Vec<EntityEntry> {
    let rects = [
        ("panel-a", Rect::new(0.0, 0.0, 10.0, 10.0)),
        ("panel-b", Rect::new(8.0, 0.0, 10.0, 10.0)),
        ("newcomer", Rect::new(9.0, 0.0, 4.0, 10.0)),
    ];
    rects
        .into_iter()
        .map(|(address, rect)| EntityEntry {
            address: address.to_string(),
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.mesh.log_level.clone())),
        )
        .init();

    info!("berth mesh starting");

    let entries = if config.entities.is_empty() {
        info!("no entities configured; using the built-in demo layout");
        default_layout()
    } else {
        config.entities.clone()
    };

    let mut mesh = Mesh::new();
    let mut newcomer = None;
    for entry in &entries {
        let entity = Entity::new(
            Address::new(entry.address.clone()),
            Box::new(PanelSurface::new(entry.rect())),
        );
        let entity = mesh
            .add_entity(entity)
            .with_context(|| format!("registering entity {}", entry.address))?;
        info!(address = %entry.address, left = entry.left, top = entry.top, "entity joined");
        newcomer = Some(entity);
    }
    let newcomer = newcomer.context("config must define at least one entity")?;

    let side = args.side.map(TargetSide::from).or(config.negotiation.target_side);
    let mut policy = config.negotiation.policy();
    if let Some(bound) = args.max_iterations {
        policy.max_iterations = bound;
    }

    let report = newcomer
        .borrow_mut()
        .avoid_all_others(side, &mut RandomSide, &policy)
        .context("negotiation failed")?;

    info!(
        side = ?report.side,
        iterations = report.iterations,
        left = report.settled.left,
        top = report.settled.top,
        "negotiation settled"
    );
    for entry in &entries {
        let address = Address::new(entry.address.clone());
        if let Some(entity) = mesh.entity_at(&address) {
            let rect = entity.borrow().rectangle();
            info!(%address, left = rect.left, top = rect.top, "final position");
        }
    }

    Ok(())
}

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use navgraph::config::NavConfig;
use navgraph::graph::NodeContainer;
use navgraph::models::NodePlacement;
use navgraph::obstacles::BoxWorld;
use navgraph::pathfinding::AStarHandler;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "navgraph", about = "Compile a navigation graph and query paths through it")]
struct Args {
    /// CSV file of node placements with Name,X,Y,Z columns.
    nodes: PathBuf,

    /// YAML nav config. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// YAML list of box obstacles to check free paths against.
    #[arg(long)]
    obstacles: Option<PathBuf>,

    /// Where the compiled edges are written as AINodes XML.
    #[arg(long, default_value = "nodes.xml")]
    output: PathBuf,

    /// Reuse the edges in --output when it exists instead of compiling.
    #[arg(long)]
    cache: bool,

    /// Name of the node to start the path query at.
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Name of the node to path to.
    #[arg(long, requires = "from")]
    to: Option<String>,

    #[arg(long)]
    max_iterations: Option<usize>,
}

#[derive(Serialize)]
struct PathReport<'a> {
    from: &'a str,
    to: &'a str,
    found: bool,
    direct: bool,
    distance: f32,
    waypoints: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => NavConfig::from_yaml_file(path)?,
        None => NavConfig::default(),
    };

    let mut container = match &args.obstacles {
        Some(path) => {
            let world = BoxWorld::from_yaml_file(path)?;
            info!(obstacles = world.len(), "Loaded obstacles");
            NodeContainer::with_physics(config, world)
        }
        None => NodeContainer::new(config),
    };

    let placements = load_placements(&args.nodes)?;
    info!(count = placements.len(), path = %args.nodes.display(), "Loaded node placements");
    for (i, placement) in placements.iter().enumerate() {
        container.add_node(&placement.name, placement.position(), i as u64);
    }

    if args.cache {
        let cached = container.load_or_compile(&args.output)?;
        info!(cached, "Navigation graph ready");
    } else {
        container.compile();
        container.save_to_file(&args.output)?;
    }

    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        let start = container
            .node_by_name(from)
            .ok_or_else(|| anyhow!("Unknown node '{}'", from))?
            .position;
        let goal = container
            .node_by_name(to)
            .ok_or_else(|| anyhow!("Unknown node '{}'", to))?
            .position;

        let mut handler = AStarHandler::new(&container);
        if let Some(max) = args.max_iterations {
            handler = handler.with_max_iterations(max);
        }

        let path = handler.get_path(start, goal);
        let report = PathReport {
            from,
            to,
            found: path.is_some(),
            direct: path.as_ref().is_some_and(|p| p.is_direct()),
            distance: path.as_ref().map_or(0.0, |p| p.distance),
            waypoints: path
                .iter()
                .flat_map(|p| p.waypoints())
                .map(|id| container.node(id).name.clone())
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn load_placements(path: &Path) -> Result<Vec<NodePlacement>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut placements = Vec::new();
    for result in rdr.deserialize() {
        let record: NodePlacement = result.context("Malformed node placement row")?;
        placements.push(record);
    }
    Ok(placements)
}

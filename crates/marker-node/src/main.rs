//! Transformable marker node entry point
//!
//! Reads JSON messages from stdin and writes events and replies to stdout.
//! Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use marker_core::RobotModel;
use marker_node::MarkerNode;
use marker_server::ServerConfig;

const DEFAULT_CONFIG_FILE: &str = "marker_server.ron";

#[derive(Parser, Debug)]
#[command(name = "marker-node")]
#[command(about = "Interactive transformable markers over a JSON line stream")]
#[command(version)]
struct Args {
    /// Path to a RON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// URDF model to expose as link markers
    #[arg(short, long)]
    urdf: Option<PathBuf>,

    /// Marker namespace of the model (defaults to the robot name)
    #[arg(long)]
    model_name: Option<String>,

    /// Fixed frame the model root is attached to
    #[arg(long, default_value = "map")]
    frame_id: String,
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marker_node=info,marker_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    tracing::info!("Starting marker node v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ServerConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
    };

    let mut node = MarkerNode::new(config);

    if let Some(path) = &args.urdf {
        let model = RobotModel::from_urdf_file(path)
            .with_context(|| format!("failed to load URDF {}", path.display()))?;
        let model_name = args.model_name.clone().unwrap_or_else(|| model.name.clone());
        node.load_model(&model, &model_name, &args.frame_id);
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    node.run(stdin.lock(), stdout.lock())?;
    Ok(())
}

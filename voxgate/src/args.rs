use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Voice recognition and translation gateway
#[derive(Debug, Parser)]
#[command(name = "voxgate", about = "HTTP gateway for speech recognition, translation and speech tokens")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "voxgate.toml", env = "VOXGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "VOXGATE_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info", env = "VOXGATE_LOG")]
    pub log: String,
}

//! Server configuration

use std::path::PathBuf;

use canopy::prelude::ViewOptions;
use clap::Parser;

/// Canopy metrics dashboard server
#[derive(Parser, Clone, Debug)]
#[command(name = "canopy-server")]
#[command(about = "Serves filtered box-plot views over a canopy-metric dataset")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8050")]
    pub port: u16,

    /// Path to the dataset JSON file
    #[arg(long, default_value = "data/dataset.json")]
    pub dataset: PathBuf,

    /// Maximum number of cached view pairs before the cache is flushed
    #[arg(long, default_value = "256")]
    pub cache_capacity: usize,

    /// Per-request time budget in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout: u64,

    /// Add group statistics to the first figure as well
    #[arg(long)]
    pub annotate_primary: bool,

    /// Leave group statistics off the second figure
    #[arg(long)]
    pub no_annotate_secondary: bool,
}

impl Config {
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            annotate_primary: self.annotate_primary,
            annotate_secondary: !self.no_annotate_secondary,
        }
    }
}

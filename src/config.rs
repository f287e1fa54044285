use std::path::PathBuf;

use crate::Args;

/// Import run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub baselines_path: PathBuf,
    pub textblocks_path: PathBuf,
    pub state_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            baselines_path: args.baselines,
            textblocks_path: args.textblocks,
            state_path: args.state,
            output_path: args.output,
            report_path: args.report,
        }
    }
}

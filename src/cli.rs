//! Command-line interface for LambdaFS

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lambdafs")]
#[command(
    about = "Compress a file or directory with brotli at maximum ratio",
    long_about = "Compress a file (to <name>.br) or a directory (to <name>.tar.br) next to the input, \
                  using brotli at maximum quality and window size."
)]
pub struct Cli {
    /// File or directory to compress
    pub path: Option<PathBuf>,
}

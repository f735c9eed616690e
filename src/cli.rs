use crate::config::{DEFAULT_BIND, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SESSION_TTL_SECS};
use crate::pdf::MergeOrder;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-splitmerge")]
#[command(about = "Split and merge PDF files through a small web form")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web service
    Serve(ServeArgs),

    /// Split PDF into individual pages
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Combine multiple PDFs into one
    Merge {
        /// PDF files to merge (at least two)
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Order in which the inputs are concatenated
        #[arg(long, value_enum, default_value_t = MergeOrder::Forward)]
        order: MergeOrder,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Root for incoming uploads [default: ./uploads]
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Root for processed files [default: ./downloads]
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Order in which merged files are concatenated. `forward` keeps upload
    /// order and is the deliberate default; `reversed` puts the last upload first
    #[arg(long, value_enum, default_value_t = MergeOrder::Forward)]
    pub merge_order: MergeOrder,

    /// Seconds of inactivity after which a session's files are removed
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL_SECS)]
    pub session_ttl_secs: u64,
}

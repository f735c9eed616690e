use crate::cli::ServeArgs;
use crate::pdf::MergeOrder;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1000 * 1000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Runtime settings of the web service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub merge_order: MergeOrder,
    pub session_ttl: Duration,
}

impl ServerConfig {
    /// Resolve command-line arguments, placing unset storage roots under `cwd`.
    pub fn resolve(args: &ServeArgs, cwd: &Path) -> Self {
        ServerConfig {
            bind: args.bind,
            upload_dir: args.upload_dir.clone().unwrap_or_else(|| cwd.join("uploads")),
            download_dir: args
                .download_dir
                .clone()
                .unwrap_or_else(|| cwd.join("downloads")),
            max_upload_bytes: args.max_upload_bytes,
            merge_order: args.merge_order,
            session_ttl: Duration::from_secs(args.session_ttl_secs),
        }
    }

    /// Defaults with both storage roots under `root`.
    #[cfg(test)]
    pub fn with_root(root: &Path) -> Self {
        ServerConfig {
            bind: DEFAULT_BIND.parse().expect("default bind address is valid"),
            upload_dir: root.join("uploads"),
            download_dir: root.join("downloads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            merge_order: MergeOrder::default(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use clap::Parser;
use mxchat::core::config::{self, CliOverrides};
use mxchat::protocol::{MatrixSession, SessionStore, store};
use mxchat::tui;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "mxchat", about = "Terminal Matrix chat client")]
struct Args {
    /// Homeserver base URL (overrides config and MXCHAT_HOMESERVER)
    #[arg(long)]
    homeserver: Option<String>,
    /// Matrix user id, e.g. @me:matrix.org (overrides config and MXCHAT_USER)
    #[arg(short, long)]
    user: Option<String>,
    /// Config file to use instead of ~/.mxchat/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to mxchat.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("mxchat.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config(args.config.as_deref()).map_err(std::io::Error::other)?;
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            homeserver: args.homeserver.as_deref(),
            user_id: args.user.as_deref(),
        },
    );
    log::info!("mxchat starting up against {}", resolved.homeserver);

    let store_path = store::session_path()?;
    let session_store = SessionStore::load(&store_path)?;

    let (tx, rx) = mpsc::channel();
    let session = MatrixSession::new(&resolved, session_store, Some(store_path), tx.clone())
        .map_err(std::io::Error::other)?;
    session
        .ensure_logged_in(&resolved.user_id, resolved.password.as_deref())
        .await
        .map_err(std::io::Error::other)?;

    tui::run(Arc::new(session), tx, rx, resolved.room_list_width)
}

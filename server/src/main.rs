use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Maximum number of concurrent connections
    #[clap(short, long, default_value = "256")]
    max_connections: usize,
    /// End sessions that saw no activity for this many seconds
    #[clap(long, default_value = "3600")]
    idle_timeout_secs: u64,
    /// How often to look for idle sessions
    #[clap(long, default_value = "60")]
    reap_interval_secs: u64,
    /// JSON quiz file to preload, may be given more than once
    #[clap(short, long)]
    quiz_file: Vec<PathBuf>,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            max_connections: self.max_connections,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            reap_interval: Duration::from_secs(self.reap_interval_secs.max(1)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut server = Server::new(args.server_config()).await?;

    for path in &args.quiz_file {
        let ids = server.quizzes_mut().load_file(path)?;
        for id in ids {
            info!("Quiz {} available from {}", id, path.display());
        }
    }

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

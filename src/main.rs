use clap::Parser;

#[tokio::main]
async fn main() {
  let cli = plex_track_sync::Cli::parse();
  if let Err(e) = plex_track_sync::run(cli).await {
    eprintln!("Error: {}", e);
    std::process::exit(1);
  }
}

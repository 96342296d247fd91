mod cli;
mod commands;
mod node;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so client command output stays parseable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("vab=info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => commands::serve::run(&args).await,
        Commands::Health(args) => commands::health::run(&args).await,
        Commands::Read(args) => commands::client::read(&args).await,
        Commands::Write(args) => commands::client::write(&args).await,
        Commands::Create(args) => commands::client::create(&args).await,
        Commands::Delete(args) => commands::client::delete(&args).await,
        Commands::DeleteMember(args) => commands::client::delete_member(&args).await,
        Commands::Invoke(args) => commands::client::invoke(&args).await,
    }
}

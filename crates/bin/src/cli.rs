//! CLI argument definitions for the vab binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Generic model access gateway
#[derive(Parser, Debug)]
#[command(name = "vab")]
#[command(about = "VAB: one path-addressed model contract over local, HTTP and native TCP")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a data model over the native and HTTP transports
    Serve(ServeArgs),
    /// Check health of a running vab server
    Health(HealthArgs),
    /// Read the value at an address
    Read(TargetArgs),
    /// Replace the value at an address
    Write(ValueArgs),
    /// Create a new element, or append to a collection
    Create(ValueArgs),
    /// Delete the element at an address
    Delete(TargetArgs),
    /// Remove a member from the collection at an address
    DeleteMember(ValueArgs),
    /// Invoke the operation at an address
    Invoke(InvokeArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "VAB_HOST")]
    pub host: String,

    /// Port for the native TCP transport
    #[arg(long, default_value_t = 7741, env = "VAB_NATIVE_PORT")]
    pub native_port: u16,

    /// Port for the HTTP transport
    #[arg(long, default_value_t = 7780, env = "VAB_HTTP_PORT")]
    pub http_port: u16,

    /// Data to serve.
    /// A directory is served as a file-system model;
    /// anything else is a JSON file loaded at startup and saved on shutdown.
    #[arg(short = 'D', long, env = "VAB_DATA_FILE")]
    pub data: Option<PathBuf>,

    /// Element under which the consistency clock and freeze flag are exposed
    #[arg(long, default_value = vab::consistency::DEFAULT_STATE_ELEMENT)]
    pub state_element: String,

    /// Timeout in seconds for requests forwarded to other gateways
    #[arg(short, long, default_value_t = 30, env = "VAB_TIMEOUT")]
    pub timeout: u64,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server's HTTP transport
    #[arg(long, default_value = "http://127.0.0.1:7780", env = "VAB_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}

/// Arguments shared by every client command
#[derive(clap::Args, Debug)]
pub struct ClientArgs {
    /// Address of the element, e.g. `vab://host:7741/motor/speed` or a chained
    /// `http://gw:7780//vab://plc:7741/motor`
    pub address: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 30, env = "VAB_TIMEOUT")]
    pub timeout: u64,
}

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(clap::Args, Debug)]
pub struct ValueArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Value as JSON, e.g. `42`, `"text"` or `{"a":[1,2]}`
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct InvokeArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Arguments as JSON values
    pub args: Vec<String>,
}

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hublink", about = "Integration gateway core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway (default).
    Serve {
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// List stored connections with credentials redacted.
    Connections,
}

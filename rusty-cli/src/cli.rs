use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rusty",
    about = "Run a WebAssembly simulation and render the state it keeps in linear memory",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open a window and render the module
    Run {
        /// Path to the .wasm module (defaults to `module` in rusty.toml)
        module: Option<String>,
        /// Config file to use instead of searching for rusty.toml
        #[arg(long)]
        config: Option<String>,
        /// Initial window width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Initial window height in pixels
        #[arg(long)]
        height: Option<u32>,
    },
    /// Load the module, initialize it, and print what the host sees
    Inspect {
        /// Path to the .wasm module (defaults to `module` in rusty.toml)
        module: Option<String>,
        /// Config file to use instead of searching for rusty.toml
        #[arg(long)]
        config: Option<String>,
    },
}

//! CachedKV CLI Client
//!
//! Command-line interface for interacting with CachedKV.

use cachedkv::protocol::Command;
use cachedkv::Client;
use clap::{Parser, Subcommand};

/// CachedKV CLI
#[derive(Parser, Debug)]
#[command(name = "cachedkv-cli")]
#[command(about = "CLI for CachedKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6969")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get the values of a key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a single value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Set a key to a list of values (field value field value ...)
    Hmset {
        /// The key to set
        key: String,

        /// Values, stored in order
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Publish a message to a topic
    Publish {
        /// Topic name
        topic: String,

        /// Message words
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Subscribe to a topic and print messages until the server hangs up
    Subscribe {
        /// Topic name
        topic: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> cachedkv::Result<()> {
    let mut client = Client::connect(&args.server)?;

    let (command, follow) = match args.command {
        Commands::Get { key } => (Command::Get { key }, false),
        Commands::Set { key, value } => (Command::Set { key, value }, false),
        Commands::Hmset { key, values } => (Command::HMSet { key, values }, false),
        Commands::Del { key } => (Command::Del { key }, false),
        Commands::Publish { topic, message } => (Command::Publish { topic, message }, false),
        Commands::Subscribe { topic } => (Command::Subscribe { topic }, true),
        Commands::Ping => (Command::Ping, false),
    };

    command.validate()?;
    println!("{}", client.request(&command)?);

    if follow {
        while let Some(line) = client.next_line()? {
            println!("{}", line);
        }
    }

    Ok(())
}

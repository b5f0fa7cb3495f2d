use clap::{Args, Parser, Subcommand};
use precache_engine::AnnouncementPolicy;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Precache one asset and serve requests cache-first",
    long_about = "Drives a cache-then-network fetch proxy against a persistent on-disk cache.\n\
                  \n\
                  `install` announces an asset filename and precaches it relative to the\n\
                  proxy scope. `fetch` routes requests through the proxy, answering from\n\
                  cache when an entry matches and from the network otherwise."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Announce an asset and run the install phase
    Install {
        /// Location of the proxy; the asset resolves relative to it
        #[arg(long, help = "Proxy scope URL, e.g. https://grader.example.com/app/sw.js")]
        scope: String,

        /// Asset filename to precache
        #[arg(
            long,
            required = true,
            help = "Filename announced to the proxy, precached as ./<filename> (repeatable)"
        )]
        filename: Vec<String>,

        /// How repeated announcements are handled
        #[arg(long, value_enum, default_value = "keep-first")]
        policy: AnnouncementPolicy,
    },

    /// Fetch URLs through the proxy
    Fetch {
        #[arg(long, help = "Proxy scope URL; relative request paths resolve against it")]
        scope: String,

        #[arg(required = true, help = "Absolute URLs or paths relative to the scope")]
        urls: Vec<String>,

        /// Write the body of a single fetched URL to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Request headers in "Name: Value" form
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },

    /// List caches and the requests stored in them
    List,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Directory holding the persistent caches
    #[arg(long, global = true, help = "Cache directory (default: <temp>/precache-cache)")]
    pub cache_dir: Option<PathBuf>,

    /// Cache the announced asset is stored in
    #[arg(long, global = true, default_value = precache_engine::DEFAULT_CACHE_NAME)]
    pub cache_name: String,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Overall HTTP timeout in seconds
    #[arg(long, global = true, default_value = "30", help = "Overall timeout in seconds for HTTP requests")]
    pub timeout: u64,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(long, global = true, help = "Outbound proxy URL (http, https or socks5)")]
    pub proxy: Option<String>,

    /// Do not pick up system proxy settings
    #[arg(long, global = true)]
    pub no_system_proxy: bool,

    #[arg(long, global = true, help = "User agent for outgoing requests")]
    pub user_agent: Option<String>,
}

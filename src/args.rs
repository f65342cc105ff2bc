use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "privacy-pal")]
#[command(about = "Finds, fetches and scores website privacy policies")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the policy cache file
    #[arg(short, long, global = true)]
    pub storage: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scraping service
    Serve,

    /// Open a page in WebDriver, watch it for a privacy policy and show the result
    Scan {
        /// Page to open
        url: String,

        /// How long to keep watching the page for DOM changes, in seconds
        #[arg(short, long, default_value_t = 15)]
        watch_secs: u64,

        /// Show the long explanation of each section
        #[arg(long)]
        learn_more: bool,
    },

    /// Show the cached analysis for a page's domain
    Show {
        /// Any URL on the site
        url: String,

        /// Show the long explanation of each section
        #[arg(long)]
        learn_more: bool,
    },
}

use crate::config::RunMode;
use std::path::PathBuf;
use structopt::StructOpt;
use structopt::clap::AppSettings;

#[derive(Debug, StructOpt)]
#[structopt(global_settings = &[AppSettings::ColoredHelp])]
pub struct Args {
    /// Seed urls to scan
    pub seeds: Vec<String>,
    /// Number of probe workers
    #[structopt(short, long)]
    pub workers: Option<usize>,
    /// Http method used for probes
    #[structopt(short = "X", long)]
    pub method: Option<String>,
    /// Run mode (enumeration, linkcheck, dot-product)
    #[structopt(short = "m", long)]
    pub mode: Option<RunMode>,
    /// Probe backup/swap variants of discovered filenames
    #[structopt(long)]
    pub mangle: bool,
    /// Parse html responses for further links
    #[structopt(long)]
    pub parse_html: bool,
    /// Load exclusions from each host's robots.txt
    #[structopt(long)]
    pub robots: bool,
    /// Url prefixes that must never be probed
    #[structopt(short = "x", long = "exclude")]
    pub exclude: Vec<String>,
    /// Delay after each probe, in milliseconds
    #[structopt(long)]
    pub sleep_ms: Option<u64>,
    /// Status codes that permit spidering
    #[structopt(long = "spider-code")]
    pub spider_code: Vec<u16>,
    /// User agent presented to servers
    #[structopt(long)]
    pub user_agent: Option<String>,
    /// Do not verify tls certificates
    #[structopt(short = "k", long)]
    pub accept_invalid_certs: bool,
    /// Suppress results that match a per-host baseline
    #[structopt(long)]
    pub diff: bool,
    /// Write results to a file instead of stdout
    #[structopt(short = "o", long)]
    pub output: Option<PathBuf>,
    #[structopt(short, long)]
    pub config: Option<PathBuf>,
}

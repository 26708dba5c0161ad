use burrow::args::Args;
use burrow::config::ScanSettings;
use burrow::errors::*;
use burrow::scan::{ResultsMode, Scan};
use env_logger::Env;
use std::fs::File;
use std::io::{self, Write};
use structopt::StructOpt;
use url::Url;

fn run() -> Result<()> {
    let args = Args::from_args();
    debug!("{:#?}", args);

    let settings = ScanSettings::load(&args)?;
    debug!("{:#?}", settings);

    let mut seeds = Vec::new();
    for seed in &args.seeds {
        let url = seed.parse::<Url>()
            .with_context(|| anyhow!("Failed to parse seed as url: {:?}", seed))?;
        seeds.push(url);
    }

    let fp: Box<dyn Write + Send> = if let Some(path) = &args.output {
        Box::new(File::create(path)
            .context("Failed to create output file")?)
    } else {
        Box::new(io::stdout())
    };

    let mode = if args.diff {
        ResultsMode::Diff(fp)
    } else {
        ResultsMode::Plain(fp)
    };

    Scan::new(settings, seeds).run(mode)
}

fn main() {
    env_logger::init_from_env(Env::default()
        .default_filter_or("burrow=info"));

    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        for cause in err.chain().skip(1) {
            eprintln!("Because: {}", cause);
        }
        std::process::exit(1);
    }
}

use crate::args::Args;
use crate::config::RunMode;
use crate::errors::*;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};

fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir() {
        let path = path.join("burrow.toml");
        if path.exists() {
            return Some(path);
        }
    }

    let path = PathBuf::from("/etc/burrow.toml");
    if path.exists() {
        return Some(path);
    }

    None
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: Scan,
}

impl ConfigFile {
    fn load_from<P: AsRef<Path>>(path: P) -> Result<ConfigFile> {
        let buf = fs::read(path)
            .context("Failed to read config file")?;
        ConfigFile::load_slice(&buf)
    }

    #[inline]
    pub fn load_slice(buf: &[u8]) -> Result<ConfigFile> {
        toml::from_slice(buf)
            .context("Failed to parse config file")
            .map_err(Error::from)
    }

    pub fn update(&mut self, args: &Args) {
        if let Some(v) = args.workers {
            self.scan.workers = Some(v);
        }

        if let Some(v) = &args.method {
            self.scan.method = Some(v.clone());
        }

        if let Some(v) = args.mode {
            self.scan.mode = Some(v);
        }

        if args.mangle {
            self.scan.mangle = Some(true);
        }

        if args.parse_html {
            self.scan.parse_html = Some(true);
        }

        if args.robots {
            self.scan.robots = Some(true);
        }

        if !args.exclude.is_empty() {
            self.scan.exclude = Some(args.exclude.clone());
        }

        if let Some(v) = args.sleep_ms {
            self.scan.sleep_ms = Some(v);
        }

        if !args.spider_code.is_empty() {
            self.scan.spider_codes = Some(args.spider_code.clone());
        }

        if let Some(v) = &args.user_agent {
            self.scan.user_agent = Some(v.clone());
        }

        if args.accept_invalid_certs {
            self.scan.accept_invalid_certs = Some(true);
        }
    }

    pub fn load(args: &Args) -> Result<ConfigFile> {
        let mut config = if let Some(path) = &args.config {
            ConfigFile::load_from(path)?
        } else if let Some(path) = find_config_file() {
            ConfigFile::load_from(path)?
        } else {
            ConfigFile::default()
        };

        config.update(args);
        Ok(config)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Scan {
    pub workers: Option<usize>,
    pub queue_size: Option<usize>,
    pub method: Option<String>,
    pub mode: Option<RunMode>,
    pub mangle: Option<bool>,
    pub parse_html: Option<bool>,
    pub robots: Option<bool>,
    pub exclude: Option<Vec<String>>,
    pub sleep_ms: Option<u64>,
    pub spider_codes: Option<Vec<u16>>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub accept_invalid_certs: Option<bool>,
}

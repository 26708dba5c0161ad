use crate::args::Args;
use crate::errors::*;
use serde::{Serialize, Deserialize};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_WORKERS: usize = 3;
const DEFAULT_QUEUE_SIZE: usize = 1024;
const DEFAULT_METHOD: &str = "GET";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SPIDER_CODES: &[u16] = &[200];
const DEFAULT_USER_AGENT: &str = concat!("burrow/", env!("CARGO_PKG_VERSION"));

mod file;
pub use self::file::ConfigFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Probe wordlist-expanded paths and spider discovered links
    Enumeration,
    /// Only follow links found in pages
    LinkCheck,
    /// Probe every (host, path) pair without recursion
    DotProduct,
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<RunMode> {
        match s.to_lowercase().as_str() {
            "enum" | "enumeration" => Ok(RunMode::Enumeration),
            "linkcheck" | "link-check" => Ok(RunMode::LinkCheck),
            "dotproduct" | "dot-product" => Ok(RunMode::DotProduct),
            _ => bail!("Unknown run mode: {:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub workers: usize,
    pub queue_size: usize,
    pub method: String,
    pub run_mode: RunMode,
    pub mangle: bool,
    pub parse_html: bool,
    pub robots: bool,
    pub exclude_paths: Vec<String>,
    pub sleep_time: Duration,
    pub spider_codes: Vec<u16>,
    pub user_agent: String,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl ScanSettings {
    pub fn load(args: &Args) -> Result<ScanSettings> {
        let config = ConfigFile::load(args)?;
        Self::build(config)
    }

    fn build(config: ConfigFile) -> Result<ScanSettings> {
        let scan = config.scan;

        let workers = scan.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            bail!("worker count must be at least 1");
        }

        let queue_size = scan.queue_size.unwrap_or(DEFAULT_QUEUE_SIZE);
        if queue_size == 0 {
            bail!("queue size must be at least 1");
        }

        let spider_codes = scan.spider_codes
            .unwrap_or_else(|| DEFAULT_SPIDER_CODES.to_vec());

        Ok(ScanSettings {
            workers,
            queue_size,
            method: scan.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            run_mode: scan.mode.unwrap_or(RunMode::Enumeration),
            mangle: scan.mangle.unwrap_or(false),
            parse_html: scan.parse_html.unwrap_or(false),
            robots: scan.robots.unwrap_or(false),
            exclude_paths: scan.exclude.unwrap_or_default(),
            sleep_time: Duration::from_millis(scan.sleep_ms.unwrap_or(0)),
            spider_codes,
            user_agent: scan.user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(
                scan.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            accept_invalid_certs: scan.accept_invalid_certs.unwrap_or(false),
        })
    }
}

#[cfg(test)]
impl ScanSettings {
    pub(crate) fn for_tests() -> ScanSettings {
        ScanSettings {
            workers: 2,
            queue_size: 32,
            method: "GET".to_string(),
            run_mode: RunMode::Enumeration,
            mangle: false,
            parse_html: false,
            robots: false,
            exclude_paths: Vec::new(),
            sleep_time: Duration::from_millis(0),
            spider_codes: vec![200],
            user_agent: "burrow-test".to_string(),
            timeout: Duration::from_secs(5),
            accept_invalid_certs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scan_settings() {
        let config = ConfigFile::load_slice(b"").unwrap();
        let settings = ScanSettings::build(config).unwrap();
        assert_eq!(settings, ScanSettings {
            workers: 3,
            queue_size: 1024,
            method: "GET".to_string(),
            run_mode: RunMode::Enumeration,
            mangle: false,
            parse_html: false,
            robots: false,
            exclude_paths: Vec::new(),
            sleep_time: Duration::from_millis(0),
            spider_codes: vec![200],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(60),
            accept_invalid_certs: false,
        });
    }

    #[test]
    fn scan_settings_from_file() {
        let config = ConfigFile::load_slice(br#"
[scan]
workers = 8
mode = "dot-product"
mangle = true
spider_codes = [200, 301, 302]
exclude = ["http://example.com/admin"]
sleep_ms = 250
"#).unwrap();
        let settings = ScanSettings::build(config).unwrap();
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.run_mode, RunMode::DotProduct);
        assert!(settings.mangle);
        assert_eq!(settings.spider_codes, vec![200, 301, 302]);
        assert_eq!(settings.exclude_paths, vec!["http://example.com/admin"]);
        assert_eq!(settings.sleep_time, Duration::from_millis(250));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = ConfigFile::load_slice(b"[scan]\nworkers = 0\n").unwrap();
        assert!(ScanSettings::build(config).is_err());
    }

    #[test]
    fn run_mode_parsing() {
        assert_eq!("enumeration".parse::<RunMode>().unwrap(), RunMode::Enumeration);
        assert_eq!("linkcheck".parse::<RunMode>().unwrap(), RunMode::LinkCheck);
        assert_eq!("dot-product".parse::<RunMode>().unwrap(), RunMode::DotProduct);
        assert!("fuzz".parse::<RunMode>().is_err());
    }
}

use crate::errors::*;
use crate::results::ScanResult;
use crossbeam_channel::{self as channel, Receiver};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::thread;

// Headers that churn on every response and can never identify an
// uninteresting page
const NEVER_IMPORTANT: &[&str] = &["etag", "cache-control"];

/// Fingerprint of what a group's uninteresting response looks like: a
/// representative result plus the dimensions that were stable across
/// all samples.
pub struct BaselineResult {
    result: ScanResult,
    path_significant: bool,
    code_significant: bool,
    headers_significant: Vec<String>,
}

impl BaselineResult {
    /// Derive a baseline from one or more samples. A dimension is
    /// significant iff it is identical across every sample.
    pub fn new(samples: Vec<ScanResult>) -> Result<BaselineResult> {
        if samples.is_empty() {
            bail!("Need at least one result to build a baseline");
        }

        let mut path_significant = true;
        let mut code_significant = true;
        for pair in samples.windows(2) {
            if pair[0].code != pair[1].code {
                code_significant = false;
            }
            if pair[0].task.url.path() != pair[1].task.url.path() {
                path_significant = false;
            }
        }

        let mut headers_significant = Vec::new();
        for name in samples[0].response_header.names() {
            let name = name.to_lowercase();
            if NEVER_IMPORTANT.contains(&name.as_str()) {
                continue;
            }
            let baseline = samples[0].response_header.get(&name);
            if samples[1..]
                .iter()
                .all(|r| r.response_header.get(&name) == baseline)
            {
                headers_significant.push(name);
            }
        }

        let result = match samples.into_iter().next() {
            Some(result) => result,
            None => bail!("Need at least one result to build a baseline"),
        };

        Ok(BaselineResult {
            result,
            path_significant,
            code_significant,
            headers_significant,
        })
    }

    pub fn group(&self) -> &str {
        &self.result.group
    }

    /// True if every significant dimension of the candidate equals the
    /// baseline's value, i.e. the result is uninteresting.
    pub fn matches(&self, candidate: &ScanResult) -> bool {
        if self.path_significant
            && self.result.task.url.path() != candidate.task.url.path()
        {
            return false;
        }
        if self.code_significant && self.result.code != candidate.code {
            return false;
        }
        for name in &self.headers_significant {
            if self.result.response_header.get(name)
                != candidate.response_header.get(name)
            {
                return false;
            }
        }
        true
    }
}

/// Result sink that only keeps results diverging from their group's
/// baseline. Groups without a baseline keep everything.
pub struct DiffResultsManager {
    baselines: HashMap<String, BaselineResult>,
    keep: HashMap<String, Vec<ScanResult>>,
    fp: Box<dyn Write + Send>,
}

impl DiffResultsManager {
    pub fn new(fp: Box<dyn Write + Send>) -> DiffResultsManager {
        DiffResultsManager {
            baselines: HashMap::new(),
            keep: HashMap::new(),
            fp,
        }
    }

    /// Register a baseline under the first sample's group.
    pub fn add_group(&mut self, samples: Vec<ScanResult>) -> Result<()> {
        let baseline = BaselineResult::new(samples)?;
        self.baselines.insert(baseline.group().to_string(), baseline);
        Ok(())
    }

    pub fn run(mut self, rchan: Receiver<ScanResult>) -> super::ResultsHandle {
        let (done_tx, done_rx) = channel::bounded(1);
        thread::spawn(move || {
            for result in rchan.iter() {
                match self.baselines.get(&result.group) {
                    None => {
                        debug!("no baseline for group {}", result.group);
                        self.append(result);
                    }
                    Some(baseline) if !baseline.matches(&result) => {
                        self.append(result);
                    }
                    Some(_) => debug!("suppressing result: {}", result),
                }
            }
            if let Err(err) = self.write_results() {
                error!("unable to write results: {:#}", err);
            }
            done_tx.send(()).ok();
        });
        super::ResultsHandle { done_rx }
    }

    fn append(&mut self, result: ScanResult) {
        self.keep
            .entry(result.group.clone())
            .or_insert_with(Vec::new)
            .push(result);
    }

    fn write_results(&mut self) -> Result<()> {
        debug!("writing results for {} groups", self.keep.len());
        let mut fp = BufWriter::new(&mut self.fp);

        let mut groups: Vec<&String> = self.keep.keys().collect();
        groups.sort();
        for group in groups {
            writeln!(fp, "Group: {}", group)?;
            for result in &self.keep[group] {
                writeln!(
                    fp,
                    "\t{}\t{}\t{}",
                    result.task.url,
                    result.task.host.as_deref().unwrap_or(""),
                    result.code,
                )?;
            }
            writeln!(fp)?;
        }
        fp.flush()?;
        Ok(())
    }
}

use crate::client::{ClientFactory, ReqwestFactory};
use crate::config::ScanSettings;
use crate::errors::*;
use crate::filter::WorkFilter;
use crate::results::{DiffResultsManager, PlainResultsManager, ScanResult};
use crate::task::Task;
use crate::worker;
use crate::workqueue::WorkQueue;
use crossbeam_channel as channel;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::io::Write;
use std::sync::Arc;
use url::Url;

/// How results are reported.
pub enum ResultsMode {
    /// Every result, one line each
    Plain(Box<dyn Write + Send>),
    /// Only results diverging from a per-seed baseline of what this
    /// server answers for missing pages
    Diff(Box<dyn Write + Send>),
}

/// Owns the pipeline: work queue, filter, worker pool and results
/// sink. Drives the orderly shutdown once the queue is quiescent.
pub struct Scan {
    settings: Arc<ScanSettings>,
    seeds: Vec<Url>,
}

impl Scan {
    pub fn new(settings: ScanSettings, seeds: Vec<Url>) -> Scan {
        Scan {
            settings: Arc::new(settings),
            seeds,
        }
    }

    pub fn run(self, mode: ResultsMode) -> Result<()> {
        let factory = ReqwestFactory::new(&self.settings);
        self.run_with_factory(&factory, mode)
    }

    pub fn run_with_factory(
        self,
        factory: &dyn ClientFactory,
        mode: ResultsMode,
    ) -> Result<()> {
        if self.seeds.is_empty() {
            bail!("Nothing to scan, no seed urls given");
        }
        let settings = &self.settings;

        let queue = Arc::new(WorkQueue::new(settings.queue_size));
        let mut filter = WorkFilter::new(settings, queue.clone())?;
        if settings.robots {
            filter.load_robots_exclusions(&self.seeds, factory);
        }

        let (result_tx, result_rx) = channel::bounded(settings.queue_size);
        let filtered = filter.run(queue.receiver());
        let workers = worker::start_workers(settings, factory, &filtered, &queue, &result_tx)?;
        // the workers hold their own clones
        drop(result_tx);
        drop(filtered);

        let results = match mode {
            ResultsMode::Plain(fp) => PlainResultsManager::new(fp).run(result_rx),
            ResultsMode::Diff(fp) => {
                let mut manager = DiffResultsManager::new(fp);
                for seed in &self.seeds {
                    match baseline_samples(factory, settings, seed) {
                        Ok(samples) => manager.add_group(samples)?,
                        Err(err) => {
                            warn!("unable to build baseline for {}: {:#}", seed, err)
                        }
                    }
                }
                manager.run(result_rx)
            }
        };

        let seeds = self.seeds.iter().cloned().map(Task::new).collect();
        queue.add(seeds);

        queue.wait();
        debug!("queue is quiescent, shutting down");
        queue.close();
        for handle in &workers {
            handle.wait();
        }
        results.wait();
        Ok(())
    }
}

fn random_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

// Sample what the server answers for pages that cannot exist, so the
// diff sink can recognize this seed's "not found" shape even when the
// server does not answer 404.
fn baseline_samples(
    factory: &dyn ClientFactory,
    settings: &ScanSettings,
    seed: &Url,
) -> Result<Vec<ScanResult>> {
    let client = factory.build()?;
    let mut samples = Vec::new();
    for _ in 0..2 {
        let mut url = seed.clone();
        url.set_path(&format!("/{}", random_id()));
        let task = Task::new(url);
        let resp = client.request(
            &task.url,
            task.host.as_deref(),
            &settings.method,
            &task.header,
        )?;
        let mut sample = ScanResult::for_response(&task, &resp);
        sample.group = seed.host_str().unwrap_or("").to_string();
        samples.push(sample);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{CannedResponse, MockClient};
    use crate::results::testbuf::SharedBuf;
    use std::collections::HashMap;

    fn scan(
        settings: ScanSettings,
        seeds: &[&str],
        responses: HashMap<String, CannedResponse>,
    ) -> (MockClient, SharedBuf) {
        let client = MockClient::new(responses);
        let buf = SharedBuf::new();
        let seeds = seeds.iter().map(|s| s.parse().unwrap()).collect();
        Scan::new(settings, seeds)
            .run_with_factory(&client, ResultsMode::Plain(Box::new(buf.clone())))
            .unwrap();
        (client, buf)
    }

    fn html_settings() -> ScanSettings {
        let mut settings = ScanSettings::for_tests();
        settings.parse_html = true;
        settings
    }

    #[test]
    fn no_seeds_is_an_error() {
        let client = MockClient::new(HashMap::new());
        let buf = SharedBuf::new();
        let result = Scan::new(ScanSettings::for_tests(), Vec::new())
            .run_with_factory(&client, ResultsMode::Plain(Box::new(buf)));
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_links_are_probed_once() {
        let mut responses = HashMap::new();
        responses.insert(
            "http://h/".to_string(),
            CannedResponse::html(r#"<a href="a">x</a><a href="a">y</a>"#),
        );
        let (client, buf) = scan(html_settings(), &["http://h/"], responses);

        let probes = client.probed();
        let hits = probes.iter().filter(|u| *u == "http://h/a").count();
        assert_eq!(hits, 1);

        let out = buf.contents();
        assert_eq!(out.matches("404 http://h/a").count(), 1);
    }

    #[test]
    fn parent_paths_are_expanded_and_probed() {
        let mut responses = HashMap::new();
        responses.insert(
            "http://h/".to_string(),
            CannedResponse::html(r#"<a href="/x/y/z">deep</a>"#),
        );
        let (client, _buf) = scan(html_settings(), &["http://h/"], responses);

        let mut probes = client.probed();
        probes.sort();
        assert_eq!(
            probes,
            vec!["http://h/", "http://h/x", "http://h/x/y", "http://h/x/y/z"]
        );
    }

    #[test]
    fn redirects_spawn_a_followup_probe() {
        let mut responses = HashMap::new();
        responses.insert(
            "http://h/old".to_string(),
            CannedResponse::redirect("http://h/new"),
        );
        responses.insert(
            "http://h/new".to_string(),
            CannedResponse {
                code: 200,
                content_type: "text/plain".to_string(),
                body: "found".to_string(),
                ..Default::default()
            },
        );
        let (client, buf) = scan(ScanSettings::for_tests(), &["http://h/old"], responses);

        let mut probes = client.probed();
        probes.sort();
        assert_eq!(probes, vec!["http://h/new", "http://h/old"]);

        let out = buf.contents();
        assert!(out.contains("302 http://h/old -> http://h/new"));
        assert!(out.contains("200 http://h/new"));
    }

    #[test]
    fn quiescence_is_reached_under_growth() {
        // one page that fans out into ten links, none of which exist
        let links: String = (0..10)
            .map(|i| format!(r#"<a href="/l{}">x</a>"#, i))
            .collect();
        let mut responses = HashMap::new();
        responses.insert("http://h/".to_string(), CannedResponse::html(&links));
        let (client, buf) = scan(html_settings(), &["http://h/"], responses);

        assert_eq!(client.probed().len(), 11);
        assert_eq!(buf.contents().lines().count(), 11);
    }

    #[test]
    fn diff_mode_suppresses_the_not_found_shape() {
        let mut responses = HashMap::new();
        responses.insert(
            "http://h/".to_string(),
            CannedResponse::html(r#"<a href="/real">x</a><a href="/missing">y</a>"#),
        );
        responses.insert(
            "http://h/real".to_string(),
            CannedResponse {
                code: 500,
                content_type: "text/plain".to_string(),
                body: "boom".to_string(),
                ..Default::default()
            },
        );
        // /missing and the two baseline sample paths all fall through
        // to the mock's canned 404

        let client = MockClient::new(responses);
        let buf = SharedBuf::new();
        let seeds = vec!["http://h/".parse().unwrap()];
        Scan::new(html_settings(), seeds)
            .run_with_factory(&client, ResultsMode::Diff(Box::new(buf.clone())))
            .unwrap();

        let out = buf.contents();
        assert!(out.contains("Group: h\n"));
        assert!(out.contains("\thttp://h/\t\t200\n"));
        assert!(out.contains("\thttp://h/real\t\t500\n"));
        // same code and headers as the baseline samples: uninteresting
        assert!(!out.contains("http://h/missing"));
    }
}

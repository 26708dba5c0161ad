use crate::client::ClientFactory;
use crate::config::ScanSettings;
use crate::errors::*;
use crate::robots;
use crate::task::Task;
use crate::util;
use crate::workqueue::WorkQueue;
use crossbeam_channel::{self as channel, Receiver};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use url::Url;

/// Makes sure every task is only probed once and applies exclusion
/// rules. A single consumer thread owns the seen set, so no locking is
/// needed; every rejected task is still counted against the queue.
pub struct WorkFilter {
    seen: HashSet<String>,
    exclusions: Vec<Url>,
    queue: Arc<WorkQueue>,
    queue_size: usize,
    user_agent: String,
}

impl WorkFilter {
    pub fn new(settings: &ScanSettings, queue: Arc<WorkQueue>) -> Result<WorkFilter> {
        let mut exclusions = Vec::with_capacity(settings.exclude_paths.len());
        for path in &settings.exclude_paths {
            let url = path.parse::<Url>()
                .with_context(|| anyhow!("Unable to parse exclusion path: {:?}", path))?;
            exclusions.push(url);
        }
        Ok(WorkFilter {
            seen: HashSet::new(),
            exclusions,
            queue,
            queue_size: settings.queue_size,
            user_agent: settings.user_agent.clone(),
        })
    }

    pub fn add_exclusion(&mut self, url: Url) {
        self.exclusions.push(url);
    }

    /// Add one exclusion per Disallow entry in each scope's robots.txt.
    /// Fetch failures are logged and skipped.
    pub fn load_robots_exclusions(&mut self, scope: &[Url], factory: &dyn ClientFactory) {
        for scope_url in scope {
            debug!("fetching robots.txt exclusions for {}", scope_url);
            match robots::fetch_for_url(scope_url, factory) {
                Ok(data) => {
                    for disallowed in data.for_user_agent(&self.user_agent) {
                        let mut url = scope_url.clone();
                        url.set_path(&disallowed);
                        debug!("disallowing url by robots.txt: {}", url);
                        self.add_exclusion(url);
                    }
                }
                Err(err) => warn!("unable to get robots.txt data: {:#}", err),
            }
        }
    }

    /// Consume tasks from src until it closes, forwarding the ones that
    /// survive deduplication and exclusion checks.
    pub fn run(mut self, src: Receiver<Task>) -> Receiver<Task> {
        let (tx, rx) = channel::bounded(self.queue_size);
        thread::spawn(move || {
            'tasks: for mut task in src.iter() {
                // the fragment is irrelevant for requests to the server
                task.url.set_fragment(None);

                let id = task.id();
                if self.seen.contains(&id) {
                    self.reject(&task, "already done");
                    continue;
                }
                self.seen.insert(id);

                for exclusion in &self.exclusions {
                    if util::is_subpath(exclusion, &task.url) {
                        self.reject(&task, "excluded");
                        continue 'tasks;
                    }
                }

                if tx.send(task).is_err() {
                    break;
                }
            }
            // tx drops here, closing the output for the workers
        });
        rx
    }

    fn reject(&self, task: &Task, reason: &str) {
        debug!("filter rejected {}: {}", task, reason);
        self.queue.done(1);
    }
}

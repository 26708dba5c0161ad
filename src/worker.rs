use crate::client::{ClientFactory, HttpClient, ProbeResponse};
use crate::config::{RunMode, ScanSettings};
use crate::errors::*;
use crate::htmlworker::HtmlWorker;
use crate::results::ScanResult;
use crate::task::Task;
use crate::util;
use crate::workqueue::WorkQueue;
use crossbeam_channel::{self as channel, Receiver, Sender};
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Post-processor a worker may run over a response body.
pub trait PageHandler {
    fn eligible(&self, resp: &ProbeResponse) -> bool;
    fn handle(&self, task: &Task, body: &mut dyn Read, result: &mut ScanResult);
}

/// Rewrite a basename into the backup/swap names editors leave behind.
pub fn mangle(basename: &str) -> Vec<String> {
    vec![
        format!(".{}.swp", basename), // vim swap file
        format!("{}~", basename),     // editor backup
        format!("{}.bak", basename),
        format!("{}.orig", basename),
    ]
}

/// Connects to the server, issues the probe and optionally parses the
/// response. A pool of several workers is used to hide network latency.
pub struct Worker {
    client: Box<dyn HttpClient>,
    src: Receiver<Task>,
    queue: Arc<WorkQueue>,
    rchan: Sender<ScanResult>,
    settings: Arc<ScanSettings>,
    page_handler: Option<Box<dyn PageHandler + Send>>,
    stop: Receiver<()>,
    waitq: Sender<()>,
}

/// Control handle for a running worker.
pub struct WorkerHandle {
    stop: Sender<()>,
    waitq: Receiver<()>,
}

impl WorkerHandle {
    /// Ask the worker to stop between tasks.
    pub fn stop(&self) {
        self.stop.send(()).ok();
    }

    /// Block until the worker has terminated.
    pub fn wait(&self) {
        self.waitq.recv().ok();
    }
}

impl Worker {
    pub fn new(
        settings: Arc<ScanSettings>,
        factory: &dyn ClientFactory,
        src: Receiver<Task>,
        queue: Arc<WorkQueue>,
        rchan: Sender<ScanResult>,
    ) -> Result<(Worker, WorkerHandle)> {
        let client = factory.build()
            .context("Failed to create worker client")?;
        let (stop_tx, stop_rx) = channel::bounded(0);
        let (wait_tx, wait_rx) = channel::bounded(1);

        let worker = Worker {
            client,
            src,
            queue,
            rchan,
            settings,
            page_handler: None,
            stop: stop_rx,
            waitq: wait_tx,
        };
        let handle = WorkerHandle {
            stop: stop_tx,
            waitq: wait_rx,
        };
        Ok((worker, handle))
    }

    pub fn set_page_handler(&mut self, handler: Box<dyn PageHandler + Send>) {
        self.page_handler = Some(handler);
    }

    pub fn run_background(self) {
        thread::spawn(move || self.run());
    }

    /// Process tasks until signalled to stop or the source closes.
    pub fn run(mut self) {
        let stop = self.stop.clone();
        let src = self.src.clone();
        loop {
            channel::select! {
                recv(stop) -> _ => break,
                recv(src) -> task => match task {
                    Ok(task) => self.handle_task(task),
                    Err(_) => break,
                },
            }
        }
        self.waitq.send(()).ok();
    }

    pub fn handle_task(&mut self, task: Task) {
        debug!("trying raw url (unmangled): {}", task);
        let code = self.try_task(&task);
        if !util::is_dir(&task.url) && self.keep_spidering(code) {
            self.try_mangle_task(&task);
        }
        // mark as done, exactly once per task
        self.queue.done(1);
    }

    fn try_mangle_task(&mut self, task: &Task) {
        if !self.settings.mangle {
            return;
        }
        let path = task.url.path().to_string();
        let spos = match path.rfind('/') {
            Some(spos) => spos,
            None => return,
        };
        let dirname = &path[..spos];
        let basename = &path[spos + 1..];
        for newname in mangle(basename) {
            let mut clone = task.clone();
            clone.url.set_path(&format!("{}/{}", dirname, newname));
            self.try_task(&clone);
        }
    }

    /// Probe one url and emit its result. Returns the response code, 0
    /// when no response arrived.
    fn try_task(&mut self, task: &Task) -> u16 {
        info!("trying: {}", task);
        let code = self.probe(task);
        self.sleep();
        code
    }

    fn probe(&mut self, task: &Task) -> u16 {
        let request = self.client.request(
            &task.url,
            task.host.as_deref(),
            &self.settings.method,
            &task.header,
        );
        match request {
            Err(err) => {
                let mut result = ScanResult::for_task(task);
                result.error = Some(err);
                self.rchan.send(result).ok();
                0
            }
            Ok(mut resp) => {
                let code = resp.code;
                if util::is_dir(&task.url) && self.keep_spidering(code) {
                    // the expander in front of the filter turns this
                    // directory into new child probes
                    debug!("referring {} back for spidering", task);
                    self.queue.add(vec![task.clone()]);
                }
                if let Some(redir) = &resp.redirect {
                    debug!("referring redirect {} back", redir);
                    let mut clone = task.clone();
                    clone.url = redir.clone();
                    self.queue.add(vec![clone]);
                }
                let mut result = ScanResult::for_response(task, &resp);
                self.run_page_handler(task, &mut resp, &mut result);
                self.rchan.send(result).ok();
                code
            }
        }
    }

    fn run_page_handler(&self, task: &Task, resp: &mut ProbeResponse, result: &mut ScanResult) {
        if let Some(handler) = &self.page_handler {
            if handler.eligible(resp) {
                debug!("running page handler for task {}", task);
                handler.handle(task, &mut *resp.body, result);
            }
        }
    }

    /// Should we keep spidering from this code?
    fn keep_spidering(&self, code: u16) -> bool {
        if self.settings.run_mode == RunMode::DotProduct {
            return false;
        }
        self.settings.spider_codes.contains(&code)
    }

    fn sleep(&self) {
        if self.settings.sleep_time > Duration::from_millis(0) {
            thread::sleep(self.settings.sleep_time);
        }
    }
}

/// Start a pool of workers sized by the settings, attaching the html
/// link extractor where the run mode asks for it.
pub fn start_workers(
    settings: &Arc<ScanSettings>,
    factory: &dyn ClientFactory,
    src: &Receiver<Task>,
    queue: &Arc<WorkQueue>,
    rchan: &Sender<ScanResult>,
) -> Result<Vec<WorkerHandle>> {
    let mut handles = Vec::with_capacity(settings.workers);
    for _ in 0..settings.workers {
        let (mut worker, handle) = Worker::new(
            settings.clone(),
            factory,
            src.clone(),
            queue.clone(),
            rchan.clone(),
        )?;
        let parse = (settings.parse_html && settings.run_mode == RunMode::Enumeration)
            || settings.run_mode == RunMode::LinkCheck;
        if parse {
            worker.set_page_handler(Box::new(HtmlWorker::new(queue.clone())));
        }
        worker.run_background();
        handles.push(handle);
    }
    Ok(handles)
}

use crate::client::ProbeResponse;
use crate::errors::*;
use crate::task::{Headers, Task};
use crossbeam_channel::{self as channel, Receiver};
use std::fmt;
use std::io::{BufWriter, Write};
use std::thread;
use url::Url;

mod diff;
pub use self::diff::{BaselineResult, DiffResultsManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    Unknown,
    Internal,
    External,
}

/// One probe outcome: response metadata, discovered links and an
/// optional transport error.
#[derive(Debug)]
pub struct ScanResult {
    pub task: Task,
    /// Http status, 0 when no response arrived
    pub code: u16,
    /// Content length, -1 when unknown
    pub length: i64,
    pub content_type: String,
    pub response_header: Headers,
    pub redir: Option<Url>,
    pub error: Option<Error>,
    pub group: String,
    links: Vec<(Url, LinkClass)>,
}

impl ScanResult {
    pub fn for_task(task: &Task) -> ScanResult {
        ScanResult {
            task: task.clone(),
            code: 0,
            length: -1,
            content_type: String::new(),
            response_header: Headers::new(),
            redir: None,
            error: None,
            group: task.group(),
            links: Vec::new(),
        }
    }

    pub fn for_response(task: &Task, resp: &ProbeResponse) -> ScanResult {
        let mut result = ScanResult::for_task(task);
        result.code = resp.code;
        result.length = resp.length;
        result.content_type = resp.content_type.clone();
        result.response_header = resp.header.clone();
        result.redir = resp.redirect.clone();
        result
    }

    // Set semantics: a url is only recorded once
    pub fn add_link(&mut self, url: Url, class: LinkClass) {
        if !self.links.iter().any(|(u, _)| *u == url) {
            self.links.push((url, class));
        }
    }

    pub fn links(&self) -> &[(Url, LinkClass)] {
        &self.links
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, w: &mut fmt::Formatter) -> fmt::Result {
        if let Some(err) = &self.error {
            return write!(w, "ERR {} ({})", self.task.url, err);
        }
        write!(w, "{} {}", self.code, self.task.url)?;
        if let Some(redir) = &self.redir {
            write!(w, " -> {}", redir)?;
        }
        if self.length >= 0 {
            write!(w, " ({} bytes)", self.length)?;
        }
        Ok(())
    }
}

/// Handle for a running results consumer.
pub struct ResultsHandle {
    done_rx: Receiver<()>,
}

impl ResultsHandle {
    pub fn wait(&self) {
        self.done_rx.recv().ok();
    }
}

/// Writes every result as one line, in arrival order.
pub struct PlainResultsManager {
    fp: Box<dyn Write + Send>,
}

impl PlainResultsManager {
    pub fn new(fp: Box<dyn Write + Send>) -> PlainResultsManager {
        PlainResultsManager { fp }
    }

    pub fn run(self, rchan: Receiver<ScanResult>) -> ResultsHandle {
        let (done_tx, done_rx) = channel::bounded(1);
        let mut fp = BufWriter::new(self.fp);
        thread::spawn(move || {
            for result in rchan.iter() {
                if let Err(err) = writeln!(fp, "{}", result) {
                    error!("unable to write result: {}", err);
                }
            }
            if let Err(err) = fp.flush() {
                error!("unable to flush results: {}", err);
            }
            done_tx.send(()).ok();
        });
        ResultsHandle { done_rx }
    }
}

#[cfg(test)]
pub(crate) mod testbuf {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// Write sink that can still be inspected after being moved into a
    /// results manager.
    #[derive(Clone, Default)]
    pub struct SharedBuf {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl SharedBuf {
        pub fn new() -> SharedBuf {
            SharedBuf::default()
        }

        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testbuf::SharedBuf;
    use super::*;

    fn result(url: &str, code: u16) -> ScanResult {
        let task = Task::new(url.parse().unwrap());
        let mut result = ScanResult::for_task(&task);
        result.code = code;
        result
    }

    #[test]
    fn links_have_set_semantics() {
        let mut r = result("http://example.com/", 200);
        let link: Url = "http://example.com/a".parse().unwrap();
        r.add_link(link.clone(), LinkClass::Unknown);
        r.add_link(link, LinkClass::Unknown);
        assert_eq!(r.links().len(), 1);
    }

    #[test]
    fn display_formats() {
        let mut r = result("http://example.com/x", 200);
        r.length = 12;
        assert_eq!(r.to_string(), "200 http://example.com/x (12 bytes)");

        let mut r = result("http://example.com/old", 302);
        r.redir = Some("http://example.com/new".parse().unwrap());
        assert_eq!(
            r.to_string(),
            "302 http://example.com/old -> http://example.com/new"
        );

        let mut r = result("http://example.com/y", 0);
        r.error = Some(anyhow!("connection refused"));
        assert_eq!(r.to_string(), "ERR http://example.com/y (connection refused)");
    }

    #[test]
    fn plain_manager_writes_every_result() {
        let buf = SharedBuf::new();
        let manager = PlainResultsManager::new(Box::new(buf.clone()));

        let (tx, rx) = channel::bounded(8);
        let handle = manager.run(rx);
        tx.send(result("http://example.com/a", 200)).unwrap();
        tx.send(result("http://example.com/b", 404)).unwrap();
        drop(tx);
        handle.wait();

        let out = buf.contents();
        assert!(out.contains("200 http://example.com/a"));
        assert!(out.contains("404 http://example.com/b"));
        assert_eq!(out.lines().count(), 2);
    }
}

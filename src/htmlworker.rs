use crate::client::ProbeResponse;
use crate::errors::*;
use crate::results::{LinkClass, ScanResult};
use crate::task::Task;
use crate::util;
use crate::worker::PageHandler;
use crate::workqueue::WorkQueue;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use rcdom::{Handle, NodeData, RcDom};
use std::io::Read;
use std::sync::Arc;

const MAX_PARSE_SIZE: u64 = 10 * 1024 * 1024;

// Element/attribute pairs that carry links, in collection order
const LINK_ATTRS: &[(&str, &str)] = &[
    ("a", "href"),
    ("img", "src"),
    ("script", "src"),
    ("style", "src"),
];

/// Page handler that feeds links found in html bodies back into the
/// work queue, together with their parent directories. The filter
/// downstream collapses the duplicates this expansion produces.
pub struct HtmlWorker {
    queue: Arc<WorkQueue>,
}

impl HtmlWorker {
    pub fn new(queue: Arc<WorkQueue>) -> HtmlWorker {
        HtmlWorker { queue }
    }

    fn get_links<R: Read>(&self, body: &mut R) -> Vec<String> {
        let dom = match parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(body)
        {
            Ok(dom) => dom,
            Err(err) => {
                info!("unable to parse html document: {}", err);
                return Vec::new();
            }
        };

        let mut links = Vec::new();
        for &(tag, attr) in LINK_ATTRS {
            collect_element_attributes(&mut links, &dom.document, tag, attr);
        }
        util::dedupe(links)
    }
}

fn collect_element_attributes(out: &mut Vec<String>, node: &Handle, tag: &str, attr: &str) {
    if let NodeData::Element {
        ref name,
        ref attrs,
        ..
    } = node.data
    {
        if name.local.eq_str_ignore_ascii_case(tag) {
            for a in attrs.borrow().iter() {
                if a.name.local.eq_str_ignore_ascii_case(attr) {
                    out.push(a.value.to_string());
                    // first matching attribute wins
                    break;
                }
            }
        }
    }

    for child in node.children.borrow().iter() {
        collect_element_attributes(out, child, tag, attr);
    }
}

impl PageHandler for HtmlWorker {
    fn eligible(&self, resp: &ProbeResponse) -> bool {
        if !resp.content_type.eq_ignore_ascii_case("text/html") {
            return false;
        }
        // length is often -1 for unknown, try to parse those
        resp.length == -1 || (resp.length > 0 && resp.length < MAX_PARSE_SIZE as i64)
    }

    fn handle(&self, task: &Task, body: &mut dyn Read, result: &mut ScanResult) {
        let mut limited = body.take(MAX_PARSE_SIZE);
        let links = self.get_links(&mut limited);
        info!("found {} links for {}", links.len(), task.url);

        let mut found = Vec::new();
        for link in &links {
            // TODO: resolve against <base href> when present
            let resolved = match task.url.join(link) {
                Ok(url) => url,
                Err(err) => {
                    info!("error parsing url ({}): {}", link, err);
                    continue;
                }
            };
            result.add_link(resolved.clone(), LinkClass::Unknown);
            // include parents of the found url, the filter removes
            // duplicates
            found.push(resolved.clone());
            found.extend(util::parent_paths(&resolved));
        }

        let tasks = found
            .into_iter()
            .map(|url| {
                let mut new_task = task.clone();
                new_task.url = url;
                new_task
            })
            .collect();
        self.queue.add(tasks);
    }
}

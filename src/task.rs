use std::fmt;
use url::Url;

/// Ordered multimap of http headers. Insertion order is preserved for
/// emission, name lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Headers {
        Headers::default()
    }

    pub fn append(&mut self, name: &str, value: &str) {
        for (k, values) in &mut self.entries {
            if k.eq_ignore_ascii_case(name) {
                values.push(value.to_string());
                return;
            }
        }
        self.entries.push((name.to_string(), vec![value.to_string()]));
    }

    // First value for the name, like Go's http.Header.Get
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Lowercased (name, value) pairs in a stable order, for identity keys
    pub fn sorted_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (k, values) in &self.entries {
            for v in values {
                pairs.push((k.to_lowercase(), v.clone()));
            }
        }
        pairs.sort();
        pairs
    }
}

/// A single pending http probe: where to connect, which Host header to
/// present and any extra request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: Url,
    pub host: Option<String>,
    pub header: Headers,
}

impl Task {
    pub fn new(url: Url) -> Task {
        Task {
            url,
            host: None,
            header: Headers::new(),
        }
    }

    pub fn with_host(url: Url, host: String) -> Task {
        Task {
            url,
            host: Some(host),
            header: Headers::new(),
        }
    }

    // The baseline scope this task's results belong to
    pub fn group(&self) -> String {
        if let Some(host) = &self.host {
            host.clone()
        } else {
            self.url.host_str().unwrap_or("").to_string()
        }
    }

    // Canonical identity for deduplication: url, effective host and the
    // sorted header pairs all participate in equality
    pub fn id(&self) -> String {
        let mut id = self.url.as_str().to_string();
        id.push('\n');
        if let Some(host) = &self.host {
            id.push_str(host);
        }
        for (k, v) in self.header.sorted_pairs() {
            id.push('\n');
            id.push_str(&k);
            id.push(':');
            id.push_str(&v);
        }
        id
    }
}

impl fmt::Display for Task {
    fn fmt(&self, w: &mut fmt::Formatter) -> fmt::Result {
        match &self.host {
            Some(host) => write!(w, "{} (host: {})", self.url, host),
            None => write!(w, "{}", self.url),
        }
    }
}

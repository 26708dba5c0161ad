use crate::config::ScanSettings;
use crate::errors::*;
use crate::task::Headers;
use std::io::Read;
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One probe's response. Redirects are never followed by the transport;
/// a 3xx response instead carries the resolved Location target so the
/// worker can decide what to do with it.
pub struct ProbeResponse {
    pub code: u16,
    /// Content length, -1 when unknown
    pub length: i64,
    pub content_type: String,
    pub header: Headers,
    pub redirect: Option<Url>,
    pub body: Box<dyn Read + Send>,
}

/// What the worker needs from a transport.
pub trait HttpClient: Send {
    fn request(
        &self,
        url: &Url,
        host: Option<&str>,
        method: &str,
        header: &Headers,
    ) -> Result<ProbeResponse>;
}

/// Builds one client per worker so connection pools are not shared
/// across threads.
pub trait ClientFactory: Send + Sync {
    fn build(&self) -> Result<Box<dyn HttpClient>>;
}

pub struct ReqwestFactory {
    timeout: Duration,
    user_agent: String,
    accept_invalid_certs: bool,
}

impl ReqwestFactory {
    pub fn new(settings: &ScanSettings) -> ReqwestFactory {
        ReqwestFactory {
            timeout: settings.timeout,
            user_agent: settings.user_agent.clone(),
            accept_invalid_certs: settings.accept_invalid_certs,
        }
    }
}

impl ClientFactory for ReqwestFactory {
    fn build(&self) -> Result<Box<dyn HttpClient>> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .context("Failed to create http client")?;
        Ok(Box::new(ReqwestClient { client }))
    }
}

pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl HttpClient for ReqwestClient {
    fn request(
        &self,
        url: &Url,
        host: Option<&str>,
        method: &str,
        header: &Headers,
    ) -> Result<ProbeResponse> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .context("Invalid http method")?;

        let mut req = self.client.request(method, url.clone());
        if let Some(host) = host {
            req = req.header("Host", host);
        }
        for (name, values) in header.iter() {
            for value in values {
                req = req.header(name, value);
            }
        }

        let resp = req.send()?;

        let code = resp.status().as_u16();
        let mut out = Headers::new();
        for (name, value) in resp.headers() {
            out.append(name.as_str(), value.to_str().unwrap_or(""));
        }
        let content_type = out.get("content-type").unwrap_or("").to_string();
        let length = resp.content_length().map(|l| l as i64).unwrap_or(-1);
        let redirect = if resp.status().is_redirection() {
            out.get("location").and_then(|loc| url.join(loc).ok())
        } else {
            None
        };

        Ok(ProbeResponse {
            code,
            length,
            content_type,
            header: out,
            redirect,
            body: Box::new(resp),
        })
    }
}

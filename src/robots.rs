use crate::client::ClientFactory;
use crate::errors::*;
use crate::task::Headers;
use std::io::Read;
use url::Url;

const MAX_ROBOTS_SIZE: u64 = 512 * 1024;

#[derive(Debug, Default, PartialEq)]
struct Group {
    agents: Vec<String>,
    disallow: Vec<String>,
}

/// Parsed robots.txt: user-agent groups and their Disallow paths.
/// Everything else (Allow, Crawl-delay, Sitemap) is ignored.
#[derive(Debug, Default, PartialEq)]
pub struct RobotsData {
    groups: Vec<Group>,
}

impl RobotsData {
    /// Disallow paths for the most specific group matching the agent,
    /// falling back to the wildcard group.
    pub fn for_user_agent(&self, user_agent: &str) -> Vec<String> {
        let user_agent = user_agent.to_lowercase();
        let mut fallback = None;
        let mut best: Option<(usize, &Group)> = None;
        for group in &self.groups {
            for agent in &group.agents {
                if agent == "*" {
                    fallback.get_or_insert(group);
                } else if user_agent.contains(&agent.to_lowercase())
                    && best.map_or(true, |(len, _)| agent.len() > len)
                {
                    best = Some((agent.len(), group));
                }
            }
        }
        best.map(|(_, g)| g)
            .or(fallback)
            .map(|g| g.disallow.clone())
            .unwrap_or_default()
    }
}

pub fn parse(body: &str) -> RobotsData {
    let mut data = RobotsData::default();
    let mut current: Option<Group> = None;
    let mut in_agent_list = false;

    for line in body.lines() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let mut parts = line.splitn(2, ':');
        let key = match parts.next() {
            Some(key) => key.trim().to_lowercase(),
            None => continue,
        };
        let value = parts.next().map(str::trim).unwrap_or("");

        match key.as_str() {
            "user-agent" => {
                if !in_agent_list {
                    if let Some(group) = current.take() {
                        data.groups.push(group);
                    }
                    current = Some(Group::default());
                }
                if let Some(group) = &mut current {
                    group.agents.push(value.to_string());
                }
                in_agent_list = true;
            }
            "disallow" => {
                in_agent_list = false;
                if value.is_empty() {
                    continue;
                }
                if let Some(group) = &mut current {
                    group.disallow.push(value.to_string());
                }
            }
            _ => {
                in_agent_list = false;
            }
        }
    }
    if let Some(group) = current.take() {
        data.groups.push(group);
    }
    data
}

/// Fetch and parse robots.txt for the scope url's host.
pub fn fetch_for_url(scope: &Url, factory: &dyn ClientFactory) -> Result<RobotsData> {
    let client = factory.build()?;

    let mut robots_url = scope.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    let resp = client.request(&robots_url, None, "GET", &Headers::new())?;
    if resp.code != 200 {
        bail!("robots.txt returned status {}", resp.code);
    }

    let mut body = String::new();
    resp.body
        .take(MAX_ROBOTS_SIZE)
        .read_to_string(&mut body)
        .context("Failed to read robots.txt body")?;
    Ok(parse(&body))
}

//! Broken resource detection: collect the stylesheets, scripts and images a
//! page references, then check each one through the page's own navigator.

use std::fmt;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::navigator::{Navigator, PageSnapshot};

/// Outcome of checking one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// HTTP status of the response
    Code(u16),
    /// Navigation finished without a response
    NoResponse,
    /// Navigation raised an error
    Error,
}

const NO_RESPONSE: &str = "No Response";
const ERROR: &str = "Error";

impl ResourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResourceStatus::Code(200))
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceStatus::Code(code) => write!(f, "{}", code),
            ResourceStatus::NoResponse => f.write_str(NO_RESPONSE),
            ResourceStatus::Error => f.write_str(ERROR),
        }
    }
}

impl Serialize for ResourceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResourceStatus::Code(code) => serializer.serialize_u16(*code),
            ResourceStatus::NoResponse => serializer.serialize_str(NO_RESPONSE),
            ResourceStatus::Error => serializer.serialize_str(ERROR),
        }
    }
}

impl<'de> Deserialize<'de> for ResourceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(ResourceStatus::Code(code)),
            Raw::Text(text) if text == NO_RESPONSE => Ok(ResourceStatus::NoResponse),
            Raw::Text(text) if text == ERROR => Ok(ResourceStatus::Error),
            Raw::Text(text) => Err(serde::de::Error::custom(format!("unknown resource status: {}", text))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCheckResult {
    pub resource: String,
    pub status: ResourceStatus,
}

/// List resource URLs referenced by stylesheet links, scripts and images,
/// in document order.
///
/// URLs are resolved against the document base. A value that cannot be
/// resolved is kept as written. Empty values are skipped; duplicates are not.
pub fn collect_resources(page: &PageSnapshot) -> Vec<String> {
    let dom = html5ever::parse_document(RcDom::default(), Default::default()).one(page.html.as_str());

    let page_url = Url::parse(&page.url).ok();
    let base = find_base_href(&dom.document)
        .and_then(|href| match &page_url {
            Some(page_url) => page_url.join(&href).ok(),
            None => Url::parse(&href).ok(),
        })
        .or(page_url);

    let mut raw = Vec::new();
    walk_resources(&dom.document, &mut raw);

    raw.into_iter()
        .map(|value| match &base {
            Some(base) => base
                .join(&value)
                .map(|u| u.to_string())
                .unwrap_or(value),
            None => value,
        })
        .collect()
}

fn element_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn element_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn find_base_href(node: &Handle) -> Option<String> {
    if element_name(node).as_deref() == Some("base") {
        if let Some(href) = element_attr(node, "href") {
            return Some(href);
        }
    }
    node.children.borrow().iter().find_map(find_base_href)
}

fn is_stylesheet_link(node: &Handle) -> bool {
    element_attr(node, "rel")
        .map(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        })
        .unwrap_or(false)
}

fn walk_resources(node: &Handle, out: &mut Vec<String>) {
    let value = match element_name(node).as_deref() {
        Some("link") if is_stylesheet_link(node) => {
            element_attr(node, "src").or_else(|| element_attr(node, "href"))
        }
        Some("script") | Some("img") => element_attr(node, "src"),
        _ => None,
    };

    if let Some(value) = value {
        let value = value.trim();
        if !value.is_empty() {
            out.push(value.to_string());
        }
    }

    for child in node.children.borrow().iter() {
        walk_resources(child, out);
    }
}

/// Check each resource by navigating to it and return the ones that did not
/// answer with HTTP 200, in input order.
///
/// Checks run one at a time on the given navigator; it no longer shows the
/// original page afterwards.
pub async fn validate_resources<N>(navigator: &mut N, resources: &[String]) -> Vec<ResourceCheckResult>
where
    N: Navigator + ?Sized,
{
    let mut broken = Vec::new();

    for resource in resources {
        let status = match navigator.goto(resource).await {
            Ok(Some(code)) => ResourceStatus::Code(code),
            Ok(None) => ResourceStatus::NoResponse,
            Err(e) => {
                debug!("Navigation to {} failed: {}", resource, e);
                ResourceStatus::Error
            }
        };

        if status.is_ok() {
            debug!("{} -> {}", resource, status);
            continue;
        }

        warn!("Broken resource: {} ({})", resource, status);
        broken.push(ResourceCheckResult {
            resource: resource.clone(),
            status,
        });
    }

    info!("Checked {} resource(s), {} broken", resources.len(), broken.len());
    broken
}

/// Fail when any resource is broken, naming every one of them
pub fn assert_no_broken(broken: &[ResourceCheckResult]) -> E2eResult<()> {
    if broken.is_empty() {
        return Ok(());
    }

    let details = broken
        .iter()
        .map(|r| format!("  {} ({})", r.resource, r.status))
        .collect::<Vec<_>>()
        .join("\n");

    Err(E2eError::BrokenResources {
        count: broken.len(),
        details,
    })
}

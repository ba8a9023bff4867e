//! Umbraco evidence scoring
//!
//! A weighted rule set classifies a probe response. Primary indicators (admin
//! path reachability, Umbraco-specific file paths) score 3 points, secondary
//! infrastructure signals (ASP.NET headers, directory names, Client Dependency
//! Framework traces) score 2, and weak textual signals score 1. A total of 3
//! or more is a positive verdict; generic mentions of the platform name alone
//! never cross the threshold.
//!
//! A meta-generator denylist of other CMS platforms short-circuits everything:
//! a page declaring itself WordPress is never counted as Umbraco regardless of
//! what else it contains.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::company::extract_display_name;
use crate::config::HttpConfig;
use crate::probe::{ProbeResult, Prober};

/// Minimum score for a positive verdict
pub const MATCH_THRESHOLD: u32 = 3;

/// Generators that rule Umbraco out immediately (lowercased substrings)
const EXCLUDED_GENERATORS: &[&str] = &[
    // Traditional CMS
    "wordpress", "drupal", "joomla", "typo3", "modx", "concrete5", "textpattern",
    "processwire", "craft cms", "expressionengine",
    // E-commerce CMS
    "magento", "opencart", "prestashop", "woocommerce", "shopify", "bigcommerce",
    // Static site generators
    "jekyll", "hugo", "gatsby", "next.js", "nuxt.js", "hexo", "pelican", "middleman",
    // Website builders
    "wix.com", "squarespace", "weebly", "webflow",
    // Wiki & documentation
    "mediawiki", "dokuwiki", "tiddlywiki", "gitiles",
    // Blogging platforms
    "ghost", "blogger", "tumblr",
    // Enterprise CMS
    "sitecore", "adobe experience manager", "episerver", "optimizely", "kentico",
    // Headless/API-first CMS
    "contentful", "strapi", "sanity",
    // Forum/community software
    "phpbb", "vbulletin", "xenforo", "discourse",
];

/// Umbraco-specific file paths (3 points when any appears in URL or body)
const FILE_PATHS: &[&str] = &[
    "/App_Plugins/",
    "/umbraco_client/",
    "/Views/",
    "/umbraco/umbraco.aspx",
    "/umbraco/login.aspx",
    "/umbraco/dashboard.aspx",
];

/// ASP.NET/IIS header names (2 points when any header key matches)
const ASPNET_HEADERS: &[&str] = &["x-aspnet-version", "x-aspnetmvc-version", "x-powered-by"];

/// Directory names typical of an Umbraco install (2 points)
const DIR_MARKERS: &[&str] = &[
    "App_Plugins",
    "umbraco_client",
    "umbraco/Views",
    "umbraco/App_Plugins",
    "umbraco/umbraco",
];

/// Client Dependency Framework traces (2 points, case-insensitive)
const CDF_MARKERS: &[&str] = &[
    "umbraco.clientdependency",
    "umbraco_client",
    "ClientDependency",
    "umbraco.css",
    "umbraco.js",
];

/// Umbraco-specific CSS classes and HTML elements (1 point, case-sensitive)
const ELEMENT_MARKERS: &[&str] = &[
    "class=\"umbraco",
    "id=\"umbraco",
    "<umbraco",
    "umbraco-login",
    "umbraco-dashboard",
    "umbraco-content",
];

/// Umbraco JavaScript filenames (1 point, case-insensitive)
const JS_MARKERS: &[&str] = &["umbraco.js", "umbraco.min.js", "umbraco_client", "umbraco/scripts"];

/// Generic textual mentions of the platform (1 point, case-insensitive)
const TEXT_MARKERS: &[&str] = &["umbraco", "umbraco.aspx", "umbraco-login", "umbraco-dashboard"];

static GENERATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta\s+name=['"]generator['"]\s+content=['"]([^'"]+)['"]"#)
        .expect("generator regex is valid")
});

/// Coarse confidence tier derived from the numeric score, for display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

impl Confidence {
    fn from_score(score: u32) -> Self {
        if score >= 6 {
            Confidence::High
        } else if score >= MATCH_THRESHOLD {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Classification verdict with its human-readable evidence trail
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_match: bool,
    pub score: u32,
    pub confidence: Confidence,
    /// First entry is always the summary line; the rest are tiered findings
    pub evidence: Vec<String>,
}

impl Verdict {
    fn no_match(evidence: Vec<String>) -> Self {
        Verdict {
            is_match: false,
            score: 0,
            confidence: Confidence::Low,
            evidence,
        }
    }
}

/// Classify a probe response. Pure function: identical inputs always yield
/// the identical verdict and evidence list.
pub fn classify(body: &str, headers: &HashMap<String, String>, status: u16, url: &str) -> Verdict {
    // Anything but 200 carries no body worth scoring
    if status != 200 {
        return Verdict::no_match(vec![format!("Status code: {}", status)]);
    }

    // Exclusion takes precedence over all scoring
    if let Some(generator) = GENERATOR_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        let lowered = generator.to_lowercase();
        if EXCLUDED_GENERATORS.iter().any(|g| lowered.contains(g)) {
            return Verdict::no_match(vec![format!(
                "EXCLUDED: Meta generator indicates non-Umbraco CMS: {}",
                generator
            )]);
        }
    }

    let body_lower = body.to_lowercase();
    let mut score = 0u32;
    let mut evidence = Vec::new();

    // PRIMARY: admin path reachable
    if url.contains("/umbraco/") || url.contains("/umbraco") {
        score += 3;
        evidence.push("PRIMARY: Admin path /umbraco/ detected".to_string());
    }

    // PRIMARY: Umbraco-specific file paths
    let found_paths: Vec<&str> = FILE_PATHS
        .iter()
        .filter(|path| url.contains(*path) || body.contains(*path))
        .copied()
        .collect();
    if !found_paths.is_empty() {
        score += 3;
        evidence.push(format!(
            "PRIMARY: Umbraco file paths detected: {}",
            found_paths.join(", ")
        ));
    }

    // SECONDARY: ASP.NET/IIS server signatures
    let found_headers: Vec<&str> = ASPNET_HEADERS
        .iter()
        .filter(|name| headers.keys().any(|key| key.contains(*name)))
        .copied()
        .collect();
    if !found_headers.is_empty() {
        score += 2;
        evidence.push(format!(
            "SECONDARY: ASP.NET/IIS headers detected: {}",
            found_headers.join(", ")
        ));
    }

    // SECONDARY: directory structures. Markers already credited by the file
    // path rule above are skipped so one occurrence scores once.
    let found_dirs: Vec<&str> = DIR_MARKERS
        .iter()
        .filter(|dir| body.contains(*dir) || body.contains(&format!("/{}/", dir)))
        .filter(|dir| !found_paths.iter().any(|path| path.contains(*dir)))
        .copied()
        .collect();
    if !found_dirs.is_empty() {
        score += 2;
        evidence.push(format!(
            "SECONDARY: Umbraco directory structures: {}",
            found_dirs.join(", ")
        ));
    }

    // SECONDARY: Client Dependency Framework traces
    let found_cdf: Vec<&str> = CDF_MARKERS
        .iter()
        .filter(|marker| body_lower.contains(&marker.to_lowercase()))
        .copied()
        .collect();
    if !found_cdf.is_empty() {
        score += 2;
        evidence.push(format!(
            "SECONDARY: Client Dependency Framework patterns: {}",
            found_cdf.join(", ")
        ));
    }

    // TERTIARY: generic .NET application patterns
    if body.contains(".aspx") || url.contains(".aspx") {
        score += 1;
        evidence.push("TERTIARY: ASPX extensions detected (.NET application)".to_string());
    }

    // TERTIARY: Umbraco CSS classes and HTML elements
    let found_elements: Vec<&str> = ELEMENT_MARKERS
        .iter()
        .filter(|marker| body.contains(*marker))
        .copied()
        .collect();
    if !found_elements.is_empty() {
        score += 1;
        evidence.push(format!(
            "TERTIARY: Umbraco HTML elements: {}",
            found_elements.join(", ")
        ));
    }

    // TERTIARY: Umbraco JavaScript references
    let found_js: Vec<&str> = JS_MARKERS
        .iter()
        .filter(|marker| body_lower.contains(&marker.to_lowercase()))
        .copied()
        .collect();
    if !found_js.is_empty() {
        score += 1;
        evidence.push(format!(
            "TERTIARY: Umbraco JavaScript references: {}",
            found_js.join(", ")
        ));
    }

    // TERTIARY: generic text mentions
    let found_text: Vec<&str> = TEXT_MARKERS
        .iter()
        .filter(|marker| body_lower.contains(&marker.to_lowercase()))
        .copied()
        .collect();
    if !found_text.is_empty() {
        score += 1;
        evidence.push(format!(
            "TERTIARY: Umbraco text patterns: {}",
            found_text.join(", ")
        ));
    }

    let confidence = Confidence::from_score(score);
    let is_match = score >= MATCH_THRESHOLD;

    if is_match {
        evidence.insert(
            0,
            format!("Umbraco detected (Score: {}, Confidence: {})", score, confidence),
        );
    } else {
        evidence.insert(
            0,
            format!("Not Umbraco (Score: {}, need {}+ points)", score, MATCH_THRESHOLD),
        );
    }

    Verdict {
        is_match,
        score,
        confidence,
        evidence,
    }
}

/// Result of checking one domain across both scheme attempts
#[derive(Debug, Clone)]
pub struct Detection {
    pub domain: String,
    pub is_match: bool,
    pub score: u32,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
    /// Display name extracted from the matched page, when one was found
    pub company_name: Option<String>,
}

impl Detection {
    fn unreachable(domain: &str) -> Self {
        Detection {
            domain: domain.to_string(),
            is_match: false,
            score: 0,
            confidence: Confidence::Low,
            evidence: Vec::new(),
            company_name: None,
        }
    }
}

/// Probes a domain over the configured schemes and classifies each response.
pub struct Checker {
    prober: Prober,
    schemes: Vec<String>,
}

impl Checker {
    pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
        Ok(Self {
            prober: Prober::new(config)?,
            schemes: config.schemes.clone(),
        })
    }

    /// Check a single domain.
    ///
    /// Schemes are tried in order (HTTPS first by default). A positive verdict
    /// short-circuits; a negative one is overwritten by the next attempt, so
    /// the last reachable scheme decides. Network failures on every scheme
    /// yield an empty-evidence non-match, never an error - a dead domain must
    /// not abort the job it belongs to.
    pub async fn check_domain(&self, domain: &str) -> Detection {
        let mut last: Option<Detection> = None;

        for scheme in &self.schemes {
            let url = self.prober.probe_url(scheme, domain);
            let result = match self.prober.fetch(&url).await {
                Ok(result) => result,
                Err(e) => {
                    debug!("{} - {} attempt failed: {:#}", domain, scheme, e);
                    continue;
                }
            };

            let detection = self.evaluate(domain, &result);
            if detection.is_match {
                return detection;
            }
            last = Some(detection);
        }

        last.unwrap_or_else(|| Detection::unreachable(domain))
    }

    fn evaluate(&self, domain: &str, result: &ProbeResult) -> Detection {
        let verdict = classify(&result.body, &result.headers, result.status, &result.final_url);
        let company_name = if verdict.is_match {
            extract_display_name(&result.body)
        } else {
            None
        };
        Detection {
            domain: domain.to_string(),
            is_match: verdict.is_match,
            score: verdict.score,
            confidence: verdict.confidence,
            evidence: verdict.evidence,
            company_name,
        }
    }
}

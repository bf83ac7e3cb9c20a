//! Pipeline configuration for topicscrape.
//!
//! The settings document is INI-style: a reserved `[General Settings]`
//! section plus one section per domain. It is parsed and validated once into
//! an immutable [`PipelineConfig`] that is passed to every stage.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption, Properties};
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::types::output_name;

/// Reserved section name; never treated as a domain.
pub const GENERAL_SETTINGS: &str = "General Settings";

const KEY_OUTPUT_DIR: &str = "OUTPUT_FILE_DIRECTORY";
const KEY_SEARCH_TERM: &str = "BERT_SEARCH_TERM";
const KEY_SCRAPER_COMMAND: &str = "SCRAPER_COMMAND";
const KEY_SCRAPER_OUTPUT_DIR: &str = "SCRAPER_OUTPUT_DIRECTORY";
const KEY_ENGINE_COMMAND: &str = "TOPIC_ENGINE_COMMAND";

const KEY_CSS_SELECTORS: &str = "CSS_SELECTORS";
const KEY_DEPTH_LIMIT: &str = "DEPTH_LIMIT";
const KEY_PAGE_COUNT: &str = "CLOSESPIDER_PAGECOUNT";

const UTF8_BOM: char = '\u{feff}';

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Validated, immutable pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// `[General Settings]` section.
    pub general: GeneralSettings,
    /// Domain sections, in file order.
    pub domains: Vec<DomainSpec>,
}

/// `[General Settings]` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralSettings {
    /// Root directory under which every domain workspace is created.
    pub output_dir: PathBuf,
    /// Default query term for topic search.
    pub search_term: Option<String>,
    /// How to invoke the external scraper.
    pub scraper: ScraperSettings,
    /// How to start the topic engine bridge.
    pub engine: EngineSettings,
}

/// External scraper invocation settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScraperSettings {
    /// Program followed by its leading arguments.
    pub command: Vec<String>,
    /// Fixed location where the scraper writes its output file.
    pub output_dir: PathBuf,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            command: default_scraper_command(),
            output_dir: default_scraper_output_dir(),
        }
    }
}

fn default_scraper_command() -> Vec<String> {
    vec!["sh".into(), "../shell/run_spider.sh".into()]
}
fn default_scraper_output_dir() -> PathBuf {
    PathBuf::from("./recursive_spider/recursive_spider")
}

/// Topic engine bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSettings {
    /// Program followed by its leading arguments.
    pub command: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
        }
    }
}

fn default_engine_command() -> Vec<String> {
    vec!["python3".into(), "-m".into(), "topic_bridge".into()]
}

/// One domain section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSpec {
    /// Domain identifier (the section name, URL-like).
    pub domain: String,
    /// CSS selector the scraper extracts content with.
    pub css_selector: String,
    /// Maximum crawl depth.
    pub depth_limit: u32,
    /// Maximum number of pages before the scraper stops.
    pub page_cap: u32,
}

impl DomainSpec {
    /// Folder and file stem used for this domain on disk.
    pub fn folder_name(&self) -> String {
        output_name(&self.domain)
    }

    /// File name the scraper is asked to produce.
    pub fn scrape_file_name(&self) -> String {
        format!("{}.jl", self.folder_name())
    }
}

impl PipelineConfig {
    /// Parse and validate a settings document.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

        // Selectors like `div.post > p::text` must come through untouched.
        let opt = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, opt)
            .map_err(|e| PipelineError::config(format!("invalid INI syntax: {e}")))?;

        let mut general = None;
        let mut domains = Vec::new();
        let mut seen_domains = HashSet::new();
        let mut seen_folders: HashMap<String, String> = HashMap::new();

        for (section, props) in ini.iter() {
            let Some(name) = section else {
                continue;
            };

            if name == GENERAL_SETTINGS {
                if general.is_some() {
                    return Err(PipelineError::config(format!(
                        "section [{GENERAL_SETTINGS}] appears more than once"
                    )));
                }
                general = Some(parse_general(props)?);
                continue;
            }

            let name = name.trim();
            if name.is_empty() {
                return Err(PipelineError::config("domain section name must not be empty"));
            }
            if !seen_domains.insert(name.to_string()) {
                return Err(PipelineError::config(format!(
                    "domain [{name}] is configured more than once"
                )));
            }

            let spec = parse_domain(name, props)?;
            if let Some(other) = seen_folders.insert(spec.folder_name(), name.to_string()) {
                return Err(PipelineError::config(format!(
                    "domains [{other}] and [{name}] share the workspace folder '{}'",
                    spec.folder_name()
                )));
            }
            domains.push(spec);
        }

        let general = general.ok_or_else(|| {
            PipelineError::config(format!("missing [{GENERAL_SETTINGS}] section"))
        })?;

        Ok(Self { general, domains })
    }

    /// The configured search term, required by modelling runs.
    pub fn require_search_term(&self) -> Result<&str> {
        self.general.search_term.as_deref().ok_or_else(|| {
            PipelineError::config(format!(
                "[{GENERAL_SETTINGS}] has no {KEY_SEARCH_TERM}; it is required to model topics"
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Section parsing
// ---------------------------------------------------------------------------

fn parse_general(props: &Properties) -> Result<GeneralSettings> {
    let output_dir = PathBuf::from(required(props, GENERAL_SETTINGS, KEY_OUTPUT_DIR)?);
    let search_term = lookup(props, KEY_SEARCH_TERM).map(String::from);

    let scraper = ScraperSettings {
        command: match lookup(props, KEY_SCRAPER_COMMAND) {
            Some(raw) => split_command(KEY_SCRAPER_COMMAND, raw)?,
            None => default_scraper_command(),
        },
        output_dir: lookup(props, KEY_SCRAPER_OUTPUT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_scraper_output_dir),
    };

    let engine = EngineSettings {
        command: match lookup(props, KEY_ENGINE_COMMAND) {
            Some(raw) => split_command(KEY_ENGINE_COMMAND, raw)?,
            None => default_engine_command(),
        },
    };

    Ok(GeneralSettings {
        output_dir,
        search_term,
        scraper,
        engine,
    })
}

fn parse_domain(name: &str, props: &Properties) -> Result<DomainSpec> {
    let css_selector = required(props, name, KEY_CSS_SELECTORS)?.to_string();

    let depth_raw = required(props, name, KEY_DEPTH_LIMIT)?;
    let depth_limit: u32 = depth_raw.parse().map_err(|_| {
        PipelineError::config(format!(
            "[{name}] {KEY_DEPTH_LIMIT} must be a non-negative integer, got '{depth_raw}'"
        ))
    })?;

    let pages_raw = required(props, name, KEY_PAGE_COUNT)?;
    let page_cap = match pages_raw.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            return Err(PipelineError::config(format!(
                "[{name}] {KEY_PAGE_COUNT} must be a positive integer, got '{pages_raw}'"
            )));
        }
    };

    Ok(DomainSpec {
        domain: name.to_string(),
        css_selector,
        depth_limit,
        page_cap,
    })
}

/// Case-insensitive key lookup; blank values count as absent.
fn lookup<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(props: &'a Properties, section: &str, key: &str) -> Result<&'a str> {
    lookup(props, key)
        .ok_or_else(|| PipelineError::config(format!("[{section}] is missing required key {key}")))
}

fn split_command(key: &str, raw: &str) -> Result<Vec<String>> {
    let parts: Vec<String> = raw.split_whitespace().map(String::from).collect();
    if parts.is_empty() {
        return Err(PipelineError::config(format!("{key} must name a program")));
    }
    Ok(parts)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load and validate the settings file at `path`.
pub fn load(path: &Path) -> Result<PipelineConfig> {
    if !path.is_file() {
        return Err(PipelineError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        PipelineError::config(format!("{} is not valid UTF-8: {e}", path.display()))
    })?;

    let config = PipelineConfig::from_ini_str(&text)?;
    tracing::debug!(
        path = %path.display(),
        domains = config.domains.len(),
        "loaded pipeline config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[General Settings]
OUTPUT_FILE_DIRECTORY = /tmp/out
BERT_SEARCH_TERM = policy

[example_com]
CSS_SELECTORS = .content
DEPTH_LIMIT = 2
CLOSESPIDER_PAGECOUNT = 50

[news.example.org/world]
CSS_SELECTORS = div.story > p::text
DEPTH_LIMIT = 0
CLOSESPIDER_PAGECOUNT = 10
"#;

    #[test]
    fn parses_general_and_domains_in_order() {
        let config = PipelineConfig::from_ini_str(SAMPLE).expect("parse");
        assert_eq!(config.general.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.general.search_term.as_deref(), Some("policy"));
        assert_eq!(config.domains.len(), 2);

        assert_eq!(config.domains[0].domain, "example_com");
        assert_eq!(config.domains[0].css_selector, ".content");
        assert_eq!(config.domains[0].depth_limit, 2);
        assert_eq!(config.domains[0].page_cap, 50);

        assert_eq!(config.domains[1].domain, "news.example.org/world");
        assert_eq!(config.domains[1].css_selector, "div.story > p::text");
        assert_eq!(config.domains[1].folder_name(), "news_example_org_world");
        assert_eq!(
            config.domains[1].scrape_file_name(),
            "news_example_org_world.jl"
        );
    }

    #[test]
    fn general_settings_is_never_a_domain() {
        let config = PipelineConfig::from_ini_str(SAMPLE).unwrap();
        assert!(config.domains.iter().all(|d| d.domain != GENERAL_SETTINGS));
    }

    #[test]
    fn defaults_for_optional_general_keys() {
        let config = PipelineConfig::from_ini_str(SAMPLE).unwrap();
        assert_eq!(config.general.scraper, ScraperSettings::default());
        assert_eq!(config.general.engine, EngineSettings::default());
    }

    #[test]
    fn optional_general_keys_override_defaults() {
        let text = "[General Settings]\n\
                    OUTPUT_FILE_DIRECTORY = out\n\
                    SCRAPER_COMMAND = bash scripts/spider.sh\n\
                    SCRAPER_OUTPUT_DIRECTORY = /var/spider\n\
                    TOPIC_ENGINE_COMMAND = uv run bridge.py\n";
        let config = PipelineConfig::from_ini_str(text).unwrap();
        assert_eq!(config.general.scraper.command, vec!["bash", "scripts/spider.sh"]);
        assert_eq!(config.general.scraper.output_dir, PathBuf::from("/var/spider"));
        assert_eq!(config.general.engine.command, vec!["uv", "run", "bridge.py"]);
        assert!(config.general.search_term.is_none());
        assert!(config.require_search_term().is_err());
    }

    #[test]
    fn tolerates_byte_order_mark() {
        let text = format!("{UTF8_BOM}{SAMPLE}");
        let config = PipelineConfig::from_ini_str(&text).expect("parse with BOM");
        assert_eq!(config.domains.len(), 2);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let text = "[General Settings]\noutput_file_directory = out\n\n\
                    [a.com]\ncss_selectors = p\ndepth_limit = 1\nclosespider_pagecount = 3\n";
        let config = PipelineConfig::from_ini_str(text).unwrap();
        assert_eq!(config.domains[0].page_cap, 3);
    }

    #[test]
    fn missing_domain_key_is_malformed() {
        let text = "[General Settings]\nOUTPUT_FILE_DIRECTORY = out\n\n\
                    [a.com]\nCSS_SELECTORS = p\nDEPTH_LIMIT = 1\n";
        let err = PipelineConfig::from_ini_str(text).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigMalformed { .. }));
        assert!(err.to_string().contains("CLOSESPIDER_PAGECOUNT"));
    }

    #[test]
    fn missing_general_section_is_malformed() {
        let text = "[a.com]\nCSS_SELECTORS = p\nDEPTH_LIMIT = 1\nCLOSESPIDER_PAGECOUNT = 3\n";
        let err = PipelineConfig::from_ini_str(text).unwrap_err();
        assert!(err.to_string().contains("General Settings"));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let negative_depth = "[General Settings]\nOUTPUT_FILE_DIRECTORY = out\n\n\
                              [a.com]\nCSS_SELECTORS = p\nDEPTH_LIMIT = -1\nCLOSESPIDER_PAGECOUNT = 3\n";
        assert!(PipelineConfig::from_ini_str(negative_depth).is_err());

        let zero_pages = "[General Settings]\nOUTPUT_FILE_DIRECTORY = out\n\n\
                          [a.com]\nCSS_SELECTORS = p\nDEPTH_LIMIT = 1\nCLOSESPIDER_PAGECOUNT = 0\n";
        let err = PipelineConfig::from_ini_str(zero_pages).unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn selectors_are_kept_verbatim() {
        let text = "[General Settings]\nOUTPUT_FILE_DIRECTORY = out\n\n\
                    [a.com]\nCSS_SELECTORS = #main-content p\nDEPTH_LIMIT = 1\nCLOSESPIDER_PAGECOUNT = 3\n\n\
                    [b.com]\nCSS_SELECTORS = div.post; p\nDEPTH_LIMIT = 1\nCLOSESPIDER_PAGECOUNT = 3\n";
        let config = PipelineConfig::from_ini_str(text).unwrap();
        assert_eq!(config.domains[0].css_selector, "#main-content p");
        assert_eq!(config.domains[1].css_selector, "div.post; p");
    }

    #[test]
    fn rejects_domains_sharing_a_folder() {
        let text = "[General Settings]\nOUTPUT_FILE_DIRECTORY = out\n\n\
                    [a.com]\nCSS_SELECTORS = p\nDEPTH_LIMIT = 1\nCLOSESPIDER_PAGECOUNT = 3\n\n\
                    [a/com]\nCSS_SELECTORS = p\nDEPTH_LIMIT = 1\nCLOSESPIDER_PAGECOUNT = 3\n";
        let err = PipelineConfig::from_ini_str(text).unwrap_err();
        assert!(err.to_string().contains("a_com"));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let err = load(Path::new("/definitely/not/here/settings.ini")).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigNotFound { .. }));
        assert!(err.is_run_fatal());
    }

    #[test]
    fn load_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigNotFound { .. }));
    }

    #[test]
    fn load_reads_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(SAMPLE.as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let config = load(&path).expect("load");
        assert_eq!(config.domains[0].domain, "example_com");
    }
}

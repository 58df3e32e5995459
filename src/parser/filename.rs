use crate::constants::KNOWN_EXTENSIONS;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Metadata recovered from a release title or a file name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTitle {
    /// Show title as it appears in the name, separators turned into spaces.
    pub title: String,

    pub season: Option<u32>,

    pub episode: Option<u32>,

    pub resolution: Option<String>,

    pub source: Option<String>,

    pub proper: bool,

    pub repack: bool,
}

/// Extracts show/episode/quality metadata from free text.
///
/// Returning `None` means no usable title could be recovered; callers drop
/// the entry.
pub trait MetadataExtractor: Send + Sync {
    fn parse(&self, text: &str) -> Option<ParsedTitle>;
}

/// Regex-based extractor for scene-style release names
/// (`Show.Name.S01E02.1080p.WEB.h264-GRP`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneParser;

impl MetadataExtractor for SceneParser {
    fn parse(&self, text: &str) -> Option<ParsedTitle> {
        parse_release_title(text)
    }
}

const SEP: &str = r"(?:^|[\s._\-\[\(])";
const END: &str = r"(?:$|[\s._\-\]\)])";

fn get_regex(re: &'static OnceLock<Regex>, pattern: impl FnOnce() -> String) -> &'static Regex {
    re.get_or_init(|| Regex::new(&pattern()).expect("Invalid regex pattern defined in code"))
}

fn season_episode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(
            r"(?i){SEP}(?P<tok>S(?P<season>\d{{1,2}})[\s._-]?E(?P<episode>\d{{1,3}}))(?:$|\D)"
        )
    })
}

fn cross_episode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(r"(?i){SEP}(?P<tok>(?P<season>\d{{1,2}})x(?P<episode>\d{{2,3}})){END}")
    })
}

fn season_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(r"(?i){SEP}(?P<tok>(?:S|Season[\s._-]?)(?P<season>\d{{1,2}})){END}")
    })
}

fn episode_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(r"(?i){SEP}(?P<tok>(?:Episode[\s._-]?|Ep[\s._-]?|E)(?P<episode>\d{{1,3}})){END}")
    })
}

fn resolution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(r"(?i){SEP}(?P<tok>(?:2160|1080|720|576|480)[pi]|4k|uhd){END}")
    })
}

fn source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(
            r"(?i){SEP}(?P<tok>web[\s._-]?dl|web[\s._-]?rip|web|blu[\s._-]?ray|bdrip|brrip|bdremux|hdtv|pdtv|dvdrip|dvd|hdrip){END}"
        )
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || format!(r"{SEP}(?P<tok>(?:19|20)\d{{2}}){END}"))
}

fn proper_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || format!(r"(?i){SEP}(?P<tok>proper){END}"))
}

fn repack_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || format!(r"(?i){SEP}(?P<tok>repack|rerip){END}"))
}

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || {
        format!(
            r"(?i){SEP}(?P<tok>[xh]\.?26[45]|hevc|avc|10bit|hdr|complete|internal|multi|dual[\s._-]?audio|amzn|nf|dsnp|hmax|atvp){END}"
        )
    })
}

fn bracket_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, || r"^\[[^\]]+\]\s*".to_string())
}

fn token_start(caps: &Captures) -> Option<usize> {
    caps.name("tok").map(|m| m.start())
}

fn first_token_start(re: &Regex, name: &str) -> Option<usize> {
    re.captures(name).and_then(|c| token_start(&c))
}

/// A year at the very start belongs to the title ("1923 S01E01").
fn first_year_start(name: &str) -> Option<usize> {
    year_re()
        .captures_iter(name)
        .filter_map(|c| token_start(&c))
        .find(|&start| start > 0)
}

fn capture_number(caps: &Captures, group: &str) -> Option<u32> {
    caps.name(group).and_then(|m| m.as_str().parse().ok())
}

#[must_use]
pub fn parse_release_title(raw: &str) -> Option<ParsedTitle> {
    let name = strip_known_extension(raw.trim());
    let name = bracket_group_re().replace(name, "");
    let name = name.as_ref();

    let mut season = None;
    let mut episode = None;

    if let Some(caps) = season_episode_re()
        .captures(name)
        .or_else(|| cross_episode_re().captures(name))
    {
        season = capture_number(&caps, "season");
        episode = capture_number(&caps, "episode");
    } else {
        if let Some(caps) = season_only_re().captures(name) {
            season = capture_number(&caps, "season");
        }
        if let Some(caps) = episode_only_re().captures(name) {
            episode = capture_number(&caps, "episode");
        }
    }

    let title_end = [
        season_episode_re(),
        cross_episode_re(),
        season_only_re(),
        episode_only_re(),
        resolution_re(),
        source_re(),
        proper_re(),
        repack_re(),
        noise_re(),
    ]
    .into_iter()
    .filter_map(|re| first_token_start(re, name))
    .chain(first_year_start(name))
    .min()
    .unwrap_or(name.len());

    let title = clean_title(&name[..title_end]);
    if title.is_empty() {
        return None;
    }

    Some(ParsedTitle {
        title,
        season,
        episode,
        resolution: extract_resolution(name),
        source: extract_source(name),
        proper: proper_re().is_match(name),
        repack: repack_re().is_match(name),
    })
}

fn strip_known_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if KNOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => stem,
        _ => name,
    }
}

fn extract_resolution(s: &str) -> Option<String> {
    let caps = resolution_re().captures(s)?;
    let res = caps.name("tok")?.as_str().to_ascii_lowercase();
    if res == "4k" || res == "uhd" {
        Some("2160p".to_string())
    } else {
        Some(res)
    }
}

fn extract_source(s: &str) -> Option<String> {
    let caps = source_re().captures(s)?;
    let compact: String = caps
        .name("tok")?
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if compact == "webdl" {
        Some("web-dl".to_string())
    } else {
        Some(compact)
    }
}

/// Turns separators into single spaces and trims dangling punctuation.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut last_was_space = true;
    for c in title.chars() {
        if c.is_whitespace() || c == '.' || c == '_' {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '(' | '[' | ':'))
        .trim()
        .to_string()
}

/// Canonical comparison form of a show title.
///
/// Lowercases, turns `.`, `_`, `-` and whitespace into single spaces and drops
/// every other non-alphanumeric character. Show names, release titles and
/// local file titles all go through this same function.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let mapped: String = title
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() || matches!(c, '.' | '_' | '-') {
                Some(' ')
            } else if c.is_alphanumeric() {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    mapped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

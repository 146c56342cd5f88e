//! Log search filters
//!
//! Raw query-string parameters are parsed here into a [`SearchFilter`].
//! Malformed or out-of-range values never fail a request: they are dropped
//! or clamped so the remaining filters still apply.

use serde::Deserialize;

/// Rows per page
pub const PAGE_SIZE: i64 = 30;
/// Highest page a client may request
pub const MAX_PAGE: i64 = 1000;
/// Action tokens beyond this count are ignored
pub const MAX_ACTION_TOKENS: usize = 20;

const IDENTIFIER_MAX_LEN: usize = 200;
const ACTION_INPUT_MAX_LEN: usize = 500;
const ACTION_TOKEN_MAX_LEN: usize = 100;
/// Tokens longer than this are matched as a prefix, shorter ones as a substring
const ACTION_SUBSTRING_MAX_LEN: usize = 3;
const DETAILS_MAX_LEN: usize = 500;
const SERVER_MAX_LEN: usize = 10;
const SUGGEST_MAX_LEN: usize = 100;
/// Suggestion terms at least this long use a prefix pattern
const SUGGEST_PREFIX_MIN_LEN: usize = 3;

/// Scan-avoidance thresholds for the details filter.
///
/// These are a performance heuristic, not part of the filter's meaning.
pub mod details_thresholds {
    /// Shorter values are ignored entirely
    pub const MIN_LEN: usize = 3;
    /// Values at least this long without spaces or `%` become a prefix match
    pub const PREFIX_MIN_LEN: usize = 4;
    /// A substring match with no other filter needs at least this many chars
    pub const UNSCOPED_SUBSTRING_MIN_LEN: usize = 6;
}

/// Actions that record a player death
pub const DEATH_ACTIONS: [&str; 3] = ["Player Died", "Player Killed", "Killed Player"];
/// Text pattern of a metadata document with an empty minigame list
pub const EMPTY_MINIGAMES_PATTERN: &str = r#"%"minigames":[]%"#;

lazy_static::lazy_static! {
    static ref LICENSE_HEX: regex::Regex = regex::Regex::new(r"^[a-fA-F0-9]{32,}$").unwrap();
}

/// Trim and cap a raw input at `max_chars` characters
pub fn clamp_input(input: &str, max_chars: usize) -> String {
    input.trim().chars().take(max_chars).collect()
}

/// Strip statement separators, quotes, backslashes and control bytes.
///
/// Values are always bound as parameters; this only narrows what reaches them.
pub fn sanitize_for_sql(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, ';' | '\0' | '\n' | '\r' | '\\' | '\'' | '"' | '\x1a'))
        .collect()
}

/// How a text column is compared against a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// `column = value`
    Exact(String),
    /// `column LIKE 'value%'`
    Prefix(String),
    /// `column LIKE '%value%'`
    Contains(String),
}

impl TextMatch {
    pub fn value(&self) -> &str {
        match self {
            TextMatch::Exact(v) | TextMatch::Prefix(v) | TextMatch::Contains(v) => v,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            TextMatch::Exact(_) => "=",
            TextMatch::Prefix(_) | TextMatch::Contains(_) => "LIKE",
        }
    }

    /// Value to bind for [`Self::sql_operator`]
    pub fn bind_value(&self) -> String {
        match self {
            TextMatch::Exact(v) => v.clone(),
            TextMatch::Prefix(v) => format!("{}%", v),
            TextMatch::Contains(v) => format!("%{}%", v),
        }
    }
}

/// Raw `/api/logs` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSearchParams {
    pub identifier: Option<String>,
    pub action: Option<String>,
    pub details: Option<String>,
    pub server: Option<String>,
    pub minigames: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub page: Option<String>,
}

/// 1-based page number within `[1, MAX_PAGE]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(i64);

impl Page {
    pub fn new(number: i64) -> Self {
        Self(number.clamp(1, MAX_PAGE))
    }

    /// Unparseable input falls back to the first page; digit strings too
    /// large for `i64` clamp to the last one
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return Self::default();
        };
        match value.parse::<i64>() {
            Ok(number) => Self::new(number),
            Err(_) if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                Self(MAX_PAGE)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn number(&self) -> i64 {
        self.0
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (self.0 - 1) * PAGE_SIZE
    }
}

impl Default for Page {
    fn default() -> Self {
        Self(1)
    }
}

/// Validated log search filter; every predicate is ANDed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub identifier: Option<TextMatch>,
    /// Alternatives, ORed together
    pub actions: Vec<TextMatch>,
    pub details: Option<TextMatch>,
    pub server_id: Option<String>,
    /// Hide death events that happened inside a minigame
    pub exclude_minigame_deaths: bool,
    /// Exclusive upper bound, epoch seconds
    pub before: Option<i64>,
    /// Exclusive lower bound, epoch seconds
    pub after: Option<i64>,
    pub page: Page,
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl SearchFilter {
    pub fn from_params(params: &LogSearchParams) -> Self {
        let has_other_filters = is_present(&params.identifier)
            || is_present(&params.action)
            || is_present(&params.server)
            || is_present(&params.before)
            || is_present(&params.after);

        Self {
            identifier: params.identifier.as_deref().and_then(parse_identifier),
            actions: params
                .action
                .as_deref()
                .map(parse_actions)
                .unwrap_or_default(),
            details: params
                .details
                .as_deref()
                .and_then(|raw| parse_details(raw, has_other_filters)),
            server_id: params.server.as_deref().and_then(parse_server),
            exclude_minigame_deaths: params.minigames.as_deref() == Some("none"),
            before: params.before.as_deref().and_then(parse_epoch),
            after: params.after.as_deref().and_then(parse_epoch),
            page: Page::parse(params.page.as_deref()),
        }
    }

    /// True when at least one predicate narrows the result set
    pub fn has_constraints(&self) -> bool {
        self.identifier.is_some()
            || !self.actions.is_empty()
            || self.details.is_some()
            || self.server_id.is_some()
            || self.exclude_minigame_deaths
            || self.before.is_some()
            || self.after.is_some()
    }
}

fn parse_identifier(raw: &str) -> Option<TextMatch> {
    let value = clamp_input(raw, IDENTIFIER_MAX_LEN);
    if value.is_empty() {
        return None;
    }

    if value.starts_with("license:") || LICENSE_HEX.is_match(&value) {
        Some(TextMatch::Prefix(value))
    } else {
        Some(TextMatch::Contains(value))
    }
}

fn parse_actions(raw: &str) -> Vec<TextMatch> {
    clamp_input(raw, ACTION_INPUT_MAX_LEN)
        .split('|')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .take(MAX_ACTION_TOKENS)
        .filter_map(|token| parse_action_token(&clamp_input(token, ACTION_TOKEN_MAX_LEN)))
        .collect()
}

fn parse_action_token(token: &str) -> Option<TextMatch> {
    if let Some(exact) = token.strip_prefix('=') {
        let exact = sanitize_for_sql(exact);
        return (!exact.is_empty()).then_some(TextMatch::Exact(exact));
    }

    let sanitized = sanitize_for_sql(token);
    if sanitized.is_empty() {
        None
    } else if token.chars().count() > ACTION_SUBSTRING_MAX_LEN {
        Some(TextMatch::Prefix(sanitized))
    } else {
        Some(TextMatch::Contains(sanitized))
    }
}

fn parse_details(raw: &str, has_other_filters: bool) -> Option<TextMatch> {
    use details_thresholds::*;

    let value = clamp_input(raw, DETAILS_MAX_LEN);
    let len = value.chars().count();
    if len < MIN_LEN {
        return None;
    }

    if len >= PREFIX_MIN_LEN && !value.contains(' ') && !value.contains('%') {
        Some(TextMatch::Prefix(value))
    } else if has_other_filters || len >= UNSCOPED_SUBSTRING_MIN_LEN {
        Some(TextMatch::Contains(value))
    } else {
        None
    }
}

fn parse_server(raw: &str) -> Option<String> {
    let value = clamp_input(raw, SERVER_MAX_LEN);
    (!value.is_empty() && value.chars().all(|c| c.is_ascii_digit())).then_some(value)
}

fn parse_epoch(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|secs| *secs > 0)
}

/// Validated `/api/actions` search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionQuery {
    pub term: String,
    pub pattern: TextMatch,
}

impl SuggestionQuery {
    /// `None` for a missing or blank term
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let term = clamp_input(raw.unwrap_or_default(), SUGGEST_MAX_LEN);
        if term.is_empty() {
            return None;
        }

        let pattern = if term.chars().count() >= SUGGEST_PREFIX_MIN_LEN {
            TextMatch::Prefix(term.clone())
        } else {
            TextMatch::Contains(term.clone())
        };
        Some(Self { term, pattern })
    }
}

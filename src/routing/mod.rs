//! Topic router.
//!
//! A registration-time dispatch table keyed by topic pattern.  Resolution
//! checks every exact pattern first, in registration order, then every
//! wildcard pattern, in registration order.  The first hit wins, so an exact
//! binding always beats a namespace catch-all.
//!
//! Wildcards follow MQTT filter rules: `+` matches one level, a trailing `#`
//! matches the parent level and everything below it.  Topics starting with
//! `$` are never matched by a leading wildcard.

pub mod command;

use core::fmt;

/// Maximum topic length accepted anywhere in the node.
pub const MAX_TOPIC_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternError {
    Empty,
    TooLong,
    /// `#` not alone in the last level, or `+` sharing a level.
    MisplacedWildcard,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty topic pattern"),
            Self::TooLong => write!(f, "topic pattern longer than {MAX_TOPIC_LEN} bytes"),
            Self::MisplacedWildcard => write!(f, "wildcard must occupy a whole level ('#' last)"),
        }
    }
}

/// A parsed subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicPattern {
    Exact(String),
    Wildcard(String),
}

impl TopicPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if pattern.len() > MAX_TOPIC_LEN {
            return Err(PatternError::TooLong);
        }
        if !pattern.contains(['+', '#']) {
            return Ok(Self::Exact(pattern.to_owned()));
        }

        let mut levels = pattern.split('/').peekable();
        while let Some(level) = levels.next() {
            let is_last = levels.peek().is_none();
            match level {
                "+" => {}
                "#" if is_last => {}
                l if l.contains(['+', '#']) => return Err(PatternError::MisplacedWildcard),
                _ => {}
            }
        }
        Ok(Self::Wildcard(pattern.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Wildcard(p) => p,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard(_))
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::Exact(p) => p == topic,
            Self::Wildcard(p) => filter_matches(p, topic),
        }
    }
}

/// MQTT topic-filter match.  `filter` must already be valid.
pub fn filter_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(fl), Some(tl)) if fl == tl => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Whether every topic `pattern` matches is also matched by `filter`.
/// Both must already be valid.
pub fn filter_covers(filter: &str, pattern: &str) -> bool {
    if pattern.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut f = filter.split('/');
    let mut p = pattern.split('/');
    loop {
        match (f.next(), p.next()) {
            (Some("#"), _) => return true,
            (Some(_), Some("#")) => return false,
            (Some("+"), Some(_)) => {}
            (Some(fl), Some(pl)) if fl == pl => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

struct Route<H> {
    pattern: TopicPattern,
    handler: H,
}

/// Ordered dispatch table from topic patterns to handlers.
pub struct TopicRouter<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for TopicRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TopicRouter<H> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn register(&mut self, pattern: &str, handler: H) -> Result<(), PatternError> {
        let pattern = TopicPattern::parse(pattern)?;
        self.routes.push(Route { pattern, handler });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Handler for `topic`: first exact match, else first wildcard match.
    pub fn resolve(&self, topic: &str) -> Option<&H> {
        self.routes
            .iter()
            .find(|r| !r.pattern.is_wildcard() && r.pattern.matches(topic))
            .or_else(|| {
                self.routes
                    .iter()
                    .find(|r| r.pattern.is_wildcard() && r.pattern.matches(topic))
            })
            .map(|r| &r.handler)
    }
}

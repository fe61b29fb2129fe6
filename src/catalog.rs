//! The table of curl options the extractor understands.
//!
//! Each [`OptionSpec`] names the aliases of one option, the record field it
//! feeds and the [`Capture`] style of its value. A [`Catalog`] compiles every
//! option spec into a [`Pattern`] once; the extraction passes then only ask a pattern
//! for "the first value", "every value" or "is it present".

use regex::{Captures, Match, Regex};
use std::{ops::Range, sync::LazyLock};

/// Record field an option feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Method,
    Header,
    Data,
    DataRaw,
    Form,
    Cookie,
    UserAgent,
    Auth,
    Referer,
    Proxy,
    ConnectTimeout,
    MaxTime,
    Insecure,
    CaCert,
    CookieJar,
    FollowRedirects,
}

/// How the value following an option is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// A single word, e.g. `-X PATCH`.
    Word,
    /// `'...'`, `"..."` or a run of non-whitespace.
    Token,
    /// `'...'`, `"..."` or a run of words ending before the next flag, the
    /// next address or the end of input.
    Bounded,
    /// Everything up to the end of the line, surrounding quotes stripped.
    ToEnd,
    /// A run of decimal digits.
    Digits,
    /// No value; the option is a switch.
    Presence,
}

/// Quoting form of a captured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Single,
    Double,
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub field: Field,
    pub aliases: &'static [&'static str],
    pub capture: Capture,
}

impl OptionSpec {
    pub const fn new(field: Field, aliases: &'static [&'static str], capture: Capture) -> Self {
        Self {
            field,
            aliases,
            capture,
        }
    }
}

/// Options recognized by [`Catalog::standard`].
pub const STANDARD_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(Field::Method, &["-X", "--request"], Capture::Word),
    OptionSpec::new(Field::Header, &["-H", "--header"], Capture::Token),
    OptionSpec::new(
        Field::Data,
        &["-d", "--data", "--data-ascii", "--data-binary"],
        Capture::Token,
    ),
    OptionSpec::new(Field::DataRaw, &["--data-raw"], Capture::ToEnd),
    OptionSpec::new(Field::Form, &["-F", "--form"], Capture::Token),
    OptionSpec::new(Field::Cookie, &["-b", "--cookie"], Capture::Bounded),
    OptionSpec::new(Field::UserAgent, &["-A", "--user-agent"], Capture::Bounded),
    OptionSpec::new(Field::Auth, &["-u", "--user"], Capture::Bounded),
    OptionSpec::new(Field::Referer, &["-e", "--referer"], Capture::Bounded),
    OptionSpec::new(Field::Proxy, &["-x", "--proxy"], Capture::Bounded),
    OptionSpec::new(Field::ConnectTimeout, &["--connect-timeout"], Capture::Digits),
    OptionSpec::new(Field::MaxTime, &["-m", "--max-time"], Capture::Digits),
    OptionSpec::new(Field::Insecure, &["-k", "--insecure"], Capture::Presence),
    OptionSpec::new(Field::CaCert, &["--cacert"], Capture::Bounded),
    OptionSpec::new(Field::CookieJar, &["-c", "--cookie-jar"], Capture::Bounded),
    OptionSpec::new(
        Field::FollowRedirects,
        &["-L", "--location", "--location-trusted"],
        Capture::Presence,
    ),
];

static STANDARD: LazyLock<Catalog> =
    LazyLock::new(|| Catalog::new(STANDARD_OPTIONS.iter().copied()));

const SINGLE: &str = r"'([^']*)'";
const DOUBLE: &str = r#""([^"]*)""#;
const TOKEN_BARE: &str = r"(\S+)";
const BOUNDED_BARE: &str = r#"([^\s-]\S*(?:\s+[^\s-]\S*)*?)(?:\s+-|\s+['"]?https?://|$)"#;

/// An [`OptionSpec`] compiled into regexes.
#[derive(Debug)]
pub struct Pattern {
    spec: OptionSpec,
    presence: Regex,
    // leftmost value in any admissible form
    value: Option<Regex>,
    forms: Vec<(Quoting, Regex)>,
    // ToEnd values are claimed as tokens so a trailing address stays free
    claim: Option<Regex>,
}

impl Pattern {
    pub fn new(spec: OptionSpec) -> Self {
        let flag = format!(
            r"(?:^|\s)(?:{})",
            spec.aliases
                .iter()
                .map(|alias| regex::escape(alias))
                .collect::<Vec<_>>()
                .join("|")
        );
        let compile = |tail: &str| {
            Regex::new(&format!("{flag}{tail}")).expect("escaped option regex must compile")
        };

        let presence = compile(r"(?:\s|$)");
        let quoted_forms = |bare: &str| {
            vec![
                (Quoting::Single, compile(&format!(r"\s+{SINGLE}"))),
                (Quoting::Double, compile(&format!(r"\s+{DOUBLE}"))),
                (Quoting::Bare, compile(&format!(r"\s+{bare}"))),
            ]
        };
        let any = |bare: &str| compile(&format!(r"\s+(?:{SINGLE}|{DOUBLE}|{bare})"));

        let (value, forms, claim) = match spec.capture {
            Capture::Word => (Some(compile(r#"\s+['"]?((?-u:\w)+)"#)), vec![], None),
            Capture::Digits => (Some(compile(r#"\s+['"]?([0-9]+)"#)), vec![], None),
            Capture::Token => (Some(any(TOKEN_BARE)), quoted_forms(TOKEN_BARE), None),
            Capture::Bounded => (Some(any(BOUNDED_BARE)), quoted_forms(BOUNDED_BARE), None),
            Capture::ToEnd => (
                Some(
                    Regex::new(&format!(r#"(?m){flag}\s+['"]?(.*?)['"]?$"#))
                        .expect("escaped option regex must compile"),
                ),
                vec![],
                Some(any(TOKEN_BARE)),
            ),
            Capture::Presence => (None, vec![], None),
        };

        Self {
            spec,
            presence,
            value,
            forms,
            claim,
        }
    }

    /// Whether any alias appears as a standalone token.
    pub fn is_present(&self, text: &str) -> bool {
        self.presence.is_match(text)
    }

    /// The leftmost value of this option, in whichever form it was written.
    pub fn first(&self, text: &str) -> Option<String> {
        let value = self.value.as_ref()?;
        let caps = value.captures(text)?;
        captured(&caps).map(|m| self.finish(m.as_str()))
    }

    /// Every non-empty value of this option, in order of appearance.
    pub fn all(&self, text: &str) -> Vec<String> {
        let Some(value) = self.value.as_ref() else {
            return Vec::new();
        };
        value
            .captures_iter(text)
            .filter_map(|caps| captured(&caps).map(|m| self.finish(m.as_str())))
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// The leftmost value written in the given quoting form.
    ///
    /// Only `Token` and `Bounded` options distinguish forms; other options
    /// never match.
    pub fn first_in(&self, quoting: Quoting, text: &str) -> Option<String> {
        let (_, re) = self.forms.iter().find(|(q, _)| *q == quoting)?;
        let caps = re.captures(text)?;
        captured(&caps).map(|m| self.finish(m.as_str()))
    }

    /// Byte ranges of `text` consumed as values of this option.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let Some(re) = self.claim.as_ref().or(self.value.as_ref()) else {
            return Vec::new();
        };
        re.captures_iter(text)
            .filter_map(|caps| captured(&caps).map(|m| m.range()))
            .collect()
    }

    fn finish(&self, value: &str) -> String {
        match self.spec.capture {
            Capture::Bounded => value.trim().to_owned(),
            _ => value.to_owned(),
        }
    }
}

fn captured<'t>(caps: &Captures<'t>) -> Option<Match<'t>> {
    caps.iter().skip(1).flatten().next()
}

/// A compiled set of option patterns.
#[derive(Debug)]
pub struct Catalog {
    patterns: Vec<Pattern>,
}

impl Catalog {
    /// Compile a catalog. When two specs name the same field the first one wins.
    pub fn new(specs: impl IntoIterator<Item = OptionSpec>) -> Self {
        Self {
            patterns: specs.into_iter().map(Pattern::new).collect(),
        }
    }

    /// The built-in catalog, compiled on first use.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    pub fn pattern(&self, field: Field) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.spec.field == field)
    }

    /// Byte ranges claimed as option values by any pattern in the catalog.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        self.patterns.iter().flat_map(|p| p.spans(text)).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(STANDARD_OPTIONS.iter().copied())
    }
}

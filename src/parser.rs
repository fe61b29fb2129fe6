use crate::{
    RequestRecord,
    catalog::{Catalog, Field, Quoting},
    error::*,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{Method, Uri};
use minijinja::Environment;
use regex::Regex;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::{collections::BTreeMap, str::FromStr, sync::LazyLock};

// `\` before a newline, before other whitespace, or at the very end
static CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:[ \t]*\r?\n|[ \t]+|[ \t]*$)").expect("static regex must compile")
});

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?(https?://[^\s"']+)"#).expect("static regex must compile")
});

/// Where the body comes from, highest priority first.
#[derive(Debug, Clone, Copy)]
enum BodySource {
    Data(Quoting),
    DataRaw,
    Form,
}

const BODY_SOURCES: [BodySource; 5] = [
    BodySource::Data(Quoting::Single),
    BodySource::Data(Quoting::Double),
    BodySource::DataRaw,
    BodySource::Data(Quoting::Bare),
    BodySource::Form,
];

/// Where the cookie string comes from, highest priority first.
#[derive(Debug, Clone, Copy)]
enum CookieSource {
    Param(Quoting),
    Header(&'static str),
}

const COOKIE_SOURCES: [CookieSource; 5] = [
    CookieSource::Param(Quoting::Single),
    CookieSource::Param(Quoting::Double),
    CookieSource::Param(Quoting::Bare),
    CookieSource::Header("Cookie"),
    CookieSource::Header("cookie"),
];

/// Runs the extraction passes over one command.
///
/// An extractor only holds the normalized command and a shared, read-only
/// [`Catalog`], so it is cheap to build one per command.
#[derive(Debug, Clone)]
pub struct Extractor<'a> {
    command: String,
    catalog: &'a Catalog,
}

impl Extractor<'static> {
    pub fn new(input: &str) -> Self {
        Self::with_catalog(input, Catalog::standard())
    }
}

impl<'a> Extractor<'a> {
    pub fn with_catalog(input: &str, catalog: &'a Catalog) -> Self {
        Self {
            command: normalize(input),
            catalog,
        }
    }

    /// The command after continuation joining and `curl` stripping.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn extract(&self) -> Result<RequestRecord> {
        let target = self.target()?;
        let (origin, path, query) = split_target(&target);
        let headers = self.headers();
        let raw_cookie = self.cookie(&headers).unwrap_or_default();

        let record = RequestRecord {
            method: self.method(),
            origin,
            path,
            query,
            body: self.body(),
            cookies: split_cookies(&raw_cookie),
            raw_cookie,
            headers,
            user_agent: self.text(Field::UserAgent),
            auth: self.text(Field::Auth),
            referer: self.text(Field::Referer),
            proxy: self.text(Field::Proxy),
            connect_timeout: self.seconds(Field::ConnectTimeout),
            max_time: self.seconds(Field::MaxTime),
            insecure: self.flag(Field::Insecure),
            ca_cert: self.text(Field::CaCert),
            cookie_jar: self.text(Field::CookieJar),
            follow_redirects: self.flag(Field::FollowRedirects),
            target,
        };
        tracing::debug!(
            method = %record.method,
            url = %record.target,
            headers = record.headers.len(),
            "extracted request record"
        );
        Ok(record)
    }

    fn target(&self) -> Result<String> {
        let claimed = self.catalog.spans(&self.command);
        let candidates: Vec<_> = ADDRESS
            .captures_iter(&self.command)
            .filter_map(|caps| caps.get(1))
            .collect();

        let free = candidates
            .iter()
            .find(|m| !claimed.iter().any(|span| span.contains(&m.start())));
        let target = free.or(candidates.first()).context(TargetNotFoundSnafu)?;
        Ok(target.as_str().to_owned())
    }

    fn method(&self) -> Method {
        let explicit = self
            .value(Field::Method)
            .and_then(|word| Method::from_bytes(word.to_ascii_uppercase().as_bytes()).ok());
        if let Some(method) = explicit {
            return method;
        }

        let has_payload = [Field::Data, Field::DataRaw, Field::Form]
            .into_iter()
            .any(|field| self.flag(field));
        if has_payload {
            Method::POST
        } else {
            Method::GET
        }
    }

    fn headers(&self) -> BTreeMap<String, String> {
        self.values(Field::Header)
            .iter()
            .filter_map(|header| {
                let (name, value) = header.split_once(':')?;
                Some((name.trim().to_owned(), value.trim().to_owned()))
            })
            .collect()
    }

    fn body(&self) -> String {
        BODY_SOURCES
            .into_iter()
            .find_map(|source| {
                let body = self.body_from(source)?;
                tracing::trace!(?source, "body resolved");
                Some(body)
            })
            .unwrap_or_default()
    }

    fn body_from(&self, source: BodySource) -> Option<String> {
        let command = self.command.as_str();
        match source {
            BodySource::Data(quoting) => self
                .catalog
                .pattern(Field::Data)?
                .first_in(quoting, command),
            BodySource::DataRaw => self.value(Field::DataRaw),
            BodySource::Form => {
                let fields = self.values(Field::Form);
                (!fields.is_empty()).then(|| fields.join("&"))
            }
        }
    }

    fn cookie(&self, headers: &BTreeMap<String, String>) -> Option<String> {
        // the first matching param form ends the param stage, even when empty
        let mut param_matched = false;
        COOKIE_SOURCES.into_iter().find_map(|source| {
            let cookie = match source {
                CookieSource::Param(_) if param_matched => return None,
                CookieSource::Param(quoting) => {
                    let cookie = self
                        .catalog
                        .pattern(Field::Cookie)?
                        .first_in(quoting, &self.command)?;
                    param_matched = true;
                    cookie
                }
                CookieSource::Header(name) => headers.get(name)?.clone(),
            };
            if cookie.is_empty() {
                return None;
            }
            tracing::trace!(?source, "cookie resolved");
            Some(cookie)
        })
    }

    fn value(&self, field: Field) -> Option<String> {
        self.catalog.pattern(field)?.first(&self.command)
    }

    fn values(&self, field: Field) -> Vec<String> {
        self.catalog
            .pattern(field)
            .map(|p| p.all(&self.command))
            .unwrap_or_default()
    }

    fn text(&self, field: Field) -> String {
        self.value(field).unwrap_or_default()
    }

    fn seconds(&self, field: Field) -> u64 {
        self.value(field)
            .and_then(|digits| digits.parse().ok())
            .unwrap_or_default()
    }

    fn flag(&self, field: Field) -> bool {
        self.catalog
            .pattern(field)
            .is_some_and(|p| p.is_present(&self.command))
    }
}

fn normalize(input: &str) -> String {
    let joined = CONTINUATION.replace_all(input, " ");
    let trimmed = joined.trim();
    let command = trimmed
        .strip_prefix("curl")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .unwrap_or(trimmed);
    command.trim().to_owned()
}

/// Origin, raw path and first-value query map of `target`.
///
/// Everything is left empty when `target` is not a valid URI.
fn split_target(target: &str) -> (String, String, BTreeMap<String, String>) {
    let Ok(uri) = target.parse::<Uri>() else {
        tracing::trace!(url = target, "target is not a valid URI");
        return Default::default();
    };
    let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
        return Default::default();
    };

    // userinfo is not part of the origin
    let host = authority
        .as_str()
        .rsplit_once('@')
        .map_or(authority.as_str(), |(_, host)| host);
    let origin = format!("{scheme}://{host}");

    let path = target
        .split_once("://")
        .and_then(|(_, rest)| rest.find(['/', '?', '#']).map(|i| &rest[i..]))
        .and_then(|rest| rest.split(['?', '#']).next())
        .unwrap_or_default()
        .to_owned();

    let mut query = BTreeMap::new();
    if let Some(q) = uri.query() {
        for (key, value) in form_urlencoded::parse(q.as_bytes()) {
            query
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }

    (origin, path, query)
}

fn split_cookies(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_owned(), value.trim().to_owned()))
        })
        .collect()
}

impl RequestRecord {
    pub fn parse(input: &str) -> Result<Self> {
        Extractor::new(input).extract().inspect_err(|_| {
            tracing::debug!("no target address in command");
        })
    }

    /// Render `input` as a minijinja template with `context`, then parse it.
    pub fn load(input: &str, context: impl Serialize) -> Result<Self> {
        let env = Environment::new();
        let input = env.render_str(input, context).context(RenderSnafu)?;
        Self::parse(&input)
    }

    /// `Authorization` header value for the `-u` credentials, if any.
    pub fn basic_auth(&self) -> Option<String> {
        if self.auth.is_empty() {
            return None;
        }
        Some(format!("Basic {}", STANDARD.encode(self.auth.as_bytes())))
    }

    /// The body decoded as `application/x-www-form-urlencoded` pairs.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect()
    }
}

impl FromStr for RequestRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "reqwest")]
impl TryFrom<&RequestRecord> for reqwest::RequestBuilder {
    type Error = reqwest::Error;

    fn try_from(req: &RequestRecord) -> Result<Self, Self::Error> {
        use http::header::{COOKIE, REFERER, USER_AGENT};
        use reqwest::redirect::Policy;
        use std::time::Duration;

        let mut client = reqwest::Client::builder()
            .danger_accept_invalid_certs(req.insecure)
            .redirect(if req.follow_redirects {
                Policy::limited(50)
            } else {
                Policy::none()
            });
        if !req.proxy.is_empty() {
            client = client.proxy(reqwest::Proxy::all(&req.proxy)?);
        }
        if req.connect_timeout > 0 {
            client = client.connect_timeout(Duration::from_secs(req.connect_timeout));
        }
        if req.max_time > 0 {
            client = client.timeout(Duration::from_secs(req.max_time));
        }
        let client = client.build()?;

        let mut builder = client.request(req.method.clone(), &req.target);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let has_header = |name: &http::HeaderName| {
            req.headers
                .keys()
                .any(|key| key.eq_ignore_ascii_case(name.as_str()))
        };
        for (name, value) in [
            (USER_AGENT, &req.user_agent),
            (REFERER, &req.referer),
            (COOKIE, &req.raw_cookie),
        ] {
            if !value.is_empty() && !has_header(&name) {
                builder = builder.header(name, value.as_str());
            }
        }

        if let Some((user, pass)) = req.auth.split_once(':') {
            builder = builder.basic_auth(user, Some(pass));
        } else if !req.auth.is_empty() {
            builder = builder.basic_auth(&req.auth, None::<&str>);
        }

        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }
        Ok(builder)
    }
}

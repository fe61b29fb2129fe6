//! Extract a structured request description from a copy-pasted curl command.
//!
//! Commands exported from a browser's network inspector, API docs or a shell
//! history are rarely tidy. This crate takes such a command and produces a flat
//! [`RequestRecord`] (method, target, headers, body, query, cookies, credentials,
//! timeouts, proxy and TLS options) that can be replayed, asserted on in tests or
//! rendered into documentation.
//!
//! # Design
//!
//! Extraction is a pipeline of independent passes over the normalized command,
//! one per concern, each driven by the option [`Catalog`]:
//!
//! 1. **Normalization**: the leading `curl` keyword and `\`-newline continuations
//!    are removed.
//! 2. **Target**: the first `http://` / `https://` address that is not the value
//!    of another option. This is the only mandatory component; without it
//!    extraction fails with [`Error::TargetNotFound`].
//! 3. **Options**: method, headers, body, cookies and the auxiliary scalars. Any
//!    option that is missing or malformed simply leaves its field at the default.
//!
//! # Examples
//!
//! ```
//! use curl_extract::RequestRecord;
//! # fn main() -> Result<(), curl_extract::Error> {
//! let record: RequestRecord = r#"curl -X POST https://api.example.com/users \
//!     -H 'Content-Type: application/json' \
//!     -b 'session=abc; theme=dark' \
//!     -d '{"name": "John Doe"}'"#
//!     .parse()?;
//!
//! assert_eq!(record.method, http::Method::POST);
//! assert_eq!(record.origin, "https://api.example.com");
//! assert_eq!(record.path, "/users");
//! assert_eq!(record.headers["Content-Type"], "application/json");
//! assert_eq!(record.cookies["theme"], "dark");
//! assert_eq!(record.body, r#"{"name": "John Doe"}"#);
//! # Ok(())
//! # }
//! ```
//!
//! Commands can be templated with [minijinja](https://docs.rs/minijinja):
//!
//! ```
//! use curl_extract::RequestRecord;
//! use serde_json::json;
//! # fn main() -> Result<(), curl_extract::Error> {
//! let curl = r#"curl https://api.example.com/me -H 'Authorization: Bearer {{ token }}'"#;
//! let record = RequestRecord::load(curl, json!({ "token": "123456" }))?;
//! assert_eq!(record.headers["Authorization"], "Bearer 123456");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub(crate) mod error;
mod parser;

use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use catalog::{Capture, Catalog, Field, OptionSpec, Quoting};
pub use error::Error;
pub use parser::Extractor;

/// The request described by a curl command.
///
/// Built once by [`Extractor::extract`]; every field other than `target` may be
/// left at its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(with = "method_str")]
    pub method: Method,
    /// Absolute `http(s)://` address, exactly as written.
    pub target: String,
    /// `scheme://host[:port]` of the target, empty if the target does not parse.
    pub origin: String,
    /// Path of the target without query or fragment.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Query parameters of the target; only the first value of a repeated key.
    pub query: BTreeMap<String, String>,
    pub raw_cookie: String,
    pub cookies: BTreeMap<String, String>,
    pub user_agent: String,
    /// `user:pass` exactly as given to `-u`.
    pub auth: String,
    pub referer: String,
    pub proxy: String,
    /// Seconds; zero when absent.
    pub connect_timeout: u64,
    /// Seconds; zero when absent.
    pub max_time: u64,
    pub insecure: bool,
    pub ca_cert: String,
    pub cookie_jar: String,
    pub follow_redirects: bool,
}

impl Default for RequestRecord {
    fn default() -> Self {
        Self {
            method: Method::GET,
            target: String::new(),
            origin: String::new(),
            path: String::new(),
            headers: BTreeMap::new(),
            body: String::new(),
            query: BTreeMap::new(),
            raw_cookie: String::new(),
            cookies: BTreeMap::new(),
            user_agent: String::new(),
            auth: String::new(),
            referer: String::new(),
            proxy: String::new(),
            connect_timeout: 0,
            max_time: 0,
            insecure: false,
            ca_cert: String::new(),
            cookie_jar: String::new(),
            follow_redirects: false,
        }
    }
}

mod method_str {
    use http::Method;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

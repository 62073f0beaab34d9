use url::Url;

use stream_common::constants::DEFAULT_API_URL;

use crate::errors::{ConfigError, Result};

/// Pick the API root: the first non-empty of an explicit override and the
/// environment's value, otherwise the production root.
///
/// The chosen root is used verbatim, so it must carry its own trailing `/`.
pub(crate) fn resolve_base_url<'a>(override_url: Option<&'a str>, env_url: Option<&'a str>) -> &'a str {
    [override_url, env_url]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_API_URL)
}

/// Builds request URLs from an API root and the account's API key.
///
/// Deterministic: the same root, key and path always give the same URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoints {
    root: String,
    api_key: String,
}

impl Endpoints {
    pub(crate) fn new(root: &str, api_key: &str) -> std::result::Result<Self, ConfigError> {
        Url::parse(root).map_err(|source| ConfigError::InvalidBaseUrl {
            url: root.to_string(),
            source,
        })?;

        Ok(Self {
            root: root.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub(crate) fn root(&self) -> &str {
        &self.root
    }

    /// `root + path + "/?api_key=" + key`.
    ///
    /// `path` is already formatted by the caller and must not end with `/`.
    /// Further query parameters may be appended to the returned URL; the key
    /// always stays first.
    pub(crate) fn build(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}/", self.root, path))?;
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }
}

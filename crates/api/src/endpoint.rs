use iclogs_core::{IclogsError, Result};
use reqwest::Url;

/// Base URL of a service. Sub-paths are appended below the base path, so a
/// base of `https://host/api/` joined with `/v1/query` gives
/// `https://host/api/v1/query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self> {
        let base = Url::parse(input.trim())
            .map_err(|e| IclogsError::InvalidArgument(format!("invalid URL {input}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(IclogsError::InvalidArgument(format!(
                "expected an http(s) URL, got {input}"
            )));
        }
        Ok(Self { base })
    }

    pub fn join(&self, sub_path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                IclogsError::InvalidArgument(format!("cannot append path to {}", self.base))
            })?
            .pop_if_empty()
            .extend(sub_path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }
}

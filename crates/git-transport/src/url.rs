//! Base URL of a remote `.git` directory.

use git_hash::ObjectAddress;
use reqwest::Url;

use crate::TransportError;

/// A normalized `http(s)://host[:port]/path/` base with a trailing slash,
/// so relative names like `index` resolve inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    base: Url,
}

impl RemoteUrl {
    /// Parse a user-supplied base URL.
    ///
    /// A missing scheme defaults to `http://`.
    pub fn parse(input: &str) -> Result<Self, TransportError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransportError::InvalidUrl("empty URL".into()));
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{input}")
        };

        let mut base =
            Url::parse(&with_scheme).map_err(|e| TransportError::InvalidUrl(format!("{input}: {e}")))?;

        match base.scheme() {
            "http" | "https" => {}
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        }
        if base.host_str().map_or(true, str::is_empty) {
            return Err(TransportError::InvalidUrl(format!("{input}: missing host")));
        }

        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base })
    }

    /// Replace the port (the URL's own port, if any, is overridden).
    pub fn with_port(mut self, port: u16) -> Result<Self, TransportError> {
        self.base
            .set_port(Some(port))
            .map_err(|_| TransportError::InvalidUrl(format!("cannot set port on {}", self.base)))?;
        Ok(self)
    }

    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// `<base>/index`
    pub fn index_url(&self) -> Result<Url, TransportError> {
        self.join("index")
    }

    /// `<base>/objects/<xx>/<38 hex chars>`
    pub fn object_url(&self, address: &ObjectAddress) -> Result<Url, TransportError> {
        self.join(&format!("objects/{}/{}", address.prefix, address.suffix))
    }

    fn join(&self, relative: &str) -> Result<Url, TransportError> {
        self.base
            .join(relative)
            .map_err(|e| TransportError::InvalidUrl(format!("{relative}: {e}")))
    }
}

impl std::fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base.as_str())
    }
}

#[cfg(test)]
mod tests {
    use git_hash::ObjectId;

    use super::*;

    #[test]
    fn adds_trailing_slash() {
        let url = RemoteUrl::parse("http://example.com/.git").unwrap();
        assert_eq!(url.as_str(), "http://example.com/.git/");
        assert_eq!(url.index_url().unwrap().as_str(), "http://example.com/.git/index");
    }

    #[test]
    fn keeps_existing_trailing_slash() {
        let url = RemoteUrl::parse("https://example.com/app/.git/").unwrap();
        assert_eq!(
            url.index_url().unwrap().as_str(),
            "https://example.com/app/.git/index"
        );
    }

    #[test]
    fn defaults_to_http() {
        let url = RemoteUrl::parse("example.com/.git").unwrap();
        assert_eq!(url.as_str(), "http://example.com/.git/");
        assert_eq!(url.host(), "example.com");
    }

    #[test]
    fn object_url_layout() {
        let url = RemoteUrl::parse("http://10.0.0.1:8080/.git").unwrap();
        let oid = ObjectId::from_hex("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
        assert_eq!(
            url.object_url(&oid.address()).unwrap().as_str(),
            "http://10.0.0.1:8080/.git/objects/e6/9de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
        assert_eq!(url.host(), "10.0.0.1");
    }

    #[test]
    fn port_override() {
        let url = RemoteUrl::parse("http://example.com:80/.git")
            .unwrap()
            .with_port(8000)
            .unwrap();
        assert_eq!(url.as_str(), "http://example.com:8000/.git/");
    }

    #[test]
    fn drops_query_and_fragment() {
        let url = RemoteUrl::parse("http://example.com/.git?x=1#frag").unwrap();
        assert_eq!(url.as_str(), "http://example.com/.git/");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(RemoteUrl::parse(""), Err(TransportError::InvalidUrl(_))));
        assert!(matches!(RemoteUrl::parse("   "), Err(TransportError::InvalidUrl(_))));
        assert!(matches!(
            RemoteUrl::parse("ftp://example.com/.git"),
            Err(TransportError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(RemoteUrl::parse("http://").is_err());
    }
}

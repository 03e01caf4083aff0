use std::{fmt, str::FromStr};

use rama::{
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    http::Uri,
};

/// Base host all simulated users send their requests to,
/// e.g. `http://127.0.0.1:8080`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHost {
    base: String,
}

impl TargetHost {
    /// Resolve a path (starting with `/`) against this host.
    pub fn join(&self, path: &str) -> Result<Uri, BoxError> {
        let path = path.trim_start_matches('/');
        format!("{}/{path}", self.base)
            .parse::<Uri>()
            .context("join target host with request path")
            .with_context_debug_field("path", || path.to_owned())
    }
}

impl FromStr for TargetHost {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uri: Uri = s.trim().parse().context("parse target host as URI")?;

        match uri.scheme_str() {
            Some("http" | "https") => (),
            Some(scheme) => {
                return Err(BoxError::from("unsupported target host scheme")
                    .context_field("scheme", scheme.to_owned()));
            }
            None => {
                return Err(BoxError::from(
                    "target host is missing a scheme (http:// or https://)",
                ));
            }
        }

        if uri.authority().is_none() {
            return Err(BoxError::from("target host is missing an authority"));
        }
        if uri.query().is_some() {
            return Err(BoxError::from("target host cannot contain a query"));
        }

        let base = uri.to_string().trim_end_matches('/').to_owned();
        Ok(Self { base })
    }
}

impl fmt::Display for TargetHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}

use agentflow_behavior::CapabilityError;
use url::Url;

/// Which hosts outbound requests may reach.
///
/// Host patterns are exact (`feeds.example.com`) or wildcard subdomains
/// (`*.example.com`). An unrestricted policy allows any http(s) host.
#[derive(Debug, Clone, Default)]
pub struct HttpPolicy {
  allowed_hosts: Option<Vec<String>>,
}

impl HttpPolicy {
  pub fn allow_all() -> Self {
    Self::default()
  }

  pub fn allowed_hosts<I, S>(hosts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      allowed_hosts: Some(hosts.into_iter().map(|h| h.into().to_lowercase()).collect()),
    }
  }

  /// Parse `url` and check it against the policy.
  pub fn check(&self, url: &str) -> Result<Url, CapabilityError> {
    let parsed =
      Url::parse(url).map_err(|e| CapabilityError::Denied(format!("invalid url '{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
      return Err(CapabilityError::Denied(format!(
        "scheme '{}' not allowed",
        parsed.scheme()
      )));
    }

    let Some(host) = parsed.host_str() else {
      return Err(CapabilityError::Denied(format!("url '{}' has no host", url)));
    };

    if let Some(allowed) = &self.allowed_hosts {
      let host = host.to_lowercase();
      if !allowed.iter().any(|pattern| host_matches(pattern, &host)) {
        return Err(CapabilityError::Denied(format!("host '{}' not allowed", host)));
      }
    }

    Ok(parsed)
  }
}

fn host_matches(pattern: &str, host: &str) -> bool {
  match pattern.strip_prefix("*.") {
    Some(suffix) => host
      .strip_suffix(suffix)
      .is_some_and(|rest| rest.ends_with('.')),
    None => pattern == host,
  }
}

//! Mention links
//!
//! A mention renders as `[@Name](<base>/jira/people/<accountId>)`. Parsing only
//! turns a link back into a mention when its path is exactly that profile
//! route and, if a base URL is configured, the link points at the same site.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

const PEOPLE_ROUTE: &str = "/jira/people/";

static ACCOUNT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+(:[A-Za-z0-9_-]+)?$").unwrap());

/// Profile URL for an account; relative when no base URL is known.
pub fn mention_url(base_url: Option<&str>, account_id: &str) -> String {
    match base_url {
        Some(base) => format!("{}{PEOPLE_ROUTE}{account_id}", base.trim_end_matches('/')),
        None => format!("{PEOPLE_ROUTE}{account_id}"),
    }
}

/// Display text of a mention, always with exactly one leading `@`.
pub fn display_text(name: &str, account_id: &str) -> String {
    let name = name.trim().trim_start_matches('@').trim_start();
    if name.is_empty() {
        format!("@{account_id}")
    } else {
        format!("@{name}")
    }
}

/// Return the account id when `href` is a profile link.
pub fn mention_account_id(href: &str, base_url: Option<&str>) -> Option<String> {
    let href = href.trim();
    if href.starts_with('/') {
        return account_id_from_path(href, "");
    }

    let url = Url::parse(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.query().is_some() || url.fragment().is_some()
    {
        return None;
    }

    let prefix = match base_url.and_then(|base| Url::parse(base).ok()) {
        Some(base) => {
            if base.origin() != url.origin() {
                return None;
            }
            base.path().trim_end_matches('/').to_string()
        }
        None => String::new(),
    };
    account_id_from_path(url.path(), &prefix)
}

fn account_id_from_path(path: &str, prefix: &str) -> Option<String> {
    let id = path.strip_prefix(prefix)?.strip_prefix(PEOPLE_ROUTE)?;
    ACCOUNT_ID_RE.is_match(id).then(|| id.to_string())
}

//! Canonical share links for a shortlist
//!
//! Format: `<base>?units=<id>,<id>,...` with IDs sorted lexicographically and
//! each ID form-urlencoded on its own, so a comma inside an ID never collides
//! with the separator. An empty shortlist yields the bare base.

use url::form_urlencoded;

/// Query parameter carrying the unit IDs
pub const UNITS_PARAM: &str = "units";

/// Build the share link for `ids` under `base_url`
pub fn encode_share_link<I, S>(base_url: &str, ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = ids
        .into_iter()
        .map(|id| id.as_ref().to_string())
        .filter(|id| !id.trim().is_empty())
        .collect();
    sorted.sort();
    sorted.dedup();

    if sorted.is_empty() {
        return base_url.to_string();
    }

    let encoded = sorted
        .iter()
        .map(|id| form_urlencoded::byte_serialize(id.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join(",");

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}{UNITS_PARAM}={encoded}")
}

/// Recover the unit IDs from a share link, sorted and deduplicated.
///
/// Links without a `units` parameter yield an empty list.
pub fn parse_share_link(link: &str) -> Vec<String> {
    let without_fragment = link.split('#').next().unwrap_or_default();
    let query = match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None => return Vec::new(),
    };

    let prefix = format!("{UNITS_PARAM}=");
    let mut ids: Vec<String> = query
        .split('&')
        .filter_map(|pair| pair.strip_prefix(prefix.as_str()))
        .flat_map(|raw| raw.split(','))
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            form_urlencoded::parse(part.as_bytes())
                .next()
                .map(|(id, _)| id.into_owned())
        })
        .collect();

    ids.sort();
    ids.dedup();
    ids
}

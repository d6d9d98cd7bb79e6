//! HATEOAS-style navigation links for paginated listings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// Builds links for the page at `skip`/`limit` out of `total` items.
///
/// Query parameters already present on `base_url` are kept in order; `skip`
/// and `limit` are replaced in place or appended. With `total == 0` the last
/// page is the first page. A zero `limit` yields no next/prev links, and
/// neither does a `skip` so large that the next offset would overflow.
pub fn generate_links(base_url: &str, skip: u64, limit: u64, total: u64) -> PaginationLinks {
    let (path, query) = base_url.split_once('?').unwrap_or((base_url, ""));
    let params: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect();

    let link = |skip: u64| build_url(path, &params, skip, limit);

    let last_skip = if total == 0 || limit == 0 {
        0
    } else {
        (total - 1) / limit * limit
    };

    let next = skip
        .checked_add(limit)
        .filter(|&n| limit > 0 && n < total)
        .map(link);
    let prev = (limit > 0 && skip >= limit).then(|| link(skip - limit));

    PaginationLinks {
        self_link: link(skip),
        first: link(0),
        last: link(last_skip),
        next,
        prev,
    }
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

fn build_url(path: &str, params: &[(String, String)], skip: u64, limit: u64) -> String {
    let mut pairs: Vec<(String, String)> = params.to_vec();
    for (key, value) in [("skip", skip.to_string()), ("limit", limit.to_string())] {
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value,
            None => pairs.push((key.to_string(), value)),
        }
    }

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{path}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8000/users";

    #[test]
    fn test_first_page() {
        let links = generate_links(BASE, 0, 10, 45);

        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:8000/users?skip=10&limit=10")
        );
        assert_eq!(links.prev, None);
        assert_eq!(links.first, "http://localhost:8000/users?skip=0&limit=10");
        assert_eq!(links.last, "http://localhost:8000/users?skip=40&limit=10");
        assert_eq!(links.self_link, links.first);
    }

    #[test]
    fn test_middle_page() {
        let links = generate_links(BASE, 20, 10, 45);

        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost:8000/users?skip=10&limit=10")
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:8000/users?skip=30&limit=10")
        );
    }

    #[test]
    fn test_single_page_has_no_neighbours() {
        let links = generate_links(BASE, 0, 10, 5);
        assert_eq!(links.next, None);
        assert_eq!(links.prev, None);
        assert_eq!(links.last, links.first);
    }

    #[test]
    fn test_exact_multiple_last_page() {
        let links = generate_links(BASE, 0, 10, 20);
        assert_eq!(links.last, "http://localhost:8000/users?skip=10&limit=10");
    }

    #[test]
    fn test_empty_result() {
        let links = generate_links(BASE, 0, 10, 0);
        assert_eq!(links.last, "http://localhost:8000/users?skip=0&limit=10");
        assert_eq!(links.next, None);
        assert_eq!(links.prev, None);
    }

    #[test]
    fn test_prev_clamps_to_zero_only_when_full_step_fits() {
        let links = generate_links(BASE, 5, 10, 45);
        assert_eq!(links.prev, None);

        let links = generate_links(BASE, 10, 10, 45);
        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost:8000/users?skip=0&limit=10")
        );
    }

    #[test]
    fn test_existing_query_is_preserved() {
        let links = generate_links(
            "http://localhost:8000/users?role=ADMIN&skip=20&username=john%20d&limit=10",
            20,
            10,
            45,
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost:8000/users?role=ADMIN&skip=30&username=john%20d&limit=10")
        );
    }

    #[test]
    fn test_zero_limit_does_not_panic() {
        let links = generate_links(BASE, 0, 0, 10);
        assert_eq!(links.next, None);
        assert_eq!(links.prev, None);
    }

    #[test]
    fn test_huge_skip_does_not_overflow() {
        let links = generate_links(BASE, u64::MAX, 10, 45);
        assert_eq!(links.next, None);
        assert_eq!(
            links.prev.as_deref(),
            Some(format!("http://localhost:8000/users?skip={}&limit=10", u64::MAX - 10).as_str())
        );
        assert_eq!(links.last, "http://localhost:8000/users?skip=40&limit=10");
    }
}

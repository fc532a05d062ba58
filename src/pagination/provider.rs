//! Page arithmetic, link synthesis, and the [`paginate`] entry point.

use super::{PageLinks, PageMeta, Paginated, PaginationQuery, RequestContext};
use crate::domain::Entity;
use crate::error::StorageError;
use crate::storage::ReadSource;

/// Page numbers derived from a query and a record count.
///
/// An empty source still has one (empty) page, so `total_pages` is never 0
/// and every link points at a page that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// `ceil(total_items / limit)`, floored to 1.
    pub total_pages: u32,
    /// `current + 1`, clamped to `total_pages`.
    pub next: u32,
    /// `current - 1`, clamped to `[1, total_pages]`.
    pub previous: u32,
}

impl PageWindow {
    /// Computes the window for `query` over `total_items` records.
    #[must_use]
    pub fn compute(query: PaginationQuery, total_items: u64) -> Self {
        let pages = total_items.div_ceil(u64::from(query.limit())).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let current = query.page();

        Self {
            total_pages,
            next: current.saturating_add(1).min(total_pages),
            previous: current.saturating_sub(1).clamp(1, total_pages),
        }
    }

    /// Builds the five navigation links for `query` against `ctx`.
    #[must_use]
    pub fn links(&self, query: PaginationQuery, ctx: &RequestContext) -> PageLinks {
        let base = format!("{}://{}{}", ctx.scheme, ctx.host, ctx.path);
        let retained = retained_params(ctx.query.as_deref());
        let link = |page: u32| {
            let mut url = format!("{base}?limit={}&page={page}", query.limit());
            for pair in &retained {
                url.push('&');
                url.push_str(pair);
            }
            url
        };

        PageLinks {
            first: link(1),
            last: link(self.total_pages),
            current: link(query.page()),
            next: link(self.next),
            previous: link(self.previous),
        }
    }
}

/// Raw query pairs other than `limit` and `page`, in request order.
fn retained_params(raw: Option<&str>) -> Vec<&str> {
    raw.unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(key, _)| key);
            key != "limit" && key != "page"
        })
        .collect()
}

/// Reads one page of `source` and wraps it with metadata and links.
///
/// The slice is fetched first and the count second, as two independent
/// reads.
///
/// # Errors
///
/// Propagates any [`StorageError`] from `find` or `count` unchanged.
pub async fn paginate<T, S>(
    query: PaginationQuery,
    source: &S,
    ctx: &RequestContext,
) -> Result<Paginated<T>, StorageError>
where
    T: Entity,
    S: ReadSource<T> + ?Sized,
{
    let data = source.find(query.skip(), u64::from(query.limit())).await?;
    let total_items = source.count().await?;

    let window = PageWindow::compute(query, total_items);
    let links = window.links(query, ctx);

    tracing::debug!(
        table = T::TABLE,
        page = query.page(),
        limit = query.limit(),
        total_items,
        returned = data.len(),
        "page served"
    );

    Ok(Paginated {
        data,
        meta: PageMeta {
            items_per_page: query.limit(),
            total_items,
            current_page: query.page(),
            total_pages: window.total_pages,
        },
        links,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{NewPost, Post};
    use crate::storage::MemoryStore;
    use crate::storage::testing::{Faults, FaultyStore};

    fn query(page: u32, limit: u32) -> PaginationQuery {
        let Ok(query) = PaginationQuery::new(page, limit) else {
            panic!("valid query");
        };
        query
    }

    fn ctx(query: Option<&str>) -> RequestContext {
        RequestContext {
            scheme: "https".to_string(),
            host: "example.com".to_string(),
            path: "/posts".to_string(),
            query: query.map(str::to_string),
        }
    }

    async fn seeded(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        let drafts = (0..n).map(|i| NewPost::draft(format!("Post {i}"), format!("post-{i}")));
        let Ok(_) = store.seed::<Post>(drafts).await else {
            panic!("seed failed");
        };
        store
    }

    #[test]
    fn fifty_seven_items_make_six_pages() {
        let window = PageWindow::compute(query(3, 10), 57);
        assert_eq!(window.total_pages, 6);
        assert_eq!(window.next, 4);
        assert_eq!(window.previous, 2);
    }

    #[test]
    fn next_clamps_on_last_page() {
        let window = PageWindow::compute(query(6, 10), 57);
        assert_eq!(window.next, 6);
        assert_eq!(window.previous, 5);
    }

    #[test]
    fn previous_clamps_on_first_page() {
        let window = PageWindow::compute(query(1, 10), 57);
        assert_eq!(window.previous, 1);
        assert_eq!(window.next, 2);
    }

    #[test]
    fn exact_multiple_has_no_extra_page() {
        assert_eq!(PageWindow::compute(query(1, 10), 60).total_pages, 6);
        assert_eq!(PageWindow::compute(query(1, 10), 61).total_pages, 7);
    }

    #[test]
    fn empty_source_has_one_page() {
        let window = PageWindow::compute(query(1, 10), 0);
        assert_eq!(window.total_pages, 1);
        assert_eq!(window.next, 1);
        assert_eq!(window.previous, 1);
    }

    #[test]
    fn page_past_the_end_clamps_both_links() {
        let window = PageWindow::compute(query(9, 10), 57);
        assert_eq!(window.next, 6);
        assert_eq!(window.previous, 6);
    }

    #[test]
    fn links_rewrite_limit_and_page() {
        let q = query(3, 10);
        let links = PageWindow::compute(q, 57).links(q, &ctx(Some("limit=10&page=3")));
        assert_eq!(links.current, "https://example.com/posts?limit=10&page=3");
        assert_eq!(links.first, "https://example.com/posts?limit=10&page=1");
        assert_eq!(links.last, "https://example.com/posts?limit=10&page=6");
        assert_eq!(links.next, "https://example.com/posts?limit=10&page=4");
        assert_eq!(links.previous, "https://example.com/posts?limit=10&page=2");
    }

    #[test]
    fn links_keep_other_query_params() {
        let q = query(2, 5);
        let links = PageWindow::compute(q, 20).links(q, &ctx(Some("page=2&sort=title&limit=5&tag")));
        assert_eq!(
            links.current,
            "https://example.com/posts?limit=5&page=2&sort=title&tag"
        );
    }

    #[tokio::test]
    async fn paginate_returns_slice_and_meta() {
        let store = seeded(57).await;
        let Ok(page) = paginate::<Post, _>(query(6, 10), &store, &ctx(None)).await else {
            panic!("paginate failed");
        };
        assert_eq!(page.data.len(), 7);
        assert_eq!(page.data.first().map(|p| p.id.get()), Some(51));
        assert_eq!(page.meta.total_items, 57);
        assert_eq!(page.meta.total_pages, 6);
        assert_eq!(page.meta.current_page, 6);
        assert_eq!(page.meta.items_per_page, 10);
        assert_eq!(page.links.next, "https://example.com/posts?limit=10&page=6");
    }

    #[tokio::test]
    async fn paginate_empty_source() {
        let store = MemoryStore::new();
        let Ok(page) = paginate::<Post, _>(query(1, 10), &store, &ctx(None)).await else {
            panic!("paginate failed");
        };
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total_items, 0);
        assert_eq!(page.meta.total_pages, 1);
        assert_eq!(page.links.last, "https://example.com/posts?limit=10&page=1");
    }

    #[tokio::test]
    async fn paginate_serializes_contract_field_names() {
        let store = seeded(3).await;
        let Ok(page) = paginate::<Post, _>(query(1, 2), &store, &ctx(None)).await else {
            panic!("paginate failed");
        };
        let json = serde_json::to_value(&page).unwrap_or_default();
        for pointer in [
            "/meta/itemsPerPage",
            "/meta/totalItems",
            "/meta/currentPage",
            "/meta/totalPages",
            "/links/first",
            "/links/last",
            "/links/current",
            "/links/next",
            "/links/previous",
        ] {
            assert!(json.pointer(pointer).is_some(), "missing {pointer}");
        }
        assert_eq!(json.pointer("/data").and_then(|d| d.as_array()).map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let store = FaultyStore::new(Faults {
            read: true,
            ..Faults::default()
        });
        let result = paginate::<Post, _>(query(1, 10), &store, &ctx(None)).await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn slice_is_read_before_count() {
        let store = FaultyStore::new(Faults::default());
        let Ok(_) = paginate::<Post, _>(query(1, 10), &store, &ctx(None)).await else {
            panic!("paginate failed");
        };
        assert_eq!(store.calls(), vec!["find", "count"]);
    }
}

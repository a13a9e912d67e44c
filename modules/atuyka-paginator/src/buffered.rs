// Page-buffered paginator: turns "fetch page N, get items + params for page N+1"
// into the item-at-a-time cursor protocol.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::page::{Page, PageParams};
use crate::paginator::Paginator;

/// Something that produces successive pages of items.
#[async_trait]
pub trait PageFetcher: Send {
    type Item: Send;
    type Error: Send;

    /// Fetch the next page. `Ok(None)` means no further pages exist.
    async fn next_page(&mut self) -> Result<Option<Vec<Self::Item>>, Self::Error>;
}

/// Buffers one page at a time and hands out its items one by one.
pub struct BufferedPaginator<F: PageFetcher> {
    fetcher: F,
    limit: Option<usize>,
    /// Items left from the current page. `None` once exhausted.
    buffer: Option<std::vec::IntoIter<F::Item>>,
    /// Items yielded so far.
    counter: usize,
}

impl<F: PageFetcher> BufferedPaginator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            limit: None,
            buffer: Some(Vec::new().into_iter()),
            counter: 0,
        }
    }

    /// Stop after `limit` items even if more pages exist upstream.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn yielded(&self) -> usize {
        self.counter
    }

    fn complete(&mut self) {
        self.buffer = None;
    }
}

#[async_trait]
impl<F: PageFetcher> Paginator for BufferedPaginator<F> {
    type Item = F::Item;
    type Error = F::Error;

    async fn next(&mut self) -> Result<Option<Self::Item>, Self::Error> {
        if self.buffer.is_none() {
            return Ok(None);
        }

        if self.limit.is_some_and(|limit| self.counter >= limit) {
            self.complete();
            return Ok(None);
        }

        if let Some(item) = self.buffer.as_mut().and_then(Iterator::next) {
            self.counter += 1;
            return Ok(Some(item));
        }

        let page = match self.fetcher.next_page().await {
            Ok(page) => page,
            Err(err) => {
                self.complete();
                return Err(err);
            }
        };

        let mut items = match page {
            Some(items) if !items.is_empty() => items.into_iter(),
            _ => {
                self.complete();
                return Ok(None);
            }
        };

        let item = items.next();
        self.buffer = Some(items);
        self.counter += 1;
        Ok(item)
    }

    fn is_exhausted(&self) -> bool {
        self.buffer.is_none()
    }
}

impl<F> IntoFuture for BufferedPaginator<F>
where
    F: PageFetcher + 'static,
    F::Item: 'static,
    F::Error: 'static,
{
    type Output = Result<Vec<F::Item>, F::Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.flatten())
    }
}

/// A page-returning endpoint with everything but the page parameters bound.
pub type Endpoint<T, E> =
    Box<dyn Fn(PageParams) -> BoxFuture<'static, Result<Page<T>, E>> + Send + Sync>;

/// Fetches pages from an [`Endpoint`], feeding each page's `next` params into
/// the following call.
pub struct EndpointFetcher<T, E> {
    endpoint: Endpoint<T, E>,
    /// Params for the following request. Empty for the first page, `None`
    /// once a page declared itself the last one.
    next_params: Option<PageParams>,
}

impl<T, E> EndpointFetcher<T, E> {
    pub fn new<F, Fut>(endpoint: F) -> Self
    where
        F: Fn(PageParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, E>> + Send + 'static,
    {
        Self::starting_at(endpoint, PageParams::new())
    }

    /// Start from explicit params instead of the first page.
    pub fn starting_at<F, Fut>(endpoint: F, params: PageParams) -> Self
    where
        F: Fn(PageParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, E>> + Send + 'static,
    {
        Self {
            endpoint: Box::new(move |params| endpoint(params).boxed()),
            next_params: Some(params),
        }
    }
}

#[async_trait]
impl<T, E> PageFetcher for EndpointFetcher<T, E>
where
    T: Send,
    E: Send,
{
    type Item = T;
    type Error = E;

    async fn next_page(&mut self) -> Result<Option<Vec<T>>, E> {
        let Some(params) = self.next_params.clone() else {
            return Ok(None);
        };

        let page = (self.endpoint)(params).await?;
        debug!(
            items = page.items.len(),
            has_next = page.next.is_some(),
            "Fetched page"
        );

        self.next_params = page.next;
        Ok(Some(page.items))
    }
}

/// Paginator over a page-returning endpoint.
pub type UniversalPaginator<T, E> = BufferedPaginator<EndpointFetcher<T, E>>;

/// Wrap a page-returning endpoint into a lazy paginator.
///
/// ```ignore
/// let posts = paginate(move |params| {
///     let client = client.clone();
///     async move { client.get_posts(None, params).await }
/// })
/// .with_limit(100);
/// ```
pub fn paginate<T, E, F, Fut>(endpoint: F) -> UniversalPaginator<T, E>
where
    T: Send,
    E: Send,
    F: Fn(PageParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, E>> + Send + 'static,
{
    BufferedPaginator::new(EndpointFetcher::new(endpoint))
}

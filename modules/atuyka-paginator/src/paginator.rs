// Forward-only, single-pass cursor protocol shared by every paginator.

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::PaginatorError;

/// A pull-based cursor over a lazily fetched sequence.
///
/// `next` returns `Ok(Some(item))` for a value and `Ok(None)` once the sequence
/// is exhausted. Exhaustion is sticky: every later call returns `Ok(None)` again.
/// Errors from the underlying fetch are passed through unchanged, after which
/// the cursor must be considered abandoned.
#[async_trait]
pub trait Paginator: Send {
    type Item: Send;
    type Error: Send;

    /// Pull the next item.
    async fn next(&mut self) -> Result<Option<Self::Item>, Self::Error>;

    /// Whether the cursor has signalled exhaustion.
    fn is_exhausted(&self) -> bool;

    /// Pull exactly one item, treating exhaustion as an error.
    async fn first(&mut self) -> Result<Self::Item, Self::Error>
    where
        Self: Sized,
        Self::Error: From<PaginatorError>,
    {
        self.next().await?.ok_or_else(|| PaginatorError::Empty.into())
    }

    /// Drain the remaining items in order.
    async fn flatten(mut self) -> Result<Vec<Self::Item>, Self::Error>
    where
        Self: Sized,
    {
        drain(&mut self).await
    }

    /// A stream view starting at the current position. It does not rewind.
    fn into_stream(mut self) -> BoxStream<'static, Result<Self::Item, Self::Error>>
    where
        Self: Sized + 'static,
        Self::Item: 'static,
        Self::Error: 'static,
    {
        Box::pin(async_stream::stream! {
            loop {
                match self.next().await {
                    Ok(Some(item)) => yield Ok(item),
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }
}

/// Type-erased paginator, used to merge heterogeneous sources.
pub type BoxPaginator<'a, T, E> = Box<dyn Paginator<Item = T, Error = E> + 'a>;

#[async_trait]
impl<P> Paginator for Box<P>
where
    P: Paginator + ?Sized,
{
    type Item = P::Item;
    type Error = P::Error;

    async fn next(&mut self) -> Result<Option<Self::Item>, Self::Error> {
        (**self).next().await
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

/// Drain any paginator into a `Vec`.
pub async fn flatten<P: Paginator>(paginator: P) -> Result<Vec<P::Item>, P::Error> {
    paginator.flatten().await
}

pub(crate) async fn drain<P>(paginator: &mut P) -> Result<Vec<P::Item>, P::Error>
where
    P: Paginator + ?Sized,
{
    let mut items = Vec::new();
    while let Some(item) = paginator.next().await? {
        items.push(item);
    }
    Ok(items)
}

/// Paginator over an already materialized iterator. Never fails, but carries
/// an error type so it can be merged with fallible sources.
pub struct IterPaginator<I, E> {
    iter: Option<I>,
    _error: PhantomData<fn() -> E>,
}

impl<I, E> IterPaginator<I, E>
where
    I: Iterator,
{
    pub fn new(iterable: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: Some(iterable.into_iter()),
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<I, E> Paginator for IterPaginator<I, E>
where
    I: Iterator + Send,
    I::Item: Send,
    E: Send,
{
    type Item = I::Item;
    type Error = E;

    async fn next(&mut self) -> Result<Option<Self::Item>, Self::Error> {
        let item = self.iter.as_mut().and_then(Iterator::next);
        if item.is_none() {
            self.iter = None;
        }
        Ok(item)
    }

    fn is_exhausted(&self) -> bool {
        self.iter.is_none()
    }
}

impl<I, E> IntoFuture for IterPaginator<I, E>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
    E: Send + 'static,
{
    type Output = Result<Vec<I::Item>, E>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.flatten())
    }
}

// K-way merge over independent paginators, ordered by a caller-supplied key.
//
// One item per live source sits in a min-heap keyed by (key, order). `order`
// is the source's position at construction and never changes, so equal keys
// always come out in source order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

use crate::paginator::{drain, Paginator};

struct HeapEntry<K, T> {
    key: K,
    order: usize,
    value: T,
}

impl<K, T> HeapEntry<K, T> {
    fn new(key: K, order: usize, value: T) -> Self {
        Self { key, order, value }
    }
}

impl<K: Ord, T> PartialEq for HeapEntry<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord, T> Eq for HeapEntry<K, T> {}

impl<K: Ord, T> PartialOrd for HeapEntry<K, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, T> Ord for HeapEntry<K, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.order.cmp(&other.order))
    }
}

/// Merge in-memory lists the same way [`MergedPaginator`] merges paginators.
pub fn merge_sorted<T, K, F>(lists: impl IntoIterator<Item = Vec<T>>, key: F) -> Vec<T>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::with_capacity(iters.iter().map(ExactSizeIterator::len).sum());
    let mut heap = BinaryHeap::with_capacity(iters.len());

    for (order, iter) in iters.iter_mut().enumerate() {
        if let Some(value) = iter.next() {
            heap.push(Reverse(HeapEntry::new(key(&value), order, value)));
        }
    }

    while let Some(Reverse(entry)) = heap.pop() {
        if let Some(value) = iters[entry.order].next() {
            heap.push(Reverse(HeapEntry::new(key(&value), entry.order, value)));
        }
        merged.push(entry.value);
    }

    merged
}

/// Interleaves several paginators into one sequence ordered by `key`.
///
/// Nothing is fetched until the first pull, which fetches one item from every
/// source concurrently. After that, each pull fetches at most one item from the
/// source whose item was just handed out.
pub struct MergedPaginator<P: Paginator, K, F> {
    /// Indexed by tie-break order. A slot is emptied once its source is retired.
    sources: Vec<Option<P>>,
    heap: BinaryHeap<Reverse<HeapEntry<K, P::Item>>>,
    key: F,
    limit: Option<usize>,
    prepared: bool,
    exhausted: bool,
    counter: usize,
}

impl<P, K, F> MergedPaginator<P, K, F>
where
    P: Paginator,
    K: Ord,
    F: Fn(&P::Item) -> K,
{
    pub fn new(sources: impl IntoIterator<Item = P>, key: F) -> Self {
        Self {
            sources: sources.into_iter().map(Some).collect(),
            heap: BinaryHeap::new(),
            key,
            limit: None,
            prepared: false,
            exhausted: false,
            counter: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Number of sources that can still produce items.
    pub fn live_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    fn push(&mut self, order: usize, value: P::Item) {
        let key = (self.key)(&value);
        self.heap.push(Reverse(HeapEntry::new(key, order, value)));
    }

    fn complete(&mut self) {
        self.exhausted = true;
        self.heap.clear();
        self.sources.clear();
    }

    /// Fill the heap with the first item of every source.
    async fn prepare(&mut self) -> Result<(), P::Error> {
        self.prepared = true;

        let firsts = join_all(self.sources.iter_mut().map(|slot| async move {
            match slot {
                Some(source) => source.next().await,
                None => Ok(None),
            }
        }))
        .await;

        let mut failure = None;
        for (order, first) in firsts.into_iter().enumerate() {
            match first {
                Ok(Some(value)) => self.push(order, value),
                Ok(None) => self.sources[order] = None,
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        if let Some(err) = failure {
            self.complete();
            return Err(err);
        }

        debug!(
            sources = self.sources.len(),
            live = self.heap.len(),
            "Prepared merged paginator"
        );
        Ok(())
    }
}

impl<P> MergedPaginator<P, P::Item, fn(&P::Item) -> P::Item>
where
    P: Paginator,
    P::Item: Ord + Clone,
{
    /// Merge by comparing the items themselves.
    pub fn by_value(sources: impl IntoIterator<Item = P>) -> Self {
        Self::new(sources, <P::Item as Clone>::clone)
    }
}

#[async_trait]
impl<P, K, F> Paginator for MergedPaginator<P, K, F>
where
    P: Paginator,
    K: Ord + Send,
    F: Fn(&P::Item) -> K + Send,
{
    type Item = P::Item;
    type Error = P::Error;

    async fn next(&mut self) -> Result<Option<Self::Item>, Self::Error> {
        if self.exhausted {
            return Ok(None);
        }

        if self.limit.is_some_and(|limit| self.counter >= limit) {
            self.complete();
            return Ok(None);
        }

        if !self.prepared {
            self.prepare().await?;
        }

        let Some(Reverse(entry)) = self.heap.pop() else {
            self.complete();
            return Ok(None);
        };
        self.counter += 1;

        let order = entry.order;
        let pulled = match self.sources[order].as_mut() {
            Some(source) => source.next().await,
            None => Ok(None),
        };

        match pulled {
            Ok(Some(value)) => self.push(order, value),
            Ok(None) => self.sources[order] = None,
            Err(err) => {
                self.complete();
                return Err(err);
            }
        }

        Ok(Some(entry.value))
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Drain the merge.
    ///
    /// An untouched merge without a limit drains every source concurrently and
    /// merges the lists in memory. Otherwise the merge is drained lazily so the
    /// limit stops fetching early. Both produce the same sequence.
    async fn flatten(mut self) -> Result<Vec<Self::Item>, Self::Error>
    where
        Self: Sized,
    {
        if self.prepared || self.limit.is_some() {
            return drain(&mut self).await;
        }

        debug!(sources = self.sources.len(), "Merging sources eagerly");
        let drained = join_all(self.sources.into_iter().flatten().map(Paginator::flatten)).await;
        let lists = drained.into_iter().collect::<Result<Vec<_>, _>>()?;

        Ok(merge_sorted(lists, &self.key))
    }
}

impl<P, K, F> IntoFuture for MergedPaginator<P, K, F>
where
    P: Paginator + 'static,
    P::Item: 'static,
    P::Error: 'static,
    K: Ord + Send + 'static,
    F: Fn(&P::Item) -> K + Send + 'static,
{
    type Output = Result<Vec<P::Item>, P::Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.flatten())
    }
}

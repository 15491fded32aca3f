//! Pagination Walker.
//!
//! Turns a paginated upstream collection into a lazy, ordered stream of items. A page
//! is fetched only once the items of the previous page have been consumed, so a
//! consumer that stops early stops the upstream traffic too. A failed fetch is
//! yielded as the stream's last element, after every item fetched before it.

use crate::catalog::{NextPageSignal, OperationDescriptor, PaginationPolicy};
use crate::dispatcher::normalize;
use crate::error::{AdapterError, AdapterResult};
use crate::upstream::{Transport, UpstreamClient, UpstreamRequest};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use log::debug;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::time::Instant;

/// One fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Page number to request next, when upstream signals more
    pub next_page: Option<u64>,
}

/// Walks paginated collections through an [`UpstreamClient`].
#[derive(Debug)]
pub struct PageWalker<'a, T: Transport> {
    client: &'a UpstreamClient<T>,
    max_pages: usize,
}

impl<'a, T: Transport> PageWalker<'a, T> {
    /// `max_pages` caps walks whose operation declares no cap of its own.
    pub fn new(client: &'a UpstreamClient<T>, max_pages: usize) -> Self {
        Self {
            client,
            max_pages: max_pages.max(1),
        }
    }

    /// Fetch a single page (1-based).
    pub async fn fetch_page(
        &self,
        descriptor: &OperationDescriptor,
        base: &UpstreamRequest,
        page: u64,
        per_page: Option<u32>,
        deadline: Instant,
    ) -> AdapterResult<Page> {
        let per_page = batch_size(&descriptor.pagination, per_page);
        let (items, more) =
            fetch_batch(self.client, descriptor, base, page.max(1), per_page, deadline).await?;
        Ok(Page {
            items,
            next_page: more.then_some(page.max(1) + 1),
        })
    }

    /// Lazily walk every page, starting at the first.
    pub fn walk(
        &self,
        descriptor: &'a OperationDescriptor,
        base: UpstreamRequest,
        per_page: Option<u32>,
        deadline: Instant,
    ) -> Walk<'a> {
        let progress = Arc::new(WalkProgress::default());
        let state = WalkState {
            client: self.client,
            descriptor,
            base,
            deadline,
            next_page: 1,
            per_page: batch_size(&descriptor.pagination, per_page),
            max_pages: descriptor.pagination.max_pages().unwrap_or(self.max_pages),
            buffer: VecDeque::new(),
            done: false,
            progress: Arc::clone(&progress),
        };

        let items = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Some((Ok(item), state));
                }
                if state.done {
                    return None;
                }
                if let Err(error) = state.advance().await {
                    state.done = true;
                    return Some((Err(error), state));
                }
            }
        });

        Walk {
            items: items.boxed(),
            progress,
        }
    }
}

/// Ordered stream of raw collection items.
pub struct Walk<'a> {
    items: BoxStream<'a, AdapterResult<Value>>,
    progress: Arc<WalkProgress>,
}

impl Walk<'_> {
    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.progress.pages.load(Ordering::Relaxed)
    }

    /// Whether the walk stopped at its page cap while upstream still had more.
    pub fn truncated(&self) -> bool {
        self.progress.truncated.load(Ordering::Relaxed)
    }
}

impl Stream for Walk<'_> {
    type Item = AdapterResult<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.items.poll_next_unpin(cx)
    }
}

#[derive(Debug, Default)]
struct WalkProgress {
    pages: AtomicUsize,
    truncated: AtomicBool,
}

struct WalkState<'a, T: Transport> {
    client: &'a UpstreamClient<T>,
    descriptor: &'a OperationDescriptor,
    base: UpstreamRequest,
    deadline: Instant,
    next_page: u64,
    per_page: u32,
    max_pages: usize,
    buffer: VecDeque<Value>,
    done: bool,
    progress: Arc<WalkProgress>,
}

impl<T: Transport> WalkState<'_, T> {
    async fn advance(&mut self) -> AdapterResult<()> {
        let (items, more) = fetch_batch(
            self.client,
            self.descriptor,
            &self.base,
            self.next_page,
            self.per_page,
            self.deadline,
        )
        .await?;

        let pages = self.progress.pages.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Fetched page {} of '{}' ({} items)",
            self.next_page,
            self.descriptor.name,
            items.len()
        );
        self.buffer.extend(items);
        self.next_page += 1;

        if !more {
            self.done = true;
        } else if pages >= self.max_pages {
            debug!(
                "Walk of '{}' stopped at page cap {}",
                self.descriptor.name, self.max_pages
            );
            self.progress.truncated.store(true, Ordering::Relaxed);
            self.done = true;
        }
        Ok(())
    }
}

fn batch_size(policy: &PaginationPolicy, requested: Option<u32>) -> u32 {
    match policy {
        PaginationPolicy::PageNumber { per_page, .. } => requested.unwrap_or(*per_page),
        PaginationPolicy::OffsetLimit { limit, .. } => requested.unwrap_or(*limit),
        PaginationPolicy::None => requested.unwrap_or(1),
    }
    .max(1)
}

/// Fetch one batch and report whether upstream signals another.
async fn fetch_batch<T: Transport>(
    client: &UpstreamClient<T>,
    descriptor: &OperationDescriptor,
    base: &UpstreamRequest,
    page: u64,
    per_page: u32,
    deadline: Instant,
) -> AdapterResult<(Vec<Value>, bool)> {
    let mut request = base.clone();
    match &descriptor.pagination {
        PaginationPolicy::PageNumber { .. } => {
            request.set_query("page", page.to_string());
            request.set_query("per_page", per_page.to_string());
        }
        PaginationPolicy::OffsetLimit {
            offset_param,
            limit_param,
            ..
        } => {
            let offset = (page - 1) * u64::from(per_page);
            request.set_query(offset_param.as_str(), offset.to_string());
            request.set_query(limit_param.as_str(), per_page.to_string());
        }
        PaginationPolicy::None => {}
    }

    let response = client.execute(request, deadline).await?;
    if !response.is_success() {
        return Err(normalize::status_error(&response));
    }
    let items = normalize::extract_items(&descriptor.response, &response.body)?;

    let more = !items.is_empty()
        && match &descriptor.pagination {
            PaginationPolicy::PageNumber {
                next: NextPageSignal::LinkHeader,
                ..
            } => response.has_next_link(),
            PaginationPolicy::PageNumber {
                next: NextPageSignal::FullPage,
                ..
            }
            | PaginationPolicy::OffsetLimit { .. } => items.len() >= per_page as usize,
            PaginationPolicy::None => false,
        };
    Ok((items, more))
}

/// Drain a walk, keeping the items fetched before any failure.
pub async fn collect_walk(walk: &mut Walk<'_>) -> Result<Vec<Value>, (AdapterError, Vec<Value>)> {
    let mut items = Vec::new();
    while let Some(next) = walk.next().await {
        match next {
            Ok(item) => items.push(item),
            Err(error) => return Err((error, items)),
        }
    }
    Ok(items)
}

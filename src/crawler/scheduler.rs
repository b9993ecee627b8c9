//! Frontier and page budget for a single crawl
//!
//! This module handles:
//! - The queue of pages waiting to be visited
//! - Deduplication of pages by their normalized unique key
//! - The crawl-wide page budget shared by all concurrent visits

use crate::url::normalize_url;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

/// Crawl-wide cap on admitted page visits
///
/// Every admitted visit takes one unit with a compare-and-decrement, so
/// concurrent admissions can never overshoot the cap.
#[derive(Debug)]
pub struct PageBudget {
    remaining: AtomicUsize,
}

impl PageBudget {
    pub fn new(max_pages: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(max_pages),
        }
    }

    /// Takes one unit; returns false once the budget is spent
    pub fn try_acquire(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// A page to visit
///
/// Keeps the text the page was requested as next to the parsed URL. Rows
/// recorded for the page name it the way it was seeded, so a crawl of
/// `https://example.com` records `https://example.com` as its source page
/// rather than the parser's `https://example.com/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: Url,
    requested: String,
}

impl PageRequest {
    /// Parses `raw`, keeping the trimmed text as the requested form
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let requested = raw.trim();
        Ok(Self {
            url: Url::parse(requested)?,
            requested: requested.to_string(),
        })
    }

    /// A request for an already parsed URL, such as a link found on a page
    pub fn from_url(url: Url) -> Self {
        let requested = url.to_string();
        Self { url, requested }
    }

    /// The URL as it was requested
    pub fn as_str(&self) -> &str {
        &self.requested
    }
}

struct FrontierState {
    queue: VecDeque<PageRequest>,
    /// Normalized keys of every URL ever queued
    seen: HashSet<String>,
}

/// Pages waiting to be visited
///
/// The frontier never holds more pages than the budget can still admit, so
/// enqueue counts reflect pages that will actually be visited.
pub struct Frontier {
    state: Mutex<FrontierState>,
    budget: PageBudget,
}

impl Frontier {
    /// Creates an empty frontier with a budget of `max_pages` visits
    pub fn new(max_pages: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState {
                queue: VecDeque::new(),
                seen: HashSet::new(),
            }),
            budget: PageBudget::new(max_pages),
        }
    }

    /// Adds pages not seen before, up to the budget's remaining room
    ///
    /// # Returns
    ///
    /// The number of pages actually added
    pub fn enqueue(&self, requests: impl IntoIterator<Item = PageRequest>) -> usize {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };

        let mut room = self.budget.remaining().saturating_sub(state.queue.len());
        let mut added = 0;

        for request in requests {
            if room == 0 {
                break;
            }

            let key = match normalize_url(request.url.as_str()) {
                Ok(key) => key.to_string(),
                Err(e) => {
                    tracing::debug!("Not queueing {}: {}", request.as_str(), e);
                    continue;
                }
            };

            if state.seen.insert(key) {
                tracing::trace!("Queued {}", request.as_str());
                state.queue.push_back(request);
                room -= 1;
                added += 1;
            }
        }

        added
    }

    /// Pops the next page if the budget admits another visit
    pub fn next_admitted(&self) -> Option<PageRequest> {
        let mut state = self.state.lock().ok()?;

        if state.queue.is_empty() {
            return None;
        }
        if !self.budget.try_acquire() {
            state.queue.clear();
            return None;
        }

        state.queue.pop_front()
    }

    /// Returns the number of pages waiting
    pub fn queued(&self) -> usize {
        self.state.lock().map(|s| s.queue.len()).unwrap_or(0)
    }

    pub fn budget(&self) -> &PageBudget {
        &self.budget
    }
}

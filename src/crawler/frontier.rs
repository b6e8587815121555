//! Crawl frontier
//!
//! A priority queue of URLs waiting to be fetched. Entries are ordered by
//! `(source rank, depth, insertion sequence)`, so seeds go first, then
//! sitemap URLs, then discovered links, shallow before deep, and FIFO within
//! a tie.

use crate::crawler::record::PageSource;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use url::Url;

/// A URL queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub url: Url,
    pub source: PageSource,
    pub discovered_from: Option<Url>,
    pub depth: u32,
}

#[derive(Debug)]
struct Queued {
    key: (u8, u32, u64),
    entry: QueueEntry,
}

// Reverse comparison so the smallest key is popped first from BinaryHeap
impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key)
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Queued {}

/// Frontier priority queue
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<Queued>,
    next_sequence: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueueEntry) {
        let key = (entry.source.rank(), entry.depth, self.next_sequence);
        self.next_sequence += 1;
        self.heap.push(Queued { key, entry });
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.heap.pop().map(|queued| queued.entry)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, source: PageSource, depth: u32) -> QueueEntry {
        QueueEntry {
            url: Url::parse(&format!("https://example.com{}", path)).unwrap(),
            source,
            discovered_from: None,
            depth,
        }
    }

    fn drain(frontier: &mut Frontier) -> Vec<String> {
        std::iter::from_fn(|| frontier.pop())
            .map(|e| e.url.path().to_string())
            .collect()
    }

    #[test]
    fn test_source_rank_first() {
        let mut frontier = Frontier::new();
        frontier.push(entry("/d", PageSource::Discovered, 1));
        frontier.push(entry("/s", PageSource::Sitemap, 0));
        frontier.push(entry("/seed", PageSource::Seed, 0));
        assert_eq!(drain(&mut frontier), vec!["/seed", "/s", "/d"]);
    }

    #[test]
    fn test_depth_then_insertion_order() {
        let mut frontier = Frontier::new();
        frontier.push(entry("/deep", PageSource::Discovered, 3));
        frontier.push(entry("/first", PageSource::Discovered, 1));
        frontier.push(entry("/second", PageSource::Discovered, 1));
        assert_eq!(drain(&mut frontier), vec!["/first", "/second", "/deep"]);
    }

    #[test]
    fn test_seed_links_after_seed_page() {
        let mut frontier = Frontier::new();
        frontier.push(entry("/", PageSource::Seed, 0));
        frontier.push(entry("/known", PageSource::Seed, 1));
        frontier.push(entry("/from-sitemap", PageSource::Sitemap, 0));
        assert_eq!(frontier.len(), 3);
        assert_eq!(drain(&mut frontier), vec!["/", "/known", "/from-sitemap"]);
        assert!(frontier.is_empty());
    }
}

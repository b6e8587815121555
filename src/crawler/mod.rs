//! Crawler module for budgeted single-origin audits
//!
//! This module contains the core crawling logic, including:
//! - The [`PageFetcher`] seam and its HTTP implementation
//! - HTML field and link extraction
//! - The priority frontier and budgeted scheduler
//! - Overall audit coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod record;
mod scheduler;

pub use coordinator::{run_audit, Coordinator};
pub use fetcher::{
    build_http_client, FetchError, FetchedPage, HreflangLink, HttpFetcher, PageFetcher,
};
pub use frontier::{Frontier, QueueEntry};
pub use parser::{extract_page, ExtractedPage};
pub use record::{PageRecord, PageSource, PageStatus};
pub use scheduler::{CrawlBudget, CrawlRunResult, Scheduler, SourceTally};

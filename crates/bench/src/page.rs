//! Capabilities the harness needs from a driven browser session
//!
//! The runner only talks to these traits. [`crate::playwright::PlaywrightSession`]
//! implements all three against a real browser; tests use in-memory fakes.

use async_trait::async_trait;

use crate::dataset::ReferenceDataset;
use crate::error::BenchResult;

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Load the tenant start page.
    async fn go_to_start(&self, start_url: &str) -> BenchResult<()>;

    /// Open the assistant panel.
    async fn open_assistant(&self) -> BenchResult<()>;
}

#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Type `text` into the chat input and submit it.
    async fn send(&self, text: &str) -> BenchResult<()>;

    /// Whether the loading indicator is still shown.
    async fn is_busy(&self) -> BenchResult<bool>;

    /// Text of the most recent assistant reply.
    async fn read_latest_response(&self) -> BenchResult<String>;
}

#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Follow the first reference link in the latest reply.
    async fn follow_reference_link(&self) -> BenchResult<()>;

    /// Reveal hidden table columns until the page reports that all columns
    /// are visible. Calling it again on a fully revealed table is a no-op.
    async fn reveal_all_columns(&self) -> BenchResult<()>;

    /// Read the table located by the current page header.
    async fn read_table(&self) -> BenchResult<ReferenceDataset>;
}

/// A session that can do everything the benchmark needs.
pub trait BenchPage: Navigator + ChatSession + ReferenceSource {}

impl<T: Navigator + ChatSession + ReferenceSource> BenchPage for T {}

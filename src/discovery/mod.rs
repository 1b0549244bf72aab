//! Catalog discovery: listing pages and the record links on them.
//!
//! - [`pagination`] - Walks the root page's pager into listing-page URLs
//! - [`links`] - Collects record links from one listing page

pub mod links;
pub mod pagination;

pub use links::{collect_links, has_path_prefix};
pub use pagination::discover_listing_pages;

//! State module for crawl lifecycle and resource classification
//!
//! # Components
//!
//! - `CrawlStatus`: Lifecycle of a crawl (pending, running, completed, failed)
//! - `ResourceType`: What kind of resource a recorded URL is
//! - `DiscoveryPath`: Which discovery path produced a resource record

mod crawl_status;
mod resource_type;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use resource_type::{DiscoveryPath, ResourceType};

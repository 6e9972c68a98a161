//! Repository analysis
//!
//! - [`SourceTree`]: read-only file access (filesystem or in-memory)
//! - [`detectors`]: one detector per facet of the facts document
//! - [`FactAggregator`]: staged, deterministic composition of the detectors

pub mod aggregator;
pub mod detectors;
pub mod scanner;
pub mod source_tree;

pub use aggregator::FactAggregator;
pub use detectors::{Detector, DetectorInput, Facet, FactDetector};
pub use source_tree::{FsSourceTree, MemorySourceTree, SourceTree, count_code_lines};

//! # Ingestion
//!
//! Producer side of the logger.
//!
//! Responsibilities:
//! - Bounded, drop-newest sample queue between producer and consumer
//! - Mock producer emitting accelerometer bursts and GPS fixes at
//!   configurable rates
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{MockSampleSource, SampleQueue};
//!
//! let queue = Arc::new(SampleQueue::with_capacity(2048)?);
//! let source = MockSampleSource::new(MockSourceConfig::from(&blueprint.producer));
//! let handle = source.start(queue.clone(), clock);
//!
//! while let Some(sample) = queue.pop() {
//!     manager.write_sample(sample)?;
//! }
//! ```

mod error;
mod mock;
mod queue;

pub use error::{IngestionError, Result};
pub use mock::{MockSampleSource, MockSourceConfig, ProducerMetrics, ProducerSnapshot};
pub use queue::{QueueSnapshot, SampleQueue};

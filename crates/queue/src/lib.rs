//! Work queue plumbing for file-processing jobs.
//!
//! The pipeline talks to the broker only through the traits in
//! [`delivery`]: [`JobPublisher`] on the upload side and
//! [`DeliverySource`] on the worker side. [`amqp::AmqpBroker`] is the
//! production implementation; [`memory::MemoryQueue`] is an in-process
//! stand-in for tests and local runs without a broker.

pub mod amqp;
pub mod delivery;
pub mod error;
pub mod memory;
pub mod topology;

pub use amqp::AmqpBroker;
pub use delivery::{DeliveryAcker, DeliverySource, DeliveryStream, JobDelivery, JobPublisher};
pub use error::QueueError;
pub use memory::{MemoryQueue, Settlement};

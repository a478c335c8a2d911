//! Error types for device construction and replica-ID parsing.

use thiserror::Error;

/// Boxed error returned by a [`DeviceInfo`](crate::device::DeviceInfo) query.
pub type InfoError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure while building a [`Device`](crate::device::Device).
///
/// Construction is all-or-nothing: one of these is returned instead of a
/// partially populated device.
#[derive(Error, Debug)]
pub enum BuildDeviceError {
    #[error("error getting device UUID: {0}")]
    Uuid(#[source] InfoError),

    #[error("error getting device paths: {0}")]
    Paths(#[source] InfoError),

    #[error("error getting device NUMA node: {0}")]
    NumaNode(#[source] InfoError),
}

/// Failure while strictly parsing an annotated device ID.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnnotatedIdError {
    #[error("invalid replica index {replica:?} in device ID {id:?}")]
    InvalidReplica { id: String, replica: String },
}

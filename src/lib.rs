//! gpu-device-rm: GPU device inventory for Kubernetes device plugins.
//!
//! Builds the per-node device inventory from driver handles and answers the
//! questions the allocator and the plugin server ask of it:
//!   - which devices exist, by ID or index, and set operations over them
//!   - which devices are MIG partitions and which support aligned allocation
//!   - the replica-expanded device list advertised to the kubelet
//!   - encoding and decoding of replica-annotated device IDs

pub mod config;
pub mod device;
pub mod error;

#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Downstream crates reach the scheduler through `sessionq_tonic_core::sessionq`.
pub use sessionq;

pub mod proto {
    #![allow(clippy::all, clippy::pedantic, clippy::nursery)]
    tonic::include_proto!("sessionq");

    /// Encoded descriptor set for `tonic-reflection`.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("sessionq_descriptor");
}

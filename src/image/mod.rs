//! Image normalization for uploaded photos
//!
//! Uploaded ingredient photos are decoded, downsized to a bounded edge
//! length, and re-encoded as JPEG so the outbound generation call stays
//! small and bounded in cost regardless of input resolution.

pub mod mime;
pub mod normalizer;

pub use normalizer::{ImageNormalizer, NormalizedImage};

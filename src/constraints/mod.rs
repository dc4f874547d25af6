//! Generic R1CS primitives the Bitcoin gadgets are assembled from

/// Bit-array allocation, packing and comparison
pub mod bits;
/// Reads at a variable byte offset
pub mod extractor;
/// One-hot selection
pub mod selector;

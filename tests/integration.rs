//! Integration tests entry point
//!
//! Tests how the parsers, the graph and the converter work together.
//! Run with: cargo test --test integration

mod integration {
    pub mod conversion;
    pub mod modules;
    pub mod parsing;
}

// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the core
// concepts of the system: manifest rows, label factorization,
// image samples and the error kinds every other layer reports.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Typed error kinds shared by every layer
pub mod error;

// Manifest rows and dense label factorization
pub mod manifest;

// A decoded image ready for batching
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;

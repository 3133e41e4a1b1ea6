//! Persistence layer: the generic document-store seam, the bundled
//! in-process implementation, and the bounded per-location history store.

pub mod doc;
pub mod history;
pub mod mem;

pub use doc::DocumentStore;
pub use history::HistoryStore;
pub use mem::MemoryStore;

// ── Domain model ──
//
// Benches, rails and the channel catalogue. Wire types stay in
// `benchdeck-api` and are re-exported from the crate root.

pub mod bench;
pub mod channel;

pub use bench::{BENCH_COUNT, BenchId, Rail};
pub use channel::{ChannelKind, catalogue, classify, is_known};

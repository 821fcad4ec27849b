//! Block-level machinery: signatures, the decision cache, and the joint
//! (glyph, fg, bg) optimizer.

mod cache;
mod optimizer;
mod signature;

pub use cache::{ApproximateCache, CachedMatch};
pub use optimizer::{calculate_block_error, quadrant_target, BlockDecision, Optimizer};
pub use signature::Signature;

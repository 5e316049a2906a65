// =============================================================================
// Signals Module
// =============================================================================
//
// Signal pipeline on top of the indicator engine:
// - Rule-based classifier (five voting rules + trend observation)
// - Best-candidate selection across instruments

pub mod classifier;
pub mod selection;

pub use classifier::{tally_votes, Signal, SignalClassifier, VoteTally};
pub use selection::select_best_signal;

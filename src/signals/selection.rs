// =============================================================================
// Best-signal selection
// =============================================================================

use super::classifier::Signal;

/// Reduce `candidates` to the strongest one.
///
/// Highest confidence wins; equal confidence goes to the candidate with more
/// confirmations; a full tie keeps the earliest candidate. Returns `None` for
/// an empty input.
pub fn select_best_signal<S, I>(candidates: I) -> Option<S>
where
    S: AsRef<Signal>,
    I: IntoIterator<Item = S>,
{
    candidates.into_iter().reduce(|best, current| {
        let (b, c) = (best.as_ref(), current.as_ref());
        if c.confidence > b.confidence
            || (c.confidence == b.confidence && c.confirmations.len() > b.confirmations.len())
        {
            current
        } else {
            best
        }
    })
}

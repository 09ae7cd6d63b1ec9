//! Reconciliation of partial recognition fragments into a display string.
//!
//! With dynamic correction (`wpgs`) enabled the service revises its most
//! recent guess as more audio arrives. The reconciler splits the transcript
//! into a stable prefix the service will no longer change and a provisional
//! tail it may still rewrite, and maintains the concatenation of the two as
//! the text callers should display.

use super::messages::{CorrectionMode, InboundFragment};

/// Accumulates inbound fragments into a coherent transcript.
#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    /// Text the service has committed to.
    stable: String,
    /// The service's current revisable guess for the latest audio.
    provisional: String,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment in and return the updated display text.
    pub fn apply(&mut self, fragment: &InboundFragment) -> String {
        match fragment.correction {
            CorrectionMode::None => {
                // Without dynamic correction every fragment is committed.
                self.stable.push_str(&fragment.text);
                self.provisional.clear();
            }
            CorrectionMode::Append => {
                // The previous provisional guess is now confirmed; the new
                // fragment starts the next revisable tail.
                let confirmed = std::mem::take(&mut self.provisional);
                self.stable.push_str(&confirmed);
                self.provisional = fragment.text.clone();
            }
            CorrectionMode::Replace => {
                self.provisional = fragment.text.clone();
            }
        }
        self.display()
    }

    /// Current transcript: stable prefix plus the provisional tail.
    pub fn display(&self) -> String {
        let mut text = String::with_capacity(self.stable.len() + self.provisional.len());
        text.push_str(&self.stable);
        text.push_str(&self.provisional);
        text
    }

    /// Commit the provisional tail and return the final transcript.
    pub fn finalize(&mut self) -> String {
        let tail = std::mem::take(&mut self.provisional);
        self.stable.push_str(&tail);
        self.stable.clone()
    }

    /// Discard all accumulated text for a fresh session.
    pub fn reset(&mut self) {
        self.stable.clear();
        self.provisional.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str, correction: CorrectionMode) -> InboundFragment {
        InboundFragment {
            text: text.to_string(),
            correction,
            is_finished: false,
        }
    }

    #[test]
    fn test_plain_fragments_accumulate() {
        let mut reconciler = TranscriptReconciler::new();
        assert_eq!(reconciler.apply(&fragment("你好", CorrectionMode::None)), "你好");
        assert_eq!(
            reconciler.apply(&fragment("世界", CorrectionMode::None)),
            "你好世界"
        );
    }

    #[test]
    fn test_replace_rewrites_provisional_tail() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(&fragment("你好", CorrectionMode::Append));
        assert_eq!(reconciler.display(), "你好");

        // A replacement revises the tail without touching stable text.
        assert_eq!(
            reconciler.apply(&fragment("你好世", CorrectionMode::Replace)),
            "你好世"
        );
        assert_eq!(
            reconciler.apply(&fragment("你好世界", CorrectionMode::Replace)),
            "你好世界"
        );
    }

    #[test]
    fn test_append_commits_previous_guess() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(&fragment("你好世界", CorrectionMode::Append));
        // "apd" confirms the earlier guess and opens a new tail.
        assert_eq!(reconciler.apply(&fragment("吗", CorrectionMode::Append)), "你好世界吗");
        // The new tail stays revisable.
        assert_eq!(reconciler.apply(&fragment("嗎", CorrectionMode::Replace)), "你好世界嗎");
    }

    #[test]
    fn test_replace_leaves_stable_text_untouched() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(&fragment("你好", CorrectionMode::None));
        assert_eq!(
            reconciler.apply(&fragment("吗", CorrectionMode::Replace)),
            "你好吗"
        );
        assert_eq!(
            reconciler.apply(&fragment("嗎", CorrectionMode::Replace)),
            "你好嗎"
        );
    }

    #[test]
    fn test_finalize_commits_tail() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(&fragment("你好", CorrectionMode::Append));
        reconciler.apply(&fragment("世界", CorrectionMode::Append));
        assert_eq!(reconciler.finalize(), "你好世界");
        // Finalize is idempotent.
        assert_eq!(reconciler.finalize(), "你好世界");
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut reconciler = TranscriptReconciler::new();
        reconciler.apply(&fragment("你好", CorrectionMode::None));
        reconciler.reset();
        assert_eq!(reconciler.display(), "");
    }
}

//! Live speaking-rate analytics over a reconciled transcript stream.
//!
//! The engine consumes the same transcript callback stream a UI would: each
//! update carries the full reconciled text and a timestamp. From those it
//! derives a sliding-window current rate, a cumulative average rate, and a
//! coarse classification. All time comes in through method arguments, so the
//! engine is fully deterministic under test.
//!
//! Rate units are word-units per minute, where one non-punctuation character
//! counts as one word unit. That matches dictation in ideographic scripts;
//! no language-aware tokenization is attempted.

use tracing::debug;

/// Default sliding-window width for the current rate.
pub const DEFAULT_WINDOW_MS: u64 = 10_000;

/// Ideographic punctuation ignored by word counting, alongside ASCII
/// punctuation and whitespace.
const CJK_PUNCTUATION: &[char] = &[
    '，', '。', '！', '？', '；', '：', '、', '…', '—', '·', '“', '”', '‘', '’', '（', '）',
    '《', '》', '【', '】', '〔', '〕', '「', '」', '『', '』', '〈', '〉',
];

/// Count word units in `text`: characters minus punctuation and whitespace.
pub fn word_count(text: &str) -> usize {
    text.chars()
        .filter(|c| {
            !c.is_whitespace() && !c.is_ascii_punctuation() && !CJK_PUNCTUATION.contains(c)
        })
        .count()
}

// =============================================================================
// Classification
// =============================================================================

/// Speaking-rate bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateClass {
    NotStarted,
    Slow,
    Moderate,
    Fast,
    VeryFast,
}

/// Band boundaries in word-units per minute.
///
/// A rate of 0 is always `NotStarted`; otherwise rates below `slow_below`
/// are slow, below `moderate_below` moderate, below `fast_below` fast, and
/// everything else very fast.
#[derive(Debug, Clone, Copy)]
pub struct RateThresholds {
    pub slow_below: u32,
    pub moderate_below: u32,
    pub fast_below: u32,
}

impl Default for RateThresholds {
    fn default() -> Self {
        Self {
            slow_below: 120,
            moderate_below: 180,
            fast_below: 250,
        }
    }
}

/// Display labels for the rate bands.
#[derive(Debug, Clone)]
pub struct RateLabels {
    pub not_started: String,
    pub slow: String,
    pub moderate: String,
    pub fast: String,
    pub very_fast: String,
}

impl Default for RateLabels {
    fn default() -> Self {
        Self {
            not_started: "not started".to_string(),
            slow: "slow".to_string(),
            moderate: "moderate".to_string(),
            fast: "fast".to_string(),
            very_fast: "very fast".to_string(),
        }
    }
}

/// Maps a rate to a band and its label.
#[derive(Debug, Clone, Default)]
pub struct RateClassifier {
    pub thresholds: RateThresholds,
    pub labels: RateLabels,
}

impl RateClassifier {
    pub fn classify(&self, rate: u32) -> RateClass {
        if rate == 0 {
            RateClass::NotStarted
        } else if rate < self.thresholds.slow_below {
            RateClass::Slow
        } else if rate < self.thresholds.moderate_below {
            RateClass::Moderate
        } else if rate < self.thresholds.fast_below {
            RateClass::Fast
        } else {
            RateClass::VeryFast
        }
    }

    pub fn label(&self, class: RateClass) -> &str {
        match class {
            RateClass::NotStarted => &self.labels.not_started,
            RateClass::Slow => &self.labels.slow,
            RateClass::Moderate => &self.labels.moderate,
            RateClass::Fast => &self.labels.fast,
            RateClass::VeryFast => &self.labels.very_fast,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// One point of transcript-length history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSample {
    pub timestamp_ms: u64,
    pub cumulative_chars: usize,
}

/// Figures reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub final_word_count: usize,
    pub final_average_rate: u32,
}

/// Sliding-window and cumulative speaking-rate computation.
///
/// Drive it with `on_session_start`, a stream of `on_transcript_update`
/// calls, and `on_session_end`. History never carries across sessions.
#[derive(Debug)]
pub struct RateAnalyticsEngine {
    window_ms: u64,
    classifier: RateClassifier,
    samples: Vec<RateSample>,
    session_start_ms: Option<u64>,
    cumulative_chars: usize,
    current_rate: u32,
    average_rate: u32,
}

impl Default for RateAnalyticsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS, RateClassifier::default())
    }
}

impl RateAnalyticsEngine {
    pub fn new(window_ms: u64, classifier: RateClassifier) -> Self {
        Self {
            window_ms: window_ms.max(1),
            classifier,
            samples: Vec::new(),
            session_start_ms: None,
            cumulative_chars: 0,
            current_rate: 0,
            average_rate: 0,
        }
    }

    /// Begin a fresh session at `timestamp_ms`. Discards all prior history.
    pub fn on_session_start(&mut self, timestamp_ms: u64) {
        self.samples.clear();
        self.samples.push(RateSample {
            timestamp_ms,
            cumulative_chars: 0,
        });
        self.session_start_ms = Some(timestamp_ms);
        self.cumulative_chars = 0;
        self.current_rate = 0;
        self.average_rate = 0;
    }

    /// Fold in one transcript update (the full reconciled text).
    pub fn on_transcript_update(&mut self, text: &str, timestamp_ms: u64) {
        if self.session_start_ms.is_none() {
            debug!("Transcript update before session start; ignoring");
            return;
        }

        let count = word_count(text);
        // One sample per update that changes the text length; replacements
        // may shrink the count.
        if self
            .samples
            .last()
            .is_none_or(|last| last.cumulative_chars != count)
        {
            self.samples.push(RateSample {
                timestamp_ms,
                cumulative_chars: count,
            });
        }
        self.cumulative_chars = count;

        self.current_rate = self.windowed_rate(timestamp_ms);
        self.average_rate = self.cumulative_rate(timestamp_ms);
    }

    /// End the session at `timestamp_ms`, finalizing the average rate.
    pub fn on_session_end(&mut self, timestamp_ms: u64) -> SessionSummary {
        self.average_rate = self.cumulative_rate(timestamp_ms);
        SessionSummary {
            final_word_count: self.cumulative_chars,
            final_average_rate: self.average_rate,
        }
    }

    /// Rate over the trailing window, falling back to the cumulative rate
    /// when the window holds too little signal.
    fn windowed_rate(&self, now_ms: u64) -> u32 {
        let window_start = now_ms.saturating_sub(self.window_ms);
        let windowed: Vec<&RateSample> = self
            .samples
            .iter()
            .filter(|s| s.timestamp_ms >= window_start)
            .collect();

        if windowed.len() >= 2 {
            let first = windowed[0];
            let last = windowed[windowed.len() - 1];
            let delta = last.cumulative_chars as i64 - first.cumulative_chars as i64;
            let dt_ms = last.timestamp_ms.saturating_sub(first.timestamp_ms);
            if delta > 0 && dt_ms > 0 {
                return (delta as f64 / (dt_ms as f64 / 60_000.0)).round() as u32;
            }
        }

        // Insufficient or flat window; fall back to the whole session.
        if self.samples.len() >= 2 {
            return self.cumulative_rate(now_ms);
        }
        0
    }

    /// Cumulative rate over the session's wall-clock duration so far.
    fn cumulative_rate(&self, now_ms: u64) -> u32 {
        let Some(start) = self.session_start_ms else {
            return 0;
        };
        let elapsed_ms = now_ms.saturating_sub(start);
        if elapsed_ms == 0 || self.cumulative_chars == 0 {
            return 0;
        }
        (self.cumulative_chars as f64 / (elapsed_ms as f64 / 60_000.0)).round() as u32
    }

    /// Latest sliding-window rate.
    pub fn current_rate(&self) -> u32 {
        self.current_rate
    }

    /// Latest cumulative average rate.
    pub fn average_rate(&self) -> u32 {
        self.average_rate
    }

    /// Band of the current rate.
    pub fn classification(&self) -> RateClass {
        self.classifier.classify(self.current_rate)
    }

    /// Display label of the current rate's band.
    pub fn classification_label(&self) -> &str {
        self.classifier.label(self.classification())
    }

    /// Recorded samples for the current session, oldest first.
    pub fn samples(&self) -> &[RateSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_strips_punctuation() {
        assert_eq!(word_count("你好，世界。"), 4);
        assert_eq!(word_count("hello, world!"), 10);
        assert_eq!(word_count("（测试） 【括号】"), 4);
        assert_eq!(word_count("，。！？"), 0);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_windowed_rate_matches_reference_samples() {
        // Samples [(t=0, c=0), (t=10000, c=20)] inside a 10s window
        // give round(20 / (10000/60000)) = 120.
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(0);
        engine.on_transcript_update(&"字".repeat(20), 10_000);

        assert_eq!(
            engine.samples(),
            &[
                RateSample { timestamp_ms: 0, cumulative_chars: 0 },
                RateSample { timestamp_ms: 10_000, cumulative_chars: 20 },
            ]
        );
        assert_eq!(engine.current_rate(), 120);
        assert_eq!(engine.average_rate(), 120);
    }

    #[test]
    fn test_classification_boundaries() {
        let classifier = RateClassifier::default();
        assert_eq!(classifier.classify(0), RateClass::NotStarted);
        assert_eq!(classifier.classify(1), RateClass::Slow);
        assert_eq!(classifier.classify(119), RateClass::Slow);
        assert_eq!(classifier.classify(120), RateClass::Moderate);
        assert_eq!(classifier.classify(179), RateClass::Moderate);
        assert_eq!(classifier.classify(180), RateClass::Fast);
        assert_eq!(classifier.classify(249), RateClass::Fast);
        assert_eq!(classifier.classify(250), RateClass::VeryFast);
    }

    #[test]
    fn test_classification_labels() {
        let mut engine = RateAnalyticsEngine::default();
        assert_eq!(engine.classification_label(), "not started");

        engine.on_session_start(0);
        engine.on_transcript_update(&"字".repeat(20), 10_000);
        assert_eq!(engine.classification_label(), "moderate");
    }

    #[test]
    fn test_old_samples_leave_the_window() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(0);
        engine.on_transcript_update(&"字".repeat(10), 2_000);
        // A burst early on, then silence; by t=30s only the last sample is
        // inside the window, so the cumulative fallback applies.
        engine.on_transcript_update(&"字".repeat(12), 30_000);

        // Window [20s, 30s] holds one sample; fallback: round(12 / 0.5min) = 24.
        assert_eq!(engine.current_rate(), 24);
    }

    #[test]
    fn test_unchanged_text_adds_no_sample() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(0);
        engine.on_transcript_update("你好", 1_000);
        engine.on_transcript_update("你好。", 2_000); // punctuation only
        assert_eq!(engine.samples().len(), 2);
    }

    #[test]
    fn test_replacement_may_shrink_count() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(0);
        engine.on_transcript_update("你好世界", 1_000);
        engine.on_transcript_update("你好", 2_000);
        assert_eq!(engine.samples().last().unwrap().cumulative_chars, 2);
        // Window delta is measured against the session-start sample:
        // round(2 / (2000/60000 min)) = 60.
        assert_eq!(engine.current_rate(), 60);
    }

    #[test]
    fn test_session_end_summary() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(5_000);
        engine.on_transcript_update(&"字".repeat(30), 15_000);

        let summary = engine.on_session_end(35_000);
        assert_eq!(summary.final_word_count, 30);
        // 30 chars over 30s of session.
        assert_eq!(summary.final_average_rate, 60);
        assert_eq!(engine.average_rate(), 60);
    }

    #[test]
    fn test_session_start_resets_history() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(0);
        engine.on_transcript_update(&"字".repeat(50), 10_000);
        assert!(engine.current_rate() > 0);

        engine.on_session_start(60_000);
        assert_eq!(engine.current_rate(), 0);
        assert_eq!(engine.average_rate(), 0);
        assert_eq!(engine.samples().len(), 1);
        assert_eq!(engine.classification(), RateClass::NotStarted);
    }

    #[test]
    fn test_update_before_start_is_ignored() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_transcript_update("你好", 1_000);
        assert_eq!(engine.samples().len(), 0);
        assert_eq!(engine.current_rate(), 0);
    }

    #[test]
    fn test_zero_elapsed_time_reports_zero() {
        let mut engine = RateAnalyticsEngine::default();
        engine.on_session_start(1_000);
        engine.on_transcript_update("你好", 1_000);
        assert_eq!(engine.current_rate(), 0);
        assert_eq!(engine.average_rate(), 0);
    }
}

//! Keep-segment calculation for word-level cuts.
//!
//! Given transcribed words with keep/remove markers, computes the merged set
//! of time ranges to retain when a single source video is cut at word
//! boundaries. All times are f64 seconds; consumers compare with a tolerance
//! on the order of 1e-4.

use clipforge_common::error::Resolution;
use clipforge_timeline_model::WordItem;
use serde::{Deserialize, Serialize};

/// A contiguous time range of the source retained after cuts.
///
/// Invariants of a returned list: `start < end` per segment, segments are
/// sorted ascending and non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeepSegment {
    pub start: f64,
    pub end: f64,
}

impl KeepSegment {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Tuning knobs for segment calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentOptions {
    /// Seconds of padding added on both sides of each removed word.
    pub buffer_seconds: f64,

    /// Gaps between keep-segments at or below this length are folded away,
    /// as are interior keep-segments shorter than it.
    pub min_gap_seconds: f64,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            buffer_seconds: 0.05,
            min_gap_seconds: 0.1,
        }
    }
}

/// Compute the keep-segments for a word-filtered export.
///
/// Returns an empty list for a zero-length timeline and the single
/// full-duration segment when nothing is marked for removal.
pub fn compute_keep_segments(
    words: &[WordItem],
    total_duration: f64,
    opts: &SegmentOptions,
) -> Vec<KeepSegment> {
    let total = total_duration.max(0.0);
    if total <= 0.0 {
        return Vec::new();
    }

    let mut removals: Vec<(f64, f64)> = words
        .iter()
        .filter(|word| word.filter_state.is_removed())
        .map(|word| {
            (
                (word.start - opts.buffer_seconds).max(0.0),
                (word.end + opts.buffer_seconds).min(total),
            )
        })
        .filter(|(start, end)| end > start)
        .collect();

    if removals.is_empty() {
        return vec![KeepSegment {
            start: 0.0,
            end: total,
        }];
    }

    removals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let merged = merge_intervals(removals);

    let mut segments = Vec::with_capacity(merged.len() + 1);
    let mut cursor = 0.0;
    for (start, end) in merged {
        if start - cursor > 0.0 {
            segments.push(KeepSegment {
                start: cursor,
                end: start,
            });
        }
        cursor = end;
    }
    if total - cursor > 0.0 {
        segments.push(KeepSegment {
            start: cursor,
            end: total,
        });
    }

    fold_micro_gaps(segments, opts.min_gap_seconds)
}

/// Standard interval merge: sweep left to right, extending the current
/// interval whenever the next one touches or overlaps it.
fn merge_intervals(sorted: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for (start, end) in sorted {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = last_end.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Absorb perceptually-imperceptible micro-gaps left after buffer expansion.
///
/// Adjacent keep-segments separated by at most `min_gap` merge into one
/// continuous segment, and interior segments shorter than `min_gap` fold
/// into the surrounding removals. The first and last segments are never
/// dropped for being short at the timeline boundary.
fn fold_micro_gaps(segments: Vec<KeepSegment>, min_gap: f64) -> Vec<KeepSegment> {
    if segments.len() <= 1 || min_gap <= 0.0 {
        return segments;
    }

    let last_idx = segments.len() - 1;
    let mut folded: Vec<KeepSegment> = Vec::with_capacity(segments.len());
    for (i, segment) in segments.into_iter().enumerate() {
        if i != 0 && i != last_idx && segment.length() < min_gap {
            continue;
        }
        if let Some(previous) = folded.last_mut() {
            if segment.start - previous.end <= min_gap {
                previous.end = segment.end;
                continue;
            }
        }
        folded.push(segment);
    }
    folded
}

/// Fail-soft entry point for export compilation.
///
/// Malformed word data (non-finite or inverted timestamps) degrades to the
/// single full-duration segment instead of aborting the export; the outcome
/// is reported as an explicit fallback so callers can log it.
pub fn keep_segments_or_full(
    words: &[WordItem],
    total_duration: f64,
    opts: &SegmentOptions,
) -> Resolution<Vec<KeepSegment>> {
    let total = if total_duration.is_finite() {
        total_duration.max(0.0)
    } else {
        0.0
    };

    let malformed = !total_duration.is_finite()
        || !opts.buffer_seconds.is_finite()
        || !opts.min_gap_seconds.is_finite()
        || words
            .iter()
            .any(|word| !word.start.is_finite() || !word.end.is_finite() || word.end < word.start);

    if malformed {
        return Resolution::Fallback {
            value: vec![KeepSegment {
                start: 0.0,
                end: total,
            }],
            reason: "malformed word-filter input; exporting full duration without cuts".to_string(),
        };
    }

    Resolution::Resolved(compute_keep_segments(words, total, opts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_timeline_model::WordFilterState;
    use proptest::prelude::*;

    fn removed(start: f64, end: f64) -> WordItem {
        WordItem::new("w", "word", start, end).with_state(WordFilterState::UserRemove)
    }

    fn kept(start: f64, end: f64) -> WordItem {
        WordItem::new("w", "word", start, end)
    }

    fn opts(buffer: f64, min_gap: f64) -> SegmentOptions {
        SegmentOptions {
            buffer_seconds: buffer,
            min_gap_seconds: min_gap,
        }
    }

    #[test]
    fn test_zero_duration_returns_empty() {
        assert!(compute_keep_segments(&[removed(0.0, 1.0)], 0.0, &opts(0.0, 0.0)).is_empty());
        assert!(compute_keep_segments(&[], -3.0, &opts(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_no_removals_returns_full_duration() {
        let segments = compute_keep_segments(&[kept(1.0, 2.0)], 10.0, &opts(0.05, 0.1));
        assert_eq!(
            segments,
            vec![KeepSegment {
                start: 0.0,
                end: 10.0
            }]
        );
    }

    #[test]
    fn test_single_removal_with_zero_buffer() {
        let segments = compute_keep_segments(&[removed(2.0, 3.0)], 6.0, &opts(0.0, 0.0));
        assert_eq!(segments.len(), 2);
        assert!((segments[0].start - 0.0).abs() < 1e-4);
        assert!((segments[0].end - 2.0).abs() < 1e-4);
        assert!((segments[1].start - 3.0).abs() < 1e-4);
        assert!((segments[1].end - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_buffer_expands_removal_interval() {
        let segments = compute_keep_segments(&[removed(2.0, 3.0)], 6.0, &opts(0.5, 0.0));
        assert!((segments[0].end - 1.5).abs() < 1e-4);
        assert!((segments[1].start - 3.5).abs() < 1e-4);
    }

    #[test]
    fn test_buffer_clamps_to_timeline_bounds() {
        let segments = compute_keep_segments(&[removed(0.1, 0.4)], 6.0, &opts(0.5, 0.0));
        // Expansion reaches past zero; only the trailing keep survives.
        assert_eq!(segments.len(), 1);
        assert!((segments[0].start - 0.9).abs() < 1e-4);
        assert!((segments[0].end - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_adjacent_removals_merge_into_one_gap() {
        let words = vec![removed(1.0, 2.0), removed(2.4, 3.0)];
        let segments = compute_keep_segments(&words, 6.0, &opts(0.3, 0.0));
        // After expansion the intervals overlap: one merged removal,
        // two keep segments.
        assert_eq!(segments.len(), 2);
        assert!((segments[0].end - 0.7).abs() < 1e-4);
        assert!((segments[1].start - 3.3).abs() < 1e-4);
    }

    #[test]
    fn test_removal_flush_with_start_emits_no_leading_segment() {
        let segments = compute_keep_segments(&[removed(0.0, 1.0)], 5.0, &opts(0.0, 0.0));
        assert_eq!(
            segments,
            vec![KeepSegment {
                start: 1.0,
                end: 5.0
            }]
        );
    }

    #[test]
    fn test_micro_gap_folds_away() {
        // A 0.05s removal gap survives expansion but is below the 0.1s
        // perceptual floor, so the keeps merge back together.
        let segments = compute_keep_segments(&[removed(2.0, 2.05)], 6.0, &opts(0.0, 0.1));
        assert_eq!(
            segments,
            vec![KeepSegment {
                start: 0.0,
                end: 6.0
            }]
        );
    }

    #[test]
    fn test_interior_micro_segment_folds_into_neighbor() {
        let words = vec![removed(1.0, 2.0), removed(2.05, 4.0)];
        let segments = compute_keep_segments(&words, 6.0, &opts(0.0, 0.1));
        assert_eq!(segments.len(), 2);
        assert!((segments[0].end - 1.0).abs() < 1e-4);
        // The 0.05s keep between the removals folded into the cut around it.
        assert!((segments[1].start - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_boundary_micro_segments_are_retained() {
        let words = vec![removed(0.05, 2.0), removed(4.0, 5.95)];
        let segments = compute_keep_segments(&words, 6.0, &opts(0.0, 0.1));
        // First and last segments are each 0.05s long but never dropped.
        assert_eq!(segments.len(), 3);
        assert!((segments[0].length() - 0.05).abs() < 1e-4);
        assert!((segments[2].length() - 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_fail_soft_on_non_finite_word() {
        let words = vec![removed(f64::NAN, 1.0)];
        let outcome = keep_segments_or_full(&words, 6.0, &opts(0.0, 0.0));
        assert!(outcome.is_fallback());
        assert_eq!(
            outcome.into_value(),
            vec![KeepSegment {
                start: 0.0,
                end: 6.0
            }]
        );
    }

    #[test]
    fn test_fail_soft_on_inverted_word() {
        let outcome = keep_segments_or_full(&[removed(3.0, 2.0)], 6.0, &opts(0.0, 0.0));
        assert!(outcome.is_fallback());
    }

    #[test]
    fn test_well_formed_input_resolves_normally() {
        let outcome = keep_segments_or_full(&[removed(2.0, 3.0)], 6.0, &opts(0.0, 0.0));
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.value().len(), 2);
    }

    proptest! {
        /// With no micro-gap folding, keep-segments and merged removal
        /// intervals partition [0, total] exactly.
        #[test]
        fn prop_segments_partition_total_duration(
            spans in prop::collection::vec((0.0f64..30.0, 0.0f64..2.0, any::<bool>()), 0..12),
            total in 0.1f64..30.0,
            buffer in 0.0f64..0.5,
        ) {
            let words: Vec<WordItem> = spans
                .iter()
                .enumerate()
                .map(|(i, (start, len, remove))| {
                    let word = WordItem::new(format!("w{i}"), "word", *start, start + len);
                    if *remove {
                        word.with_state(WordFilterState::UserRemove)
                    } else {
                        word
                    }
                })
                .collect();

            let segments = compute_keep_segments(&words, total, &opts(buffer, 0.0));

            let mut previous_end: Option<f64> = None;
            let mut kept_total = 0.0;
            for segment in &segments {
                prop_assert!(segment.start < segment.end);
                prop_assert!(segment.start >= -1e-9 && segment.end <= total + 1e-9);
                if let Some(prev) = previous_end {
                    prop_assert!(segment.start >= prev - 1e-9);
                }
                previous_end = Some(segment.end);
                kept_total += segment.length();
            }

            let removed_total: f64 = {
                let mut intervals: Vec<(f64, f64)> = words
                    .iter()
                    .filter(|w| w.filter_state.is_removed())
                    .map(|w| ((w.start - buffer).max(0.0), (w.end + buffer).min(total)))
                    .filter(|(s, e)| e > s)
                    .collect();
                intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
                let mut merged: Vec<(f64, f64)> = Vec::new();
                for (s, e) in intervals {
                    match merged.last_mut() {
                        Some((_, last)) if s <= *last => *last = last.max(e),
                        _ => merged.push((s, e)),
                    }
                }
                merged.iter().map(|(s, e)| e - s).sum()
            };

            prop_assert!((kept_total + removed_total - total).abs() < 1e-6);
        }

        /// All-kept word lists always yield exactly the full-duration segment.
        #[test]
        fn prop_no_removals_is_identity(
            spans in prop::collection::vec((0.0f64..30.0, 0.0f64..2.0), 0..12),
            total in 0.1f64..30.0,
        ) {
            let words: Vec<WordItem> = spans
                .iter()
                .enumerate()
                .map(|(i, (start, len))| WordItem::new(format!("w{i}"), "word", *start, start + len))
                .collect();

            let segments = compute_keep_segments(&words, total, &SegmentOptions::default());
            prop_assert_eq!(segments.len(), 1);
            prop_assert!((segments[0].start - 0.0).abs() < 1e-9);
            prop_assert!((segments[0].end - total).abs() < 1e-9);
        }
    }
}

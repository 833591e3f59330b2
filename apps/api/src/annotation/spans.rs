//! Entity span verification.
//!
//! Spans index the message text by Unicode codepoint, `[start, end)`.
//! A span list is valid when every range is in bounds, non-empty, and no
//! two ranges overlap.

use crate::models::annotation::EntitySpan;

/// Why a span list failed verification. Overlaps are kept distinct because
/// the exporter treats them as blocking while bound faults only drop the
/// affected example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanFault {
    Bounds(String),
    Overlap(String),
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Verifies a span list against its message text.
///
/// Bound checks run first for every span, then pairwise overlap on the
/// list sorted by start offset.
pub fn verify_spans(text: &str, spans: &[EntitySpan]) -> Result<(), SpanFault> {
    let len = char_len(text);

    for span in spans {
        if span.start >= span.end {
            return Err(SpanFault::Bounds(format!(
                "span '{}' has start {} >= end {}",
                span.entity_type, span.start, span.end
            )));
        }
        if span.end > len {
            return Err(SpanFault::Bounds(format!(
                "span '{}' [{}, {}) exceeds message length {}",
                span.entity_type, span.start, span.end, len
            )));
        }
    }

    let mut sorted: Vec<&EntitySpan> = spans.iter().collect();
    sorted.sort_by_key(|s| (s.start, s.end));
    for pair in sorted.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(SpanFault::Overlap(format!(
                "spans '{}' [{}, {}) and '{}' [{}, {}) overlap",
                pair[0].entity_type,
                pair[0].start,
                pair[0].end,
                pair[1].entity_type,
                pair[1].start,
                pair[1].end
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(entity_type: &str, start: usize, end: usize) -> EntitySpan {
        EntitySpan {
            entity_type: entity_type.to_string(),
            value: String::new(),
            start,
            end,
        }
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(verify_spans("quiero ver productos", &[]).is_ok());
    }

    #[test]
    fn test_valid_single_span() {
        assert!(verify_spans("quiero una blusa", &[span("producto", 11, 16)]).is_ok());
    }

    #[test]
    fn test_start_not_before_end() {
        let fault = verify_spans("quiero una blusa", &[span("producto", 5, 5)]).unwrap_err();
        assert!(matches!(fault, SpanFault::Bounds(_)));
    }

    #[test]
    fn test_end_out_of_bounds() {
        let fault = verify_spans("blusa", &[span("producto", 0, 6)]).unwrap_err();
        assert!(matches!(fault, SpanFault::Bounds(_)));
    }

    #[test]
    fn test_bounds_count_codepoints_not_bytes() {
        // "camisón" is 7 codepoints but 8 bytes.
        assert!(verify_spans("camisón", &[span("producto", 0, 7)]).is_ok());
        assert!(verify_spans("camisón", &[span("producto", 0, 8)]).is_err());
    }

    #[test]
    fn test_overlapping_spans_rejected() {
        let fault = verify_spans(
            "dos camisas rojas",
            &[span("cantidad", 0, 3), span("producto", 2, 11)],
        )
        .unwrap_err();
        assert!(matches!(fault, SpanFault::Overlap(_)));
    }

    #[test]
    fn test_adjacent_spans_do_not_overlap() {
        assert!(verify_spans(
            "dos camisas",
            &[span("cantidad", 0, 3), span("producto", 3, 11)],
        )
        .is_ok());
    }

    #[test]
    fn test_overlap_detected_regardless_of_input_order() {
        let fault = verify_spans(
            "dos camisas rojas",
            &[span("producto", 4, 11), span("color", 8, 17)],
        )
        .unwrap_err();
        assert!(matches!(fault, SpanFault::Overlap(_)));
    }
}

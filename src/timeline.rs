use crate::error::ComposeError;
use serde::{Deserialize, Serialize};

/// Default length of the slideshow, regardless of narration length.
pub const DEFAULT_VISUAL_SPAN_SECS: f64 = 60.0;

/// Display window of one image, by position in the image set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualSegment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl VisualSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Display window of one script word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl Caption {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionPlan {
    pub segments: Vec<VisualSegment>,
    pub captions: Vec<Caption>,
}

/// Splits `[0, total)` into `count` equal, contiguous slots.
///
/// Both ends of slot `i` come from the same `i * slot` expression as the
/// neighbouring slot, so boundaries match bit for bit; the final end is pinned
/// to `total`.
fn equal_slots(count: usize, total: f64) -> impl Iterator<Item = (usize, f64, f64)> {
    let slot = total / count as f64;
    (0..count).map(move |i| {
        let start = i as f64 * slot;
        let end = if i + 1 == count {
            total
        } else {
            (i + 1) as f64 * slot
        };
        (i, start, end)
    })
}

impl CompositionPlan {
    /// Lays `image_count` images over `visual_span` seconds and the words over
    /// `narration_duration` seconds.
    pub fn build(
        image_count: usize,
        words: &[String],
        narration_duration: f64,
        visual_span: f64,
    ) -> Result<Self, ComposeError> {
        if image_count == 0 {
            return Err(ComposeError::NoImages);
        }
        if words.is_empty() {
            return Err(ComposeError::NoWords);
        }
        if !narration_duration.is_finite() || narration_duration <= 0.0 {
            return Err(ComposeError::InvalidDuration(narration_duration));
        }
        if !visual_span.is_finite() || visual_span <= 0.0 {
            return Err(ComposeError::InvalidSpan(visual_span));
        }

        let segments = equal_slots(image_count, visual_span)
            .map(|(index, start, end)| VisualSegment { index, start, end })
            .collect();

        let captions = equal_slots(words.len(), narration_duration)
            .map(|(i, start, end)| Caption {
                word: words[i].clone(),
                start,
                end,
            })
            .collect();

        Ok(Self { segments, captions })
    }

    pub fn visual_duration(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    pub fn caption_duration(&self) -> f64 {
        self.captions.last().map(|c| c.end).unwrap_or(0.0)
    }
}

//! Hourly frame alignment between the requested run range and the frames
//! present in the emissions table.

use crate::common::constants::{CONFIG_DATE_FORMAT, CONFIG_DATE_FORMAT_SECONDS, WRF_DATE_FORMAT};
use crate::domain::{AasError, AasResult};
use chrono::{Duration, NaiveDateTime};
use tracing::debug;

const ACCEPTED_FORMATS: [&str; 5] = [
    CONFIG_DATE_FORMAT,
    CONFIG_DATE_FORMAT_SECONDS,
    WRF_DATE_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Hourly timestamps covering `[start, end]` inclusive.
///
/// Returns `None` when `end` precedes `start` or the span is not a whole
/// number of hours.
pub fn hourly_range(start: NaiveDateTime, end: NaiveDateTime) -> Option<Vec<NaiveDateTime>> {
    let span = end.signed_duration_since(start);
    if span < Duration::zero() || span.num_seconds() % 3600 != 0 || span.subsec_nanos() != 0 {
        return None;
    }

    let hours = span.num_hours();
    Some((0..=hours).map(|hour| start + Duration::hours(hour)).collect())
}

/// Table frames selected for the run, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAlignment {
    /// Index into the table's frame list for every output hour.
    pub frame_indices: Vec<usize>,
    pub times: Vec<NaiveDateTime>,
}

impl FrameAlignment {
    pub fn len(&self) -> usize {
        self.frame_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, NaiveDateTime)> + '_ {
        self.frame_indices
            .iter()
            .copied()
            .zip(self.times.iter().copied())
    }
}

pub fn align_frames(
    start: NaiveDateTime,
    end: NaiveDateTime,
    table_times: &[NaiveDateTime],
) -> AasResult<FrameAlignment> {
    let (Some(first), Some(last)) = (table_times.first(), table_times.last()) else {
        return Err(AasError::time_range(
            "TIME.EMPTY",
            "the emissions table contains no frames",
        ));
    };

    if let Some(position) = table_times.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(AasError::time_range(
            "TIME.ORDER",
            format!(
                "table frame {} ({}) does not follow frame {} ({}); \
                 timestamps must be strictly increasing",
                position + 1,
                table_times[position + 1],
                position,
                table_times[position]
            ),
        ));
    }

    if start < *first || end > *last {
        return Err(AasError::time_range(
            "TIME.COVERAGE",
            format!(
                "requested range {} .. {} is outside the table coverage {} .. {}",
                start, end, first, last
            ),
        ));
    }

    let hours = hourly_range(start, end).ok_or_else(|| {
        AasError::time_range(
            "TIME.STEP",
            format!("range {} .. {} is not a whole number of hours", start, end),
        )
    })?;

    let mut frame_indices = Vec::with_capacity(hours.len());
    for hour in &hours {
        let index = table_times.binary_search(hour).map_err(|_| {
            AasError::time_range(
                "TIME.GAP",
                format!("hour {} is missing from the emissions table", hour),
            )
        })?;
        frame_indices.push(index);
    }

    debug!(
        frames = frame_indices.len(),
        first_frame = frame_indices[0],
        "aligned hourly frames"
    );
    Ok(FrameAlignment {
        frame_indices,
        times: hours,
    })
}

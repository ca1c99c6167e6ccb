//! The GDF event table stored after the data records.

use std::io::{Read, Seek};

use log::{debug, warn};

use super::header::FieldReader;
use crate::error::{Result, SigError};

/// One decoded event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GdfEvent {
    /// Zero-based sample index of the onset, in the event table's rate.
    pub position: u64,
    pub event_type: u16,
    /// One-based channel, 0 when the event applies to all channels.
    pub channel: u16,
    /// Duration in samples of the event table's rate.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GdfEventTable {
    /// 1 stores positions and types only, 3 also channels and durations.
    pub mode: u8,
    pub sampling_rate: f32,
    pub events: Vec<GdfEvent>,
}

impl GdfEventTable {
    /// Converts a position or duration from the event rate to `signal_rate`.
    pub fn rescale(&self, samples: u64, signal_rate: f64) -> u64 {
        let rate = self.sampling_rate as f64;
        if rate > 0.0 && rate != signal_rate {
            (samples as f64 * signal_rate / rate).round() as u64
        } else {
            samples
        }
    }
}

/// Reads the event table at `start`. Returns `None` when the file ends
/// before it.
pub(crate) fn read_event_table<R: Read + Seek>(
    reader: &mut FieldReader<'_, R>,
    start: u64,
    file_len: u64,
) -> Result<Option<GdfEventTable>> {
    if start >= file_len {
        debug!("no event table (data ends at {}, file length {})", start, file_len);
        return Ok(None);
    }
    if file_len - start < 8 {
        warn!("ignoring truncated event table header at {}", start);
        return Ok(None);
    }

    reader.seek_to(start)?;

    let mode = reader.u8()?;
    if mode != 1 && mode != 3 {
        return Err(SigError::format(format!("unsupported event table mode {}", mode)));
    }
    let count = reader.u24()? as usize;
    let sampling_rate = reader.f32()?;

    let positions = (0..count).map(|_| reader.u32()).collect::<Result<Vec<_>>>()?;
    let types = (0..count).map(|_| reader.u16()).collect::<Result<Vec<_>>>()?;
    let (channels, durations) = if mode == 3 {
        (
            (0..count).map(|_| reader.u16()).collect::<Result<Vec<_>>>()?,
            (0..count).map(|_| reader.u32()).collect::<Result<Vec<_>>>()?,
        )
    } else {
        (vec![0; count], vec![0; count])
    };

    let events = (0..count)
        .map(|i| GdfEvent {
            // Positions are stored one-based.
            position: u64::from(positions[i].saturating_sub(1)),
            event_type: types[i],
            channel: channels[i],
            duration: durations[i],
        })
        .collect();

    debug!("read {} events (mode {}, {} Hz)", count, mode, sampling_rate);
    Ok(Some(GdfEventTable {
        mode,
        sampling_rate,
        events,
    }))
}

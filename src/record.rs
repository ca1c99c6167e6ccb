//! Record-oriented channel reading shared by the GDF2 and EDF backends.
//!
//! Both formats store data as fixed-size records. Inside a record every
//! channel's block of samples is stored contiguously, one channel after the
//! other.

use std::io::{Read, Seek, SeekFrom};

use log::trace;

use crate::error::{Result, SigError};
use crate::sample::SampleValue;

/// Byte geometry of the data records of one file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordLayout {
    pub start_of_data: u64,
    pub record_bytes: usize,
    pub samples_per_record: usize,
    pub sample_size: usize,
    /// Offset of each channel's block inside a record.
    pub channel_offsets: Vec<usize>,
}

impl RecordLayout {
    /// Layout with every channel block packed back to back.
    ///
    /// Fails when the record size does not fit in memory.
    pub fn packed(
        start_of_data: u64,
        channel_count: usize,
        samples_per_record: usize,
        sample_size: usize,
    ) -> Result<Self> {
        let block = samples_per_record
            .checked_mul(sample_size)
            .and_then(|block| block.checked_mul(channel_count).map(|record| (block, record)));
        let (block, record_bytes) = block.ok_or_else(|| {
            SigError::format(format!(
                "record of {} channels x {} samples is too large",
                channel_count, samples_per_record
            ))
        })?;
        Ok(RecordLayout {
            start_of_data,
            record_bytes,
            samples_per_record,
            sample_size,
            channel_offsets: (0..channel_count).map(|i| i * block).collect(),
        })
    }

    pub fn block_bytes(&self) -> usize {
        self.samples_per_record * self.sample_size
    }
}

/// Scratch space for one record, sized on the first read and reused.
#[derive(Debug, Default)]
pub(crate) struct RecordBuffers {
    raw: Vec<u8>,
    values: Vec<f64>,
}

/// Validates a channel-reader request against the file dimensions.
pub(crate) fn check_request<T>(
    channels: &[&mut [T]],
    channel_count: usize,
    first_sample: u64,
    last_sample: u64,
    samples_recorded: u64,
) -> Result<usize> {
    if first_sample > last_sample {
        return Err(SigError::invalid_argument(format!(
            "first sample {} is after last sample {}",
            first_sample, last_sample
        )));
    }
    if last_sample >= samples_recorded {
        return Err(SigError::OutOfRange {
            first: first_sample,
            last: last_sample,
            samples: samples_recorded,
        });
    }
    if channels.len() != channel_count {
        return Err(SigError::invalid_argument(format!(
            "expected {} channel buffers, got {}",
            channel_count,
            channels.len()
        )));
    }

    let count = usize::try_from(last_sample - first_sample + 1)
        .map_err(|_| SigError::invalid_argument("sample range too large"))?;
    if let Some(i) = channels.iter().position(|c| c.len() < count) {
        return Err(SigError::invalid_argument(format!(
            "buffer of channel {} holds {} samples, {} requested",
            i,
            channels[i].len(),
            count
        )));
    }
    Ok(count)
}

/// Reads samples `[first_sample, last_sample]` of every channel.
///
/// `decode` turns one channel's raw block (file byte order) into
/// `samples_per_record` values; only the requested slice is copied into the
/// channel's buffer. The range must already be validated.
pub(crate) fn read_records<R, T, F>(
    reader: &mut R,
    layout: &RecordLayout,
    buffers: &mut RecordBuffers,
    channels: &mut [&mut [T]],
    first_sample: u64,
    last_sample: u64,
    mut decode: F,
) -> Result<()>
where
    R: Read + Seek,
    T: SampleValue,
    F: FnMut(usize, &mut [u8], &mut [f64]),
{
    let samples_per_record = layout.samples_per_record as u64;
    let total = (last_sample - first_sample + 1) as usize;

    let mut record = first_sample / samples_per_record;
    let offset = layout.start_of_data + record * layout.record_bytes as u64;
    reader.seek(SeekFrom::Start(offset))?;
    trace!(
        "reading samples {}..={} starting at record {} (offset {})",
        first_sample,
        last_sample,
        record,
        offset
    );

    let RecordBuffers { raw, values } = buffers;
    raw.resize(layout.record_bytes, 0);
    values.resize(layout.samples_per_record, 0.0);
    let block_bytes = layout.block_bytes();
    let mut first_to_copy = (first_sample % samples_per_record) as usize;
    let mut written = 0;

    while written < total {
        reader.read_exact(raw.as_mut_slice())?;
        let copy_count = (layout.samples_per_record - first_to_copy).min(total - written);

        for (channel, dest) in channels.iter_mut().enumerate() {
            let start = layout.channel_offsets[channel];
            decode(channel, &mut raw[start..start + block_bytes], values.as_mut_slice());

            let source = &values[first_to_copy..first_to_copy + copy_count];
            for (d, &v) in dest[written..written + copy_count].iter_mut().zip(source) {
                *d = T::from_f64(v);
            }
        }

        written += copy_count;
        first_to_copy = 0;
        record += 1;
    }

    trace!("finished at record {}", record);
    Ok(())
}

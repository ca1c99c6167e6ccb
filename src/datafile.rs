use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{Result, SigError};
use crate::model::{DataModel, Track};
use crate::sample::SampleValue;
use crate::types::ChannelHeader;

/// Operations shared by every recording format.
///
/// Implementors provide the file identity and [`DataFile::read_channels`];
/// the zero-padding [`DataFile::read_signal`] is built on top of it.
///
/// Every channel is assumed to have the same sampling frequency and the same
/// number of recorded samples.
pub trait DataFile {
    fn file_path(&self) -> &Path;

    fn sampling_frequency(&self) -> f64;

    fn channel_count(&self) -> usize;

    /// Number of samples recorded in each channel.
    fn samples_recorded(&self) -> u64;

    /// Start of the recording in seconds since the Unix epoch.
    ///
    /// Formats that store local wall-clock time subtract
    /// `timezone_hours` to get UTC; GDF stores UTC and ignores it.
    fn start_date(&self, timezone_hours: i32) -> i64;

    /// Static attributes of one channel.
    fn channel(&self, channel: usize) -> Result<ChannelHeader>;

    /// Reads samples `[first_sample, last_sample]`, which must lie inside the
    /// recording, into one buffer per channel.
    ///
    /// # Errors
    ///
    /// [`SigError::InvalidArgument`] when the range is reversed or the
    /// buffers don't match the channel count or range length,
    /// [`SigError::OutOfRange`] when `last_sample` is past the end.
    fn read_channels<T: SampleValue>(
        &mut self,
        channels: &mut [&mut [T]],
        first_sample: u64,
        last_sample: u64,
    ) -> Result<()>;

    fn label(&self, channel: usize) -> Result<String> {
        Ok(self.channel(channel)?.label)
    }

    fn physical_minimum(&self, channel: usize) -> Result<f64> {
        Ok(self.channel(channel)?.physical_minimum)
    }

    fn physical_maximum(&self, channel: usize) -> Result<f64> {
        Ok(self.channel(channel)?.physical_maximum)
    }

    fn digital_minimum(&self, channel: usize) -> Result<f64> {
        Ok(self.channel(channel)?.digital_minimum)
    }

    fn digital_maximum(&self, channel: usize) -> Result<f64> {
        Ok(self.channel(channel)?.digital_maximum)
    }

    fn start_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_date(0), 0)
    }

    /// Populates `model` with a default montage of one track per channel.
    fn load(&mut self, model: &mut DataModel) -> Result<()> {
        fill_default_montage(self, model)
    }

    /// Reads samples `[first_sample, last_sample]` of every channel into
    /// `data`, laid out channel after channel.
    ///
    /// The range may extend before the first or past the last recorded
    /// sample; those positions are set to zero. `data` must hold at least
    /// `channel_count * (last_sample - first_sample + 1)` elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sigfile::{DataFile, Gdf2File};
    ///
    /// # sigfile::doctest_utils::create_simple_gdf2_file("padding.gdf")?;
    /// let mut file = Gdf2File::open("padding.gdf", true)?;
    /// let channels = file.channel_count();
    ///
    /// // Ten samples before the recording starts, ten inside it.
    /// let mut data = vec![1.0f64; channels * 20];
    /// file.read_signal(&mut data, -10, 9)?;
    /// assert!(data[..10].iter().all(|&v| v == 0.0));
    /// # std::fs::remove_file("padding.gdf").ok();
    /// # Ok::<(), sigfile::SigError>(())
    /// ```
    fn read_signal<T: SampleValue>(
        &mut self,
        data: &mut [T],
        first_sample: i64,
        last_sample: i64,
    ) -> Result<()> {
        if last_sample < first_sample {
            return Err(SigError::invalid_argument(
                "last sample must be greater than or equal to first sample",
            ));
        }

        let length = last_sample
            .checked_sub(first_sample)
            .and_then(|d| usize::try_from(d).ok())
            .and_then(|d| d.checked_add(1))
            .ok_or_else(|| SigError::invalid_argument("sample range too large"))?;
        let needed = length
            .checked_mul(self.channel_count())
            .ok_or_else(|| SigError::invalid_argument("sample range too large"))?;
        if data.len() < needed {
            return Err(SigError::invalid_argument(format!(
                "output buffer holds {} samples, {} required",
                data.len(),
                needed
            )));
        }

        let mut spans: Vec<&mut [T]> = data[..needed].chunks_mut(length).collect();
        let mut first = first_sample;
        let mut written = 0;

        if first < 0 {
            let n = first.unsigned_abs().min(length as u64) as usize;
            for span in spans.iter_mut() {
                span[..n].fill(T::default());
            }
            written = n;
            first = 0;
        }

        let samples_recorded = i64::try_from(self.samples_recorded()).unwrap_or(i64::MAX);
        let last_in_file = (samples_recorded - 1).min(last_sample);

        if first <= last_in_file {
            let n = (last_in_file - first + 1) as usize;
            let mut window: Vec<&mut [T]> = spans
                .iter_mut()
                .map(|span| &mut span[written..written + n])
                .collect();
            self.read_channels(&mut window, first as u64, last_in_file as u64)?;
            written += n;
        }

        if last_in_file < last_sample {
            let n = ((last_sample - last_in_file) as u64).min((length - written) as u64) as usize;
            for span in spans.iter_mut() {
                span[written..written + n].fill(T::default());
            }
            written += n;
        }

        debug_assert_eq!(written, length);
        Ok(())
    }
}

/// Inserts montage 0 with one track per channel labelled from the header.
pub fn fill_default_montage<F: DataFile + ?Sized>(file: &F, model: &mut DataModel) -> Result<()> {
    let channel_count = file.channel_count();

    model.montages.insert_rows(0, 1);
    let tracks = model.montages.track_table_mut(0);
    tracks.insert_rows(0, channel_count);

    for i in 0..channel_count {
        let track = Track {
            label: file.label(i)?,
            ..tracks.row(i)
        };
        tracks.set_row(i, track);
    }
    Ok(())
}

//! # sigfile
//!
//! Reads multichannel biosignal recordings (EEG, polygraphy) stored as GDF v2,
//! EDF, EDF+C or BDF through one interface.
//!
//! Every format implements [`DataFile`], whose [`DataFile::read_signal`]
//! reads any range of samples of all channels at once. Parts of the range
//! outside the recording are filled with zeros, so a viewer can ask for a
//! window that starts before the recording or runs past its end.
//!
//! ## Quick Start
//!
//! ### Reading a recording
//!
//! ```rust
//! use sigfile::{DataFile, RecordingFile, Result};
//!
//! fn main() -> Result<()> {
//!     # sigfile::doctest_utils::create_simple_gdf2_file("quick_start.gdf")?;
//!     // The format is picked from the extension or the file's magic bytes
//!     let mut file = RecordingFile::open("quick_start.gdf")?;
//!
//!     println!("{} channels, {} Hz", file.channel_count(), file.sampling_frequency());
//!     println!("{} samples per channel", file.samples_recorded());
//!     for i in 0..file.channel_count() {
//!         println!("  {}: {}", i, file.label(i)?);
//!     }
//!
//!     // Two seconds starting one second before the recording
//!     let fs = file.sampling_frequency() as i64;
//!     let length = 2 * fs as usize;
//!     let mut data = vec![0.0f32; file.channel_count() * length];
//!     file.read_signal(&mut data, -fs, fs - 1)?;
//!
//!     // Channel 0 is data[..length], channel 1 data[length..2 * length], ...
//!     assert!(data[..fs as usize].iter().all(|&v| v == 0.0));
//!     # std::fs::remove_file("quick_start.gdf").ok();
//!     Ok(())
//! }
//! ```
//!
//! ### Choosing how to open a file
//!
//! ```rust
//! use sigfile::{DataFile, Endianness, OpenOptions};
//!
//! # sigfile::doctest_utils::create_simple_gdf2_file("raw_values.gdf")?;
//! // Digital values instead of physical units
//! let mut file = OpenOptions::new()
//!     .calibrated(false)
//!     .byte_order(Endianness::Little)
//!     .open("raw_values.gdf")?;
//!
//! let mut data = vec![0.0f64; file.channel_count() * 10];
//! file.read_signal(&mut data, 0, 9)?;
//! assert!(data.iter().all(|v| v.fract() == 0.0));
//! # std::fs::remove_file("raw_values.gdf").ok();
//! # Ok::<(), sigfile::SigError>(())
//! ```
//!
//! ## Events and montages
//!
//! [`DataFile::load`] fills a [`DataModel`] with a default montage of one
//! track per channel. GDF files also contribute their event table.
//!
//! ```rust
//! use sigfile::{DataFile, DataModel, RecordingFile};
//!
//! # sigfile::doctest_utils::create_simple_gdf2_file("model.gdf")?;
//! let mut file = RecordingFile::open("model.gdf")?;
//! let mut model = DataModel::new();
//! file.load(&mut model)?;
//!
//! let tracks = model.montages.track_table(0);
//! assert_eq!(tracks.row_count(), file.channel_count());
//! println!("first track: {}", tracks.row(0).label);
//! # std::fs::remove_file("model.gdf").ok();
//! # Ok::<(), sigfile::SigError>(())
//! ```
//!
//! ## Sharing a file between threads
//!
//! Reads move the file position, so they take `&mut self`. Wrap the handle
//! in a [`std::sync::Mutex`] to share it.

pub mod datafile;
pub mod edf;
pub mod endian;
pub mod error;
pub mod gdf2;
pub mod model;
mod record;
pub mod recording;
pub mod sample;
pub mod types;
pub mod utils;

#[doc(hidden)]
pub mod doctest_utils; // For internal doctest support

// Re-export main types for convenience
pub use datafile::DataFile;
pub use edf::{EdfFile, EdfHeader, SignalParam};
pub use endian::{ByteOrderCorrector, Endianness};
pub use error::{Result, SigError};
pub use gdf2::{Gdf2File, GdfEvent, GdfEventTable};
pub use model::{DataModel, Event, EventType, Montage, Track};
pub use recording::{detect_file_type, OpenOptions, RecordingFile};
pub use sample::{Calibration, SampleValue};
pub use types::{ChannelHeader, DataType, FileType, FixedHeader, VariableHeader};

// Important constants
pub const TIME_DIMENSION: i64 = 10_000_000; // 100 nanoseconds unit
pub const MAX_SIGNALS: usize = 4096;

/// Library version
///
/// Returns the current version of the sigfile library.
///
/// # Examples
///
/// ```rust
/// let version = sigfile::version();
/// assert!(!version.is_empty());
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

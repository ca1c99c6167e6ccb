//! In-memory montage and event tables filled when a recording is loaded.
//!
//! Rows are addressed by index; inserting rows creates them with
//! numbered default values which the loader then overwrites.

#[derive(Debug, Clone, PartialEq)]
pub struct EventType {
    pub id: i32,
    pub name: String,
    pub opacity: f64,
    pub color: [u8; 3],
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub label: String,
    pub event_type: i32,
    /// Sample index of the onset.
    pub position: i64,
    /// Duration in samples.
    pub duration: i64,
    /// Zero-based channel, -1 for all channels, -2 when unassigned.
    pub channel: i32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub label: String,
    pub code: String,
    pub color: [u8; 3],
    pub amplitude: f64,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Montage {
    pub name: String,
    pub save: bool,
}

/// Rows that can be created with a placeholder value for a given index.
pub trait DefaultRow {
    fn default_row(index: usize) -> Self;
}

impl DefaultRow for EventType {
    fn default_row(index: usize) -> Self {
        EventType {
            id: index as i32,
            name: format!("Type {}", index),
            opacity: 0.25,
            color: [255, 0, 0],
            hidden: false,
        }
    }
}

impl DefaultRow for Event {
    fn default_row(index: usize) -> Self {
        Event {
            label: format!("Event {}", index),
            event_type: -1,
            position: 0,
            duration: 1,
            channel: -2,
            description: String::new(),
        }
    }
}

impl DefaultRow for Track {
    fn default_row(index: usize) -> Self {
        Track {
            label: format!("Track {}", index),
            code: format!("out = in({});", index),
            color: [0, 0, 0],
            amplitude: -0.000008,
            hidden: false,
        }
    }
}

impl DefaultRow for Montage {
    fn default_row(index: usize) -> Self {
        Montage {
            name: format!("Montage {}", index),
            save: false,
        }
    }
}

/// An ordered list of rows with insert/remove by index.
///
/// Indices past the end panic, like slice indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table { rows: Vec::new() }
    }
}

impl<T: DefaultRow + Clone> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn insert_rows(&mut self, row: usize, count: usize) {
        let new_rows = (row..row + count).map(T::default_row);
        self.rows.splice(row..row, new_rows);
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        self.rows.drain(row..row + count);
    }

    pub fn row(&self, i: usize) -> T {
        self.rows[i].clone()
    }

    pub fn set_row(&mut self, i: usize, value: T) {
        self.rows[i] = value;
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }
}

pub type EventTypeTable = Table<EventType>;
pub type EventTable = Table<Event>;
pub type TrackTable = Table<Track>;

#[derive(Debug, Clone, PartialEq)]
struct MontageEntry {
    montage: Montage,
    events: EventTable,
    tracks: TrackTable,
}

/// Montages, each owning its own event and track table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MontageTable {
    entries: Vec<MontageEntry>,
}

impl MontageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.entries.len()
    }

    pub fn insert_rows(&mut self, row: usize, count: usize) {
        let new_entries = (row..row + count).map(|i| MontageEntry {
            montage: Montage::default_row(i),
            events: EventTable::new(),
            tracks: TrackTable::new(),
        });
        self.entries.splice(row..row, new_entries);
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        self.entries.drain(row..row + count);
    }

    pub fn row(&self, i: usize) -> Montage {
        self.entries[i].montage.clone()
    }

    pub fn set_row(&mut self, i: usize, value: Montage) {
        self.entries[i].montage = value;
    }

    pub fn event_table(&self, i: usize) -> &EventTable {
        &self.entries[i].events
    }

    pub fn event_table_mut(&mut self, i: usize) -> &mut EventTable {
        &mut self.entries[i].events
    }

    pub fn track_table(&self, i: usize) -> &TrackTable {
        &self.entries[i].tracks
    }

    pub fn track_table_mut(&mut self, i: usize) -> &mut TrackTable {
        &mut self.entries[i].tracks
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataModel {
    pub event_types: EventTypeTable,
    pub montages: MontageTable,
}

impl DataModel {
    pub fn new() -> Self {
        Self::default()
    }
}

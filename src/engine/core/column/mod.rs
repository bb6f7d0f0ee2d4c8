pub mod column_data;
pub mod column_segment;
pub mod compression;
pub mod format;
pub mod segment_codec;
pub mod segment_statistics;
pub mod update_overlay;

pub use column_data::{ColumnData, SegmentConfig};
pub use column_segment::{ColumnSegment, SegmentData};
pub use segment_statistics::{PruneResult, SegmentStatistics};
pub use update_overlay::{UpdateOverlay, UpdateVersion};

#[cfg(test)]
mod column_data_test;
#[cfg(test)]
mod format_test;
#[cfg(test)]
mod segment_codec_test;
#[cfg(test)]
mod segment_statistics_test;

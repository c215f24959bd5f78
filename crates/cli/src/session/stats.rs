//! Drive session statistics.

use std::path::PathBuf;
use std::time::Duration;

use contracts::FrameId;
use observability::SessionStatsAggregator;

/// Statistics from a drive session
#[derive(Debug, Clone, Default)]
pub struct DriveStats {
    /// Frames successfully synchronized
    pub frames_synced: u64,

    /// Rows refused by the recorder (schema mismatch)
    pub rows_rejected: u64,

    /// Last frame the world was stepped to
    pub final_frame: FrameId,

    /// Wall-clock duration of the loop
    pub duration: Duration,

    /// Recording directories opened during the session
    pub recordings: Vec<PathBuf>,

    /// Sync and recorder counters
    pub session: SessionStatsAggregator,
}

impl DriveStats {
    /// Synchronized frames per wall-clock second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_synced as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Throughput: {:.2} frames/s", self.fps());
        println!("Final world frame: {}", self.final_frame);
        if self.rows_rejected > 0 {
            println!("Rows rejected: {}", self.rows_rejected);
        }
        println!();
        print!("{}", self.session.summary());

        if !self.recordings.is_empty() {
            println!("Recordings:");
            for path in &self.recordings {
                println!("  {}", path.display());
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps() {
        let mut stats = DriveStats {
            frames_synced: 50,
            ..Default::default()
        };
        assert_eq!(stats.fps(), 0.0);

        stats.duration = Duration::from_secs(5);
        assert!((stats.fps() - 10.0).abs() < 1e-9);
    }
}

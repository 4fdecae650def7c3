//! Flush timing statistics
//!
//! Each flush is reduced to a [`FlushStat`]. The device may still be busy
//! with the previous update when the next SET_BUFFER arrives, in which case
//! its status read is delayed. An update whose control phase took longer
//! than the wait threshold is considered to have waited: it starts when the
//! device released it, and the previous update ends at that point.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::flush::Flush;
use crate::usbmon::Micros;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlushStat {
    pub ctrl_start: Micros,
    /// End of the status read, or of the control transfer without one
    pub ctrl_end: Micros,
    pub bulk_start: Micros,
    pub bulk_end: Micros,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub len: u32,
    /// 0 when sent uncompressed
    pub len_compressed: u32,
    pub compression: f64,
}

impl From<&Flush> for FlushStat {
    fn from(flush: &Flush) -> Self {
        let h = &flush.header;
        let compression = if !h.compression.is_empty() && h.compressed_length > 0 {
            h.length as f64 / h.compressed_length as f64
        } else {
            1.0
        };
        Self {
            ctrl_start: flush.ctrl.start(),
            ctrl_end: flush.ctrl.end(),
            bulk_start: flush.bulk.start,
            bulk_end: flush.bulk.end,
            x: h.x,
            y: h.y,
            width: h.width,
            height: h.height,
            len: h.length,
            len_compressed: if h.compression.is_empty() {
                0
            } else {
                h.compressed_length
            },
            compression,
        }
    }
}

impl FlushStat {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Bytes on the wire
    pub fn sent(&self) -> u32 {
        if self.len_compressed > 0 {
            self.len_compressed
        } else {
            self.len
        }
    }
}

/// Duration of one update, or of merged partial updates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub width: u32,
    pub height: u32,
    pub duration_ms: f64,
    pub compression: f64,
}

/// Samples sharing an area, labelled with the first one's size
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<Sample>,
}

/// Session totals, present with more than one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub updates: usize,
    pub seconds: f64,
    pub compression: f64,
    /// Uncompressed bytes per second
    pub throughput: f64,
    pub fps: f64,
}

#[derive(Debug, Clone)]
pub struct Stats {
    updates: Vec<FlushStat>,
    wait_threshold: Micros,
}

impl Stats {
    pub fn new(wait_threshold: Duration) -> Self {
        Self {
            updates: Vec::new(),
            wait_threshold: wait_threshold.as_micros() as Micros,
        }
    }

    pub fn add(&mut self, flush: &Flush) {
        self.push(FlushStat::from(flush));
    }

    pub fn push(&mut self, stat: FlushStat) {
        self.updates.push(stat);
    }

    pub fn updates(&self) -> &[FlushStat] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Frame width implied by the updates seen
    pub fn width(&self) -> u32 {
        self.updates.iter().map(|u| u.x + u.width).max().unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.updates.iter().map(|u| u.y + u.height).max().unwrap_or(0)
    }

    fn waited(&self, i: usize) -> bool {
        let u = &self.updates[i];
        u.ctrl_end - u.ctrl_start > self.wait_threshold
    }

    pub fn start(&self, i: usize) -> Micros {
        let u = &self.updates[i];
        if self.waited(i) {
            u.ctrl_end
        } else {
            u.ctrl_start
        }
    }

    pub fn end(&self, i: usize) -> Micros {
        match self.updates.get(i + 1) {
            Some(next) if self.waited(i + 1) => next.ctrl_end,
            _ => self.updates[i].bulk_end,
        }
    }

    fn sample(
        &self,
        first: usize,
        last: usize,
        width: u32,
        height: u32,
        compression: f64,
    ) -> Sample {
        Sample {
            width,
            height,
            duration_ms: (self.end(last) - self.start(first)) as f64 / 1000.0,
            compression,
        }
    }

    pub fn groups(&self) -> Vec<Group> {
        let mut by_area: BTreeMap<u64, Group> = BTreeMap::new();
        for (i, u) in self.updates.iter().enumerate() {
            let sample = self.sample(i, i, u.width, u.height, u.compression);
            by_area
                .entry(u.area())
                .or_insert_with(|| Group {
                    width: u.width,
                    height: u.height,
                    samples: Vec::new(),
                })
                .samples
                .push(sample);
        }
        by_area.into_values().rev().collect()
    }

    /// Full-frame updates, with vertically contiguous full-width partial
    /// updates starting at the top merged into one sample
    pub fn full(&self) -> Vec<Sample> {
        struct Merge {
            first: usize,
            next_y: u32,
            compression: f64,
            count: usize,
        }

        let (width, height) = (self.width(), self.height());
        let mut full = Vec::new();
        let mut merge: Option<Merge> = None;

        for (i, u) in self.updates.iter().enumerate() {
            if u.x == 0 && u.y == 0 && u.width == width && u.height == height {
                full.push(self.sample(i, i, width, height, u.compression));
                merge = None;
                continue;
            }
            if u.x != 0 || u.width != width {
                merge = None;
                continue;
            }

            let current = match merge.take() {
                _ if u.y == 0 => Merge {
                    first: i,
                    next_y: u.height,
                    compression: u.compression,
                    count: 1,
                },
                Some(m) if m.next_y == u.y => Merge {
                    next_y: u.y + u.height,
                    compression: m.compression + u.compression,
                    count: m.count + 1,
                    ..m
                },
                _ => continue,
            };

            if current.count > 1 && current.next_y == height {
                let compression = current.compression / current.count as f64;
                full.push(self.sample(current.first, i, width, height, compression));
            } else {
                merge = Some(current);
            }
        }
        full
    }

    pub fn totals(&self) -> Option<Totals> {
        if self.updates.len() < 2 {
            return None;
        }
        let first = self.updates.first()?;
        let last = self.updates.last()?;

        let seconds = (last.bulk_end - first.ctrl_start) as f64 / 1_000_000.0;
        let total_len: u64 = self.updates.iter().map(|u| u.len as u64).sum();
        let total_sent: u64 = self.updates.iter().map(|u| u.sent() as u64).sum();

        let compression = if total_sent > 0 {
            total_len as f64 / total_sent as f64
        } else {
            1.0
        };
        let (throughput, fps) = if seconds > 0.0 {
            let cpp = first.len as f64 / first.area().max(1) as f64;
            let frame = self.width() as f64 * self.height() as f64 * cpp;
            let fps = if frame > 0.0 {
                total_len as f64 / frame / seconds
            } else {
                0.0
            };
            (total_len as f64 / seconds, fps)
        } else {
            (0.0, 0.0)
        };

        Some(Totals {
            updates: self.updates.len(),
            seconds,
            compression,
            throughput,
            fps,
        })
    }
}

fn summary(
    f: &mut fmt::Formatter<'_>,
    width: u32,
    height: u32,
    samples: &[Sample],
) -> fmt::Result {
    let durations = samples.iter().map(|s| s.duration_ms);
    let min = durations.clone().fold(f64::INFINITY, f64::min);
    let max = durations.clone().fold(f64::NEG_INFINITY, f64::max);
    let avg = durations.sum::<f64>() / samples.len() as f64;
    writeln!(
        f,
        "        {}x{}: {:.1} < {:.1} ms < {:.1} ({})",
        width,
        height,
        min,
        avg,
        max,
        samples.len()
    )
}

pub struct Throughput(pub f64);

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps < 1024.0 {
            write!(f, "{} B/s", bps as u64)
        } else if bps < 1024.0 * 1024.0 {
            write!(f, "{:.1} kB/s", bps / 1024.0)
        } else {
            write!(f, "{:.1} MB/s", bps / 1024.0 / 1024.0)
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<none>");
        }

        writeln!(f, "Statistics:")?;
        writeln!(f, "    Rects:")?;
        for group in self.groups() {
            summary(f, group.width, group.height, &group.samples)?;
        }

        let full = self.full();
        if !full.is_empty() {
            writeln!(f, "    Full:")?;
            summary(f, self.width(), self.height(), &full)?;
        }

        if let Some(totals) = self.totals() {
            writeln!(f, "    Totals ({}):", totals.updates)?;
            writeln!(f, "        time: {:.1} seconds", totals.seconds)?;
            writeln!(f, "        compression: {:.1}", totals.compression)?;
            writeln!(f, "        throughput: {}", Throughput(totals.throughput))?;
            writeln!(f, "        fps={:.1}", totals.fps)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(y: u32, height: u32, t: Micros) -> FlushStat {
        FlushStat {
            ctrl_start: t,
            ctrl_end: t + 500,
            bulk_start: t + 600,
            bulk_end: t + 5_000,
            x: 0,
            y,
            width: 400,
            height,
            len: 400 * height * 2,
            len_compressed: 0,
            compression: 1.0,
        }
    }

    fn stats(updates: impl IntoIterator<Item = FlushStat>) -> Stats {
        let mut stats = Stats::new(Duration::from_millis(1));
        for u in updates {
            stats.push(u);
        }
        stats
    }

    #[test]
    fn test_partials_merge_into_full_frame() {
        let mut a = stat(0, 100, 0);
        let mut b = stat(100, 120, 10_000);
        let mut c = stat(220, 80, 20_000);
        a.compression = 2.0;
        b.compression = 3.0;
        c.compression = 4.0;
        let stats = stats([a, b, c]);

        assert_eq!((stats.width(), stats.height()), (400, 300));
        let full = stats.full();
        assert_eq!(full.len(), 1);
        assert_eq!((full[0].width, full[0].height), (400, 300));
        assert!((full[0].compression - 3.0).abs() < 1e-9);
        // First control start to last bulk end
        assert!((full[0].duration_ms - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_breaks_merge() {
        let stats = stats([stat(0, 100, 0), stat(120, 180, 10_000)]);
        assert!(stats.full().is_empty());
    }

    #[test]
    fn test_full_update_counts_directly() {
        let stats = stats([stat(0, 300, 0), stat(0, 300, 10_000)]);
        assert_eq!(stats.full().len(), 2);
    }

    #[test]
    fn test_wait_adjusts_start_and_end() {
        let first = stat(0, 300, 0);
        let mut second = stat(0, 300, 2_000);
        // Status read held back until 8 ms
        second.ctrl_end = 8_000;
        second.bulk_start = 8_100;
        second.bulk_end = 12_000;
        let stats = stats([first, second]);

        assert_eq!(stats.start(0), 0);
        assert_eq!(stats.end(0), 8_000);
        assert_eq!(stats.start(1), 8_000);
        assert_eq!(stats.end(1), 12_000);
    }

    #[test]
    fn test_wait_threshold_configurable() {
        let mut second = stat(0, 300, 2_000);
        second.ctrl_end = 3_500;
        let mut relaxed = Stats::new(Duration::from_millis(2));
        relaxed.push(stat(0, 300, 0));
        relaxed.push(second);
        assert_eq!(relaxed.start(1), 2_000);
        assert_eq!(relaxed.end(0), 5_000);

        let strict = stats([stat(0, 300, 0), second]);
        assert_eq!(strict.start(1), 3_500);
    }

    #[test]
    fn test_groups_largest_first() {
        let stats = stats([stat(0, 10, 0), stat(0, 300, 10_000), stat(50, 10, 20_000)]);
        let groups = stats.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].width, groups[0].height), (400, 300));
        assert_eq!(groups[1].samples.len(), 2);
    }

    #[test]
    fn test_totals() {
        let mut a = stat(0, 300, 0);
        let mut b = stat(0, 300, 500_000);
        a.len_compressed = a.len / 4;
        b.len_compressed = b.len / 4;
        b.bulk_end = 1_000_000;
        let totals = stats([a, b]).totals().unwrap();

        assert_eq!(totals.updates, 2);
        assert!((totals.seconds - 1.0).abs() < 1e-9);
        assert!((totals.compression - 4.0).abs() < 1e-9);
        assert!((totals.throughput - 480_000.0).abs() < 1e-6);
        assert!((totals.fps - 2.0).abs() < 1e-9);
        assert!(stats([a]).totals().is_none());
    }

    #[test]
    fn test_throughput_units() {
        assert_eq!(Throughput(512.0).to_string(), "512 B/s");
        assert_eq!(Throughput(2048.0).to_string(), "2.0 kB/s");
        assert_eq!(Throughput(3.5 * 1024.0 * 1024.0).to_string(), "3.5 MB/s");
    }

    #[test]
    fn test_report() {
        assert_eq!(Stats::new(Duration::from_millis(1)).to_string(), "<none>");

        let report = stats([stat(0, 300, 0), stat(0, 300, 10_000)]).to_string();
        assert!(report.starts_with("Statistics:\n    Rects:\n        400x300: 5.0 < 5.0 ms < 5.0 (2)\n"));
        assert!(report.contains("    Full:\n"));
        assert!(report.contains("    Totals (2):\n"));
    }
}

/// Depth values at or beyond this limit are ignored by the histogram.
pub const MAX_DEPTH: usize = 10_000;

/// Histogram-equalized lookup from raw depth to display intensity.
///
/// Nearer surfaces map to brighter values so contrast survives scenes where
/// most pixels sit in a narrow depth band.
#[derive(Clone, Debug)]
pub struct DepthHistogram {
    counts: Vec<u64>,
    table: Vec<u8>,
}

impl DepthHistogram {
    pub fn new(max_depth: usize) -> Self {
        let len = max_depth.max(1);
        Self {
            counts: vec![0; len],
            table: vec![0; len],
        }
    }

    /// Rebuilds the table from scratch for one depth buffer.
    pub fn update(&mut self, depth: &[u16]) {
        self.counts.fill(0);
        self.table.fill(0);

        let mut total: u64 = 0;
        for &value in depth {
            let value = value as usize;
            if value == 0 || value >= self.counts.len() {
                continue;
            }
            self.counts[value] += 1;
            total += 1;
        }

        if total == 0 {
            return;
        }

        let mut cumulative: u64 = 0;
        for (value, count) in self.counts.iter().enumerate().skip(1) {
            cumulative += count;
            self.table[value] = (255 - 255 * cumulative / total) as u8;
        }
    }

    pub fn intensity(&self, depth: u16) -> u8 {
        self.table.get(depth as usize).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn table(&self) -> &[u8] {
        &self.table
    }
}

impl Default for DepthHistogram {
    fn default() -> Self {
        Self::new(MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_non_increasing(table: &[u8]) {
        for pair in table[1..].windows(2) {
            assert!(pair[0] >= pair[1], "table increases: {pair:?}");
        }
    }

    #[test]
    fn zero_depth_is_always_dark() {
        let mut hist = DepthHistogram::new(100);
        hist.update(&[0, 0, 10, 20, 30]);
        assert_eq!(hist.intensity(0), 0);
    }

    #[test]
    fn nearest_depth_is_brightest() {
        let mut hist = DepthHistogram::new(100);
        hist.update(&[10, 20, 20, 30, 30, 30, 0]);

        // 1/6, 3/6 and 6/6 of the valid pixels are at or nearer than each depth.
        assert_eq!(hist.intensity(10), (255 - 255u32 / 6) as u8);
        assert_eq!(hist.intensity(20), (255 - 255u32 * 3 / 6) as u8);
        assert_eq!(hist.intensity(30), 0);
        assert!(hist.intensity(10) > hist.intensity(20));
        assert_non_increasing(hist.table());
    }

    #[test]
    fn table_is_monotonic_for_irregular_buffers() {
        let mut hist = DepthHistogram::new(4096);
        let depth: Vec<u16> = (0..5_000u32).map(|i| ((i * 7919) % 4096) as u16).collect();
        hist.update(&depth);
        assert_eq!(hist.intensity(0), 0);
        assert_non_increasing(hist.table());
    }

    #[test]
    fn empty_scene_leaves_table_dark() {
        let mut hist = DepthHistogram::new(64);
        hist.update(&[0; 32]);
        assert!(hist.table().iter().all(|&v| v == 0));
    }

    #[test]
    fn rebuild_discards_previous_frame() {
        let mut hist = DepthHistogram::new(100);
        hist.update(&[50; 10]);
        let first = hist.table().to_vec();
        hist.update(&[10; 10]);
        hist.update(&[50; 10]);
        assert_eq!(hist.table(), first.as_slice());
    }

    #[test]
    fn out_of_range_depth_is_ignored() {
        let mut hist = DepthHistogram::new(16);
        hist.update(&[4, 4, 200]);
        assert_eq!(hist.intensity(4), 0);
        assert_eq!(hist.intensity(200), 0);
        assert_eq!(hist.intensity(3), 255);
    }
}

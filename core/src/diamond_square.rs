use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::heightfield::{HeightEdit, HeightField};

// Inclusive index bounds of the block being refined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRect {
    pub x1: usize,
    pub x2: usize,
    pub y1: usize,
    pub y2: usize,
}

impl IndexRect {
    pub fn full(resolution: usize) -> Self {
        Self {
            x1: 0,
            x2: resolution - 1,
            y1: 0,
            y2: resolution - 1,
        }
    }

    fn contains(&self, col: usize, row: usize) -> bool {
        col >= self.x1 && col <= self.x2 && row >= self.y1 && row <= self.y2
    }
}

// Samples the synthesizer leaves untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMask {
    resolution: usize,
    pinned: Vec<bool>,
}

impl PinMask {
    pub fn none(resolution: usize) -> Self {
        Self {
            resolution,
            pinned: vec![false; resolution * resolution],
        }
    }

    pub fn pin_row(&mut self, row: usize) {
        let start = row * self.resolution;
        self.pinned[start..start + self.resolution].fill(true);
    }

    pub fn pin_column(&mut self, col: usize) {
        for row in 0..self.resolution {
            self.pinned[row * self.resolution + col] = true;
        }
    }

    pub fn is_pinned(&self, col: usize, row: usize) -> bool {
        col < self.resolution && row < self.resolution && self.pinned[row * self.resolution + col]
    }

    pub fn is_empty(&self) -> bool {
        !self.pinned.iter().any(|&p| p)
    }
}

// What one recursion level did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    pub level: usize,
    pub range: f32,
    pub max_perturbation: f32,
    pub writes: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisReport {
    pub levels: Vec<LevelStats>,
}

impl SynthesisReport {
    pub fn writes(&self) -> usize {
        self.levels.iter().map(|l| l.writes).sum()
    }
}

// Diamond-square: offsets uniform in [-range, range], stride and range halve per level.
// Writes off the grid, outside the block or onto pinned samples are skipped.
#[derive(Debug, Clone)]
pub struct FractalSynthesizer {
    seed: u64,
    level: Option<usize>,
    range: f32,
    seed_corners: bool,
}

impl FractalSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            level: None,
            range: 1.0,
            seed_corners: false,
        }
    }

    pub fn with_level(mut self, level: Option<usize>) -> Self {
        self.level = level;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    // Give the outer corners a random start value before the first pass
    pub fn with_corner_seeding(mut self, enabled: bool) -> Self {
        self.seed_corners = enabled;
        self
    }

    // (resolution - 1) rounded down to a power of two
    pub fn initial_level(resolution: usize) -> usize {
        let span = resolution.saturating_sub(1);
        if span == 0 {
            return 0;
        }
        1 << (usize::BITS - 1 - span.leading_zeros())
    }

    pub fn synthesize(&self, field: &mut HeightField) -> SynthesisReport {
        let pins = PinMask::none(field.resolution());
        self.synthesize_pinned(field, &pins)
    }

    pub fn synthesize_pinned(&self, field: &mut HeightField, pins: &PinMask) -> SynthesisReport {
        let resolution = field.resolution();
        let level = self
            .level
            .unwrap_or_else(|| Self::initial_level(resolution));
        self.synthesize_region(field, IndexRect::full(resolution), level, self.range, pins)
    }

    pub fn synthesize_region(
        &self,
        field: &mut HeightField,
        rect: IndexRect,
        level: usize,
        range: f32,
        pins: &PinMask,
    ) -> SynthesisReport {
        let last = field.resolution() - 1;
        let rect = IndexRect {
            x1: rect.x1.min(last),
            x2: rect.x2.min(last),
            y1: rect.y1.min(last),
            y2: rect.y2.min(last),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut report = SynthesisReport::default();
        let mut edit = field.edit();

        if self.seed_corners {
            for &(col, row) in &[
                (rect.x1, rect.y1),
                (rect.x2, rect.y1),
                (rect.x1, rect.y2),
                (rect.x2, rect.y2),
            ] {
                if !pins.is_pinned(col, row) {
                    let v = rng.random_range(-1.0f32..=1.0) * range;
                    edit.set(col as isize, row as isize, v);
                }
            }
        }

        let mut pass = Pass {
            edit: &mut edit,
            rng: &mut rng,
            pins,
            rect,
        };
        pass.diamond_square(level, range, &mut report);
        report
    }
}

struct Pass<'a, 'f> {
    edit: &'a mut HeightEdit<'f>,
    rng: &'a mut ChaCha8Rng,
    pins: &'a PinMask,
    rect: IndexRect,
}

impl Pass<'_, '_> {
    fn diamond_square(&mut self, level: usize, range: f32, report: &mut SynthesisReport) {
        // a stride of 1 has no midpoints left to fill
        if level < 2 {
            return;
        }
        let half = level / 2;
        let rect = self.rect;
        let mut stats = LevelStats {
            level,
            range,
            max_perturbation: 0.0,
            writes: 0,
        };

        // Diamond step: block centres from their four corners
        for y in (rect.y1..rect.y2).step_by(level) {
            for x in (rect.x1..rect.x2).step_by(level) {
                let (xi, yi, l) = (x as isize, y as isize, level as isize);
                let avg = (self.edit.get(xi, yi)
                    + self.edit.get(xi + l, yi)
                    + self.edit.get(xi, yi + l)
                    + self.edit.get(xi + l, yi + l))
                    * 0.25;
                self.displace(x + half, y + half, avg, range, &mut stats);
            }
        }

        // Square step: edge midpoints from the in-block neighbours
        for y in (rect.y1..=rect.y2).step_by(half) {
            let start = if ((y - rect.y1) / half) % 2 == 0 {
                rect.x1 + half
            } else {
                rect.x1
            };
            for x in (start..=rect.x2).step_by(level) {
                let mut sum = 0.0;
                let mut cnt = 0;
                if x >= rect.x1 + half {
                    sum += self.edit.get((x - half) as isize, y as isize);
                    cnt += 1;
                }
                if x + half <= rect.x2 {
                    sum += self.edit.get((x + half) as isize, y as isize);
                    cnt += 1;
                }
                if y >= rect.y1 + half {
                    sum += self.edit.get(x as isize, (y - half) as isize);
                    cnt += 1;
                }
                if y + half <= rect.y2 {
                    sum += self.edit.get(x as isize, (y + half) as isize);
                    cnt += 1;
                }
                if cnt > 0 {
                    self.displace(x, y, sum / cnt as f32, range, &mut stats);
                }
            }
        }

        debug!(
            "diamond-square level {} range {:.3}: {} writes, max offset {:.3}",
            stats.level, stats.range, stats.writes, stats.max_perturbation
        );
        report.levels.push(stats);

        self.diamond_square(half, range * 0.5, report);
    }

    fn displace(&mut self, col: usize, row: usize, avg: f32, range: f32, stats: &mut LevelStats) {
        if !self.rect.contains(col, row) || self.pins.is_pinned(col, row) {
            return;
        }
        let offset = self.rng.random_range(-1.0f32..=1.0) * range;
        if self.edit.set(col as isize, row as isize, avg + offset) {
            stats.writes += 1;
            stats.max_perturbation = stats.max_perturbation.max(offset.abs());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_level_rounds_down() {
        assert_eq!(FractalSynthesizer::initial_level(129), 128);
        assert_eq!(FractalSynthesizer::initial_level(128), 64);
        assert_eq!(FractalSynthesizer::initial_level(3), 2);
        assert_eq!(FractalSynthesizer::initial_level(2), 1);
        assert_eq!(FractalSynthesizer::initial_level(1), 0);
    }

    #[test]
    fn determinism() {
        let mut a = HeightField::new(33, 10.0);
        let mut b = HeightField::new(33, 10.0);
        let mut c = HeightField::new(33, 10.0);
        let synth = FractalSynthesizer::new(42).with_range(5.0);
        synth.synthesize(&mut a);
        synth.synthesize(&mut b);
        FractalSynthesizer::new(43).with_range(5.0).synthesize(&mut c);
        assert_eq!(a.elevations(), b.elevations());
        assert_ne!(a.elevations(), c.elevations());
    }

    #[test]
    fn range_halves_every_level() {
        let mut f = HeightField::new(129, 100.0);
        let report = FractalSynthesizer::new(7)
            .with_range(16.0)
            .with_corner_seeding(true)
            .synthesize(&mut f);

        let levels: Vec<usize> = report.levels.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![128, 64, 32, 16, 8, 4, 2]);
        for pair in report.levels.windows(2) {
            assert_eq!(pair[1].range, pair[0].range * 0.5);
            assert!(pair[1].max_perturbation <= pair[1].range);
        }
        // finer levels have enough samples that their largest offset
        // clears half the range, which the next level can never reach
        for pair in report.levels[1..].windows(2) {
            assert!(pair[1].max_perturbation < pair[0].max_perturbation);
        }
    }

    #[test]
    fn power_of_two_plus_one_fills_every_sample() {
        let mut f = HeightField::new(17, 16.0);
        let report = FractalSynthesizer::new(1)
            .with_range(1.0)
            .with_corner_seeding(true)
            .synthesize(&mut f);
        // every sample except the four seeded corners is written exactly once
        assert_eq!(report.writes(), 17 * 17 - 4);
        assert!(f.elevations().iter().all(|&h| h != 0.0));
    }

    #[test]
    fn odd_resolution_stays_in_bounds() {
        for res in [2usize, 5, 10, 100] {
            let mut f = HeightField::new(res, 1.0);
            let report = FractalSynthesizer::new(3).with_range(2.0).synthesize(&mut f);
            assert!(report.writes() <= res * res);
            assert_eq!(f.elevations().len(), res * res);
        }
    }

    #[test]
    fn pinned_samples_survive() {
        let mut f = HeightField::new(17, 16.0);
        f.edit().fill_with(|col, row| if row == 0 || col == 0 { 3.5 } else { 0.0 });
        let mut pins = PinMask::none(17);
        pins.pin_row(0);
        pins.pin_column(0);

        FractalSynthesizer::new(11)
            .with_range(8.0)
            .with_corner_seeding(true)
            .synthesize_pinned(&mut f, &pins);

        assert!(f.row(0).iter().all(|&h| h == 3.5));
        assert!(f.column(0).iter().all(|&h| h == 3.5));
        assert_ne!(f.sample_elevation(8, 8), 0.0);
    }

    #[test]
    fn region_refinement_leaves_outside_alone() {
        let mut f = HeightField::new(17, 16.0);
        let rect = IndexRect {
            x1: 0,
            x2: 8,
            y1: 0,
            y2: 8,
        };
        FractalSynthesizer::new(5).synthesize_region(&mut f, rect, 8, 4.0, &PinMask::none(17));
        for row in 0..17 {
            for col in 0..17 {
                if col > 8 || row > 8 {
                    assert_eq!(f.sample_elevation(col as isize, row as isize), 0.0);
                }
            }
        }
        assert_ne!(f.sample_elevation(4, 4), 0.0);
    }

    #[test]
    fn synthesis_refreshes_min_max() {
        let mut f = HeightField::new(33, 10.0);
        FractalSynthesizer::new(9).with_range(4.0).synthesize(&mut f);
        let (min, max) = f.min_max();
        assert!(min < max);
        assert!(f.elevations().iter().all(|&h| h >= min && h <= max));
    }
}

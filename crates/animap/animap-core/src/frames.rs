//! Frame-grid math: power-of-two map sizing and per-frame sample times.
//!
//! Map dimensions are quantized to powers of two. Width covers every vertex
//! (`next_power_of_two`), height is the clip's frame estimate snapped to the
//! *closest* power of two, so baked playback speed only approximates the clip's
//! real frame rate when `frame_rate * length` is not itself a power of two.

use crate::config::{FrameRounding, TimeStepping};

/// Smallest power of two >= `n`, or `None` if it does not fit in `usize`.
/// Zero yields `Some(1)`; callers reject empty meshes before asking.
#[inline]
pub fn next_power_of_two(n: usize) -> Option<usize> {
    n.checked_next_power_of_two()
}

/// Power of two closest to `n` by linear distance.
///
/// Exact midpoints round up (24 -> 32, 48 -> 64), matching the host engine's
/// `ClosestPowerOfTwo`. Zero maps to 1 so a clip always yields one frame.
/// Values past `2^31` saturate to `2^31`.
pub fn closest_power_of_two(n: u32) -> u32 {
    if n == 0 {
        return 1;
    }
    let Some(next) = n.checked_next_power_of_two() else {
        return 1 << 31;
    };
    let prev = next >> 1;
    if n - prev < next - n {
        prev
    } else {
        next
    }
}

/// Integer frame estimate for a clip before quantization.
/// Returns `None` for non-finite or negative timing.
pub fn frame_estimate(frame_rate: f32, length: f32, rounding: FrameRounding) -> Option<u32> {
    if !frame_rate.is_finite() || !length.is_finite() || frame_rate < 0.0 || length < 0.0 {
        return None;
    }
    let raw = frame_rate * length;
    if !raw.is_finite() {
        return None;
    }
    // `as` saturates at u32::MAX.
    Some(match rounding {
        FrameRounding::Nearest => raw.round() as u32,
        FrameRounding::Truncate => raw as u32,
    })
}

/// Frame layout for one clip: row count of its map and the time between rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGrid {
    pub frame_count: usize,
    pub per_frame_time: f32,
}

impl FrameGrid {
    /// Build the grid for a clip, or `None` if its timing is unusable.
    pub fn for_clip(length: f32, frame_rate: f32, rounding: FrameRounding) -> Option<Self> {
        let estimate = frame_estimate(frame_rate, length, rounding)?;
        let frame_count = closest_power_of_two(estimate) as usize;
        Some(Self {
            frame_count,
            per_frame_time: length / frame_count as f32,
        })
    }

    /// Sample times for rows `0..frame_count`, first row at t = 0.
    pub fn sample_times(&self, stepping: TimeStepping) -> SampleTimes {
        SampleTimes {
            frame: 0,
            count: self.frame_count,
            per_frame_time: self.per_frame_time,
            accumulated: 0.0,
            stepping,
        }
    }
}

/// Iterator over the sample time of each frame row.
#[derive(Clone, Debug)]
pub struct SampleTimes {
    frame: usize,
    count: usize,
    per_frame_time: f32,
    accumulated: f32,
    stepping: TimeStepping,
}

impl Iterator for SampleTimes {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.frame >= self.count {
            return None;
        }
        let t = match self.stepping {
            TimeStepping::Accumulate => self.accumulated,
            TimeStepping::Multiply => self.frame as f32 * self.per_frame_time,
        };
        self.accumulated += self.per_frame_time;
        self.frame += 1;
        Some(t)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count.saturating_sub(self.frame);
        (left, Some(left))
    }
}

impl ExactSizeIterator for SampleTimes {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_pins_midpoints_upward() {
        assert_eq!(closest_power_of_two(24), 32);
        assert_eq!(closest_power_of_two(48), 64);
        assert_eq!(closest_power_of_two(3), 4);
        assert_eq!(closest_power_of_two(6), 8);
    }

    #[test]
    fn closest_picks_nearer_neighbour() {
        assert_eq!(closest_power_of_two(30), 32);
        assert_eq!(closest_power_of_two(40), 32);
        assert_eq!(closest_power_of_two(5), 4);
        assert_eq!(closest_power_of_two(100), 128);
        assert_eq!(closest_power_of_two(90), 64);
    }

    #[test]
    fn closest_keeps_exact_powers_and_edges() {
        assert_eq!(closest_power_of_two(0), 1);
        assert_eq!(closest_power_of_two(1), 1);
        assert_eq!(closest_power_of_two(8), 8);
        assert_eq!(closest_power_of_two(1 << 31), 1 << 31);
        assert_eq!(closest_power_of_two(u32::MAX), 1 << 31);
    }

    #[test]
    fn next_power_of_two_for_widths() {
        assert_eq!(next_power_of_two(100), Some(128));
        assert_eq!(next_power_of_two(128), Some(128));
        assert_eq!(next_power_of_two(1), Some(1));
        assert_eq!(next_power_of_two(usize::MAX), None);
    }

    #[test]
    fn estimate_rejects_bad_timing() {
        assert_eq!(frame_estimate(f32::NAN, 1.0, FrameRounding::Nearest), None);
        assert_eq!(frame_estimate(30.0, f32::INFINITY, FrameRounding::Nearest), None);
        assert_eq!(frame_estimate(-30.0, 1.0, FrameRounding::Nearest), None);
        assert_eq!(frame_estimate(30.0, -1.0, FrameRounding::Nearest), None);
        assert_eq!(frame_estimate(30.0, 0.0, FrameRounding::Nearest), Some(0));
    }

    #[test]
    fn rounding_modes_can_land_on_different_powers() {
        let nearest = FrameGrid::for_clip(1.0, 23.6, FrameRounding::Nearest).unwrap();
        let truncated = FrameGrid::for_clip(1.0, 23.6, FrameRounding::Truncate).unwrap();
        assert_eq!(nearest.frame_count, 32); // 24 is the 16..32 midpoint
        assert_eq!(truncated.frame_count, 16); // 23 is nearer 16
    }

    #[test]
    fn grid_time_steps() {
        let grid = FrameGrid::for_clip(1.0, 30.0, FrameRounding::Nearest).unwrap();
        assert_eq!(grid.frame_count, 32);
        assert_eq!(grid.per_frame_time, 1.0 / 32.0);

        let grid = FrameGrid::for_clip(2.0, 24.0, FrameRounding::Nearest).unwrap();
        assert_eq!(grid.frame_count, 64);
        assert_eq!(grid.per_frame_time, 2.0 / 64.0);
    }

    #[test]
    fn zero_length_clip_has_single_frame() {
        let grid = FrameGrid::for_clip(0.0, 30.0, FrameRounding::Nearest).unwrap();
        assert_eq!(grid.frame_count, 1);
        let times: Vec<f32> = grid.sample_times(TimeStepping::Accumulate).collect();
        assert_eq!(times, vec![0.0]);
    }

    #[test]
    fn accumulated_times_are_a_running_sum() {
        let grid = FrameGrid {
            frame_count: 16,
            per_frame_time: 0.1,
        };
        let acc: Vec<f32> = grid.sample_times(TimeStepping::Accumulate).collect();
        let mul: Vec<f32> = grid.sample_times(TimeStepping::Multiply).collect();
        assert_eq!(acc.len(), 16);
        assert_eq!(mul.len(), 16);
        assert_eq!(acc[0], 0.0);
        assert_eq!(mul[0], 0.0);

        let mut running = 0.0f32;
        for (i, t) in acc.iter().enumerate() {
            assert_eq!(*t, running, "frame {i}");
            running += 0.1;
        }
        for (i, t) in mul.iter().enumerate() {
            assert_eq!(*t, i as f32 * 0.1f32, "frame {i}");
            assert!((acc[i] - t).abs() < 1e-5);
        }
    }

    #[test]
    fn sample_times_report_exact_len() {
        let grid = FrameGrid {
            frame_count: 8,
            per_frame_time: 0.125,
        };
        let mut it = grid.sample_times(TimeStepping::Multiply);
        assert_eq!(it.len(), 8);
        it.next();
        assert_eq!(it.len(), 7);
    }
}

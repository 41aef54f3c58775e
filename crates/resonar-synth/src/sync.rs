//! Oscillator hard-sync schedule.
//!
//! A sync schedule cycles through up to four attack/phase slots. Slot `k`
//! waits its attack interval, then resets the oscillator to its phase and
//! hands over to the next slot with a non-zero attack. The interval of a slot
//! is
//!
//! ```text
//! (1 - relative_attack_factor * midi / 128) * (attack / 2π) * (samplerate / frequency)
//! ```
//!
//! frames, so `attack` counts radians of the oscillator period and high notes
//! may shorten it. The reset phase is scaled by the sync LFO evaluated at the
//! reset frame.
//!
//! Rendering walks a tick as [`SubSegment`]s that split at every reset and
//! at every buffer boundary. The segments of one tick always partition the
//! tick's frame range exactly.

use std::f64::consts::TAU;

use resonar_core::guard_frequency;
use resonar_core::segment::next_boundary;

use crate::ports::{SYNC_SLOTS, SyncParams};

/// Note-dependent quantities the schedule needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTiming {
    /// MIDI note of the voice
    pub midi: u8,
    /// Oscillator base frequency in Hz
    pub frequency: f64,
    /// Sample rate in Hz
    pub samplerate: f64,
}

impl SyncTiming {
    /// Interval of `slot` in frames, never below one.
    pub fn period(&self, params: &SyncParams, slot: usize) -> f64 {
        let attack = params.slots[slot].attack;
        let relative = 1.0 - params.relative_attack_factor * (f64::from(self.midi) / 128.0);
        let frames =
            relative * (attack / TAU) * (self.samplerate / guard_frequency(self.frequency));
        frames.max(1.0)
    }

    /// Reset phase of `slot` at `frame`, in oscillator cycles.
    pub fn reset_cycles(&self, params: &SyncParams, slot: usize, frame: u64) -> f64 {
        let factor = if params.lfo_frequency > 0.0 {
            params
                .lfo_waveform
                .factor(frame as f64, params.lfo_frequency, self.samplerate)
        } else {
            1.0
        };
        params.slots[slot].phase / TAU * factor
    }
}

/// One contiguous run of frames inside a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubSegment {
    /// Absolute first frame
    pub start: u64,
    /// Frame count, never zero
    pub len: usize,
    /// Phase in cycles to restart the oscillator at before rendering
    pub reset: Option<f64>,
}

fn next_active(params: &SyncParams, after: usize) -> Option<usize> {
    (1..=SYNC_SLOTS)
        .map(|step| (after + step) % SYNC_SLOTS)
        .find(|&slot| params.slots[slot].attack > 0.0)
}

fn first_active(params: &SyncParams) -> Option<usize> {
    (0..SYNC_SLOTS).find(|&slot| params.slots[slot].attack > 0.0)
}

/// Reset state of one oscillator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSchedule {
    slot: usize,
    /// Next reset frame; fractional so periods below a frame accumulate
    next_reset: Option<f64>,
}

impl SyncSchedule {
    /// Creates an idle schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts at note-on: the first active slot starts counting at frame 0.
    pub fn restart(&mut self, params: &SyncParams, timing: &SyncTiming) {
        match first_active(params) {
            Some(slot) => {
                self.slot = slot;
                self.next_reset = Some(timing.period(params, slot));
            }
            None => {
                self.slot = 0;
                self.next_reset = None;
            }
        }
    }

    /// Slot that fires next.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Frame of the next reset.
    pub fn next_reset(&self) -> Option<u64> {
        self.next_reset.map(|at| at.ceil() as u64)
    }

    /// Fires the pending reset at `frame` and schedules the next one.
    fn fire(&mut self, params: &SyncParams, timing: &SyncTiming, frame: u64) -> Option<f64> {
        let at = self.next_reset?;
        let cycles = timing.reset_cycles(params, self.slot, frame);
        match next_active(params, self.slot) {
            Some(slot) => {
                self.slot = slot;
                self.next_reset = Some(at + timing.period(params, slot));
            }
            None => self.next_reset = None,
        }
        Some(cycles)
    }

    /// Moves a schedule that fell behind `frame` forward without firing.
    fn catch_up(&mut self, params: &SyncParams, timing: &SyncTiming, frame: u64) {
        let Some(mut at) = self.next_reset else {
            return;
        };
        let target = frame as f64;
        if at.ceil() >= target {
            return;
        }
        // a slot whose attack dropped to zero is no longer part of the cycle
        if params.slots[self.slot].attack <= 0.0 {
            match next_active(params, self.slot) {
                Some(slot) => self.slot = slot,
                None => {
                    self.next_reset = None;
                    return;
                }
            }
        }

        let cycle: f64 = (0..SYNC_SLOTS)
            .filter(|&slot| params.slots[slot].attack > 0.0)
            .map(|slot| timing.period(params, slot))
            .sum();
        if cycle > 0.0 && target - at > cycle {
            at += ((target - at) / cycle).floor() * cycle;
        }
        while at.ceil() < target {
            match next_active(params, self.slot) {
                Some(slot) => {
                    self.slot = slot;
                    at += timing.period(params, slot);
                }
                None => {
                    self.next_reset = None;
                    return;
                }
            }
        }
        self.next_reset = Some(at);
    }

    /// Splits `[start, start + len)` into sub-segments, firing every reset
    /// that falls inside. With sync disabled the whole range is one segment.
    pub fn segments<'a>(
        &'a mut self,
        params: &'a SyncParams,
        timing: SyncTiming,
        start: u64,
        len: usize,
        buffer_size: usize,
    ) -> SubSegments<'a> {
        if params.enabled {
            self.catch_up(params, &timing, start);
        }
        SubSegments {
            schedule: self,
            params,
            timing,
            pos: start,
            end: start + len as u64,
            buffer_size: buffer_size as u64,
        }
    }
}

/// Iterator returned by [`SyncSchedule::segments`].
#[derive(Debug)]
pub struct SubSegments<'a> {
    schedule: &'a mut SyncSchedule,
    params: &'a SyncParams,
    timing: SyncTiming,
    pos: u64,
    end: u64,
    buffer_size: u64,
}

impl Iterator for SubSegments<'_> {
    type Item = SubSegment;

    fn next(&mut self) -> Option<SubSegment> {
        if self.pos >= self.end {
            return None;
        }
        if !self.params.enabled {
            let segment = SubSegment {
                start: self.pos,
                len: (self.end - self.pos) as usize,
                reset: None,
            };
            self.pos = self.end;
            return Some(segment);
        }

        let mut reset = None;
        while self.schedule.next_reset() == Some(self.pos) {
            reset = self.schedule.fire(self.params, &self.timing, self.pos);
        }

        let mut stop = self.end.min(next_boundary(self.pos, self.buffer_size));
        if let Some(at) = self.schedule.next_reset()
            && at > self.pos
            && at < stop
        {
            stop = at;
        }

        let segment = SubSegment {
            start: self.pos,
            len: (stop - self.pos) as usize,
            reset,
        };
        self.pos = stop;
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SyncSlot;
    use resonar_core::Waveform;

    fn timing() -> SyncTiming {
        // 441 Hz at 44100 Hz: one period is 100 frames
        SyncTiming {
            midi: 0,
            frequency: 441.0,
            samplerate: 44100.0,
        }
    }

    fn params(attacks: [f64; SYNC_SLOTS]) -> SyncParams {
        SyncParams {
            enabled: true,
            slots: attacks.map(|attack| SyncSlot { attack, phase: 0.0 }),
            ..Default::default()
        }
    }

    fn collect(
        schedule: &mut SyncSchedule,
        params: &SyncParams,
        start: u64,
        len: usize,
        buffer_size: usize,
    ) -> Vec<SubSegment> {
        schedule
            .segments(params, timing(), start, len, buffer_size)
            .collect()
    }

    #[test]
    fn test_period_formula() {
        let p = params([TAU, 0.0, 0.0, 0.0]);
        assert!((timing().period(&p, 0) - 100.0).abs() < 1e-9);

        let mut high = timing();
        high.midi = 64;
        let mut p = p;
        p.relative_attack_factor = 1.0;
        assert!((high.period(&p, 0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_is_one_segment() {
        let mut p = params([TAU, 0.0, 0.0, 0.0]);
        p.enabled = false;
        let mut schedule = SyncSchedule::new();
        schedule.restart(&p, &timing());
        let segments = collect(&mut schedule, &p, 0, 256, 256);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len, 256);
    }

    #[test]
    fn test_resets_split_segments() {
        let p = params([TAU, 0.0, 0.0, 0.0]);
        let mut schedule = SyncSchedule::new();
        schedule.restart(&p, &timing());
        let segments = collect(&mut schedule, &p, 0, 256, 256);

        let starts: Vec<u64> = segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 100, 200]);
        assert!(segments[0].reset.is_none());
        assert!(segments[1].reset.is_some());
        assert_eq!(segments.iter().map(|s| s.len).sum::<usize>(), 256);
    }

    #[test]
    fn test_zero_attack_slots_are_skipped() {
        let p = params([0.0, TAU, 0.0, TAU / 2.0]);
        let mut schedule = SyncSchedule::new();
        schedule.restart(&p, &timing());
        assert_eq!(schedule.slot(), 1);
        assert_eq!(schedule.next_reset(), Some(100));

        let segments = collect(&mut schedule, &p, 0, 200, 1024);
        let starts: Vec<u64> = segments.iter().map(|s| s.start).collect();
        // slot 1 fires at 100, slot 3 waits 50, slot 1 waits 100 again
        assert_eq!(starts, vec![0, 100, 150]);
    }

    #[test]
    fn test_all_zero_attacks_never_reset() {
        let p = params([0.0; SYNC_SLOTS]);
        let mut schedule = SyncSchedule::new();
        schedule.restart(&p, &timing());
        let segments = collect(&mut schedule, &p, 0, 512, 128);
        assert!(segments.iter().all(|s| s.reset.is_none()));
        assert_eq!(segments.len(), 4);
    }

    #[test]
    fn test_splits_at_buffer_boundaries() {
        let p = params([TAU * 10.0, 0.0, 0.0, 0.0]);
        let mut schedule = SyncSchedule::new();
        schedule.restart(&p, &timing());
        let segments = collect(&mut schedule, &p, 100, 256, 256);
        assert_eq!(segments[0].start, 100);
        assert_eq!(segments[0].len, 156);
        assert_eq!(segments[1].start, 256);
        assert_eq!(segments[1].len, 100);
    }

    #[test]
    fn test_catch_up_after_gap() {
        let p = params([TAU, 0.0, 0.0, 0.0]);
        let mut schedule = SyncSchedule::new();
        schedule.restart(&p, &timing());
        let segments = collect(&mut schedule, &p, 10_050, 100, 4096);
        assert_eq!(segments[0].start, 10_050);
        assert_eq!(segments[1].start, 10_100);
        assert_eq!(segments.iter().map(|s| s.len).sum::<usize>(), 100);
    }

    #[test]
    fn test_reset_phase_uses_lfo() {
        let mut p = params([TAU, 0.0, 0.0, 0.0]);
        p.slots[0].phase = std::f64::consts::PI;
        assert!((timing().reset_cycles(&p, 0, 77) - 0.5).abs() < 1e-12);

        p.lfo_waveform = Waveform::Square;
        p.lfo_frequency = 1.0;
        // first half of the LFO cycle is +1
        assert!((timing().reset_cycles(&p, 0, 100) - 0.5).abs() < 1e-12);
        assert!((timing().reset_cycles(&p, 0, 30_000) + 0.5).abs() < 1e-12);
    }
}

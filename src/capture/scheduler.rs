//! Sampling scheduler - fixed-rate capture driven by host wall-clock time.

use std::time::Duration;

use super::{FrameSequence, RollingBuffer, sample_frame};
use crate::host::Host;
use crate::schema::ReplayConfig;

/// Fixed-rate timer fed with host timestamps.
///
/// Elapsed time is accumulated and drained in whole intervals, so the tick
/// count over a run equals `elapsed / interval` regardless of how host
/// updates are spaced. At most `max_catch_up` ticks are reported per call;
/// any further backlog is dropped and logged.
#[derive(Debug, Clone)]
pub struct FixedTicker {
    interval: Duration,
    max_catch_up: u32,
    last: Option<Duration>,
    carry: Duration,
    dropped: u64,
}

impl FixedTicker {
    /// Intervals shorter than one nanosecond are raised to one nanosecond.
    pub fn new(interval: Duration, max_catch_up: u32) -> Self {
        Self {
            interval: interval.max(Duration::from_nanos(1)),
            max_catch_up: max_catch_up.max(1),
            last: None,
            carry: Duration::ZERO,
            dropped: 0,
        }
    }

    /// Forget all timing state. The next `advance` ticks immediately.
    pub fn reset(&mut self) {
        self.last = None;
        self.carry = Duration::ZERO;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks dropped because of the catch-up limit since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Feed the current host time; returns the number of ticks due.
    pub fn advance(&mut self, now: Duration) -> u32 {
        let Some(last) = self.last else {
            self.last = Some(now);
            self.carry = Duration::ZERO;
            return 1;
        };
        self.last = Some(now);
        // Host clocks that step backwards contribute nothing.
        self.carry += now.saturating_sub(last);

        let mut ticks = 0;
        while self.carry >= self.interval && ticks < self.max_catch_up {
            self.carry -= self.interval;
            ticks += 1;
        }

        if self.carry >= self.interval {
            let interval = self.interval.as_nanos();
            let backlog = self.carry.as_nanos();
            let skipped = (backlog / interval) as u64;
            self.carry = Duration::from_nanos((backlog % interval) as u64);
            self.dropped += skipped;
            log::debug!("Tick backlog exceeded catch-up limit, dropped {skipped} ticks");
        }

        ticks
    }
}

/// Ticks consumed by one [`SamplingScheduler::advance`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleReport {
    pub session_frames: u32,
    pub buffer_frames: u32,
}

/// Drives the session recording and the always-on rolling buffer.
///
/// Both run on their own [`FixedTicker`] at the recording interval. The
/// scene is sampled once per host update; if catch-up makes several ticks
/// due, the same frame is appended for each of them.
#[derive(Debug, Clone)]
pub struct SamplingScheduler {
    entity_tag: String,
    puck_name: String,
    session_ticker: FixedTicker,
    buffer_ticker: FixedTicker,
    buffer: RollingBuffer,
}

impl SamplingScheduler {
    pub fn new(config: &ReplayConfig) -> Self {
        let interval = config.recording_interval();
        Self {
            entity_tag: config.entity_tag.clone(),
            puck_name: config.puck_name.clone(),
            session_ticker: FixedTicker::new(interval, config.max_catch_up_ticks),
            buffer_ticker: FixedTicker::new(interval, config.max_catch_up_ticks),
            buffer: RollingBuffer::new(config.buffer_capacity()),
        }
    }

    /// Restart the session timer; call when a recording begins.
    pub fn start_session(&mut self) {
        self.session_ticker.reset();
    }

    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    /// Sample the scene if a tick is due.
    ///
    /// `session` is the active recording, `None` when not recording.
    pub fn advance<H: Host>(
        &mut self,
        host: &H,
        now: Duration,
        session: Option<&mut FrameSequence>,
    ) -> SampleReport {
        let buffer_frames = self.buffer_ticker.advance(now);
        let session_frames = match session {
            Some(_) => self.session_ticker.advance(now),
            None => 0,
        };
        if buffer_frames == 0 && session_frames == 0 {
            return SampleReport::default();
        }

        let frame = sample_frame(host, &self.entity_tag, &self.puck_name);
        if let Some(session) = session {
            for _ in 0..session_frames {
                session.push(frame.clone());
            }
        }
        for _ in 0..buffer_frames {
            self.buffer.push(frame.clone());
        }

        SampleReport {
            session_frames,
            buffer_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryHost, Scene};
    use crate::schema::Pose;

    const INTERVAL: Duration = Duration::from_nanos(8_333_333);

    #[test]
    fn test_first_advance_ticks() {
        let mut ticker = FixedTicker::new(INTERVAL, 8);
        assert_eq!(ticker.interval(), INTERVAL);
        assert_eq!(ticker.advance(Duration::from_secs(3)), 1);
        assert_eq!(ticker.advance(Duration::from_secs(3)), 0);
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let mut ticker = FixedTicker::new(Duration::ZERO, 4);
        assert_eq!(ticker.interval(), Duration::from_nanos(1));

        assert_eq!(ticker.advance(Duration::ZERO), 1);
        assert_eq!(ticker.advance(Duration::from_millis(1)), 4);
        assert_eq!(ticker.dropped(), 999_996);
        assert_eq!(ticker.advance(Duration::from_millis(1)), 0);
    }

    #[test]
    fn test_accumulator_does_not_drift() {
        // Host updates every 5ms against an 8.33ms tick: 1200ms -> 144 ticks.
        let mut ticker = FixedTicker::new(INTERVAL, 8);
        let mut ticks = ticker.advance(Duration::ZERO) - 1;
        for step in 1..=240u64 {
            ticks += ticker.advance(Duration::from_millis(step * 5));
        }
        assert_eq!(ticks, 144);
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let mut ticker = FixedTicker::new(INTERVAL, 4);
        ticker.advance(Duration::ZERO);
        assert_eq!(ticker.advance(INTERVAL * 10), 4);
        assert_eq!(ticker.dropped(), 6);
        assert_eq!(ticker.advance(INTERVAL * 11), 1);
    }

    #[test]
    fn test_backwards_clock_is_ignored() {
        let mut ticker = FixedTicker::new(INTERVAL, 8);
        ticker.advance(Duration::from_secs(1));
        assert_eq!(ticker.advance(Duration::from_millis(500)), 0);
    }

    #[test]
    fn test_scheduler_feeds_buffer_without_session() {
        let config = ReplayConfig {
            buffer_duration_secs: 0.05,
            ..Default::default()
        };
        let mut host = MemoryHost::new();
        let p = host.add_player("p", "Player", Pose::default());
        let mut scheduler = SamplingScheduler::new(&config);
        let interval = config.recording_interval();

        for k in 0..20u32 {
            host.set_pose(p, Pose::at(k as f32, 0.0, 0.0));
            let report = scheduler.advance(&host, interval * k, None);
            assert_eq!(report.session_frames, 0);
        }
        assert_eq!(scheduler.buffer().len(), config.buffer_capacity());
        let newest = scheduler.buffer().iter().last().unwrap();
        assert_eq!(newest.entities[0].pose, Pose::at(19.0, 0.0, 0.0));
    }

    #[test]
    fn test_scheduler_feeds_session() {
        let config = ReplayConfig::default();
        let mut host = MemoryHost::new();
        host.add_player("p", "Player", Pose::default());
        let mut scheduler = SamplingScheduler::new(&config);
        let mut session = FrameSequence::new();
        let interval = config.recording_interval();

        scheduler.start_session();
        for k in 0..10u32 {
            scheduler.advance(&host, interval * k, Some(&mut session));
        }
        assert_eq!(session.len(), 10);
        assert_eq!(scheduler.buffer().len(), 10);
    }
}

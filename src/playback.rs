use crate::config::EditorConfig;

/// Most ticks caught up in one update before the timer resynchronises
const MAX_CATCH_UP_TICKS: u32 = 60;

/// Advances the displayed frame at a fixed rate.
///
/// Time is passed in explicitly (seconds, see [`crate::util::time`]) so the
/// scheduler stays deterministic. The repeating interval is created lazily on
/// the first update after play, and torn down whenever the rate or the frame
/// range changes; it is never adjusted in place.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackScheduler {
    fps: u32,
    max_frame: u32,
    looping: bool,
    playing: bool,
    current_frame: u32,
    /// When the next tick is due; `None` while no interval is running
    next_tick: Option<f64>,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(12, 1, true)
    }
}

impl PlaybackScheduler {
    pub fn new(fps: u32, max_frame: u32, looping: bool) -> Self {
        Self {
            fps: fps.max(1),
            max_frame: max_frame.max(1),
            looping,
            playing: false,
            current_frame: 1,
            next_tick: None,
        }
    }

    pub fn from_config(config: &EditorConfig, max_frame: u32) -> Self {
        Self::new(config.fps, max_frame, config.looping)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn max_frame(&self) -> u32 {
        self.max_frame
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Seconds between ticks
    pub fn interval(&self) -> f64 {
        1.0 / self.fps as f64
    }

    pub fn play(&mut self) {
        if !self.playing {
            log::info!("▶ playback at {} fps", self.fps);
            self.playing = true;
            self.next_tick = None;
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            log::info!("⏸ playback paused at frame {}", self.current_frame);
        }
        self.playing = false;
        self.next_tick = None;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn set_fps(&mut self, fps: u32) {
        let fps = fps.max(1);
        if fps != self.fps {
            self.fps = fps;
            self.next_tick = None;
        }
    }

    pub fn set_max_frame(&mut self, max_frame: u32) {
        let max_frame = max_frame.max(1);
        if max_frame != self.max_frame {
            self.max_frame = max_frame;
            self.next_tick = None;
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Jump to `frame` without disturbing the timer phase
    pub fn scrub(&mut self, frame: u32) {
        self.current_frame = frame.clamp(1, self.max_frame);
    }

    /// Advance one frame, wrapping to 1 when looping or stopping at the last frame
    pub fn tick(&mut self) -> u32 {
        if self.current_frame >= self.max_frame {
            if self.looping {
                self.current_frame = 1;
            } else {
                self.current_frame = self.max_frame;
                self.pause();
            }
        } else {
            self.current_frame += 1;
        }
        self.current_frame
    }

    /// Run every tick due at `now`. Returns true if the frame changed.
    pub fn update(&mut self, now: f64) -> bool {
        if !self.playing {
            return false;
        }
        let interval = self.interval();
        let Some(mut due) = self.next_tick else {
            self.next_tick = Some(now + interval);
            return false;
        };

        let start = self.current_frame;
        let mut ticks = 0;
        while self.playing && now >= due {
            self.tick();
            due += interval;
            ticks += 1;
            if ticks >= MAX_CATCH_UP_TICKS {
                log::debug!("playback fell behind, resynchronising");
                due = now + interval;
                break;
            }
        }
        if self.playing {
            self.next_tick = Some(due);
        }
        self.current_frame != start
    }

    /// Seconds until the next tick, for scheduling a repaint
    pub fn time_until_next(&self, now: f64) -> Option<f64> {
        if !self.playing {
            return None;
        }
        Some(self.next_tick.map_or(self.interval(), |due| (due - now).max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_wraps_when_looping() {
        let mut playback = PlaybackScheduler::new(12, 10, true);
        playback.scrub(10);
        assert_eq!(playback.tick(), 1);
    }

    #[test]
    fn test_tick_holds_last_frame_without_loop() {
        let mut playback = PlaybackScheduler::new(12, 10, false);
        playback.play();
        playback.scrub(10);
        assert_eq!(playback.tick(), 10);
        assert!(!playback.is_playing());
    }

    #[test]
    fn test_update_ticks_per_interval() {
        let mut playback = PlaybackScheduler::new(10, 5, true);
        playback.play();
        assert!(!playback.update(0.0));
        assert!(!playback.update(0.05));
        assert!(playback.update(0.1));
        assert_eq!(playback.current_frame(), 2);
        assert!(playback.update(0.31));
        assert_eq!(playback.current_frame(), 4);
    }

    #[test]
    fn test_scrub_keeps_phase() {
        let mut playback = PlaybackScheduler::new(10, 20, true);
        playback.play();
        playback.update(0.0);
        playback.scrub(7);
        assert!(playback.update(0.1));
        assert_eq!(playback.current_frame(), 8);
        playback.scrub(50);
        assert_eq!(playback.current_frame(), 20);
    }

    #[test]
    fn test_fps_change_recreates_interval() {
        let mut playback = PlaybackScheduler::new(10, 20, true);
        playback.play();
        playback.update(0.0);
        playback.set_fps(2);
        assert!(!playback.update(0.1));
        assert!(!playback.update(0.5));
        assert!(playback.update(0.61));
        assert_eq!(playback.current_frame(), 2);
    }

    #[test]
    fn test_paused_never_ticks() {
        let mut playback = PlaybackScheduler::new(10, 20, true);
        assert!(!playback.update(5.0));
        assert_eq!(playback.time_until_next(5.0), None);
    }
}

/// Per-frame effect timing. Periods are frame indices at the nominal tick
/// rate; an effect restart simply re-seats `start_period`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EffectTimer {
    pub cur_period: i64,
    pub start_period: i64,
    pub end_period: i64,
    pub frame_time_ms: i64,
}

impl EffectTimer {
    /// The derived "distance traveled" unit driving all positional math:
    /// elapsed periods scaled by the per-line speed and the frame duration,
    /// normalized by the 50ms nominal tick. Monotonic non-decreasing within
    /// one effect instance.
    pub fn state(&self, speed: i64) -> i64 {
        (self.cur_period - self.start_period) * speed * self.frame_time_ms / 50
    }

    /// Overall effect progress in [0, 1].
    pub fn interval_position(&self) -> f64 {
        let total = self.end_period - self.start_period;
        if total <= 0 {
            return 0.0;
        }
        let elapsed = (self.cur_period - self.start_period) as f64;
        (elapsed / total as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(cur: i64) -> EffectTimer {
        EffectTimer {
            cur_period: cur,
            start_period: 10,
            end_period: 110,
            frame_time_ms: 50,
        }
    }

    #[test]
    fn state_scales_with_speed_and_frame_time() {
        assert_eq!(timer(10).state(10), 0);
        assert_eq!(timer(11).state(10), 10);
        assert_eq!(timer(12).state(5), 10);

        let fast = EffectTimer {
            frame_time_ms: 25,
            ..timer(12)
        };
        assert_eq!(fast.state(10), 10);
    }

    #[test]
    fn interval_position_spans_zero_to_one() {
        assert_eq!(timer(10).interval_position(), 0.0);
        assert_eq!(timer(60).interval_position(), 0.5);
        assert_eq!(timer(110).interval_position(), 1.0);
        assert_eq!(timer(200).interval_position(), 1.0);
    }

    #[test]
    fn degenerate_duration_pins_position_at_zero() {
        let t = EffectTimer {
            end_period: 10,
            ..timer(10)
        };
        assert_eq!(t.interval_position(), 0.0);
    }
}

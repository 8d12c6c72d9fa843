use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::rows::{OffBallRun, PhaseContext, PhaseInterval, PressingAction, SprintEvent};

/// Anything that can be joined to a phase interval: it sits in a match/period
/// and has one representative frame (midpoint for sprints, the event frame
/// for vendor events).
pub trait FrameAnchored {
    fn match_id(&self) -> &str;
    fn period(&self) -> u8;
    fn representative_frame(&self) -> i64;
}

impl FrameAnchored for SprintEvent {
    fn match_id(&self) -> &str {
        &self.match_id
    }
    fn period(&self) -> u8 {
        self.period
    }
    fn representative_frame(&self) -> i64 {
        self.mid_frame
    }
}

impl FrameAnchored for OffBallRun {
    fn match_id(&self) -> &str {
        &self.match_id
    }
    fn period(&self) -> u8 {
        self.period
    }
    fn representative_frame(&self) -> i64 {
        self.frame
    }
}

impl FrameAnchored for PressingAction {
    fn match_id(&self) -> &str {
        &self.match_id
    }
    fn period(&self) -> u8 {
        self.period
    }
    fn representative_frame(&self) -> i64 {
        self.frame
    }
}

/// An event with the tactical context of the phase containing its
/// representative frame. `phase` is None when the frame falls in a coverage
/// gap; the event still counts toward volumes, only phase-conditioned rates
/// skip it.
#[derive(Debug, Clone)]
pub struct Enriched<T> {
    pub event: T,
    pub phase: Option<PhaseContext>,
}

/// Sorted per-(match, period) interval index for point-in-interval lookups.
#[derive(Debug, Clone, Default)]
pub struct PhaseIndex {
    by_match: HashMap<String, HashMap<u8, Vec<PhaseInterval>>>,
}

impl PhaseIndex {
    /// Group intervals by match/period and sort by frame_start. Overlapping
    /// intervals break the single-match guarantee of the join and reject the
    /// whole batch.
    pub fn build(intervals: Vec<PhaseInterval>) -> Result<Self> {
        let mut by_match: HashMap<String, HashMap<u8, Vec<PhaseInterval>>> = HashMap::new();
        for interval in intervals {
            if interval.frame_end < interval.frame_start {
                bail!(
                    "match {} period {}: phase interval ends before it starts ({}..{})",
                    interval.match_id,
                    interval.period,
                    interval.frame_start,
                    interval.frame_end
                );
            }
            by_match
                .entry(interval.match_id.clone())
                .or_default()
                .entry(interval.period)
                .or_default()
                .push(interval);
        }

        for (match_id, periods) in &mut by_match {
            for (period, list) in periods.iter_mut() {
                list.sort_by(|a, b| {
                    a.frame_start
                        .cmp(&b.frame_start)
                        .then(a.frame_end.cmp(&b.frame_end))
                });
                for pair in list.windows(2) {
                    if pair[1].frame_start <= pair[0].frame_end {
                        bail!(
                            "match {match_id} period {period}: overlapping phase intervals \
                             {}..{} and {}..{}",
                            pair[0].frame_start,
                            pair[0].frame_end,
                            pair[1].frame_start,
                            pair[1].frame_end
                        );
                    }
                }
            }
        }

        Ok(Self { by_match })
    }

    pub fn is_empty(&self) -> bool {
        self.by_match.is_empty()
    }

    /// Binary search for the interval containing the event's representative
    /// frame. Non-overlap makes the match unique; a gap returns None.
    pub fn lookup(&self, event: &impl FrameAnchored) -> Option<&PhaseInterval> {
        let list = self
            .by_match
            .get(event.match_id())?
            .get(&event.period())?;
        let frame = event.representative_frame();
        let idx = list.partition_point(|iv| iv.frame_start <= frame);
        if idx == 0 {
            return None;
        }
        let candidate = &list[idx - 1];
        (frame <= candidate.frame_end).then_some(candidate)
    }

    pub fn enrich<T: FrameAnchored>(&self, events: Vec<T>) -> Vec<Enriched<T>> {
        events
            .into_iter()
            .map(|event| {
                let phase = self.lookup(&event).map(PhaseContext::from_interval);
                Enriched { event, phase }
            })
            .collect()
    }
}

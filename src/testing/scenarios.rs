//! Named acoustic scenarios with their expected detector output.
//!
//! Onsets sit 12 ms before a frame boundary (frames end every 32 ms), so a
//! snap's first frame catches the sharp attack. Expected outputs list every
//! non-NONE result with its frame timestamp, for the default tuning.

use std::fmt;
use std::str::FromStr;

use super::signals::Timeline;
use crate::analysis::gesture::SnapResult;

use crate::analysis::gesture::SnapResult::{DoubleSnap, FirstSnap, WaitingDecay};

/// Synthetic recordings exercising each detector behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Silence,
    SingleSnap,
    DoubleSnap,
    NoisyDoubleSnap,
    ShortGap,
    LongGap,
    Cooldown,
    RunningWater,
    DoorSlam,
    Voice,
    BackgroundNoise,
}

impl Scenario {
    pub const ALL: [Scenario; 11] = [
        Scenario::Silence,
        Scenario::SingleSnap,
        Scenario::DoubleSnap,
        Scenario::NoisyDoubleSnap,
        Scenario::ShortGap,
        Scenario::LongGap,
        Scenario::Cooldown,
        Scenario::RunningWater,
        Scenario::DoorSlam,
        Scenario::Voice,
        Scenario::BackgroundNoise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Silence => "silence",
            Scenario::SingleSnap => "single-snap",
            Scenario::DoubleSnap => "double-snap",
            Scenario::NoisyDoubleSnap => "noisy-double-snap",
            Scenario::ShortGap => "short-gap",
            Scenario::LongGap => "long-gap",
            Scenario::Cooldown => "cooldown",
            Scenario::RunningWater => "running-water",
            Scenario::DoorSlam => "door-slam",
            Scenario::Voice => "voice",
            Scenario::BackgroundNoise => "background-noise",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Scenario::Silence => "two seconds of digital silence",
            Scenario::SingleSnap => "one snap at 500 ms",
            Scenario::DoubleSnap => "snaps at 500 ms and 900 ms",
            Scenario::NoisyDoubleSnap => "snaps at 500 ms and 900 ms over white noise",
            Scenario::ShortGap => "snaps at 500 ms and 550 ms",
            Scenario::LongGap => "snaps at 500 ms and 1500 ms",
            Scenario::Cooldown => "snaps at 500, 900, 1300, 1700, 3500 and 3900 ms",
            Scenario::RunningWater => "snap-band hiss from 508 ms for one second",
            Scenario::DoorSlam => "120 Hz thump at 500 ms",
            Scenario::Voice => "250 Hz harmonic voice from 508 ms",
            Scenario::BackgroundNoise => "loud broadband white noise",
        }
    }

    pub fn timeline(self) -> Timeline {
        match self {
            Scenario::Silence => Timeline::new(2_000),
            Scenario::SingleSnap => Timeline::new(2_000).snap(500),
            Scenario::DoubleSnap => Timeline::new(2_000).snaps(&[500, 900]),
            Scenario::NoisyDoubleSnap => Timeline::new(2_000).noise(1_000.0, 42).snaps(&[500, 900]),
            Scenario::ShortGap => Timeline::new(2_000).snaps(&[500, 550]),
            Scenario::LongGap => Timeline::new(3_000).snaps(&[500, 1_500]),
            Scenario::Cooldown => {
                Timeline::new(5_000).snaps(&[500, 900, 1_300, 1_700, 3_500, 3_900])
            }
            Scenario::RunningWater => Timeline::new(2_000).hiss(508, 1_000),
            Scenario::DoorSlam => Timeline::new(2_000).thump(500),
            Scenario::Voice => Timeline::new(2_000).voice(508, 800),
            Scenario::BackgroundNoise => Timeline::new(2_000).noise(20_000.0, 7),
        }
    }

    /// Every non-NONE result, as (frame timestamp ms, result)
    pub fn expected(self) -> &'static [(u64, SnapResult)] {
        const SINGLE: &[(u64, SnapResult)] = &[
            (512, WaitingDecay),
            (544, WaitingDecay),
            (576, WaitingDecay),
            (608, FirstSnap),
        ];
        const DOUBLE: &[(u64, SnapResult)] = &[
            (512, WaitingDecay),
            (544, WaitingDecay),
            (576, WaitingDecay),
            (608, FirstSnap),
            (928, WaitingDecay),
            (960, WaitingDecay),
            (992, WaitingDecay),
            (1_024, DoubleSnap),
        ];
        const LONG_GAP: &[(u64, SnapResult)] = &[
            (512, WaitingDecay),
            (544, WaitingDecay),
            (576, WaitingDecay),
            (608, FirstSnap),
            (1_504, WaitingDecay),
            (1_536, WaitingDecay),
            (1_568, WaitingDecay),
            (1_600, FirstSnap),
        ];
        const COOLDOWN: &[(u64, SnapResult)] = &[
            (512, WaitingDecay),
            (544, WaitingDecay),
            (576, WaitingDecay),
            (608, FirstSnap),
            (928, WaitingDecay),
            (960, WaitingDecay),
            (992, WaitingDecay),
            (1_024, DoubleSnap),
            (3_520, WaitingDecay),
            (3_552, WaitingDecay),
            (3_584, WaitingDecay),
            (3_616, FirstSnap),
            (3_904, WaitingDecay),
            (3_936, WaitingDecay),
            (3_968, WaitingDecay),
            (4_000, DoubleSnap),
        ];
        const WATER: &[(u64, SnapResult)] = &[(512, WaitingDecay), (544, WaitingDecay)];

        match self {
            Scenario::SingleSnap | Scenario::ShortGap => SINGLE,
            Scenario::DoubleSnap | Scenario::NoisyDoubleSnap => DOUBLE,
            Scenario::LongGap => LONG_GAP,
            Scenario::Cooldown => COOLDOWN,
            Scenario::RunningWater => WATER,
            Scenario::Silence | Scenario::DoorSlam | Scenario::Voice | Scenario::BackgroundNoise => {
                &[]
            }
        }
    }

    pub fn expected_double_snaps(self) -> usize {
        self.expected()
            .iter()
            .filter(|(_, result)| *result == DoubleSnap)
            .count()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
                format!("unknown scenario '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

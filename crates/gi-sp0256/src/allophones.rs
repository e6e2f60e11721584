//! SP0256-AL2 allophone set.
//!
//! Durations follow the AL2 datasheet. Formant targets (F1-F3, Hz) are
//! interpolated from `start` to `end` over the segment.

/// How an allophone is excited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Excitation {
    Silence,
    Voiced,
    Noise,
    /// Voiced with a noise component (voiced fricatives).
    Mixed,
    /// Closure of silence, then a burst. `true` for voiced stops.
    Stop(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct Allophone {
    pub name: &'static str,
    pub duration_ms: u16,
    pub excitation: Excitation,
    pub start: [u16; 3],
    pub end: [u16; 3],
}

const fn a(
    name: &'static str,
    duration_ms: u16,
    excitation: Excitation,
    start: [u16; 3],
    end: [u16; 3],
) -> Allophone {
    Allophone {
        name,
        duration_ms,
        excitation,
        start,
        end,
    }
}

use Excitation::{Mixed, Noise, Silence, Stop, Voiced};

const NONE: [u16; 3] = [500, 1500, 2500];
const FRIC: [u16; 3] = [400, 1800, 2700];
const SIB: [u16; 3] = [320, 2400, 3300];
const HUSH: [u16; 3] = [300, 1800, 2500];
const LABIAL: [u16; 3] = [300, 900, 2200];
const ALVEOLAR: [u16; 3] = [300, 1700, 2600];
const VELAR: [u16; 3] = [300, 2000, 2800];

/// Allophones indexed by address `$00-$3F`.
pub static ALLOPHONES: [Allophone; 64] = [
    a("PA1", 10, Silence, NONE, NONE),
    a("PA2", 30, Silence, NONE, NONE),
    a("PA3", 50, Silence, NONE, NONE),
    a("PA4", 100, Silence, NONE, NONE),
    a("PA5", 200, Silence, NONE, NONE),
    a("OY", 420, Voiced, [570, 840, 2410], [300, 2200, 2960]),
    a("AY", 260, Voiced, [730, 1090, 2440], [300, 2200, 2960]),
    a("EH", 70, Voiced, [530, 1840, 2480], [530, 1840, 2480]),
    a("KK3", 120, Stop(false), VELAR, VELAR),
    a("PP", 210, Stop(false), LABIAL, LABIAL),
    a("JH", 140, Mixed, HUSH, [300, 2000, 2600]),
    a("NN1", 140, Voiced, [480, 1340, 2470], [480, 1340, 2470]),
    a("IH", 70, Voiced, [390, 1990, 2550], [390, 1990, 2550]),
    a("TT2", 140, Stop(false), ALVEOLAR, ALVEOLAR),
    a("RR1", 170, Voiced, [310, 1060, 1380], [310, 1060, 1380]),
    a("AX", 70, Voiced, [500, 1500, 2500], [500, 1500, 2500]),
    a("MM", 180, Voiced, [480, 1270, 2130], [480, 1270, 2130]),
    a("TT1", 100, Stop(false), ALVEOLAR, ALVEOLAR),
    a("DH1", 290, Mixed, FRIC, FRIC),
    a("IY", 250, Voiced, [270, 2290, 3010], [270, 2290, 3010]),
    a("EY", 280, Voiced, [530, 1840, 2480], [300, 2200, 2960]),
    a("DD1", 70, Stop(true), ALVEOLAR, ALVEOLAR),
    a("UW1", 100, Voiced, [300, 870, 2240], [300, 870, 2240]),
    a("AO", 100, Voiced, [570, 840, 2410], [570, 840, 2410]),
    a("AA", 100, Voiced, [730, 1090, 2440], [730, 1090, 2440]),
    a("YY2", 180, Voiced, [270, 2290, 3010], [390, 1990, 2550]),
    a("AE", 120, Voiced, [660, 1720, 2410], [660, 1720, 2410]),
    a("HH1", 130, Noise, [500, 1500, 2500], [500, 1500, 2500]),
    a("BB1", 80, Stop(true), LABIAL, LABIAL),
    a("TH", 180, Noise, FRIC, FRIC),
    a("UH", 100, Voiced, [440, 1020, 2240], [440, 1020, 2240]),
    a("UW2", 260, Voiced, [300, 870, 2240], [300, 870, 2240]),
    a("AW", 370, Voiced, [730, 1090, 2440], [300, 870, 2240]),
    a("DD2", 160, Stop(true), ALVEOLAR, ALVEOLAR),
    a("GG3", 140, Stop(true), VELAR, VELAR),
    a("VV", 190, Mixed, LABIAL, LABIAL),
    a("GG1", 80, Stop(true), VELAR, VELAR),
    a("SH", 160, Noise, HUSH, HUSH),
    a("ZH", 190, Mixed, HUSH, HUSH),
    a("RR2", 120, Voiced, [310, 1060, 1380], [310, 1060, 1380]),
    a("FF", 150, Noise, LABIAL, LABIAL),
    a("KK2", 190, Stop(false), VELAR, VELAR),
    a("KK1", 160, Stop(false), VELAR, VELAR),
    a("ZZ", 210, Mixed, SIB, SIB),
    a("NG", 220, Voiced, [480, 2000, 2900], [480, 2000, 2900]),
    a("LL", 110, Voiced, [310, 1050, 2880], [310, 1050, 2880]),
    a("WW", 180, Voiced, [300, 610, 2200], [440, 1020, 2240]),
    a("XR", 360, Voiced, [570, 840, 2410], [490, 1350, 1690]),
    a("WH", 200, Mixed, [300, 610, 2200], [300, 610, 2200]),
    a("YY1", 130, Voiced, [270, 2290, 3010], [390, 1990, 2550]),
    a("CH", 190, Noise, HUSH, HUSH),
    a("ER1", 160, Voiced, [490, 1350, 1690], [490, 1350, 1690]),
    a("ER2", 300, Voiced, [490, 1350, 1690], [490, 1350, 1690]),
    a("OW", 240, Voiced, [570, 840, 2410], [300, 870, 2240]),
    a("DH2", 240, Mixed, FRIC, FRIC),
    a("SS", 90, Noise, SIB, SIB),
    a("NN2", 190, Voiced, [480, 1340, 2470], [480, 1340, 2470]),
    a("HH2", 180, Noise, [500, 1500, 2500], [500, 1500, 2500]),
    a("OR", 330, Voiced, [570, 840, 2410], [490, 1350, 1690]),
    a("AR", 290, Voiced, [730, 1090, 2440], [490, 1350, 1690]),
    a("YR", 350, Voiced, [390, 1990, 2550], [490, 1350, 1690]),
    a("GG2", 40, Stop(true), VELAR, VELAR),
    a("EL", 190, Voiced, [500, 1500, 2500], [310, 1050, 2880]),
    a("BB2", 50, Stop(true), LABIAL, LABIAL),
];

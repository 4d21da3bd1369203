//! Pure scoring of one entity's buffered signals.
//!
//! Everything here depends only on the multiset of signal types, never on
//! their order or payload, so identical buffers always score identically.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use corelib::{Confidence, CorrelatedSpike, Direction, SignalType, SpikeSignal};

/// Pairs of signal types that reinforce each other. Bonuses stack.
const BONUS_PAIRS: [(SignalType, SignalType, u8); 4] = [
    (SignalType::PricePump, SignalType::SocialSpike, 15),
    (SignalType::PricePump, SignalType::LiquidationShort, 20),
    (SignalType::PriceDump, SignalType::LiquidationLong, 20),
    (SignalType::WhaleAccumulation, SignalType::PricePump, 25),
];

pub const MAX_SCORE: u8 = 100;

/// Sum of the bonuses whose two types are both present.
pub fn complementary_bonus(types: &BTreeSet<SignalType>) -> u8 {
    BONUS_PAIRS
        .iter()
        .filter(|(a, b, _)| types.contains(a) && types.contains(b))
        .map(|(_, _, bonus)| *bonus)
        .sum()
}

/// Majority of bullish vs bearish biases.
///
/// A lone neutral signal is NEUTRAL; any tie across two or more signals,
/// all-neutral included, is MIXED.
pub fn direction_of<'a>(signals: impl IntoIterator<Item = &'a SpikeSignal>) -> Direction {
    let (mut total, mut bullish, mut bearish) = (0usize, 0usize, 0usize);

    for s in signals {
        total += 1;
        match s.signal_type.bias() {
            Direction::Bullish => bullish += 1,
            Direction::Bearish => bearish += 1,
            _ => {}
        }
    }

    if total <= 1 && bullish == 0 && bearish == 0 {
        return Direction::Neutral;
    }

    match bullish.cmp(&bearish) {
        Ordering::Greater => Direction::Bullish,
        Ordering::Less => Direction::Bearish,
        Ordering::Equal => Direction::Mixed,
    }
}

/// Scores `primary` together with the other in-window signals of its entity.
pub fn correlate(primary: SpikeSignal, supporting: Vec<SpikeSignal>, now_ms: u64) -> CorrelatedSpike {
    let n = 1 + supporting.len();
    let confidence = Confidence::from_signal_count(n);

    let types: BTreeSet<SignalType> = std::iter::once(&primary)
        .chain(supporting.iter())
        .map(|s| s.signal_type)
        .collect();

    let raw = u16::from(confidence.base_score()) + u16::from(complementary_bonus(&types));
    let score = raw.min(u16::from(MAX_SCORE)) as u8;

    let direction = direction_of(std::iter::once(&primary).chain(supporting.iter()));

    CorrelatedSpike {
        entity_id: primary.entity_id.clone(),
        primary,
        supporting,
        confidence,
        score,
        direction,
        timestamp_ms: now_ms,
    }
}

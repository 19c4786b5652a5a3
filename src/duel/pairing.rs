use std::fmt::Display;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::LeagueMember;

/// A player's in-match side, trimmed and uppercased. Blank means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideLabel(String);

impl SideLabel {
    pub fn new(raw: Option<&str>) -> Self {
        Self(raw.unwrap_or_default().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        !self.0.is_empty()
    }

    /// True only when both sides are known and equal.
    pub fn same_as(&self, other: &SideLabel) -> bool {
        self.is_known() && other.is_known() && self.0 == other.0
    }
}

impl Display for SideLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order-independent identifier for two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey(Uuid, Uuid);

impl PairKey {
    pub fn new(first: Uuid, second: Uuid) -> Self {
        if first <= second {
            Self(first, second)
        } else {
            Self(second, first)
        }
    }
}

impl Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

/// A possible duel between two rated members of the same roster.
#[derive(Debug, Clone)]
pub struct CandidatePair<'a> {
    pub first: &'a LeagueMember,
    pub second: &'a LeagueMember,
    pub rating_diff: f64,
    pub same_side: bool,
    pub key: PairKey,
}

impl<'a> CandidatePair<'a> {
    pub fn new(first: &'a LeagueMember, second: &'a LeagueMember, sides: &SideLookup) -> Self {
        Self {
            first,
            second,
            rating_diff: (first.rating() - second.rating()).abs(),
            same_side: sides.side_of(first.user_id).same_as(&sides.side_of(second.user_id)),
            key: PairKey::new(first.user_id, second.user_id),
        }
    }
}

/// Side labels of a match's confirmed roster, keyed by user.
#[derive(Debug, Default)]
pub struct SideLookup(std::collections::HashMap<Uuid, SideLabel>);

impl SideLookup {
    pub fn new<'s>(entries: impl IntoIterator<Item = (Uuid, Option<&'s str>)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(user_id, side)| (user_id, SideLabel::new(side)))
                .collect(),
        )
    }

    pub fn side_of(&self, user_id: Uuid) -> SideLabel {
        self.0.get(&user_id).cloned().unwrap_or_default()
    }
}

/// Builds every unordered pair of members, keeping the member order within each pair.
pub fn enumerate_candidates<'a>(
    members: &'a [LeagueMember],
    sides: &SideLookup,
) -> Vec<CandidatePair<'a>> {
    let mut candidates = Vec::with_capacity(members.len() * members.len().saturating_sub(1) / 2);
    for (i, first) in members.iter().enumerate() {
        for second in &members[i + 1..] {
            candidates.push(CandidatePair::new(first, second, sides));
        }
    }
    candidates
}

/// Drops the pair that dueled in the league's previous match, then orders the rest
/// from most to least balanced. Pairs with the same difference keep their order.
pub fn rank_candidates<'a>(
    mut candidates: Vec<CandidatePair<'a>>,
    previous: Option<PairKey>,
) -> Vec<CandidatePair<'a>> {
    if let Some(previous) = previous {
        candidates.retain(|c| c.key != previous);
    }
    candidates.sort_by(|a, b| a.rating_diff.total_cmp(&b.rating_diff));
    candidates
}

/// Picks the pool to draw from: cross-side pairs when any exist, otherwise same-side pairs.
pub fn selection_pool<'a, 'c>(ranked: &'c [CandidatePair<'a>]) -> Vec<&'c CandidatePair<'a>> {
    let (same_side, different_side): (Vec<_>, Vec<_>) = ranked.iter().partition(|c| c.same_side);
    if different_side.is_empty() {
        same_side
    } else {
        different_side
    }
}

/// Draws uniformly among the first `cap` entries of the pool.
pub fn draw<'p, 'a, 'c, R: Rng + ?Sized>(
    pool: &'p [&'c CandidatePair<'a>],
    cap: usize,
    rng: &mut R,
) -> Option<&'c CandidatePair<'a>> {
    let end = pool.len().min(cap.max(1));
    pool[..end].choose(rng).copied()
}

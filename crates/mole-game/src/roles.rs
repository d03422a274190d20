//! Role assignment
//!
//! Ids are put in canonical order before shuffling, so a seeded generator
//! yields the same deal no matter how the caller collected the roster.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use mole_core::{PlayerId, Role};

/// Deal roles for one round.
///
/// Exactly `min(spy_count, |players|)` distinct players become spies, chosen
/// uniformly over all subsets of that size; everyone else is a player.
/// Duplicate ids count once. An empty roster yields an empty deal.
pub fn assign<R: Rng + ?Sized>(
    players: &[PlayerId],
    spy_count: u32,
    rng: &mut R,
) -> BTreeMap<PlayerId, Role> {
    let mut order = players.to_vec();
    order.sort();
    order.dedup();
    order.shuffle(rng);

    let spies = (spy_count as usize).min(order.len());
    order
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, if i < spies { Role::Spy } else { Role::Player }))
        .collect()
}

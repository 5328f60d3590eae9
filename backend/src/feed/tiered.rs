use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::Property;

/// Shuffles a page inside each priority tier while keeping the tiers
/// themselves ordered from highest to lowest.
pub fn shuffle_within_tiers<R: Rng + ?Sized>(page: Vec<Property>, rng: &mut R) -> Vec<Property> {
    let mut tiers: BTreeMap<u8, Vec<Property>> = BTreeMap::new();
    for property in page {
        tiers.entry(property.priority_tier).or_default().push(property);
    }

    let mut shuffled = Vec::new();
    for (_, mut group) in tiers.into_iter().rev() {
        group.shuffle(rng);
        shuffled.extend(group);
    }
    shuffled
}

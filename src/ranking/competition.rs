//! Tie-aware competition ranking
//!
//! Equal keys share a rank and the next distinct key is ranked one past the
//! number of entries above it, giving sequences like 1, 1, 3, 4, 4, 4, 7.

use crate::utils::precision_key;

/// Ranks for keys already sorted best first
pub fn ranks_for_sorted<K: PartialEq>(sorted_keys: &[K]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(sorted_keys.len());
    for (position, key) in sorted_keys.iter().enumerate() {
        let rank = match ranks.last() {
            Some(&previous) if sorted_keys[position - 1] == *key => previous,
            _ => position as u32 + 1,
        };
        ranks.push(rank);
    }
    ranks
}

/// Competition ranks of `values`, higher is better, in input order
///
/// Values are compared after rounding to `digits` decimal digits so float
/// noise cannot split a tie.
pub fn competition_ranks(values: &[f64], digits: u32) -> Vec<u32> {
    let keys: Vec<i64> = values.iter().map(|v| precision_key(*v, digits)).collect();

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| keys[*b].cmp(&keys[*a]));

    let sorted_keys: Vec<i64> = order.iter().map(|i| keys[*i]).collect();
    let sorted_ranks = ranks_for_sorted(&sorted_keys);

    let mut ranks = vec![0; values.len()];
    for (index, rank) in order.into_iter().zip(sorted_ranks) {
        ranks[index] = rank;
    }
    ranks
}

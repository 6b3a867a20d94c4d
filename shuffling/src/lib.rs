//! Swap-or-not shuffling used to assign validators to committees and proposer slots.
//!
//! See [`compute_shuffled_index`](https://github.com/ethereum/consensus-specs/blob/86fb82b221474cc89387fa6436806507b3849d88/specs/phase0/beacon-chain.md#compute_shuffled_index).

use core::num::NonZeroU64;

use types::{phase0::primitives::H256, preset::Preset};

const POSITIONS_PER_SOURCE: u64 = 256;

/// Maps a single index through all shuffling rounds.
#[must_use]
pub fn shuffle_single<P: Preset>(mut index: u64, index_count: NonZeroU64, seed: H256) -> u64 {
    assert!(index < index_count.get());

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = compute_pivot(seed, round, index_count);
        let flip = (pivot + index_count.get() - index) % index_count;
        let position = index.max(flip);
        let source = compute_source(seed, round, position / POSITIONS_PER_SOURCE);

        if source_bit(source, position) {
            index = flip;
        }
    }

    index
}

/// Permutes `slice` in place so that `slice[i]` ends up holding the element that was at
/// `shuffle_single(i)`.
///
/// Every round is an involution pairing `i` with `pivot - i`, so applying the rounds in reverse
/// order with pairwise swaps computes the whole permutation with one hash per 256 positions.
pub fn shuffle_slice<P: Preset, T>(slice: &mut [T], seed: H256) {
    let Some(length) = NonZeroU64::new(slice.len() as u64) else {
        return;
    };

    for round in (0..P::SHUFFLE_ROUND_COUNT).rev() {
        let pivot = compute_pivot(seed, round, length);
        let mut cached_source = None;

        for index in 0..length.get() {
            let flip = (pivot + length.get() - index) % length;

            if index >= flip {
                continue;
            }

            let source_index = flip / POSITIONS_PER_SOURCE;

            let source = match cached_source {
                Some((cached_index, source)) if cached_index == source_index => source,
                _ => {
                    let source = compute_source(seed, round, source_index);
                    cached_source = Some((source_index, source));
                    source
                }
            };

            if source_bit(source, flip) {
                slice.swap(to_usize(index), to_usize(flip));
            }
        }
    }
}

fn compute_pivot(seed: H256, round: u8, index_count: NonZeroU64) -> u64 {
    let hash = hashing::hash_256_8(seed, round);
    let mut prefix = [0; size_of::<u64>()];
    prefix.copy_from_slice(&hash[..size_of::<u64>()]);
    u64::from_le_bytes(prefix) % index_count
}

fn compute_source(seed: H256, round: u8, position_window: u64) -> H256 {
    // Truncate to match the behavior of `compute_shuffled_index` in `consensus-specs`.
    #[expect(clippy::cast_possible_truncation)]
    let position_window = position_window as u32;

    hashing::hash_256_8_32(seed, round, position_window)
}

fn source_bit(source: H256, position: u64) -> bool {
    let bit_index = position % POSITIONS_PER_SOURCE;
    let byte = source[to_usize(bit_index / 8)];
    (byte >> (bit_index % 8)) & 1 == 1
}

fn to_usize(index: u64) -> usize {
    index
        .try_into()
        .expect("indices into a slice fit in usize")
}

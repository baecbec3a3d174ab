//! Shard key scheme — arithmetic partition of the id alphabet.
//!
//! A collection's id space is split into `factor` buckets by walking the
//! fixed 64-symbol alphabet in order and cutting a new bucket every
//! `64/factor` characters. No hashing and no stored mapping: the layout is
//! reproducible from the schema alone, so every process reconstructs the
//! same shard set without coordination.

use crate::error::{Result, StoreError};

/// Every character a record-id suffix may start with, in bucket order.
pub const ID_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// The ordered bucket ids for a shard factor. A bucket's id is the exact
/// run of alphabet characters it covers.
pub fn shard_buckets(shard_factor: u32) -> Result<Vec<String>> {
    if shard_factor == 0 || 64 % shard_factor != 0 {
        return Err(StoreError::InvalidShardFactor(shard_factor));
    }
    let chars_per_bucket = (64 / shard_factor) as usize;

    let mut buckets = Vec::with_capacity(shard_factor as usize);
    let mut current = String::with_capacity(chars_per_bucket);
    for (i, c) in ID_ALPHABET.chars().enumerate() {
        current.push(c);
        if (i + 1) % chars_per_bucket == 0 {
            buckets.push(std::mem::take(&mut current));
        }
    }
    Ok(buckets)
}

/// The bucket id covering `leading_char` under the given factor.
pub fn bucket_for(shard_factor: u32, leading_char: char) -> Result<String> {
    shard_buckets(shard_factor)?
        .into_iter()
        .find(|b| b.contains(leading_char))
        .ok_or(StoreError::IdCharOutsideAlphabet(leading_char))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_buckets_partition_alphabet() {
        for factor in [1u32, 2, 4, 8, 16, 32, 64] {
            let buckets = shard_buckets(factor).unwrap();
            assert_eq!(buckets.len(), factor as usize);
            assert_eq!(buckets.concat(), ID_ALPHABET);
            let width = (64 / factor) as usize;
            assert!(buckets.iter().all(|b| b.chars().count() == width));
        }
    }

    #[test]
    fn test_non_divisor_factor_rejected() {
        for factor in [0u32, 3, 6, 10, 63, 65] {
            assert!(matches!(
                shard_buckets(factor).unwrap_err(),
                StoreError::InvalidShardFactor(f) if f == factor
            ));
        }
    }

    #[test]
    fn test_bucket_for_factor_four() {
        // 4-way split: 16 chars per bucket; 'x' lands in the third.
        assert_eq!(bucket_for(4, 'x').unwrap(), "wxyzABCDEFGHIJKL");
        assert_eq!(bucket_for(4, '0').unwrap(), "0123456789abcdef");
        assert_eq!(bucket_for(4, '-').unwrap(), "MNOPQRSTUVWXYZ_-");
    }

    #[test]
    fn test_char_outside_alphabet_rejected() {
        assert!(matches!(
            bucket_for(4, '$').unwrap_err(),
            StoreError::IdCharOutsideAlphabet('$')
        ));
    }

    proptest! {
        /// Every alphabet char falls in exactly one bucket, for every
        /// legal factor.
        #[test]
        fn prop_every_char_in_exactly_one_bucket(
            factor in prop_oneof![Just(1u32), Just(2), Just(4), Just(8), Just(16), Just(32), Just(64)],
            idx in 0usize..64,
        ) {
            let c = ID_ALPHABET.chars().nth(idx).unwrap();
            let buckets = shard_buckets(factor).unwrap();
            let holding: Vec<&String> =
                buckets.iter().filter(|b| b.contains(c)).collect();
            prop_assert_eq!(holding.len(), 1);
            prop_assert_eq!(holding[0], &bucket_for(factor, c).unwrap());
        }
    }
}

//! Session splitter.
//!
//! Turns a required amount of work into session durations that each fall
//! within the session length bounds. Largest chunks come first; a short
//! remainder is topped up by trimming the preceding chunks, latest first.

use crate::error::UnsplittableError;

use super::{hours_to_minutes, minutes_to_hours, MAX_REQUIRED_HOURS};

/// Split `required` minutes into sessions of `min..=max` minutes.
///
/// The result sums exactly to `required` and is non-increasing. A single
/// session shorter than `min` is returned only when `required < min`.
pub fn split_minutes(required: i64, min: i64, max: i64) -> Result<Vec<i64>, UnsplittableError> {
    if required < 0 {
        return Err(UnsplittableError::NegativeHours { minutes: required });
    }
    if min <= 0 || min > max {
        return Err(UnsplittableError::InvalidBounds { min, max });
    }
    let limit = hours_to_minutes(MAX_REQUIRED_HOURS);
    if required > limit {
        return Err(UnsplittableError::QuotaTooLarge {
            minutes: required,
            limit,
        });
    }
    if required == 0 {
        return Ok(Vec::new());
    }
    if required <= max {
        return Ok(vec![required]);
    }

    let count = required / max + i64::from(required % max != 0);
    let mut chunks = vec![max; count as usize];
    let last = required - (count - 1) * max;
    chunks[count as usize - 1] = last;

    if last < min {
        let mut deficit = min - last;
        for i in (0..chunks.len() - 1).rev() {
            let give = deficit.min(chunks[i] - min);
            chunks[i] -= give;
            deficit -= give;
            if deficit == 0 {
                break;
            }
        }
        if deficit > 0 {
            return Err(UnsplittableError::NoValidPartition { required, min, max });
        }
        chunks[count as usize - 1] = min;
    }

    Ok(chunks)
}

/// Hour-based front end of [`split_minutes`].
pub fn split_hours(
    required_hours: f64,
    min_hours: f64,
    max_hours: f64,
) -> Result<Vec<f64>, UnsplittableError> {
    if required_hours < 0.0 {
        return Err(UnsplittableError::NegativeHours {
            minutes: hours_to_minutes(required_hours),
        });
    }
    let chunks = split_minutes(
        hours_to_minutes(required_hours),
        hours_to_minutes(min_hours),
        hours_to_minutes(max_hours),
    )?;
    Ok(chunks.into_iter().map(minutes_to_hours).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIN: i64 = 120;
    const MAX: i64 = 300;

    #[test]
    fn exact_multiple_uses_max_chunks() {
        assert_eq!(split_minutes(600, MIN, MAX).unwrap(), vec![300, 300]);
        assert_eq!(split_hours(25.0, 2.0, 5.0).unwrap(), vec![5.0; 5]);
    }

    #[test]
    fn remainder_within_bounds_is_kept_last() {
        assert_eq!(split_minutes(720, MIN, MAX).unwrap(), vec![300, 300, 120]);
    }

    #[test]
    fn short_remainder_is_topped_up_to_minimum() {
        assert_eq!(split_minutes(400, MIN, MAX).unwrap(), vec![280, 120]);
    }

    #[test]
    fn short_remainder_borrows_from_previous_chunk() {
        // 11h with 2..5h sessions: 5, 5, 1 becomes 5, 4, 2
        assert_eq!(split_hours(11.0, 2.0, 5.0).unwrap(), vec![5.0, 4.0, 2.0]);
    }

    #[test]
    fn requirement_below_minimum_is_one_short_session() {
        assert_eq!(split_hours(1.0, 2.0, 5.0).unwrap(), vec![1.0]);
    }

    #[test]
    fn zero_requirement_yields_no_sessions() {
        assert!(split_minutes(0, MIN, MAX).unwrap().is_empty());
    }

    #[test]
    fn negative_requirement_is_rejected() {
        assert_eq!(
            split_hours(-1.0, 2.0, 5.0),
            Err(UnsplittableError::NegativeHours { minutes: -60 })
        );
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert_eq!(
            split_minutes(600, 300, 120),
            Err(UnsplittableError::InvalidBounds { min: 300, max: 120 })
        );
        assert!(split_minutes(600, 0, 120).is_err());
    }

    #[test]
    fn oversized_quota_is_rejected() {
        assert!(matches!(
            split_hours(f64::INFINITY, 2.0, 5.0),
            Err(UnsplittableError::QuotaTooLarge { .. })
        ));
        assert!(matches!(
            split_hours(1e18, 2.0, 5.0),
            Err(UnsplittableError::QuotaTooLarge { .. })
        ));
        assert!(matches!(
            split_minutes(i64::MAX, 1, 2),
            Err(UnsplittableError::QuotaTooLarge { .. })
        ));
        assert_eq!(split_hours(MAX_REQUIRED_HOURS, 5.0, 5.0).unwrap().len(), 2000);
    }

    #[test]
    fn impossible_partition_is_reported() {
        // 6h cannot be made from 4..5h sessions
        assert_eq!(
            split_hours(6.0, 4.0, 5.0),
            Err(UnsplittableError::NoValidPartition {
                required: 360,
                min: 240,
                max: 300
            })
        );
    }

    proptest! {
        #[test]
        fn chunks_sum_and_respect_bounds(
            required in 0i64..5_000,
            min in 1i64..240,
            extra in 0i64..240,
        ) {
            let max = min + extra;
            match split_minutes(required, min, max) {
                Ok(chunks) => {
                    prop_assert_eq!(chunks.iter().sum::<i64>(), required);
                    prop_assert!(chunks.windows(2).all(|w| w[0] >= w[1]));
                    if required < min {
                        prop_assert!(chunks.len() <= 1);
                    } else {
                        prop_assert!(chunks.iter().all(|c| *c >= min && *c <= max));
                    }
                }
                Err(UnsplittableError::NoValidPartition { .. }) => {
                    // no count of sessions can cover the requirement
                    let feasible = (1..=required / min)
                        .any(|k| k * min <= required && required <= k * max);
                    prop_assert!(!feasible);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }
}

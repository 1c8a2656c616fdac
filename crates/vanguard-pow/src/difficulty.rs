//! Difficulty adjustment.
//!
//! Difficulty tracks the PoW submission rate against the node population.
//! The signal is the delta between submissions and currently admitted
//! nodes; small deltas only move difficulty when the population is on the
//! same side of the expected network size, large deltas move it directly.
//! Every change is clamped to one level per epoch, with a once-a-year
//! extra increment during the network's first decade.

use tracing::debug;

/// Percent change in submissions, relative to the admitted population,
/// below which the delta is considered noise.
pub const POW_CHANGE_PERCENT_TO_ADJ_DIFF: i64 = 3;

/// Hard cap on the per-epoch difficulty movement.
pub const MAX_ADJUST_STEP: i64 = 1;

/// Years during which the annual bonus increment applies.
pub const MAX_INCREASE_DIFFICULTY_YEARS: i64 = 10;

/// Compute the next difficulty level.
///
/// * `adjust_threshold` caps the noise threshold for very large networks.
/// * The annual bonus fires on epochs that are exact multiples of
///   `num_blocks_per_year`, for the first
///   [`MAX_INCREASE_DIFFICULTY_YEARS`] years.
/// * The result never drops below `min_difficulty`.
#[allow(clippy::too_many_arguments)]
pub fn calculate_new_difficulty(
    current_difficulty: u8,
    min_difficulty: u8,
    current_nodes: i64,
    pow_submissions: i64,
    expected_nodes: i64,
    adjust_threshold: u32,
    current_epoch_num: i64,
    num_blocks_per_year: i64,
) -> u8 {
    let mut adjustment: i64 = 0;

    if current_nodes > 0 && current_nodes != pow_submissions {
        let submissions_diff = pow_submissions - current_nodes;

        // Noise threshold, scaled to the population so small networks still
        // react, and capped for very large ones.
        let scaled = current_nodes * POW_CHANGE_PERCENT_TO_ADJ_DIFF;
        let div = scaled / 100;
        let rem = scaled % 100;
        let mut threshold = if (rem > 0 && 100 > 0) || (rem < 0 && 100 < 0) {
            div + 1
        } else {
            div
        };
        if threshold > adjust_threshold as i64 {
            threshold = adjust_threshold as i64;
        }

        if submissions_diff.abs() <= threshold {
            if submissions_diff > 0 && current_nodes > expected_nodes {
                adjustment = 1;
            } else if submissions_diff < 0 && current_nodes < expected_nodes {
                adjustment = -1;
            }
        } else {
            adjustment = submissions_diff / threshold;
        }
    }

    let adjustment = adjustment.clamp(-MAX_ADJUST_STEP, MAX_ADJUST_STEP);
    let mut new_difficulty = current_difficulty as i64 + adjustment;

    if current_epoch_num / num_blocks_per_year <= MAX_INCREASE_DIFFICULTY_YEARS
        && current_epoch_num % num_blocks_per_year == 0
    {
        new_difficulty += 1;
    }

    if new_difficulty < min_difficulty as i64 {
        new_difficulty = min_difficulty as i64;
    }

    debug!(
        current_difficulty,
        new_difficulty, current_nodes, pow_submissions, expected_nodes, "Difficulty retarget"
    );
    new_difficulty.clamp(0, u8::MAX as i64) as u8
}

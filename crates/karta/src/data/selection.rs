//! Weighted selection over probability tables.
//!
//! Two draws are supported. A *mutex* draw picks exactly one entry whose
//! probabilities must add up to one. An *independent* draw includes each
//! entry on its own Bernoulli trial. Both walk entries in declaration order.

use super::error::RandomizationError;
use super::rng::SeededRng;

/// Round a probability total to two decimal places.
#[must_use]
pub fn round_total(total: f64) -> f64 {
    (total * 100.0).round() / 100.0
}

/// Check that every probability lies in `(0, 1]`.
///
/// # Errors
/// Returns [`RandomizationError::InvalidProbability`] for the first value out
/// of range.
pub fn check_probabilities<I>(probabilities: I) -> Result<(), RandomizationError>
where
    I: IntoIterator<Item = f64>,
{
    for probability in probabilities {
        if !(probability > 0.0 && probability <= 1.0) {
            return Err(RandomizationError::InvalidProbability(probability));
        }
    }
    Ok(())
}

/// Check that mutually exclusive probabilities are valid and add up to one.
///
/// # Errors
/// Returns [`RandomizationError`] when a probability is out of range or the
/// rounded total differs from `1.00`.
pub fn check_mutex_total<I>(probabilities: I) -> Result<(), RandomizationError>
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = probabilities.into_iter().collect();
    check_probabilities(values.iter().copied())?;
    let total = round_total(values.iter().sum());
    if (total - 1.0).abs() > f64::EPSILON {
        return Err(RandomizationError::ProbabilityTotal(total));
    }
    Ok(())
}

/// Pick exactly one item by weighted mutex draw.
///
/// Draws `r` uniformly from `[0, 1)` and returns the first item whose
/// half-open cumulative interval contains it. When rounding leaves `r` past
/// the last boundary the final item is returned.
///
/// # Errors
/// Returns [`RandomizationError`] when `items` is empty or the probabilities
/// fail [`check_mutex_total`].
///
/// # Examples
///
/// ```
/// use karta::data::{SeededRng, select_one};
///
/// let rng = SeededRng::with_seed(1);
/// let picked = select_one(&[("a", 0.25), ("b", 0.75)], |e| e.1, &rng).unwrap();
/// assert!(["a", "b"].contains(&picked.0));
/// ```
pub fn select_one<'a, T, F>(
    items: &'a [T],
    probability: F,
    rng: &SeededRng,
) -> Result<&'a T, RandomizationError>
where
    F: Fn(&T) -> f64,
{
    let last = items
        .last()
        .ok_or(RandomizationError::EmptySelection("probability map"))?;
    check_mutex_total(items.iter().map(&probability))?;
    let draw = rng.unit();
    let mut upper = 0.0;
    for item in items {
        upper += probability(item);
        if draw < upper {
            return Ok(item);
        }
    }
    Ok(last)
}

/// Pick every item whose own draw succeeds, preserving declaration order.
///
/// Each item draws `r` uniformly from `[0, 1)` and is included when
/// `r <= probability`; a probability of one always includes the item.
///
/// # Errors
/// Returns [`RandomizationError::InvalidProbability`] when a probability lies
/// outside `(0, 1]`.
pub fn select_independent<'a, T, F>(
    items: &'a [T],
    probability: F,
    rng: &SeededRng,
) -> Result<Vec<&'a T>, RandomizationError>
where
    F: Fn(&T) -> f64,
{
    check_probabilities(items.iter().map(&probability))?;
    Ok(items
        .iter()
        .filter(|item| {
            let p = probability(item);
            p >= 1.0 || rng.unit() <= p
        })
        .collect())
}

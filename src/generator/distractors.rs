use rand::Rng;
use tracing::debug;

/// Candidates tried at one offset width before the width is doubled.
const ATTEMPTS_PER_WIDTH: u32 = 24;
const MAX_WIDENINGS: u32 = 6;

/// Collect three wrong answers that differ from `correct` and from each other.
///
/// `propose` receives a width multiplier (1, 2, 4, ...) to scale its random
/// offset by. If random proposals still stall after the widest range, the
/// remaining slots are filled from `fallback(1)`, `fallback(2)`, ... which must
/// never return `correct` and must be injective.
pub fn collect<R, P, F>(correct: &str, rng: &mut R, mut propose: P, fallback: F) -> [String; 3]
where
    R: Rng + ?Sized,
    P: FnMut(&mut R, i64) -> String,
    F: Fn(i64) -> String,
{
    let mut pool: Vec<String> = Vec::with_capacity(3);
    let mut width = 1;
    let mut widenings = 0;
    let mut attempts = 0;

    while pool.len() < 3 {
        if attempts == ATTEMPTS_PER_WIDTH {
            if widenings == MAX_WIDENINGS {
                break;
            }
            width *= 2;
            widenings += 1;
            attempts = 0;
            debug!(correct, width, "widening distractor offset range");
        }
        attempts += 1;
        let candidate = propose(rng, width);
        if candidate != correct && !pool.contains(&candidate) {
            pool.push(candidate);
        }
    }

    let mut step = 1;
    while pool.len() < 3 {
        let candidate = fallback(step);
        step += 1;
        if candidate != correct && !pool.contains(&candidate) {
            pool.push(candidate);
        }
    }

    let mut slots = pool.into_iter();
    [
        slots.next().unwrap_or_default(),
        slots.next().unwrap_or_default(),
        slots.next().unwrap_or_default(),
    ]
}

/// Random sign times a magnitude in `low..=high * width`.
pub fn signed_offset<R: Rng + ?Sized>(rng: &mut R, low: i64, high: i64, width: i64) -> i64 {
    let magnitude = rng.gen_range(low..=high * width);
    if rng.gen_bool(0.5) { magnitude } else { -magnitude }
}

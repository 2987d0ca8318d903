use rand::Rng;

use crate::generator::distractors;
use crate::generator::format;
use crate::generator::{QuestionBody, QuestionSpec, Statement, Topic, Triangle, UNKNOWN_MARKER};

/// Angle used by every trig-ratio question, in degrees.
pub const RATIO_ANGLE_DEG: f64 = 40.0;

/// Two sides where the second is at least 1.1x the first (rounded up), so a
/// hypotenuse built from them always leaves a real third side.
fn side_pair<R: Rng + ?Sized>(rng: &mut R) -> (i64, i64) {
    let shorter: i64 = rng.gen_range(2..=12);
    let min_longer = (shorter as f64 * 1.1).ceil() as i64;
    let longer = rng.gen_range(min_longer..=min_longer + 3);
    (shorter, longer)
}

fn unknown() -> Option<String> {
    Some(UNKNOWN_MARKER.to_string())
}

fn side(n: i64) -> Option<String> {
    Some(format::length(n as f64))
}

/// Positive-only offsets, whole for whole answers and fractional otherwise.
fn measurement_distractors<R, F>(answer: f64, correct: &str, rng: &mut R, render: F) -> [String; 3]
where
    R: Rng + ?Sized,
    F: Fn(f64) -> String,
{
    let whole = answer.fract() == 0.0;
    distractors::collect(
        correct,
        rng,
        |rng, width| {
            let offset = if whole {
                rng.gen_range(1..=6 * width) as f64
            } else {
                rng.gen_range(1.0..6.0 * width as f64)
            };
            render(answer + offset)
        },
        |k| render(answer + k as f64),
    )
}

fn find_length(side_name: &str) -> Statement {
    Statement::Lines(["Find the length".to_string(), format!("of the {side_name}:")])
}

/// Easy: area of a right triangle from its two legs.
pub fn triangle_area<R: Rng + ?Sized>(rng: &mut R) -> QuestionSpec {
    let (a, b) = side_pair(rng);
    let answer = (a * b) as f64 / 2.0;
    let correct = format::area(answer);
    let distractors = measurement_distractors(answer, &correct, rng, format::area);

    QuestionSpec {
        topic: Topic::Trigonometry,
        title: "Area of Triangles".to_string(),
        statement: Statement::Lines(["Find the area".to_string(), "of the triangle:".to_string()]),
        body: QuestionBody::Triangle(Triangle {
            hypotenuse: None,
            opposite: side(a),
            adjacent: side(b),
            angle: None,
        }),
        correct_answer: correct,
        distractors,
    }
}

/// Medium: Pythagorean theorem, solving for the hypotenuse or either leg.
pub fn pythagorean<R: Rng + ?Sized>(rng: &mut R) -> QuestionSpec {
    let (short, long) = side_pair(rng);
    let (side_name, triangle, answer) = match rng.gen_range(0..3) {
        0 => (
            "hypotenuse",
            Triangle {
                hypotenuse: unknown(),
                opposite: side(short),
                adjacent: side(long),
                angle: None,
            },
            ((short * short + long * long) as f64).sqrt(),
        ),
        1 => (
            "adjacent",
            Triangle {
                hypotenuse: side(long),
                opposite: side(short),
                adjacent: unknown(),
                angle: None,
            },
            ((long * long - short * short) as f64).sqrt(),
        ),
        _ => (
            "opposite",
            Triangle {
                hypotenuse: side(long),
                opposite: unknown(),
                adjacent: side(short),
                angle: None,
            },
            ((long * long - short * short) as f64).sqrt(),
        ),
    };
    let correct = format::length(answer);
    let distractors = measurement_distractors(answer, &correct, rng, format::length);

    QuestionSpec {
        topic: Topic::Trigonometry,
        title: "Pythagorean Theorem".to_string(),
        statement: find_length(side_name),
        body: QuestionBody::Triangle(triangle),
        correct_answer: correct,
        distractors,
    }
}

/// Hard: sin/cos/tan at a fixed 40 degree angle.
pub fn trig_ratio<R: Rng + ?Sized>(rng: &mut R) -> QuestionSpec {
    let angle = RATIO_ANGLE_DEG.to_radians();
    let angle_label = Some(format!("{}\u{00b0}", RATIO_ANGLE_DEG as i64));
    let (side_name, triangle, answer) = match rng.gen_range(0..3) {
        0 => {
            let hyp: i64 = rng.gen_range(6..=24);
            (
                "opposite",
                Triangle {
                    hypotenuse: side(hyp),
                    opposite: unknown(),
                    adjacent: None,
                    angle: angle_label,
                },
                hyp as f64 * angle.sin(),
            )
        }
        1 => {
            let adj: i64 = rng.gen_range(4..=16);
            (
                "hypotenuse",
                Triangle {
                    hypotenuse: unknown(),
                    opposite: None,
                    adjacent: side(adj),
                    angle: angle_label,
                },
                adj as f64 / angle.cos(),
            )
        }
        _ => {
            let opp: i64 = rng.gen_range(4..=16);
            (
                "adjacent",
                Triangle {
                    hypotenuse: None,
                    opposite: side(opp),
                    adjacent: unknown(),
                    angle: angle_label,
                },
                opp as f64 / angle.tan(),
            )
        }
    };
    let correct = format::length(answer);
    let distractors = measurement_distractors(answer, &correct, rng, format::length);

    QuestionSpec {
        topic: Topic::Trigonometry,
        title: "Trigonometric Ratios".to_string(),
        statement: find_length(side_name),
        body: QuestionBody::Triangle(triangle),
        correct_answer: correct,
        distractors,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn cm(slot: &Option<String>) -> f64 {
        slot.as_deref()
            .and_then(|s| s.strip_suffix(" cm"))
            .and_then(|n| n.parse().ok())
            .expect("side in cm")
    }

    fn triangle(q: &QuestionSpec) -> &Triangle {
        match &q.body {
            QuestionBody::Triangle(t) => t,
            other => panic!("expected triangle body, got {other:?}"),
        }
    }

    #[test]
    fn test_side_pair_keeps_third_side_real() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..500 {
            let (short, long) = side_pair(&mut rng);
            assert!(long as f64 >= short as f64 * 1.1);
            assert!(long > short);
        }
    }

    #[test]
    fn test_pythagorean_unknown_matches_statement() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..100 {
            let q = pythagorean(&mut rng);
            let t = triangle(&q);
            let unknown = t.unknown_slot().expect("one unknown side");
            assert_eq!(q.statement.lines()[1], format!("of the {unknown}:"));
            let expected = match unknown {
                "hypotenuse" => (cm(&t.opposite).powi(2) + cm(&t.adjacent).powi(2)).sqrt(),
                "adjacent" => (cm(&t.hypotenuse).powi(2) - cm(&t.opposite).powi(2)).sqrt(),
                _ => (cm(&t.hypotenuse).powi(2) - cm(&t.adjacent).powi(2)).sqrt(),
            };
            assert_eq!(q.correct_answer, format::length(expected));
        }
    }

    #[test]
    fn test_area_is_half_product_of_legs() {
        let mut rng = SmallRng::seed_from_u64(8);
        for _ in 0..50 {
            let q = triangle_area(&mut rng);
            let t = triangle(&q);
            assert!(t.unknown_slot().is_none());
            let expected = cm(&t.opposite) * cm(&t.adjacent) / 2.0;
            assert_eq!(q.correct_answer, format::area(expected));
        }
    }

    #[test]
    fn test_trig_ratio_uses_fixed_angle() {
        let mut rng = SmallRng::seed_from_u64(12);
        for _ in 0..50 {
            let q = trig_ratio(&mut rng);
            let t = triangle(&q);
            assert_eq!(t.angle.as_deref(), Some("40\u{00b0}"));
            assert!(t.unknown_slot().is_some());
            assert!(q.correct_answer.ends_with(" cm"));
        }
    }
}

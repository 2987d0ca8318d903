use rand::Rng;
use rand::seq::SliceRandom;

use crate::generator::distractors::{self, signed_offset};
use crate::generator::format;
use crate::generator::{QuestionBody, QuestionSpec, Statement, Topic};

const LETTERS: [&str; 8] = ["x", "y", "z", "a", "b", "c", "m", "n"];

fn pick_letter<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    LETTERS.choose(rng).copied().unwrap_or("x")
}

fn signed_magnitude<R: Rng + ?Sized>(rng: &mut R, max: i64) -> i64 {
    signed_offset(rng, 1, max, 1)
}

/// Easy: collect three like terms, all added or all subtracted from the first.
pub fn like_terms<R: Rng + ?Sized>(rng: &mut R) -> QuestionSpec {
    let letter = pick_letter(rng);
    let subtract = rng.gen_bool(0.5);
    let n1: i64 = rng.gen_range(1..=12);
    let n2: i64 = rng.gen_range(1..=12);
    let n3: i64 = rng.gen_range(1..=12);

    let op = if subtract { "-" } else { "+" };
    let body = format!(
        "{} {op} {} {op} {} = ?",
        format::implied_coefficient(n1, letter),
        format::implied_coefficient(n2, letter),
        format::implied_coefficient(n3, letter),
    );
    let answer = if subtract { n1 - n2 - n3 } else { n1 + n2 + n3 };
    let correct = format::single_term(answer, letter);

    let distractors = distractors::collect(
        &correct,
        rng,
        |rng, width| format::single_term(answer + signed_offset(rng, 2, 10, width), letter),
        |k| format::single_term(answer + k, letter),
    );

    QuestionSpec {
        topic: Topic::Algebra,
        title: "Like Terms".to_string(),
        statement: Statement::Line("Simplify the following:".to_string()),
        body: QuestionBody::Expression(body),
        correct_answer: correct,
        distractors,
    }
}

/// Medium: one of `x - a = b`, `x + a = b`, `ax = b`, `x / a = b`.
pub fn one_step_equation<R: Rng + ?Sized>(rng: &mut R) -> QuestionSpec {
    let letter = pick_letter(rng);
    let (body, answer) = match rng.gen_range(0..4) {
        0 => {
            let a: i64 = rng.gen_range(1..=20);
            let b: i64 = rng.gen_range(1..=50);
            (format!("{letter} - {a} = {b}"), (b + a) as f64)
        }
        1 => {
            let a: i64 = rng.gen_range(1..=20);
            let b: i64 = rng.gen_range(1..=50);
            (format!("{letter} + {a} = {b}"), (b - a) as f64)
        }
        2 => {
            let a: i64 = rng.gen_range(1..=10);
            let b: i64 = rng.gen_range(a..=a + 10);
            (format!("{a}{letter} = {b}"), b as f64 / a as f64)
        }
        _ => {
            let a: i64 = rng.gen_range(1..=12);
            let b: i64 = rng.gen_range(1..=12);
            (format!("{letter} / {a} = {b}"), (b * a) as f64)
        }
    };
    let correct = format::number(answer);
    let whole = answer.fract() == 0.0;

    let distractors = distractors::collect(
        &correct,
        rng,
        |rng, width| {
            let offset = if whole {
                signed_offset(rng, 1, 8, width) as f64
            } else {
                let magnitude = rng.gen_range(1.0..6.0 * width as f64);
                if rng.gen_bool(0.5) { magnitude } else { -magnitude }
            };
            format::number(answer + offset)
        },
        |k| format::number(answer + k as f64),
    );

    QuestionSpec {
        topic: Topic::Algebra,
        title: "One Step Equations".to_string(),
        statement: Statement::Line(format!("Solve for {letter}:")),
        body: QuestionBody::Expression(body),
        correct_answer: correct,
        distractors,
    }
}

/// Hard: expand `(x + a)(x + b)` where either constant may be negative.
pub fn binomial_expansion<R: Rng + ?Sized>(rng: &mut R) -> QuestionSpec {
    let letter = pick_letter(rng);
    let a = signed_magnitude(rng, 12);
    let b = signed_magnitude(rng, 12);

    let body = format!(
        "{}{} = ?",
        format::binomial_factor(letter, a),
        format::binomial_factor(letter, b)
    );
    let linear = a + b;
    let constant = a * b;
    let correct = format::quadratic(letter, linear, constant);

    let distractors = distractors::collect(
        &correct,
        rng,
        |rng, width| {
            let fake_linear = linear + signed_offset(rng, 2, 10, width);
            let fake_constant = constant + signed_offset(rng, 2, 10, width);
            format::quadratic(letter, fake_linear, fake_constant)
        },
        |k| format::quadratic(letter, linear, constant + k * 11),
    );

    QuestionSpec {
        topic: Topic::Algebra,
        title: "Binomial Expansion".to_string(),
        statement: Statement::Line("Expand the following:".to_string()),
        body: QuestionBody::Expression(body),
        correct_answer: correct,
        distractors,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use regex::Regex;

    use super::*;

    fn expression(q: &QuestionSpec) -> &str {
        match &q.body {
            QuestionBody::Expression(e) => e,
            other => panic!("expected expression body, got {other:?}"),
        }
    }

    #[test]
    fn test_like_terms_shape() {
        let mut rng = SmallRng::seed_from_u64(42);
        let re = Regex::new(r"^\d*[xyzabcmn] ([+-]) \d*[xyzabcmn] ([+-]) \d*[xyzabcmn] = \?$").unwrap();
        for _ in 0..100 {
            let q = like_terms(&mut rng);
            let caps = re.captures(expression(&q)).expect("like-terms body");
            assert_eq!(&caps[1], &caps[2], "operators must match");
            assert_eq!(q.title, "Like Terms");
        }
    }

    #[test]
    fn test_one_step_answers_solve_the_equation() {
        let mut rng = SmallRng::seed_from_u64(9);
        let add = Regex::new(r"^[a-z] \+ (\d+) = (\d+)$").unwrap();
        let sub = Regex::new(r"^[a-z] - (\d+) = (\d+)$").unwrap();
        let div = Regex::new(r"^[a-z] / (\d+) = (\d+)$").unwrap();
        let mul = Regex::new(r"^(\d+)[a-z] = (\d+)$").unwrap();
        for _ in 0..200 {
            let q = one_step_equation(&mut rng);
            let body = expression(&q);
            let expected = if let Some(c) = add.captures(body) {
                c[2].parse::<f64>().unwrap() - c[1].parse::<f64>().unwrap()
            } else if let Some(c) = sub.captures(body) {
                c[2].parse::<f64>().unwrap() + c[1].parse::<f64>().unwrap()
            } else if let Some(c) = div.captures(body) {
                c[2].parse::<f64>().unwrap() * c[1].parse::<f64>().unwrap()
            } else if let Some(c) = mul.captures(body) {
                c[2].parse::<f64>().unwrap() / c[1].parse::<f64>().unwrap()
            } else {
                panic!("unexpected body {body}");
            };
            assert_eq!(q.correct_answer, format::number(expected));
        }
    }

    #[test]
    fn test_binomial_answer_matches_factors() {
        let mut rng = SmallRng::seed_from_u64(5);
        let re = Regex::new(r"^\(([a-z]) ([+-]) (\d+)\)\([a-z] ([+-]) (\d+)\) = \?$").unwrap();
        for _ in 0..100 {
            let q = binomial_expansion(&mut rng);
            let c = re.captures(expression(&q)).expect("binomial body");
            let sign = |s: &str| if s == "-" { -1 } else { 1 };
            let a = sign(&c[2]) * c[3].parse::<i64>().unwrap();
            let b = sign(&c[4]) * c[5].parse::<i64>().unwrap();
            assert_eq!(q.correct_answer, format::quadratic(&c[1], a + b, a * b));
        }
    }
}

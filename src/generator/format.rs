//! Text rendering for numeric answers and algebraic terms.

/// Integers render without decimals, everything else to two places.
pub fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

pub fn length(value: f64) -> String {
    format!("{} cm", number(value))
}

pub fn area(value: f64) -> String {
    format!("{} cm\u{00b2}", number(value))
}

/// Coefficient used inside a question, where a coefficient of one is implied.
pub fn implied_coefficient(n: i64, letter: &str) -> String {
    if n == 1 {
        letter.to_string()
    } else {
        format!("{n}{letter}")
    }
}

/// A simplified like-terms answer: `x`, `-x`, `0`, or `7x`.
pub fn single_term(n: i64, letter: &str) -> String {
    match n {
        0 => "0".to_string(),
        1 => letter.to_string(),
        -1 => format!("-{letter}"),
        _ => format!("{n}{letter}"),
    }
}

/// Middle term of an expanded binomial, including its leading operator.
pub fn signed_linear(n: i64, letter: &str) -> String {
    match n {
        0 => String::new(),
        1 => format!(" + {letter}"),
        -1 => format!(" - {letter}"),
        n if n > 0 => format!(" + {n}{letter}"),
        n => format!(" - {}{letter}", n.unsigned_abs()),
    }
}

pub fn signed_constant(n: i64) -> String {
    match n {
        0 => String::new(),
        n if n > 0 => format!(" + {n}"),
        n => format!(" - {}", n.unsigned_abs()),
    }
}

/// `(x + 3)` or `(x - 3)`.
pub fn binomial_factor(letter: &str, n: i64) -> String {
    if n < 0 {
        format!("({letter} - {})", n.unsigned_abs())
    } else {
        format!("({letter} + {n})")
    }
}

pub fn quadratic(letter: &str, linear: i64, constant: i64) -> String {
    format!(
        "{letter}\u{00b2}{}{}",
        signed_linear(linear, letter),
        signed_constant(constant)
    )
}

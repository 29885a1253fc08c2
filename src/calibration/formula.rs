// Formula - the accepted quadratic and its canonical string form
//
// The canonical form is `<a>*tilt^2+<b>*tilt+<c>` with every coefficient
// in fixed point with 8 decimals. A negative coefficient replaces the
// preceding `+`, so `+-` never appears. This string is what the rest of
// the device stores, displays and evaluates.

use std::fmt;
use std::str::FromStr;

/// Decimal digits rendered for each coefficient
pub const COEFFICIENT_DECIMALS: usize = 8;

const SQUARE_TERM: &str = "*tilt^2";
const LINEAR_TERM: &str = "*tilt";

/// `gravity(angle) = a*angle^2 + b*angle + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formula {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Formula {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Evaluate the formula for a tilt angle
    #[inline]
    pub fn gravity_at(&self, angle: f64) -> f64 {
        self.a * angle * angle + self.b * angle + self.c
    }

    /// Canonical formula string
    pub fn render(&self) -> String {
        FormulaFormatter::render(self)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Renders accepted coefficients into the canonical formula string
pub struct FormulaFormatter;

impl FormulaFormatter {
    pub fn render(formula: &Formula) -> String {
        let mut out = String::with_capacity(48);
        out.push_str(&fixed(formula.a));
        out.push_str(SQUARE_TERM);
        push_signed(&mut out, formula.b);
        out.push_str(LINEAR_TERM);
        push_signed(&mut out, formula.c);
        out
    }
}

/// Fixed-point rendering; a value that rounds to zero never keeps a minus sign
fn fixed(value: f64) -> String {
    let rendered = format!("{:.*}", COEFFICIENT_DECIMALS, value);
    match rendered.strip_prefix('-') {
        Some(magnitude) if magnitude.bytes().all(|b| b == b'0' || b == b'.') => {
            magnitude.to_string()
        }
        _ => rendered,
    }
}

fn push_signed(out: &mut String, value: f64) {
    let rendered = fixed(value);
    if !rendered.starts_with('-') {
        out.push('+');
    }
    out.push_str(&rendered);
}

/// Error returned when a stored formula is not in canonical form
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaParseError {
    pub input: String,
    pub reason: String,
}

impl fmt::Display for FormulaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid formula '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for FormulaParseError {}

impl FromStr for Formula {
    type Err = FormulaParseError;

    /// Parse `<a>*tilt^2<+|-><b>*tilt<+|-><c>` (whitespace ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let fail = |reason: &str| FormulaParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (a_str, rest) = compact
            .split_once(SQUARE_TERM)
            .ok_or_else(|| fail("missing '*tilt^2' term"))?;
        let (b_str, c_str) = rest
            .split_once(LINEAR_TERM)
            .ok_or_else(|| fail("missing '*tilt' term"))?;

        if !b_str.starts_with(['+', '-']) || !c_str.starts_with(['+', '-']) {
            return Err(fail("terms must be joined by '+' or '-'"));
        }

        let parse = |text: &str, name: &str| -> Result<f64, FormulaParseError> {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| fail(&format!("coefficient {} '{}' is not a number", name, text)))
        };

        Ok(Formula {
            a: parse(a_str, "a")?,
            b: parse(b_str, "b")?,
            c: parse(c_str, "c")?,
        })
    }
}

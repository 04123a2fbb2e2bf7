//! Four-function calculator with left-to-right operator chaining.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "×",
            Op::Div => "÷",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
        }
    }
}

/// A keypad button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(char),
    Decimal,
    Op(Op),
    Equals,
    Clear,
    ClearEntry,
    Backspace,
    Negate,
}

impl Key {
    pub fn label(self) -> String {
        match self {
            Key::Digit(d) => d.to_string(),
            Key::Decimal => ".".into(),
            Key::Op(op) => op.symbol().into(),
            Key::Equals => "=".into(),
            Key::Clear => "C".into(),
            Key::ClearEntry => "CE".into(),
            Key::Backspace => "⌫".into(),
            Key::Negate => "+/-".into(),
        }
    }

    pub fn from_char(c: char) -> Option<Key> {
        Some(match c {
            '0'..='9' => Key::Digit(c),
            '.' | ',' => Key::Decimal,
            '+' => Key::Op(Op::Add),
            '-' => Key::Op(Op::Sub),
            '*' | 'x' | 'X' => Key::Op(Op::Mul),
            '/' => Key::Op(Op::Div),
            '=' => Key::Equals,
            'c' | 'C' => Key::Clear,
            'e' | 'E' => Key::ClearEntry,
            'n' | 'N' => Key::Negate,
            _ => return None,
        })
    }
}

/// Keypad layout, row by row.
pub const KEYPAD: [[Key; 4]; 5] = [
    [Key::Clear, Key::ClearEntry, Key::Backspace, Key::Op(Op::Div)],
    [Key::Digit('7'), Key::Digit('8'), Key::Digit('9'), Key::Op(Op::Mul)],
    [Key::Digit('4'), Key::Digit('5'), Key::Digit('6'), Key::Op(Op::Sub)],
    [Key::Digit('1'), Key::Digit('2'), Key::Digit('3'), Key::Op(Op::Add)],
    [Key::Negate, Key::Digit('0'), Key::Decimal, Key::Equals],
];

#[derive(Debug, Clone)]
pub struct Calculator {
    display: String,
    previous: Option<f64>,
    operation: Option<Op>,
    new_number: bool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            display: "0".into(),
            previous: None,
            operation: None,
            new_number: true,
        }
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// The pending `a op` line shown above the display.
    pub fn pending(&self) -> Option<String> {
        self.previous.map(|p| {
            let op = self.operation.map(Op::symbol).unwrap_or("");
            format!("{} {}", format_number(p), op)
        })
    }

    fn current(&self) -> f64 {
        self.display.parse().unwrap_or(0.0)
    }

    pub fn press(&mut self, key: Key) {
        match key {
            Key::Digit(d) => self.digit(d),
            Key::Decimal => {
                if !self.display.contains('.') {
                    self.display.push('.');
                    self.new_number = false;
                }
            }
            Key::Op(op) => self.operation(op),
            Key::Equals => self.equals(),
            Key::Clear => *self = Self::default(),
            Key::ClearEntry => {
                self.display = "0".into();
                self.new_number = true;
            }
            Key::Backspace => {
                if self.display.chars().count() > 1 {
                    self.display.pop();
                } else {
                    self.display = "0".into();
                    self.new_number = true;
                }
            }
            Key::Negate => self.display = format_number(-self.current()),
        }
    }

    fn digit(&mut self, d: char) {
        if self.new_number {
            self.display = d.to_string();
            self.new_number = false;
        } else if self.display == "0" {
            self.display = d.to_string();
        } else {
            self.display.push(d);
        }
    }

    fn operation(&mut self, op: Op) {
        let current = self.current();
        match (self.previous, self.operation) {
            (None, _) => self.previous = Some(current),
            (Some(prev), Some(pending)) => {
                let result = pending.apply(prev, current);
                self.display = format_number(result);
                self.previous = Some(result);
            }
            (Some(_), None) => {}
        }
        self.operation = Some(op);
        self.new_number = true;
    }

    fn equals(&mut self) {
        if let (Some(prev), Some(op)) = (self.previous, self.operation) {
            let result = op.apply(prev, self.current());
            self.display = format_number(result);
            self.previous = None;
            self.operation = None;
            self.new_number = true;
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else if n == 0.0 {
        "0".into()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(keys: &str) -> Calculator {
        let mut calc = Calculator::new();
        for c in keys.chars() {
            calc.press(Key::from_char(c).unwrap());
        }
        calc
    }

    #[test]
    fn chaining_evaluates_left_to_right() {
        assert_eq!(run("2+3*4=").display(), "20");
        assert_eq!(run("10-4-1=").display(), "5");
    }

    #[test]
    fn intermediate_result_shows_on_next_operator() {
        let calc = run("7+8+");
        assert_eq!(calc.display(), "15");
        assert_eq!(calc.pending().as_deref(), Some("15 +"));
    }

    #[test]
    fn decimal_entry_and_float_output() {
        assert_eq!(run("1.5*2=").display(), "3");
        assert_eq!(run("0.1+0.2=").display(), "0.30000000000000004");
        assert_eq!(run("1..2").display(), "1.2");
    }

    #[test]
    fn division_by_zero_is_infinity() {
        assert_eq!(run("9/0=").display(), "Infinity");
    }

    #[test]
    fn clear_entry_keeps_pending_operation() {
        let calc = run("5+9e3=");
        assert_eq!(calc.display(), "8");
    }

    #[test]
    fn clear_resets_everything() {
        let calc = run("5+3c");
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.pending(), None);
    }

    #[test]
    fn backspace_and_negate() {
        let mut calc = run("123");
        calc.press(Key::Backspace);
        assert_eq!(calc.display(), "12");
        calc.press(Key::Negate);
        assert_eq!(calc.display(), "-12");
        calc.press(Key::Backspace);
        calc.press(Key::Backspace);
        calc.press(Key::Backspace);
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn leading_zero_is_replaced() {
        assert_eq!(run("007").display(), "7");
    }

    #[test]
    fn equals_without_operation_is_ignored() {
        assert_eq!(run("42=").display(), "42");
    }
}

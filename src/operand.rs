//! Typed instruction operands.
//!
//! Tokens are classified once, at parse time, so the engine never re-inspects
//! raw text to decide whether an argument is a constant or a register.

/// A decoded operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Named register reference; existence is checked at execution time.
    Reg(String),
    /// Signed integer literal.
    Int(i64),
    /// String literal with the surrounding quotes stripped.
    Str(String),
    /// Label reference for jumps and calls; resolved at execution time.
    Label(String),
}

impl Operand {
    /// Returns a human-readable kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Reg(_) => "a register",
            Operand::Int(_) => "an integer",
            Operand::Str(_) => "a string",
            Operand::Label(_) => "a label",
        }
    }

    /// Classifies a raw token as a string literal, integer literal, or
    /// register reference.
    ///
    /// A token starting with a quote is a string literal; its closing quote
    /// is optional (an unterminated literal runs to the end of the line) and
    /// the interior is kept verbatim. A token of optionally signed digits is
    /// an integer literal; `None` is returned when its value does not fit an
    /// `i64`. Anything else is a register reference. `Label` operands are
    /// never produced here; the decoder rewrites register-shaped tokens in
    /// target positions.
    pub(crate) fn classify(token: &str) -> Option<Operand> {
        if let Some(inner) = token.strip_prefix('\'') {
            let inner = inner.strip_suffix('\'').unwrap_or(inner);
            return Some(Operand::Str(inner.to_string()));
        }
        if looks_numeric(token) {
            return token.parse::<i64>().ok().map(Operand::Int);
        }
        Some(Operand::Reg(token.to_string()))
    }
}

/// Whether a token is an optionally signed digit sequence.
fn looks_numeric(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_string_literal() {
        assert_eq!(
            Operand::classify("'hello'"),
            Some(Operand::Str("hello".to_string()))
        );
        assert_eq!(
            Operand::classify("', '"),
            Some(Operand::Str(", ".to_string()))
        );
        assert_eq!(Operand::classify("''"), Some(Operand::Str(String::new())));
    }

    #[test]
    fn classify_unterminated_string_runs_to_end() {
        assert_eq!(
            Operand::classify("'open ended"),
            Some(Operand::Str("open ended".to_string()))
        );
    }

    #[test]
    fn classify_integer_literal() {
        assert_eq!(Operand::classify("42"), Some(Operand::Int(42)));
        assert_eq!(Operand::classify("-7"), Some(Operand::Int(-7)));
        assert_eq!(Operand::classify("+7"), Some(Operand::Int(7)));
        assert_eq!(Operand::classify("0"), Some(Operand::Int(0)));
        assert_eq!(
            Operand::classify("9223372036854775807"),
            Some(Operand::Int(i64::MAX))
        );
    }

    #[test]
    fn classify_integer_out_of_range() {
        assert_eq!(Operand::classify("9223372036854775808"), None);
        assert_eq!(Operand::classify("-9223372036854775809"), None);
    }

    #[test]
    fn classify_register_reference() {
        assert_eq!(
            Operand::classify("counter"),
            Some(Operand::Reg("counter".to_string()))
        );
        assert_eq!(Operand::classify("a"), Some(Operand::Reg("a".to_string())));
        // A bare sign is not a number.
        assert_eq!(Operand::classify("-"), Some(Operand::Reg("-".to_string())));
        // Mixed digits and letters read as a register name.
        assert_eq!(
            Operand::classify("1a"),
            Some(Operand::Reg("1a".to_string()))
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(Operand::Reg("a".to_string()).kind_name(), "a register");
        assert_eq!(Operand::Int(1).kind_name(), "an integer");
        assert_eq!(Operand::Str(String::new()).kind_name(), "a string");
        assert_eq!(Operand::Label("l".to_string()).kind_name(), "a label");
    }
}

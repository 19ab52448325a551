//! Instruction set definition.
//!
//! [`for_each_opcode!`](crate::for_each_opcode) holds the canonical opcode
//! list and invokes a callback macro for code generation, so the [`Opcode`]
//! enum, the mnemonic mappings, and the operand-shape table stay in one
//! place.
//!
//! Each table entry declares the opcode variant, its assembly mnemonic, and
//! the [`ParamKind`] of every operand position. The decoder uses the shape
//! table to type-check instructions once, at parse time.

use std::fmt;

/// Operand position kinds, used by the decoder to type-check instructions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamKind {
    /// Register name the instruction writes (existence not required yet).
    Dst,
    /// Integer literal or register read for its value.
    Src,
    /// Label identifier.
    Target,
    /// One or more message arguments (string literal, integer literal, or
    /// register). Only valid as the last position.
    Args,
}

/// Operand count an opcode accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    /// Whether `count` operands satisfy this arity.
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Invokes a callback macro with the complete opcode definition list.
///
/// This macro enables code generation for opcodes in multiple places without
/// duplicating the definitions.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// MOV dst, src ; dst = value(src)
            Mov = "MOV" => [Dst, Src],
            /// INC dst ; dst = dst + 1
            Inc = "INC" => [Dst],
            /// DEC dst ; dst = dst - 1
            Dec = "DEC" => [Dst],
            /// ADD dst, src ; dst = dst + value(src)
            Add = "ADD" => [Dst, Src],
            /// SUB dst, src ; dst = dst - value(src)
            Sub = "SUB" => [Dst, Src],
            /// MUL dst, src ; dst = dst * value(src)
            Mul = "MUL" => [Dst, Src],
            /// DIV dst, src ; dst = dst / value(src), truncating toward zero
            Div = "DIV" => [Dst, Src],
            /// JMP label ; unconditional jump
            Jmp = "JMP" => [Target],
            /// CMP a, b ; record (value(a), value(b)) for conditional jumps
            Cmp = "CMP" => [Src, Src],
            /// JNE label ; jump if the recorded comparison was not equal
            Jne = "JNE" => [Target],
            /// JE label ; jump if the recorded comparison was equal
            Je = "JE" => [Target],
            /// JGE label ; jump if lhs >= rhs
            Jge = "JGE" => [Target],
            /// JG label ; jump if lhs > rhs
            Jg = "JG" => [Target],
            /// JLE label ; jump if lhs <= rhs
            Jle = "JLE" => [Target],
            /// JL label ; jump if lhs < rhs
            Jl = "JL" => [Target],
            /// CALL label ; push the return line, jump to label
            Call = "CALL" => [Target],
            /// RET ; pop the call stack into the counter
            Ret = "RET" => [],
            /// MSG arg, ... ; append literals and register values to the output
            Msg = "MSG" => [Args],
            /// END ; finalize the output and stop
            End = "END" => [],
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [ $( $kind:ident ),* ]
        ),* $(,)?
    ) => {
        /// Operation kinds of the instruction set.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: [Opcode; for_each_opcode!(count_opcodes)] = [
                $( Opcode::$name, )*
            ];

            /// Looks up an opcode by mnemonic, case-insensitively.
            pub fn from_mnemonic(token: &str) -> Option<Opcode> {
                $(
                    if token.eq_ignore_ascii_case($mnemonic) {
                        return Some(Opcode::$name);
                    }
                )*
                None
            }

            /// Returns the canonical (uppercase) assembly mnemonic.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the operand position kinds for the decoder.
            pub fn params(&self) -> &'static [ParamKind] {
                match self {
                    $( Opcode::$name => &[ $( ParamKind::$kind ),* ], )*
                }
            }
        }
    };
}

macro_rules! count_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [ $( $kind:ident ),* ]
        ),* $(,)?
    ) => {
        <[()]>::len(&[ $( count_opcodes!(@unit $name) ),* ])
    };
    (@unit $name:ident) => { () };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Returns the operand count this opcode accepts, derived from its
    /// operand shape table.
    pub fn arity(&self) -> Arity {
        let params = self.params();
        match params.last() {
            Some(ParamKind::Args) => Arity::AtLeast(params.len()),
            _ => Arity::Exact(params.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn from_mnemonic_valid() {
        assert_eq!(Opcode::from_mnemonic("MOV"), Some(Opcode::Mov));
        assert_eq!(Opcode::from_mnemonic("mov"), Some(Opcode::Mov));
        assert_eq!(Opcode::from_mnemonic("Jne"), Some(Opcode::Jne));
        assert_eq!(Opcode::from_mnemonic("end"), Some(Opcode::End));
    }

    #[test]
    fn from_mnemonic_invalid() {
        assert_eq!(Opcode::from_mnemonic("MVO"), None);
        assert_eq!(Opcode::from_mnemonic("MOVE"), None);
        assert_eq!(Opcode::from_mnemonic(""), None);
        assert_eq!(Opcode::from_mnemonic("loop:"), None);
    }

    #[test]
    fn mnemonics_round_trip_and_are_unique() {
        let mut seen = HashSet::new();
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
            assert!(seen.insert(op.mnemonic()), "duplicate mnemonic {}", op.mnemonic());
        }
    }

    #[test]
    fn variadic_params_only_in_last_position() {
        for op in Opcode::ALL {
            let params = op.params();
            for kind in &params[..params.len().saturating_sub(1)] {
                assert_ne!(*kind, ParamKind::Args, "{} has a non-final Args", op.mnemonic());
            }
        }
    }

    #[test]
    fn arity_follows_the_shape_table() {
        assert_eq!(Opcode::Mov.arity(), Arity::Exact(2));
        assert_eq!(Opcode::Inc.arity(), Arity::Exact(1));
        assert_eq!(Opcode::Ret.arity(), Arity::Exact(0));
        assert_eq!(Opcode::End.arity(), Arity::Exact(0));
        assert_eq!(Opcode::Msg.arity(), Arity::AtLeast(1));
    }

    #[test]
    fn arity_accepts() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(1));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(1));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(!Arity::AtLeast(1).accepts(0));
    }

    #[test]
    fn table_order_matches_all() {
        macro_rules! collect_mnemonics {
            (
                $(
                    $(#[$doc:meta])*
                    $name:ident = $mnemonic:literal => [ $( $kind:ident ),* ]
                ),* $(,)?
            ) => {
                vec![ $( $mnemonic ),* ]
            };
        }
        let mnemonics: Vec<&str> = crate::for_each_opcode!(collect_mnemonics);
        assert_eq!(mnemonics.len(), Opcode::ALL.len());
        for (mnemonic, op) in mnemonics.iter().zip(Opcode::ALL) {
            assert_eq!(*mnemonic, op.mnemonic());
        }
    }
}

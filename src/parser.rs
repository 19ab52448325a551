//! Source parsing: preprocessing, tokenizing, and instruction decoding.
//!
//! Converts raw source text into an immutable [`Program`] in a single pass.
//!
//! # Syntax
//!
//! ```text
//! label:
//! OPCODE arg[, arg]*   ; optional comment
//! ```
//!
//! - Opcodes are case-insensitive (e.g., `MOV`, `mov`)
//! - Arguments are separated by spaces or commas
//! - String literals are single-quoted (e.g., `'hello'`)
//! - Integers are optionally signed decimal (e.g., `42`, `-1`)
//! - Comments start with `;` outside string literals
//! - A label is an identifier alone on its line, suffixed with `:`

use crate::errors::VmError;
use crate::isa::{Opcode, ParamKind};
use crate::operand::Operand;
use crate::program::{Instruction, Program, SourceLine};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = ';';
const LABEL_SUFFIX: char = ':';

/// A raw token with its 1-based column in the source line.
#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    column: usize,
}

/// Tokenizes a single line of source.
///
/// Rules:
/// - spaces, tabs, and commas separate tokens
/// - a single quote toggles an in-string flag; while set, separators are part
///   of the token and the quote characters themselves are retained, so the
///   decoder can tell a string literal from a bare identifier
/// - `;` outside a string drops the rest of the line
/// - an unterminated string runs to the end of the line
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();

    let mut start: Option<usize> = None;
    let mut in_str = false;

    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == COMMENT_CHAR as u8 && !in_str {
            break;
        }

        match b {
            b'\'' => {
                if start.is_none() {
                    start = Some(i);
                }
                in_str = !in_str;
            }
            b',' | b' ' | b'\t' if !in_str => {
                if let Some(s) = start.take() {
                    out.push(Token {
                        text: &line[s..i],
                        column: s + 1,
                    });
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }

        i += 1;
    }

    if let Some(s) = start {
        out.push(Token {
            text: &line[s..i],
            column: s + 1,
        });
    }

    out
}

/// Returns the label name when the line's sole token is `identifier:`.
fn label_def<'a>(tokens: &[Token<'a>]) -> Option<&'a str> {
    let [token] = tokens else { return None };
    let name = token.text.strip_suffix(LABEL_SUFFIX)?;
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Some(name)
    } else {
        None
    }
}

/// Decodes one tokenized instruction line.
///
/// Validates the mnemonic, the operand count against the opcode's arity, and
/// each operand's kind against the opcode's shape table.
fn decode_instruction(
    line_no: usize,
    head: &Token<'_>,
    args: &[Token<'_>],
) -> Result<Instruction, VmError> {
    let opcode = Opcode::from_mnemonic(head.text).ok_or_else(|| VmError::UnknownOpcode {
        line: line_no,
        column: head.column,
        mnemonic: head.text.to_string(),
    })?;

    let arity = opcode.arity();
    if !arity.accepts(args.len()) {
        return Err(VmError::OperandCountMismatch {
            line: line_no,
            column: head.column,
            mnemonic: opcode.mnemonic(),
            expected: arity,
            actual: args.len(),
        });
    }

    let params = opcode.params();
    let mut operands = Vec::with_capacity(args.len());
    for (position, token) in args.iter().enumerate() {
        // A variadic last param covers every remaining position.
        let kind = params[position.min(params.len() - 1)];
        operands.push(decode_operand(line_no, opcode, kind, token)?);
    }

    Ok(Instruction { opcode, operands })
}

/// Classifies one operand token and checks it against its position kind.
fn decode_operand(
    line_no: usize,
    opcode: Opcode,
    kind: ParamKind,
    token: &Token<'_>,
) -> Result<Operand, VmError> {
    let operand = Operand::classify(token.text).ok_or_else(|| VmError::IntegerOutOfRange {
        line: line_no,
        column: token.column,
        literal: token.text.to_string(),
    })?;

    let mismatch = |expected: &'static str, operand: &Operand| VmError::OperandTypeMismatch {
        line: line_no,
        column: token.column,
        mnemonic: opcode.mnemonic(),
        expected,
        actual: operand.kind_name(),
    };

    match kind {
        ParamKind::Dst => match operand {
            Operand::Reg(_) => Ok(operand),
            other => Err(mismatch("a register", &other)),
        },
        ParamKind::Src => match operand {
            Operand::Reg(_) | Operand::Int(_) => Ok(operand),
            other => Err(mismatch("a register or integer", &other)),
        },
        ParamKind::Target => match operand {
            Operand::Reg(name) => Ok(Operand::Label(name)),
            other => Err(mismatch("a label", &other)),
        },
        ParamKind::Args => Ok(operand),
    }
}

/// Parses source text into an immutable [`Program`].
///
/// Builds the label table and decodes every instruction in one pass; blank
/// and label lines keep their indices so jump targets stay stable. Label
/// resolution is deferred to execution, so forward references are legal.
pub fn parse_source(source: &str) -> Result<Program, VmError> {
    let mut lines = Vec::new();
    let mut labels: HashMap<String, usize> = HashMap::new();

    for (index, raw) in source.lines().enumerate() {
        let tokens = tokenize(raw);

        let Some((head, args)) = tokens.split_first() else {
            lines.push(SourceLine::Empty);
            continue;
        };

        if let Some(name) = label_def(&tokens) {
            if labels.insert(name.to_string(), index).is_some() {
                return Err(VmError::DuplicateLabel {
                    line: index + 1,
                    column: head.column,
                    label: name.to_string(),
                });
            }
            lines.push(SourceLine::Label(name.to_string()));
            continue;
        }

        lines.push(SourceLine::Instr(decode_instruction(index + 1, head, args)?));
    }

    Ok(Program::new(lines, labels))
}

/// Convenience: parse directly from a file path.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Program, VmError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VmError::IoError {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_source(&source)
}

/// Formats a compiler-style diagnostic for an error with a source position.
///
/// Errors without a position (step budget, I/O) render as the bare message.
pub fn render_diagnostic(file: &str, source: &str, err: &VmError) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {err}");

    let Some((line, column)) = err.location() else {
        return diag;
    };
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(column.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{line:>2} | {line_text}");
        let _ = writeln!(diag, "  | {underline}^");
    }

    diag
}

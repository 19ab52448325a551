//! Execution engine.
//!
//! Drives the fetch-execute loop over a parsed [`Program`]. All per-run
//! mutable state (counter, registers, call stack, comparison, output) lives
//! in the [`Vm`] value; the program is borrowed immutably, so one parsed
//! program can back any number of sequential or concurrent runs.
//!
//! # Execution model
//!
//! - Named registers hold `i64` values and exist only once written
//! - `INC`/`DEC`/`ADD`/`SUB`/`MUL` use wrapping arithmetic; `DIV` truncates
//!   toward zero and fails fast on a zero divisor
//! - `CMP` records a value pair the conditional jumps consult
//! - `CALL` pushes the line after itself; `RET` pops it into the counter
//! - `MSG` appends to the run's output, published only when `END` executes
//!
//! The engine imposes no bound on run length. Callers that need one attach a
//! step budget with [`Vm::step_limit`]; exhausting it is an error, distinct
//! from the `Ok(None)` result of falling off the end without `END`.

mod output;
mod registers;

use crate::errors::VmError;
use crate::isa::Opcode;
use crate::operand::Operand;
use crate::program::{Instruction, Program, SourceLine};
use output::MessageBuffer;
use registers::Registers;

/// The two values most recently compared by `CMP`.
#[derive(Clone, Copy, Debug)]
struct Comparison {
    lhs: i64,
    rhs: i64,
}

/// Branch conditions of the conditional jump opcodes.
#[derive(Clone, Copy, Debug)]
enum Condition {
    NotEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    LessOrEqual,
    Less,
}

impl Comparison {
    fn satisfies(&self, condition: Condition) -> bool {
        match condition {
            Condition::NotEqual => self.lhs != self.rhs,
            Condition::Equal => self.lhs == self.rhs,
            Condition::GreaterOrEqual => self.lhs >= self.rhs,
            Condition::Greater => self.lhs > self.rhs,
            Condition::LessOrEqual => self.lhs <= self.rhs,
            Condition::Less => self.lhs < self.rhs,
        }
    }
}

/// Where the counter goes after an instruction executes.
enum Flow {
    /// Advance to the next line.
    Next,
    /// Jump to a line index.
    Jump(usize),
    /// `END` executed; the run is complete.
    Halt,
}

/// One execution of a parsed program.
///
/// Owns all mutable run state, created fresh per invocation and consumed by
/// [`run`](Vm::run). The borrowed [`Program`] is never mutated.
pub struct Vm<'p> {
    program: &'p Program,
    /// Program counter: index of the line being fetched.
    pc: usize,
    registers: Registers,
    /// Pending return line indices pushed by `CALL`.
    call_stack: Vec<usize>,
    comparison: Option<Comparison>,
    output: MessageBuffer,
    steps: u64,
    step_limit: Option<u64>,
}

impl<'p> Vm<'p> {
    /// Creates an engine over `program` with fresh state and no step budget.
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            pc: 0,
            registers: Registers::new(),
            call_stack: Vec::new(),
            comparison: None,
            output: MessageBuffer::new(),
            steps: 0,
            step_limit: None,
        }
    }

    /// Caps the number of fetched lines.
    ///
    /// Exceeding the cap aborts the run with [`VmError::StepLimitExceeded`].
    /// Blank and label lines count as steps, so the budget also bounds
    /// programs that spin over no-ops.
    pub fn step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Runs the program to completion.
    ///
    /// Returns `Ok(Some(output))` when `END` executes, `Ok(None)` when the
    /// counter advances past the last line without `END` having executed, and
    /// `Err` when an instruction fails. Output accumulated before a failure
    /// or a fall-off-the-end is discarded.
    pub fn run(mut self) -> Result<Option<String>, VmError> {
        while let Some(line) = self.program.line(self.pc) {
            self.charge_step()?;

            let instruction = match line {
                SourceLine::Instr(instruction) => instruction,
                SourceLine::Empty | SourceLine::Label(_) => {
                    self.pc += 1;
                    continue;
                }
            };

            match self.exec(instruction)? {
                Flow::Next => self.pc += 1,
                Flow::Jump(target) => self.pc = target,
                Flow::Halt => return Ok(Some(self.output.finish())),
            }
        }

        Ok(None)
    }

    fn charge_step(&mut self) -> Result<(), VmError> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(VmError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    /// Executes a single instruction and reports where the counter goes next.
    fn exec(&mut self, instruction: &Instruction) -> Result<Flow, VmError> {
        let operands = &instruction.operands;
        match instruction.opcode {
            Opcode::Mov => self.op_mov(operands),
            Opcode::Inc => self.op_step_by(operands, 1),
            Opcode::Dec => self.op_step_by(operands, -1),
            Opcode::Add => self.op_arith(operands, i64::wrapping_add),
            Opcode::Sub => self.op_arith(operands, i64::wrapping_sub),
            Opcode::Mul => self.op_arith(operands, i64::wrapping_mul),
            Opcode::Div => self.op_div(operands),
            Opcode::Jmp => self.op_jmp(operands),
            Opcode::Cmp => self.op_cmp(operands),
            Opcode::Jne => self.op_branch(instruction.opcode, Condition::NotEqual, operands),
            Opcode::Je => self.op_branch(instruction.opcode, Condition::Equal, operands),
            Opcode::Jge => self.op_branch(instruction.opcode, Condition::GreaterOrEqual, operands),
            Opcode::Jg => self.op_branch(instruction.opcode, Condition::Greater, operands),
            Opcode::Jle => self.op_branch(instruction.opcode, Condition::LessOrEqual, operands),
            Opcode::Jl => self.op_branch(instruction.opcode, Condition::Less, operands),
            Opcode::Call => self.op_call(operands),
            Opcode::Ret => self.op_ret(),
            Opcode::Msg => self.op_msg(operands),
            Opcode::End => Ok(Flow::Halt),
        }
    }

    /// 1-based source line of the instruction being executed.
    fn line_number(&self) -> usize {
        self.pc + 1
    }

    /// Reads register `name`, erroring if it was never written.
    fn register(&self, name: &str) -> Result<i64, VmError> {
        self.registers
            .get(name)
            .ok_or_else(|| VmError::UndefinedRegister {
                line: self.line_number(),
                name: name.to_string(),
            })
    }

    /// Resolves an integer literal or a register read to its value.
    fn value(&self, operand: &Operand) -> Result<i64, VmError> {
        match operand {
            Operand::Int(value) => Ok(*value),
            Operand::Reg(name) => self.register(name),
            other => unreachable!("decoder passed {} in a value position", other.kind_name()),
        }
    }

    /// Resolves a label operand to its line index.
    fn target(&self, operand: &Operand) -> Result<usize, VmError> {
        let name = label_name(operand);
        self.program
            .resolve_label(name)
            .ok_or_else(|| VmError::UndefinedLabel {
                line: self.line_number(),
                label: name.to_string(),
            })
    }

    fn op_mov(&mut self, operands: &[Operand]) -> Result<Flow, VmError> {
        let value = self.value(&operands[1])?;
        self.registers.set(reg_name(&operands[0]), value);
        Ok(Flow::Next)
    }

    fn op_step_by(&mut self, operands: &[Operand], delta: i64) -> Result<Flow, VmError> {
        let dst = reg_name(&operands[0]);
        let value = self.register(dst)?;
        self.registers.set(dst, value.wrapping_add(delta));
        Ok(Flow::Next)
    }

    fn op_arith(&mut self, operands: &[Operand], apply: fn(i64, i64) -> i64) -> Result<Flow, VmError> {
        let dst = reg_name(&operands[0]);
        let lhs = self.register(dst)?;
        let rhs = self.value(&operands[1])?;
        self.registers.set(dst, apply(lhs, rhs));
        Ok(Flow::Next)
    }

    fn op_div(&mut self, operands: &[Operand]) -> Result<Flow, VmError> {
        let dst = reg_name(&operands[0]);
        let lhs = self.register(dst)?;
        let rhs = self.value(&operands[1])?;
        if rhs == 0 {
            return Err(VmError::DivisionByZero {
                line: self.line_number(),
            });
        }
        // wrapping_div keeps i64::MIN / -1 from trapping.
        self.registers.set(dst, lhs.wrapping_div(rhs));
        Ok(Flow::Next)
    }

    fn op_jmp(&mut self, operands: &[Operand]) -> Result<Flow, VmError> {
        Ok(Flow::Jump(self.target(&operands[0])?))
    }

    fn op_cmp(&mut self, operands: &[Operand]) -> Result<Flow, VmError> {
        let lhs = self.value(&operands[0])?;
        let rhs = self.value(&operands[1])?;
        self.comparison = Some(Comparison { lhs, rhs });
        Ok(Flow::Next)
    }

    fn op_branch(
        &mut self,
        opcode: Opcode,
        condition: Condition,
        operands: &[Operand],
    ) -> Result<Flow, VmError> {
        let target = self.target(&operands[0])?;
        let comparison = self
            .comparison
            .ok_or_else(|| VmError::BranchWithoutCompare {
                line: self.line_number(),
                mnemonic: opcode.mnemonic(),
            })?;
        if comparison.satisfies(condition) {
            Ok(Flow::Jump(target))
        } else {
            Ok(Flow::Next)
        }
    }

    fn op_call(&mut self, operands: &[Operand]) -> Result<Flow, VmError> {
        let target = self.target(&operands[0])?;
        self.call_stack.push(self.pc + 1);
        Ok(Flow::Jump(target))
    }

    fn op_ret(&mut self) -> Result<Flow, VmError> {
        let return_to = self
            .call_stack
            .pop()
            .ok_or_else(|| VmError::ReturnWithoutCall {
                line: self.line_number(),
            })?;
        Ok(Flow::Jump(return_to))
    }

    fn op_msg(&mut self, operands: &[Operand]) -> Result<Flow, VmError> {
        for operand in operands {
            match operand {
                Operand::Str(text) => self.output.push_text(text),
                other => {
                    let value = self.value(other)?;
                    self.output.push_int(value);
                }
            }
        }
        Ok(Flow::Next)
    }
}

// Operand accessors for positions whose shape the decoder has already
// checked; a mismatch here is a decoder bug.

fn reg_name(operand: &Operand) -> &str {
    match operand {
        Operand::Reg(name) => name,
        other => unreachable!("decoder passed {} in a register position", other.kind_name()),
    }
}

fn label_name(operand: &Operand) -> &str {
    match operand {
        Operand::Label(name) => name,
        other => unreachable!("decoder passed {} in a target position", other.kind_name()),
    }
}

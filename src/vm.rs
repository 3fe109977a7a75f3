use std::io::{self, Write};

use crate::alu::{self, AluOp};
use crate::opcode::Opcode;
use crate::region::{LoadError, Region};

/// The type of a single register in our virtual machine
pub type Register = u8;

pub const MEMORY_SIZE: usize = 256;
pub const REGISTER_COUNT: usize = 8;

/// Index of the register reserved for the stack pointer
pub const SP: u8 = 7;

/// Where the stack pointer starts; the stack grows down from here
pub const EMPTY_STACK: u8 = 0xF4;

/// Address the loader writes the first program byte to, and where `pc` starts
pub const PROGRAM_ENTRY: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Running,
  Halted,
}

/// The `FL` register, laid out as `00000LGE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
  pub const LESS: u8 = 0b100;
  pub const GREATER: u8 = 0b010;
  pub const EQUAL: u8 = 0b001;

  fn compare(a: u8, b: u8) -> Self {
    let bits = match a.cmp(&b) {
      std::cmp::Ordering::Less => Self::LESS,
      std::cmp::Ordering::Greater => Self::GREATER,
      std::cmp::Ordering::Equal => Self::EQUAL,
    };
    Self(bits)
  }

  pub fn bits(self) -> u8 {
    self.0
  }

  pub fn less(self) -> bool {
    self.0 & Self::LESS != 0
  }

  pub fn greater(self) -> bool {
    self.0 & Self::GREATER != 0
  }

  pub fn equal(self) -> bool {
    self.0 & Self::EQUAL != 0
  }
}

/// A virtual machine for the LS8 architecture.
///
/// Memory is a flat 256 byte space shared by code and stack, so every `u8` is
/// a valid address and all address arithmetic wraps. Register operands only
/// look at their low three bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vm {
  pc: u8,
  memory: [u8; MEMORY_SIZE],
  registers: [Register; REGISTER_COUNT],
  flags: Flags,
  state: State,
}

impl Vm {
  /// Create a new, empty virtual machine
  pub fn new() -> Self {
    let mut registers = [0; REGISTER_COUNT];
    registers[SP as usize] = EMPTY_STACK;
    Self {
      pc: PROGRAM_ENTRY,
      memory: [0; MEMORY_SIZE],
      registers,
      flags: Flags::default(),
      state: State::Running,
    }
  }

  /// Copy a program image into memory, starting at [`PROGRAM_ENTRY`]
  pub fn load<R>(&mut self, region: &R) -> Result<(), LoadError>
  where
    R: Region,
  {
    let bytes = region.instructions();
    let start = PROGRAM_ENTRY as usize;
    if bytes.len() > MEMORY_SIZE - start {
      return Err(LoadError::TooLarge { len: bytes.len() });
    }
    self.memory[start..start + bytes.len()].copy_from_slice(bytes);
    tracing::debug!("loaded {} bytes at {:#04x}", bytes.len(), start);
    Ok(())
  }

  pub fn read(&self, address: u8) -> u8 {
    self.memory[address as usize]
  }

  pub fn write(&mut self, address: u8, value: u8) {
    self.memory[address as usize] = value;
  }

  pub fn push(&mut self, value: u8) {
    let sp = self.register(SP).wrapping_sub(1);
    self.set_register(SP, sp);
    self.write(sp, value);
  }

  pub fn pop(&mut self) -> u8 {
    let sp = self.register(SP);
    let value = self.read(sp);
    self.set_register(SP, sp.wrapping_add(1));
    value
  }

  pub fn register(&self, index: u8) -> Register {
    self.registers[register_slot(index)]
  }

  pub fn set_register(&mut self, index: u8, value: Register) {
    self.registers[register_slot(index)] = value;
  }

  pub fn pc(&self) -> u8 {
    self.pc
  }

  pub fn flags(&self) -> Flags {
    self.flags
  }

  pub fn state(&self) -> State {
    self.state
  }

  /// `r[a] ← r[a] <op> r[b]`, leaving the registers untouched on failure
  pub fn alu(&mut self, op: AluOp, a: u8, b: u8) -> Result<(), Error> {
    let result = alu::apply(op, self.register(a), self.register(b))?;
    self.set_register(a, result);
    Ok(())
  }

  /// Execute a single instruction, writing anything it prints to `out`.
  ///
  /// An illegal opcode is reported before any state is touched.
  pub fn step<W>(&mut self, out: &mut W) -> Result<State, Error>
  where
    W: Write,
  {
    if self.state == State::Halted {
      return Err(Error::MachineHalted);
    }
    let pc = self.pc;
    let byte = self.read(pc);
    let op = Opcode::try_from(byte)
      .map_err(|opcode| Error::IllegalInstruction { address: pc, opcode })?;
    let descriptor = op.descriptor();

    let mut task = Task::new(self, out, pc);
    tracing::trace!(
      "{:#04x}: {} {:#04x} {:#04x} | fl: {:03b}",
      pc,
      op,
      task.a,
      task.b,
      task.vm.flags.bits()
    );
    let flow = task.run(op)?;

    // an untaken conditional jump advances like any other instruction
    match flow {
      Flow::Advance => self.pc = pc.wrapping_add(descriptor.width()),
      Flow::Jump(target) => self.pc = target,
      Flow::Halt => {
        self.pc = pc.wrapping_add(descriptor.width());
        self.state = State::Halted;
        tracing::debug!("halted at {:#04x}", pc);
      }
    }
    Ok(self.state)
  }

  /// Step until the machine halts or faults
  pub fn run<W>(&mut self, out: &mut W) -> Result<(), Error>
  where
    W: Write,
  {
    while self.step(out)? == State::Running {}
    Ok(())
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

fn register_slot(index: u8) -> usize {
  (index as usize) % REGISTER_COUNT
}

/// An error that occurred during execution of instructions
#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("illegal instruction at {address:#04x}: {opcode:#04x}")]
  IllegalInstruction { address: u8, opcode: u8 },

  #[error("ALU operation `{op}` is not implemented")]
  UnimplementedAluOp { op: AluOp },

  #[error("machine is halted")]
  MachineHalted,

  #[error("failed to write program output")]
  Output(#[from] io::Error),
}

impl From<alu::Unimplemented> for Error {
  fn from(alu::Unimplemented(op): alu::Unimplemented) -> Self {
    Self::UnimplementedAluOp { op }
  }
}

/// What the execution loop should do with `pc` once a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
  Advance,
  Jump(u8),
  Halt,
}

struct Task<'vm, 'out, W> {
  vm: &'vm mut Vm,
  out: &'out mut W,
  pc: u8,
  // operands are fetched whether or not the instruction uses them
  a: u8,
  b: u8,
}

impl<'vm, 'out, W> Task<'vm, 'out, W>
where
  W: Write,
{
  fn new(vm: &'vm mut Vm, out: &'out mut W, pc: u8) -> Self {
    let a = vm.read(pc.wrapping_add(1));
    let b = vm.read(pc.wrapping_add(2));
    Self { vm, out, pc, a, b }
  }

  fn run(&mut self, op: Opcode) -> Result<Flow, Error> {
    let equal = self.vm.flags.equal();
    let flow = match op {
      Opcode::LoadImmediate => load_immediate(self),
      Opcode::Print => print(self)?,
      Opcode::Halt => Flow::Halt,
      Opcode::Multiply => self.alu(AluOp::Mul)?,
      Opcode::Add => self.alu(AluOp::Add)?,
      Opcode::Push => push(self),
      Opcode::Pop => pop(self),
      Opcode::Call => call(self),
      Opcode::Return => Flow::Jump(self.vm.pop()),
      Opcode::Compare => compare(self),
      Opcode::Jump => Flow::Jump(self.vm.register(self.a)),
      Opcode::JumpIfEqual => jump_if(self, equal),
      Opcode::JumpIfNotEqual => jump_if(self, !equal),
    };
    Ok(flow)
  }

  fn alu(&mut self, op: AluOp) -> Result<Flow, Error> {
    self.vm.alu(op, self.a, self.b)?;
    Ok(Flow::Advance)
  }
}

// r[a] ← b
fn load_immediate<W>(task: &mut Task<'_, '_, W>) -> Flow {
  task.vm.set_register(task.a, task.b);
  Flow::Advance
}

// out ← r[a]
fn print<W>(task: &mut Task<'_, '_, W>) -> Result<Flow, Error>
where
  W: Write,
{
  writeln!(task.out, "{}", task.vm.register(task.a))?;
  Ok(Flow::Advance)
}

// sp ← sp - 1; m[sp] ← r[a]
fn push<W>(task: &mut Task<'_, '_, W>) -> Flow {
  let value = task.vm.register(task.a);
  task.vm.push(value);
  Flow::Advance
}

// r[a] ← m[sp]; sp ← sp + 1
fn pop<W>(task: &mut Task<'_, '_, W>) -> Flow {
  let value = task.vm.pop();
  task.vm.set_register(task.a, value);
  Flow::Advance
}

// push(pc + 2); pc ← r[a]
fn call<W>(task: &mut Task<'_, '_, W>) -> Flow {
  let ret = task.pc.wrapping_add(Opcode::Call.descriptor().width());
  task.vm.push(ret);
  Flow::Jump(task.vm.register(task.a))
}

// fl ← cmp(r[a], r[b])
fn compare<W>(task: &mut Task<'_, '_, W>) -> Flow {
  task.vm.flags = Flags::compare(task.vm.register(task.a), task.vm.register(task.b));
  Flow::Advance
}

// if cond : pc ← r[a]
fn jump_if<W>(task: &mut Task<'_, '_, W>, cond: bool) -> Flow {
  if cond {
    Flow::Jump(task.vm.register(task.a))
  } else {
    Flow::Advance
  }
}

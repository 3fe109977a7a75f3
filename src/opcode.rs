use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  /// Halts the machine.
  ///
  /// | Operation | Semantics/RTL      | Assembly |
  /// |-----------|--------------------|----------|
  /// | Halt      | `(stop execution)` | `HLT`    |
  Halt = 0b0000_0001,

  /// Returns from a subroutine.
  ///
  /// | Operation | Semantics/RTL           | Assembly |
  /// |-----------|-------------------------|----------|
  /// | Return    | `pc ← m[sp]; sp ← sp+1` | `RET`    |
  Return = 0b0001_0001,

  /// Pushes a register onto the stack.
  ///
  /// | Operation | Semantics/RTL             | Assembly  |
  /// |-----------|---------------------------|-----------|
  /// | Push      | `sp ← sp-1; m[sp] ← r[a]` | `PUSH ra` |
  Push = 0b0100_0101,

  /// Pops the top of the stack into a register.
  ///
  /// | Operation | Semantics/RTL             | Assembly |
  /// |-----------|---------------------------|----------|
  /// | Pop       | `r[a] ← m[sp]; sp ← sp+1` | `POP ra` |
  Pop = 0b0100_0110,

  /// Prints a register as a decimal number followed by a newline.
  ///
  /// | Operation | Semantics/RTL  | Assembly |
  /// |-----------|----------------|----------|
  /// | Print     | `out ← r[a]`   | `PRN ra` |
  Print = 0b0100_0111,

  /// Calls the subroutine whose address is held in a register.
  ///
  /// | Operation | Semantics/RTL                      | Assembly  |
  /// |-----------|------------------------------------|-----------|
  /// | Call      | `push(pc + 2); pc ← r[a]`          | `CALL ra` |
  Call = 0b0101_0000,

  /// | Operation | Semantics/RTL | Assembly |
  /// |-----------|---------------|----------|
  /// | Jump      | `pc ← r[a]`   | `JMP ra` |
  Jump = 0b0101_0100,

  /// | Operation     | Semantics/RTL           | Assembly |
  /// |---------------|-------------------------|----------|
  /// | Jump if Equal | `if E : pc ← r[a]`      | `JEQ ra` |
  JumpIfEqual = 0b0101_0101,

  /// | Operation         | Semantics/RTL       | Assembly |
  /// |-------------------|---------------------|----------|
  /// | Jump if Not Equal | `if !E : pc ← r[a]` | `JNE ra` |
  JumpIfNotEqual = 0b0101_0110,

  /// Loads an immediate value into a register.
  ///
  /// | Operation      | Semantics/RTL | Assembly      |
  /// |----------------|---------------|---------------|
  /// | Load Immediate | `r[a] ← b`    | `LDI ra, b`   |
  LoadImmediate = 0b1000_0010,

  /// | Operation | Semantics/RTL          | Assembly      |
  /// |-----------|------------------------|---------------|
  /// | Add       | `r[a] ← r[a] + r[b]`   | `ADD ra, rb`  |
  Add = 0b1010_0000,

  /// | Operation | Semantics/RTL          | Assembly      |
  /// |-----------|------------------------|---------------|
  /// | Multiply  | `r[a] ← r[a] × r[b]`   | `MUL ra, rb`  |
  Multiply = 0b1010_0010,

  /// Compares two registers and sets the `L`, `G` and `E` flags.
  ///
  /// | Operation | Semantics/RTL          | Assembly      |
  /// |-----------|------------------------|---------------|
  /// | Compare   | `fl ← cmp(r[a], r[b])` | `CMP ra, rb`  |
  Compare = 0b1010_0111,
}

/// How an instruction is laid out in memory and how it moves the program
/// counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
  /// Number of operand bytes following the opcode (0, 1 or 2).
  pub operands: u8,
  /// Whether the instruction is responsible for setting `pc` itself.
  pub sets_pc: bool,
}

impl Descriptor {
  const fn new(operands: u8, sets_pc: bool) -> Self {
    Self { operands, sets_pc }
  }

  /// Total encoded size of the instruction, opcode included.
  pub const fn width(self) -> u8 {
    1 + self.operands
  }
}

impl Opcode {
  pub const ALL: [Opcode; 13] = [
    Opcode::Halt,
    Opcode::Return,
    Opcode::Push,
    Opcode::Pop,
    Opcode::Print,
    Opcode::Call,
    Opcode::Jump,
    Opcode::JumpIfEqual,
    Opcode::JumpIfNotEqual,
    Opcode::LoadImmediate,
    Opcode::Add,
    Opcode::Multiply,
    Opcode::Compare,
  ];

  pub const fn descriptor(self) -> Descriptor {
    match self {
      Self::Halt => Descriptor::new(0, false),
      Self::Return => Descriptor::new(0, true),
      Self::Push => Descriptor::new(1, false),
      Self::Pop => Descriptor::new(1, false),
      Self::Print => Descriptor::new(1, false),
      Self::Call => Descriptor::new(1, true),
      Self::Jump => Descriptor::new(1, true),
      Self::JumpIfEqual => Descriptor::new(1, true),
      Self::JumpIfNotEqual => Descriptor::new(1, true),
      Self::LoadImmediate => Descriptor::new(2, false),
      Self::Add => Descriptor::new(2, false),
      Self::Multiply => Descriptor::new(2, false),
      Self::Compare => Descriptor::new(2, false),
    }
  }

  pub const fn mnemonic(self) -> &'static str {
    match self {
      Self::Halt => "HLT",
      Self::Return => "RET",
      Self::Push => "PUSH",
      Self::Pop => "POP",
      Self::Print => "PRN",
      Self::Call => "CALL",
      Self::Jump => "JMP",
      Self::JumpIfEqual => "JEQ",
      Self::JumpIfNotEqual => "JNE",
      Self::LoadImmediate => "LDI",
      Self::Add => "ADD",
      Self::Multiply => "MUL",
      Self::Compare => "CMP",
    }
  }
}

impl fmt::Display for Opcode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.mnemonic())
  }
}

/// Decoding fails with the offending byte when it names no instruction.
impl TryFrom<u8> for Opcode {
  type Error = u8;

  fn try_from(byte: u8) -> Result<Self, Self::Error> {
    match byte {
      0b0000_0001 => Ok(Self::Halt),
      0b0001_0001 => Ok(Self::Return),
      0b0100_0101 => Ok(Self::Push),
      0b0100_0110 => Ok(Self::Pop),
      0b0100_0111 => Ok(Self::Print),
      0b0101_0000 => Ok(Self::Call),
      0b0101_0100 => Ok(Self::Jump),
      0b0101_0101 => Ok(Self::JumpIfEqual),
      0b0101_0110 => Ok(Self::JumpIfNotEqual),
      0b1000_0010 => Ok(Self::LoadImmediate),
      0b1010_0000 => Ok(Self::Add),
      0b1010_0010 => Ok(Self::Multiply),
      0b1010_0111 => Ok(Self::Compare),
      other => Err(other),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_every_opcode() {
    for op in Opcode::ALL {
      assert_eq!(Opcode::try_from(op as u8), Ok(op));
    }
  }

  #[test]
  fn decode_unknown_byte() {
    assert_eq!(Opcode::try_from(0x00), Err(0x00));
    assert_eq!(Opcode::try_from(0xFF), Err(0xFF));
    // ALU SUB exists in the encoding space but not in this machine
    assert_eq!(Opcode::try_from(0b1010_0001), Err(0b1010_0001));
  }

  // the table must agree with the bits packed into each opcode:
  // AABCDDDD, where AA is the operand count and C is "sets pc"
  #[test]
  fn descriptor_matches_encoding() {
    for op in Opcode::ALL {
      let byte = op as u8;
      let descriptor = op.descriptor();
      assert_eq!(descriptor.operands, byte >> 6, "{op}");
      assert_eq!(descriptor.sets_pc, (byte >> 4) & 1 == 1, "{op}");
    }
  }

  #[test]
  fn width() {
    assert_eq!(Opcode::Halt.descriptor().width(), 1);
    assert_eq!(Opcode::Call.descriptor().width(), 2);
    assert_eq!(Opcode::LoadImmediate.descriptor().width(), 3);
  }
}

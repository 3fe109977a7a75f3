use std::fmt;

/// Operations the arithmetic/logic unit can be asked to perform.
///
/// The LS8 encoding reserves a selector for every one of these, but only
/// `Add` and `Mul` are wired up; the rest fail with [`Unimplemented`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  And,
  Or,
  Xor,
}

impl fmt::Display for AluOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Add => "ADD",
      Self::Sub => "SUB",
      Self::Mul => "MUL",
      Self::Div => "DIV",
      Self::Mod => "MOD",
      Self::And => "AND",
      Self::Or => "OR",
      Self::Xor => "XOR",
    };
    f.write_str(name)
  }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ALU operation `{0}` is not implemented")]
pub struct Unimplemented(pub AluOp);

/// Computes `lhs <op> rhs` with 8-bit wraparound.
pub fn apply(op: AluOp, lhs: u8, rhs: u8) -> Result<u8, Unimplemented> {
  match op {
    AluOp::Add => Ok(lhs.wrapping_add(rhs)),
    AluOp::Mul => Ok(lhs.wrapping_mul(rhs)),
    other => Err(Unimplemented(other)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_wraps() {
    assert_eq!(apply(AluOp::Add, 250, 10), Ok(4)); // 260 mod 256
    assert_eq!(apply(AluOp::Add, 2, 3), Ok(5));
  }

  #[test]
  fn mul_wraps() {
    assert_eq!(apply(AluOp::Mul, 8, 9), Ok(72));
    assert_eq!(apply(AluOp::Mul, 16, 17), Ok(16)); // 272 mod 256
  }

  #[test]
  fn unimplemented_ops_fail() {
    for op in [
      AluOp::Sub,
      AluOp::Div,
      AluOp::Mod,
      AluOp::And,
      AluOp::Or,
      AluOp::Xor,
    ] {
      assert_eq!(apply(op, 1, 1), Err(Unimplemented(op)));
    }
  }
}

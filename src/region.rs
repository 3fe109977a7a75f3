use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A region of instructions
pub trait Region {
  fn instructions(&self) -> &[u8];
}

/// A `Chunk` is a program image our virtual machine may load into memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
  instructions: Vec<u8>,
}

/// An error that occurred while reading a program image
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
  #[error("cannot open file {}", .path.display())]
  NotFound { path: PathBuf },

  #[error("cannot read file {}: {source}", .path.display())]
  Unreadable {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("program image is {len} bytes, which does not fit in memory")]
  TooLarge { len: usize },
}

impl Chunk {
  /// Parses the textual `.ls8` format: one byte per line, written in base 2.
  ///
  /// Leading whitespace and an optional `+`/`-` sign are skipped, and parsing
  /// stops at the first character that is not a binary digit, so trailing
  /// `# comments` are fine. Lines with no digit after that are ignored.
  /// Negative numbers are stored in two's complement and numbers wider than
  /// a byte keep their low 8 bits.
  pub fn parse(text: &str) -> Self {
    let instructions = text.lines().filter_map(parse_line).collect();
    Self { instructions }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| match source.kind() {
      io::ErrorKind::NotFound => LoadError::NotFound {
        path: path.to_path_buf(),
      },
      _ => LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
      },
    })?;
    let chunk = Self::parse(&String::from_utf8_lossy(&bytes));
    tracing::debug!(
      "parsed {} bytes of program from {}",
      chunk.len(),
      path.display()
    );
    Ok(chunk)
  }

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }
}

fn parse_line(line: &str) -> Option<u8> {
  let line = line.trim_start();
  let (negative, rest) = match line.as_bytes().first() {
    Some(b'-') => (true, &line[1..]),
    Some(b'+') => (false, &line[1..]),
    _ => (false, line),
  };
  let digits = rest
    .bytes()
    .take_while(|b| matches!(b, b'0' | b'1'))
    .map(|b| b - b'0');
  let mut value: Option<u8> = None;
  for digit in digits {
    let acc = value.unwrap_or(0);
    value = Some((acc << 1) | digit);
  }
  if negative {
    value.map(u8::wrapping_neg)
  } else {
    value
  }
}

impl From<Vec<u8>> for Chunk {
  fn from(instructions: Vec<u8>) -> Self {
    Self { instructions }
  }
}

impl Region for Chunk {
  fn instructions(&self) -> &[u8] {
    &self.instructions
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_with_comments() {
    let text = "\
# print8.ls8

10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";
    let chunk = Chunk::parse(text);
    assert_eq!(chunk.instructions(), &[0x82, 0x00, 0x08, 0x47, 0x00, 0x01]);
  }

  #[test]
  fn parse_skips_lines_without_digits() {
    let chunk = Chunk::parse("\n   \n# comment\nabc\n  101\r\n");
    assert_eq!(chunk.instructions(), &[0b101]);
  }

  #[test]
  fn parse_stops_at_first_non_binary_digit() {
    // `2` ends the number, like the `#` of a comment would
    let chunk = Chunk::parse("1121\n");
    assert_eq!(chunk.instructions(), &[0b11]);
  }

  #[test]
  fn parse_keeps_low_byte() {
    let chunk = Chunk::parse("100000001\n");
    assert_eq!(chunk.instructions(), &[0x01]);
  }

  #[test]
  fn parse_signed() {
    let chunk = Chunk::parse("-1\n+101\n  -10 # two\n-\n+ 1\n");
    assert_eq!(chunk.instructions(), &[0xFF, 0b101, 0xFE]);
  }

  #[test]
  fn parse_empty() {
    assert!(Chunk::parse("").is_empty());
  }

  #[test]
  fn from_missing_path() {
    let err = Chunk::from_path("definitely/not/here.ls8").unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }));
    assert_eq!(err.to_string(), "cannot open file definitely/not/here.ls8");
  }

  #[test]
  fn from_directory_is_unreadable() {
    let err = Chunk::from_path(env!("CARGO_MANIFEST_DIR")).unwrap_err();
    assert!(matches!(err, LoadError::Unreadable { .. }));
  }
}

//! A USTAR archive is a flat sequence of 512 byte blocks:
//!
//! * [Header](header/index.html): one block describing an entry
//! * Data: `ceil(size / 512)` blocks holding the entry contents, zero padded
//!
//! The archive ends at the first header with an empty name. Writers emit two
//! zeroed blocks for this, readers only need to look at the first one.
//!
//! Numeric header fields are ASCII octal, left padded with `0` and terminated
//! by NUL or space.

use bitflags::bitflags;
use thiserror::Error;

use std::fmt;
use std::fmt::Write;

pub mod header;

pub use header::{append, finish, Header};

/// Size of a header, and the unit every data section is padded to
pub const BLOCK_SIZE: usize = 512;

/// Number of data blocks following a header for an entry of `size` bytes
#[inline]
pub fn blocks_for(size: usize) -> usize {
    (size + BLOCK_SIZE - 1) / BLOCK_SIZE
}

/// Number of zero bytes between the end of `size` bytes of data and the next header
#[inline]
pub fn padding(size: usize) -> usize {
    blocks_for(size) * BLOCK_SIZE - size
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum OctalError {
    #[error("field is empty")]
    Empty,
    #[error("invalid octal digit {byte:#04x}")]
    InvalidDigit { byte: u8 },
    #[error("value does not fit")]
    Overflow,
}

/// Decode an octal header field
///
/// Leading spaces are skipped, and digits are read up to the first NUL or space.
/// Only NULs and spaces may follow the terminator.
pub fn parse_octal(field: &[u8]) -> Result<u64, OctalError> {
    let start = field
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or_else(|| field.len());
    let field = &field[start..];
    let end = field
        .iter()
        .position(|&b| b == 0 || b == b' ')
        .unwrap_or_else(|| field.len());
    let (digits, rest) = field.split_at(end);

    if let Some(&byte) = rest.iter().find(|&&b| b != 0 && b != b' ') {
        return Err(OctalError::InvalidDigit { byte });
    }
    if digits.is_empty() {
        return Err(OctalError::Empty);
    }

    digits.iter().try_fold(0u64, |acc, &byte| {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(OctalError::InvalidDigit { byte });
        }
        acc.checked_mul(8)
            .and_then(|acc| acc.checked_add(u64::from(byte - b'0')))
            .ok_or(OctalError::Overflow)
    })
}

/// Encode `value` as zero padded octal, NUL terminated, filling `field`
///
/// The field is left untouched if `value` needs more digits than it holds.
pub fn write_octal(field: &mut [u8], value: u64) -> Result<(), OctalError> {
    let digits = field.len() - 1;
    let encoded = format!("{:0width$o}", value, width = digits);
    if encoded.len() > digits {
        return Err(OctalError::Overflow);
    }
    field[..digits].copy_from_slice(encoded.as_bytes());
    field[digits] = 0;
    Ok(())
}

/// The single byte entry type stored in a header
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypeFlag(pub u8);

impl TypeFlag {
    pub const REGULAR: TypeFlag = TypeFlag(b'0');
    /// Regular file, as written by pre-POSIX tar
    pub const REGULAR_OLD: TypeFlag = TypeFlag(0);
    pub const HARD_LINK: TypeFlag = TypeFlag(b'1');
    pub const SYMLINK: TypeFlag = TypeFlag(b'2');
    pub const CHAR_DEV: TypeFlag = TypeFlag(b'3');
    pub const BLOCK_DEV: TypeFlag = TypeFlag(b'4');
    pub const DIRECTORY: TypeFlag = TypeFlag(b'5');
    pub const FIFO: TypeFlag = TypeFlag(b'6');
    pub const CONTIGUOUS: TypeFlag = TypeFlag(b'7');

    pub fn is_file(self) -> bool {
        matches!(
            self,
            TypeFlag::REGULAR | TypeFlag::REGULAR_OLD | TypeFlag::CONTIGUOUS
        )
    }

    pub fn is_dir(self) -> bool {
        self == TypeFlag::DIRECTORY
    }

    /// The `st_mode` type bits matching this flag
    ///
    /// Hard links and unknown flags map to `Mode::NONE`.
    pub fn mode_type(self) -> Mode {
        match self {
            TypeFlag::REGULAR | TypeFlag::REGULAR_OLD | TypeFlag::CONTIGUOUS => Mode::TYPE_FILE,
            TypeFlag::SYMLINK => Mode::TYPE_LINK,
            TypeFlag::CHAR_DEV => Mode::TYPE_CHAR,
            TypeFlag::BLOCK_DEV => Mode::TYPE_BLOCK,
            TypeFlag::DIRECTORY => Mode::TYPE_DIR,
            TypeFlag::FIFO => Mode::TYPE_FIFO,
            _ => Mode::NONE,
        }
    }
}

impl fmt::Debug for TypeFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TypeFlag({:?})", char::from(self.0))
    }
}

impl fmt::Display for TypeFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char(char::from(self.0))
    }
}

bitflags! {
    #[derive(Default)]
    pub struct Mode: u32 {
        const OTHER_EXEC =  0o000_001;
        const OTHER_WRITE = 0o000_002;
        const OTHER_READ =  0o000_004;
        const GROUP_EXEC =  0o000_010;
        const GROUP_WRITE = 0o000_020;
        const GROUP_READ =  0o000_040;
        const USER_EXEC =   0o000_100;
        const USER_WRITE =  0o000_200;
        const USER_READ =   0o000_400;
        const BIT_STICKY =  0o001_000;
        const BIT_SGID =    0o002_000;
        const BIT_SUID =    0o004_000;

        const TYPE_FIFO =   0o010_000;
        const TYPE_CHAR =   0o020_000;
        const TYPE_DIR  =   0o040_000;
        const TYPE_BLOCK =  0o060_000;
        const TYPE_FILE =   0o100_000;
        const TYPE_LINK =   0o120_000;
        const TYPE_SOCKET = 0o140_000;
    }
}

impl Mode {
    pub const O755: Mode = Mode { bits: 0o000_755 };
    pub const O644: Mode = Mode { bits: 0o000_644 };
    pub const PERM_MASK: Mode = Mode { bits: 0o007_777 };
    pub const TYPE_MASK: Mode = Mode { bits: 0o170_000 };
    pub const NONE: Mode = Mode { bits: 0 };
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let type_char = match *self & Mode::TYPE_MASK {
            Mode::TYPE_DIR => 'd',
            Mode::TYPE_CHAR => 'c',
            Mode::TYPE_BLOCK => 'b',
            Mode::TYPE_FILE => '-',
            Mode::TYPE_LINK => 'l',
            Mode::TYPE_SOCKET => 's',
            Mode::TYPE_FIFO => 'p',
            _ => '?',
        };

        let bit = |flag: Mode, set: char| if self.contains(flag) { set } else { '-' };
        let exec = |x: Mode, special: Mode, lower: char, upper: char| {
            match *self & (x | special) {
                Mode::NONE => '-',
                m if m == x => 'x',
                m if m == special => upper,
                // Both
                _ => lower,
            }
        };

        f.write_char(type_char)?;
        f.write_char(bit(Mode::USER_READ, 'r'))?;
        f.write_char(bit(Mode::USER_WRITE, 'w'))?;
        f.write_char(exec(Mode::USER_EXEC, Mode::BIT_SUID, 's', 'S'))?;
        f.write_char(bit(Mode::GROUP_READ, 'r'))?;
        f.write_char(bit(Mode::GROUP_WRITE, 'w'))?;
        f.write_char(exec(Mode::GROUP_EXEC, Mode::BIT_SGID, 's', 'S'))?;
        f.write_char(bit(Mode::OTHER_READ, 'r'))?;
        f.write_char(bit(Mode::OTHER_WRITE, 'w'))?;
        f.write_char(exec(Mode::OTHER_EXEC, Mode::BIT_STICKY, 't', 'T'))?;

        Ok(())
    }
}

// Core value types for the ledger surface.
//
// These are the nouns every ledger method and event speaks in: game ids,
// account addresses, 256-bit hashes (commitment roots, salts, proof nodes),
// wager amounts, and the board-size / ship-count vectors fixed at game
// creation. They are shared by `message.rs`, `snapshot.rs`, the board crate,
// and the session crate.
//
// `Address` and `Hash32` serialize as `0x`-prefixed lowercase hex strings so
// they read naturally in JSON and can be used as map keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Smallest supported board side (4x4).
pub const MIN_BOARD_SIDE: u8 = 4;

/// Largest supported board side (8x8).
pub const MAX_BOARD_SIDE: u8 = 8;

/// Number of ship lengths the ledger knows about (lengths 1 through 4).
pub const SHIP_KINDS: usize = 4;

/// Error returned when a hex string cannot be parsed into a fixed-width value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseHexError {
    #[error("expected {expected} hex digits, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("invalid hex digit in {0:?}")]
    InvalidDigit(String),
}

fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseHexError::InvalidDigit(s.to_string()));
    }
    if digits.len() != N * 2 {
        return Err(ParseHexError::WrongLength {
            expected: N * 2,
            actual: digits.len(),
        });
    }
    let mut bytes = [0u8; N];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let pair = digits
            .get(i * 2..i * 2 + 2)
            .ok_or_else(|| ParseHexError::InvalidDigit(s.to_string()))?;
        *byte =
            u8::from_str_radix(pair, 16).map_err(|_| ParseHexError::InvalidDigit(s.to_string()))?;
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Fixed-width hex values
// ---------------------------------------------------------------------------

macro_rules! hex_value {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex::<$len>(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("0x")?;
                for b in &self.0 {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_value!(/// A 20-byte ledger account address.
Address, 20);
hex_value!(/// A 256-bit value: commitment roots, leaf hashes, proof nodes, and salts.
Hash32, 32);

impl Address {
    /// Abbreviated form for game listings: first five and last four
    /// characters of the hex rendering, e.g. `0x12a...9f0c`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..5], &full[full.len() - 4..])
    }
}

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

// ---------------------------------------------------------------------------
// Game identifiers and amounts
// ---------------------------------------------------------------------------

/// Ledger-assigned game id. Ids are allocated sequentially, so a larger id
/// is a newer game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game #{}", self.0)
    }
}

/// A wager or bet amount in the ledger's smallest currency unit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Wager(pub u128);

impl Wager {
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Wager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Board geometry and ship vector
// ---------------------------------------------------------------------------

/// Error for board-size and ship-count values outside the ledger's domain.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("board side {0} is outside {MIN_BOARD_SIDE}..={MAX_BOARD_SIDE}")]
    BoardSide(u8),
    #[error("board cell count {0} is not a square from 16 to 64")]
    BoardCells(u16),
    #[error("reserved ship slot must be zero, got {0}")]
    ReservedSlot(u8),
}

/// Total cell count of a square board: one of 16, 25, 36, 49, 64.
///
/// The ledger stores the cell count, not the side; `side()` recovers it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct BoardSize(u8);

impl BoardSize {
    pub fn from_side(side: u8) -> Result<Self, DomainError> {
        if !(MIN_BOARD_SIDE..=MAX_BOARD_SIDE).contains(&side) {
            return Err(DomainError::BoardSide(side));
        }
        Ok(Self(side))
    }

    pub fn from_cells(cells: u16) -> Result<Self, DomainError> {
        (MIN_BOARD_SIDE..=MAX_BOARD_SIDE)
            .find(|&side| u16::from(side) * u16::from(side) == cells)
            .map(Self)
            .ok_or(DomainError::BoardCells(cells))
    }

    pub fn side(self) -> u8 {
        self.0
    }

    pub fn cells(self) -> u16 {
        u16::from(self.0) * u16::from(self.0)
    }
}

impl TryFrom<u16> for BoardSize {
    type Error = DomainError;

    fn try_from(cells: u16) -> Result<Self, Self::Error> {
        Self::from_cells(cells)
    }
}

impl From<BoardSize> for u16 {
    fn from(size: BoardSize) -> u16 {
        size.cells()
    }
}

/// Ship count vector as stored by the ledger:
/// `[count_len1, count_len2, count_len3, count_len4, reserved]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipCounts(pub [u8; SHIP_KINDS + 1]);

impl ShipCounts {
    /// Build from the four per-length counts, reserved slot zeroed.
    pub fn new(by_length: [u8; SHIP_KINDS]) -> Self {
        let mut counts = [0u8; SHIP_KINDS + 1];
        counts[..SHIP_KINDS].copy_from_slice(&by_length);
        Self(counts)
    }

    /// Reject vectors with a non-zero reserved slot.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.0[SHIP_KINDS] {
            0 => Ok(()),
            other => Err(DomainError::ReservedSlot(other)),
        }
    }

    /// Expected number of ships of `length` (1..=4); zero for other lengths.
    pub fn count(&self, length: u8) -> u8 {
        match length {
            1..=4 => self.0[usize::from(length) - 1],
            _ => 0,
        }
    }

    /// Total number of ships across all lengths.
    pub fn total_ships(&self) -> u32 {
        self.0[..SHIP_KINDS].iter().map(|&c| u32::from(c)).sum()
    }

    /// Total number of cells a valid placement must occupy: `Σ(length × count)`.
    pub fn total_cells(&self) -> u32 {
        (1..=SHIP_KINDS as u8)
            .map(|len| u32::from(len) * u32::from(self.count(len)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_and_parse_agree() {
        let addr = Address([0xAB; 20]);
        let text = addr.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_short_form() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0x12;
        bytes[19] = 0x9f;
        let addr = Address(bytes);
        assert_eq!(addr.short(), "0x120...009f");
    }

    #[test]
    fn hash_parse_rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<Hash32>(),
            Err(ParseHexError::WrongLength {
                expected: 64,
                actual: 4
            })
        );
        let bad = format!("0x{}", "zz".repeat(32));
        assert!(matches!(
            bad.parse::<Hash32>(),
            Err(ParseHexError::InvalidDigit(_))
        ));
    }

    #[test]
    fn sign_characters_are_not_hex_digits() {
        let plus = format!("0x+f{}", "00".repeat(19));
        assert_eq!(
            plus.parse::<Address>(),
            Err(ParseHexError::InvalidDigit(plus.clone()))
        );
        let minus = format!("-1{}", "00".repeat(31));
        assert!(minus.parse::<Hash32>().is_err());
        let json = format!("\"0x+f{}\"", "ab".repeat(31));
        assert!(serde_json::from_str::<Hash32>(&json).is_err());
    }

    #[test]
    fn hash_serializes_as_hex_string() {
        let h = Hash32([1; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(32)));
        let back: Hash32 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn zero_hash() {
        assert!(Hash32::ZERO.is_zero());
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!Hash32(bytes).is_zero());
    }

    #[test]
    fn board_size_domain() {
        for (side, cells) in [(4, 16), (5, 25), (6, 36), (7, 49), (8, 64)] {
            let size = BoardSize::from_side(side).unwrap();
            assert_eq!(size.cells(), cells);
            assert_eq!(BoardSize::from_cells(cells).unwrap(), size);
        }
        assert_eq!(BoardSize::from_side(3), Err(DomainError::BoardSide(3)));
        assert_eq!(BoardSize::from_side(9), Err(DomainError::BoardSide(9)));
        assert_eq!(BoardSize::from_cells(20), Err(DomainError::BoardCells(20)));
        assert_eq!(BoardSize::from_cells(81), Err(DomainError::BoardCells(81)));
    }

    #[test]
    fn board_size_serializes_as_cell_count() {
        let size = BoardSize::from_side(6).unwrap();
        assert_eq!(serde_json::to_string(&size).unwrap(), "36");
        assert!(serde_json::from_str::<BoardSize>("35").is_err());
    }

    #[test]
    fn ship_counts_totals() {
        let counts = ShipCounts::new([2, 1, 0, 1]);
        assert_eq!(counts.0, [2, 1, 0, 1, 0]);
        assert_eq!(counts.total_ships(), 4);
        assert_eq!(counts.total_cells(), 2 + 2 + 4);
        assert_eq!(counts.count(4), 1);
        assert_eq!(counts.count(5), 0);
        assert!(counts.validate().is_ok());
        assert_eq!(
            ShipCounts([1, 0, 0, 0, 3]).validate(),
            Err(DomainError::ReservedSlot(3))
        );
    }
}

//! 2x2 colour-filter-array pattern descriptor.
//!
//! A mosaiced sensor records one colour channel per pixel site, repeating a
//! 2x2 tile across the image. The pattern is named by four characters in
//! row-major tile order (`"rggb"`, `"bggr"`, `"grbg"`, `"gbrg"`). When a
//! patch's top-left corner is not aligned to the full image's tile origin,
//! [`CfaPattern::shifted`] produces the pattern seen from that corner.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CfaError {
    #[error("CFA pattern must have exactly 4 characters, got {0:?}")]
    Length(String),
    #[error("unknown CFA channel {0:?} (expected 'r', 'g' or 'b')")]
    Channel(char),
}

/// Repeating 2x2 CFA tile; entries are channel indices (r = 0, g = 1, b = 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfaPattern {
    channels: [usize; 4],
}

impl CfaPattern {
    /// Parse a four-character row-major pattern such as `"rggb"`.
    pub fn parse(descriptor: &str) -> Result<Self, CfaError> {
        let chars: Vec<char> = descriptor.chars().collect();
        if chars.len() != 4 {
            return Err(CfaError::Length(descriptor.to_string()));
        }
        let mut channels = [0usize; 4];
        for (slot, &ch) in channels.iter_mut().zip(chars.iter()) {
            *slot = match ch.to_ascii_lowercase() {
                'r' => 0,
                'g' => 1,
                'b' => 2,
                other => return Err(CfaError::Channel(other)),
            };
        }
        Ok(Self { channels })
    }

    /// The common RGGB Bayer layout.
    pub fn rggb() -> Self {
        Self {
            channels: [0, 1, 1, 2],
        }
    }

    /// Channel index recorded at image position `(row, col)`.
    pub fn channel_at(&self, row: usize, col: usize) -> usize {
        self.channels[(row % 2) * 2 + (col % 2)]
    }

    /// Number of distinct colour channels the pattern addresses.
    pub fn num_channels(&self) -> usize {
        3
    }

    /// Pattern as seen from a corner offset by `(row_offset, col_offset)`
    /// from the full image's tile origin.
    pub fn shifted(&self, row_offset: usize, col_offset: usize) -> Self {
        let mut channels = [0usize; 4];
        for row in 0..2 {
            for col in 0..2 {
                channels[row * 2 + col] = self.channel_at(row + row_offset, col + col_offset);
            }
        }
        Self { channels }
    }
}

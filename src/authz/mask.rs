use std::fmt;

use bitflags::bitflags;

/// Number of characters in a permission mask string.
pub const MASK_WIDTH: usize = 5;

bitflags! {
    /// Capability set carried by a permission.
    ///
    /// The textual form is a zero-padded binary string, most significant bit
    /// first: `Admin Delete Create Write Read`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct PermissionFlags: u8 {
        const READ   = 0b0_0001;
        const WRITE  = 0b0_0010;
        const CREATE = 0b0_0100;
        const DELETE = 0b0_1000;
        const ADMIN  = 0b1_0000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    #[error("permission mask must be 5 characters, got {0}")]
    Length(usize),
    #[error("permission mask must contain only 0 and 1: {0:?}")]
    NotBinary(String),
}

/// Parse a 5-character binary mask.
pub fn to_flags(mask: &str) -> Result<PermissionFlags, MaskError> {
    let width = mask.chars().count();
    if width != MASK_WIDTH {
        return Err(MaskError::Length(width));
    }
    if !mask.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(MaskError::NotBinary(mask.to_string()));
    }

    let bits = u8::from_str_radix(mask, 2).map_err(|_| MaskError::NotBinary(mask.to_string()))?;
    Ok(PermissionFlags::from_bits_truncate(bits))
}

/// Render flags as the fixed-width mask string.
pub fn to_mask_string(flags: PermissionFlags) -> String {
    format!("{:0width$b}", flags.bits(), width = MASK_WIDTH)
}

/// True iff every requested bit is present in `mask`. An empty request always grants.
pub fn grants(mask: &str, requested: PermissionFlags) -> Result<bool, MaskError> {
    let granted = to_flags(mask)?;
    Ok(granted.contains(requested))
}

impl fmt::Display for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_mask_string(*self))
    }
}

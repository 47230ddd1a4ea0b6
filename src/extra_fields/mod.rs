//! Types for extra fields

mod zip64_extended_information;

pub(crate) use zip64_extended_information::Zip64ExtendedInformation;

/// Extra field used in this crate
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum UsedExtraField {
    /// ZIP64 extended information extra field
    Zip64ExtendedInfo = 0x0001,
}

impl UsedExtraField {
    pub(crate) const fn to_le_bytes(self) -> [u8; 2] {
        (self as u16).to_le_bytes()
    }
}

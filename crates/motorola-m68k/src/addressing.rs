//! The twelve 68000 addressing modes.

/// Effective-address mode, decoded from a (mode, register) field pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Data register direct: Dn
    DataReg(u8),
    /// Address register direct: An
    AddrReg(u8),
    /// Address register indirect: (An)
    AddrInd(u8),
    /// Address register indirect with postincrement: (An)+
    AddrIndPostInc(u8),
    /// Address register indirect with predecrement: -(An)
    AddrIndPreDec(u8),
    /// Address register indirect with displacement: (d16,An)
    AddrIndDisp(u8),
    /// Address register indirect with index: (d8,An,Xn)
    AddrIndIndex(u8),
    /// Absolute short: (xxx).W
    AbsShort,
    /// Absolute long: (xxx).L
    AbsLong,
    /// Program counter with displacement: (d16,PC)
    PcDisp,
    /// Program counter with index: (d8,PC,Xn)
    PcIndex,
    /// Immediate: #<data>
    Immediate,
}

impl AddrMode {
    /// Decode from the 3-bit mode and register fields of an opcode.
    #[must_use]
    pub const fn decode(mode: u8, reg: u8) -> Option<Self> {
        let reg = reg & 0x07;
        match mode & 0x07 {
            0 => Some(Self::DataReg(reg)),
            1 => Some(Self::AddrReg(reg)),
            2 => Some(Self::AddrInd(reg)),
            3 => Some(Self::AddrIndPostInc(reg)),
            4 => Some(Self::AddrIndPreDec(reg)),
            5 => Some(Self::AddrIndDisp(reg)),
            6 => Some(Self::AddrIndIndex(reg)),
            7 => match reg {
                0 => Some(Self::AbsShort),
                1 => Some(Self::AbsLong),
                2 => Some(Self::PcDisp),
                3 => Some(Self::PcIndex),
                4 => Some(Self::Immediate),
                _ => None,
            },
            _ => None,
        }
    }

    /// Control addressing: valid for LEA/PEA/JMP/JSR and MOVEM sources.
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(
            self,
            Self::AddrInd(_)
                | Self::AddrIndDisp(_)
                | Self::AddrIndIndex(_)
                | Self::AbsShort
                | Self::AbsLong
                | Self::PcDisp
                | Self::PcIndex
        )
    }

    /// Modes a result can be stored to (excludes An, PC-relative, immediate).
    #[must_use]
    pub const fn is_data_alterable(self) -> bool {
        matches!(
            self,
            Self::DataReg(_)
                | Self::AddrInd(_)
                | Self::AddrIndPostInc(_)
                | Self::AddrIndPreDec(_)
                | Self::AddrIndDisp(_)
                | Self::AddrIndIndex(_)
                | Self::AbsShort
                | Self::AbsLong
        )
    }

    /// Memory modes a result can be stored to.
    #[must_use]
    pub const fn is_memory_alterable(self) -> bool {
        matches!(
            self,
            Self::AddrInd(_)
                | Self::AddrIndPostInc(_)
                | Self::AddrIndPreDec(_)
                | Self::AddrIndDisp(_)
                | Self::AddrIndIndex(_)
                | Self::AbsShort
                | Self::AbsLong
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_covers_all_modes() {
        assert_eq!(AddrMode::decode(0, 3), Some(AddrMode::DataReg(3)));
        assert_eq!(AddrMode::decode(4, 7), Some(AddrMode::AddrIndPreDec(7)));
        assert_eq!(AddrMode::decode(7, 4), Some(AddrMode::Immediate));
        assert_eq!(AddrMode::decode(7, 5), None);
    }

    #[test]
    fn control_class() {
        assert!(AddrMode::AddrInd(0).is_control());
        assert!(AddrMode::PcDisp.is_control());
        assert!(!AddrMode::AddrIndPostInc(0).is_control());
        assert!(!AddrMode::Immediate.is_control());
    }
}

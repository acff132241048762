//! RISC-V register identifiers.

use algostub::arch::RegId;

/// RISC-V Register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RiscvRegId {
    /// General Purpose Register (x0-x31).
    Gpr(u8),
    /// Program Counter.
    Pc,
}

/// Integer register ABI names, indexed by register number.
const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

impl RegId for RiscvRegId {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "pc" => return Some(Self::Pc),
            "fp" => return Some(Self::Gpr(8)),
            _ => {}
        }

        if let Some(n) = ABI_NAMES.iter().position(|&abi| abi == name) {
            return Some(Self::Gpr(n as u8));
        }

        let digits = name.strip_prefix('x')?;
        if !digits.bytes().all(|b| b.is_ascii_digit())
            || (digits.len() > 1 && digits.starts_with('0'))
        {
            return None;
        }
        match digits.parse::<u8>().ok()? {
            n @ 0..=31 => Some(Self::Gpr(n)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(RiscvRegId::from_name("x0"), Some(RiscvRegId::Gpr(0)));
        assert_eq!(RiscvRegId::from_name("zero"), Some(RiscvRegId::Gpr(0)));
        assert_eq!(RiscvRegId::from_name("a0"), Some(RiscvRegId::Gpr(10)));
        assert_eq!(RiscvRegId::from_name("x10"), Some(RiscvRegId::Gpr(10)));
        assert_eq!(RiscvRegId::from_name("s0"), Some(RiscvRegId::Gpr(8)));
        assert_eq!(RiscvRegId::from_name("fp"), Some(RiscvRegId::Gpr(8)));
        assert_eq!(RiscvRegId::from_name("s11"), Some(RiscvRegId::Gpr(27)));
        assert_eq!(RiscvRegId::from_name("t6"), Some(RiscvRegId::Gpr(31)));
        assert_eq!(RiscvRegId::from_name("pc"), Some(RiscvRegId::Pc));

        assert_eq!(RiscvRegId::from_name("x32"), None);
        assert_eq!(RiscvRegId::from_name("x01"), None);
        assert_eq!(RiscvRegId::from_name("a8"), None);
        assert_eq!(RiscvRegId::from_name("r0"), None);
    }
}

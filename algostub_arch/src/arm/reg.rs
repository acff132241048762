//! Cortex-M register identifiers.

use algostub::arch::RegId;

/// Cortex-M core register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArmCoreRegId {
    /// General purpose registers (R0-R12)
    Gpr(u8),
    /// Stack Pointer (R13)
    Sp,
    /// Link Register (R14)
    Lr,
    /// Program Counter (R15)
    Pc,
    /// Program Status Register
    Xpsr,
    /// Main Stack Pointer
    Msp,
    /// Process Stack Pointer
    Psp,
    /// Control Register
    Control,
}

impl RegId for ArmCoreRegId {
    fn from_name(name: &str) -> Option<Self> {
        let reg = match name {
            "sp" | "r13" => Self::Sp,
            "lr" | "r14" => Self::Lr,
            "pc" | "r15" => Self::Pc,
            "xpsr" => Self::Xpsr,
            "msp" => Self::Msp,
            "psp" => Self::Psp,
            "control" => Self::Control,
            _ => {
                let digits = name.strip_prefix('r')?;
                if !digits.bytes().all(|b| b.is_ascii_digit())
                    || (digits.len() > 1 && digits.starts_with('0'))
                {
                    return None;
                }
                match digits.parse::<u8>().ok()? {
                    n @ 0..=12 => Self::Gpr(n),
                    _ => return None,
                }
            }
        };
        Some(reg)
    }
}

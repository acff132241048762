use log::*;
use num_traits::{CheckedAdd, FromPrimitive, ToPrimitive};

use crate::arch::Arch;
use crate::error::Error;

use super::{Endianness, Target};

macro_rules! word_accessors {
    ($($ty:ty),*) => {
        paste::paste! {
            $(
                /// Read a single target-endian word.
                fn [<read_ $ty>](
                    &mut self,
                    addr: <Self::Arch as Arch>::Usize,
                ) -> Result<$ty, Error<Self::Error>> {
                    let mut buf = [0; core::mem::size_of::<$ty>()];
                    if let Err(e) = self.read_addrs(addr, &mut buf) {
                        debug!("address: {:#x}, {} read failed", addr, stringify!($ty));
                        return Err(e.into());
                    }

                    let val = match self.endianness() {
                        Endianness::Little => <$ty>::from_le_bytes(buf),
                        Endianness::Big => <$ty>::from_be_bytes(buf),
                    };
                    trace!("address: {:#x}, value: {:#x}", addr, val);
                    Ok(val)
                }

                /// Write a single target-endian word.
                fn [<write_ $ty>](
                    &mut self,
                    addr: <Self::Arch as Arch>::Usize,
                    val: $ty,
                ) -> Result<(), Error<Self::Error>> {
                    let buf = match self.endianness() {
                        Endianness::Little => val.to_le_bytes(),
                        Endianness::Big => val.to_be_bytes(),
                    };
                    trace!("address: {:#x}, value: {:#x}", addr, val);
                    self.write_addrs(addr, &buf)?;
                    Ok(())
                }
            )*
        }
    };
}

/// Convenience accessors layered on top of [`Target::read_addrs`] /
/// [`Target::write_addrs`].
///
/// Automatically implemented for every [`Target`].
pub trait TargetMem: Target {
    word_accessors!(u16, u32, u64);

    /// Read `data.len()` bytes starting at `addr`.
    ///
    /// Empty reads are a no-op. Ranges which wrap around the end of the
    /// address space are rejected.
    fn read_buffer(
        &mut self,
        addr: <Self::Arch as Arch>::Usize,
        data: &mut [u8],
    ) -> Result<(), Error<Self::Error>> {
        debug!("reading buffer of {} byte at {:#x}", data.len(), addr);
        if data.is_empty() {
            return Ok(());
        }
        check_wrap::<Self>(addr, data.len())?;
        self.read_addrs(addr, data)?;
        Ok(())
    }

    /// Write `data` starting at `addr`.
    ///
    /// Empty writes are a no-op. Ranges which wrap around the end of the
    /// address space are rejected.
    fn write_buffer(
        &mut self,
        addr: <Self::Arch as Arch>::Usize,
        data: &[u8],
    ) -> Result<(), Error<Self::Error>> {
        debug!("writing buffer of {} byte at {:#x}", data.len(), addr);
        if data.is_empty() {
            return Ok(());
        }
        check_wrap::<Self>(addr, data.len())?;
        self.write_addrs(addr, data)?;
        Ok(())
    }
}

impl<T: Target + ?Sized> TargetMem for T {}

fn check_wrap<T: Target + ?Sized>(
    addr: <T::Arch as Arch>::Usize,
    len: usize,
) -> Result<(), Error<T::Error>> {
    let last = <T::Arch as Arch>::Usize::from_usize(len - 1).and_then(|n| addr.checked_add(&n));
    if last.is_none() {
        error!("address + size wrapped ({:#x}, {:#x})", addr, len);
        return Err(Error::AddressWrap {
            addr: addr.to_u64().unwrap_or(u64::MAX),
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimTarget;

    #[test]
    fn words_follow_target_endianness() {
        let mut target = SimTarget::new();
        target.write_u32(0x2000_0000, 0x1122_3344).unwrap();
        assert_eq!(target.peek(0x2000_0000, 4), &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(target.read_u16(0x2000_0000).unwrap(), 0x3344);

        target.set_endianness(Endianness::Big);
        target.write_u32(0x2000_0000, 0x1122_3344).unwrap();
        assert_eq!(target.peek(0x2000_0000, 4), &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(target.read_u32(0x2000_0000).unwrap(), 0x1122_3344);
    }

    #[test]
    fn empty_buffers_are_noops() {
        let mut target = SimTarget::new();
        let writes = target.write_count();
        target.write_buffer(0xffff_fff0, &[]).unwrap();
        target.read_buffer(0xffff_fff0, &mut []).unwrap();
        assert_eq!(target.write_count(), writes);
    }

    #[test]
    fn wrapping_ranges_are_rejected() {
        let mut target = SimTarget::new();
        let err = target.write_buffer(0xffff_fffc, &[0; 8]).unwrap_err();
        assert!(matches!(
            err,
            Error::AddressWrap {
                addr: 0xffff_fffc,
                len: 8
            }
        ));

        // ends exactly at the top of the address space: no wrap, just unmapped
        let mut buf = [0; 4];
        assert!(matches!(
            target.read_buffer(0xffff_fffc, &mut buf),
            Err(Error::NonFatal)
        ));
    }
}

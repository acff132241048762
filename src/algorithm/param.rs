use alloc::vec;
use alloc::vec::Vec;

use managed::ManagedSlice;
use num_traits::Zero;

/// Direction of an algorithm parameter, as seen from the algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamDirection {
    /// Written to the target before the algorithm starts.
    In,
    /// Read back from the target once the algorithm completes.
    Out,
    /// Both.
    InOut,
}

impl ParamDirection {
    pub(crate) fn is_input(self) -> bool {
        matches!(self, ParamDirection::In | ParamDirection::InOut)
    }

    pub(crate) fn is_output(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// A block of target memory exchanged with an algorithm.
///
/// The parameter's buffer may either be owned, or borrowed from the caller
/// (see [`MemParam::with_buffer`]). Output data is available through
/// [`MemParam::data`] once the algorithm completes.
#[derive(Debug)]
pub struct MemParam<'a, U> {
    address: U,
    data: ManagedSlice<'a, u8>,
    direction: ParamDirection,
}

impl<'a, U: Copy> MemParam<'a, U> {
    /// An input parameter. `data` is copied.
    pub fn input(address: U, data: &[u8]) -> Self {
        MemParam {
            address,
            data: ManagedSlice::Owned(data.to_vec()),
            direction: ParamDirection::In,
        }
    }

    /// An output parameter of `len` bytes.
    pub fn output(address: U, len: usize) -> Self {
        MemParam {
            address,
            data: ManagedSlice::Owned(vec![0; len]),
            direction: ParamDirection::Out,
        }
    }

    /// A parameter backed by a caller-provided buffer.
    ///
    /// For output parameters, the buffer's length determines how many bytes
    /// are read back.
    pub fn with_buffer<B>(address: U, buf: B, direction: ParamDirection) -> Self
    where
        B: Into<ManagedSlice<'a, u8>>,
    {
        MemParam {
            address,
            data: buf.into(),
            direction,
        }
    }

    /// Target address of the parameter.
    pub fn address(&self) -> U {
        self.address
    }

    /// Size of the parameter in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parameter is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The parameter's direction.
    pub fn direction(&self) -> ParamDirection {
        self.direction
    }

    /// The parameter's current contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Take the parameter's buffer, if it is owned.
    pub fn into_vec(self) -> Option<Vec<u8>> {
        match self.data {
            ManagedSlice::Owned(v) => Some(v),
            ManagedSlice::Borrowed(_) => None,
        }
    }
}

/// A core register exchanged with an algorithm.
///
/// Registers are named using the architecture's names (see
/// [`RegId::from_name`](crate::arch::RegId::from_name)).
#[derive(Clone, Debug)]
pub struct RegParam<'a, U> {
    name: &'a str,
    value: U,
    direction: ParamDirection,
}

impl<'a, U: Copy> RegParam<'a, U> {
    /// An input register, set to `value` before the algorithm starts.
    pub fn input(name: &'a str, value: U) -> Self {
        RegParam {
            name,
            value,
            direction: ParamDirection::In,
        }
    }

    /// A register which is both written and read back.
    pub fn in_out(name: &'a str, value: U) -> Self {
        RegParam {
            name,
            value,
            direction: ParamDirection::InOut,
        }
    }

    /// The register's name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The register's current value.
    pub fn value(&self) -> U {
        self.value
    }

    /// The parameter's direction.
    pub fn direction(&self) -> ParamDirection {
        self.direction
    }

    pub(crate) fn set_value(&mut self, value: U) {
        self.value = value
    }
}

impl<'a, U: Copy + Zero> RegParam<'a, U> {
    /// An output register, read back once the algorithm completes.
    pub fn output(name: &'a str) -> Self {
        RegParam {
            name,
            value: U::zero(),
            direction: ParamDirection::Out,
        }
    }
}

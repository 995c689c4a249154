//! Fixed-width scalar types and little-endian access to byte buffers.

use num_traits::{FromBytes, ToBytes};

/// Fixed-width numeric type that can be stored in a fixed-size value buffer.
pub trait Scalar:
    Copy + PartialEq + Default + std::fmt::Debug + ToBytes + FromBytes + Send + Sync + 'static
{
    const SIZE: usize;

    fn read_from<S: AsRef<[u8]>>(src: S) -> Self;

    /// Equality used for run detection. Floating point values compare by bit pattern so that
    /// encoding never merges distinct NaN payloads or signed zeros.
    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

macro_rules! impl_scalar {
    ($($T:ty),*) => {
        $(
            impl Scalar for $T {
                const SIZE: usize = std::mem::size_of::<$T>();

                fn read_from<S: AsRef<[u8]>>(src: S) -> $T {
                    let mut b = [0u8; Self::SIZE];
                    b.copy_from_slice(&src.as_ref()[..Self::SIZE]);
                    <$T as FromBytes>::from_le_bytes(&b)
                }
            }
        )*
    };
}

macro_rules! impl_float_scalar {
    ($($T:ty),*) => {
        $(
            impl Scalar for $T {
                const SIZE: usize = std::mem::size_of::<$T>();

                fn read_from<S: AsRef<[u8]>>(src: S) -> $T {
                    let mut b = [0u8; Self::SIZE];
                    b.copy_from_slice(&src.as_ref()[..Self::SIZE]);
                    <$T as FromBytes>::from_le_bytes(&b)
                }

                fn same_as(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

impl_scalar!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_float_scalar!(f32, f64);

pub trait ValueReader {
    fn read_value<T>(&self, pos: usize) -> T
    where
        T: Scalar;
}

impl<S> ValueReader for S
where
    S: AsRef<[u8]> + ?Sized,
{
    #[inline]
    fn read_value<T>(&self, pos: usize) -> T
    where
        T: Scalar,
    {
        T::read_from(&self.as_ref()[pos..])
    }
}

pub trait ValueWriter {
    /// Appends a value to the end of the buffer.
    fn write_value<T>(&mut self, value: T)
    where
        T: ToBytes;

    /// Writes a value at the specified position in the buffer.
    fn write_value_at<T>(&mut self, pos: usize, value: T)
    where
        T: ToBytes;
}

impl ValueWriter for Vec<u8> {
    #[inline]
    fn write_value<T>(&mut self, value: T)
    where
        T: ToBytes,
    {
        self.extend_from_slice(value.to_le_bytes().as_ref());
    }

    #[inline]
    fn write_value_at<T>(&mut self, pos: usize, value: T)
    where
        T: ToBytes,
    {
        let bytes = value.to_le_bytes();
        let bytes = bytes.as_ref();
        self[pos..pos + bytes.len()].copy_from_slice(bytes);
    }
}

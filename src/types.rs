//! Core data types for raster-twice

use crate::io::ByteOrder;

/// Native storage type of raster cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
}

impl DataType {
    /// Resolves a type from the TIFF `SampleFormat` (1=unsigned, 2=signed,
    /// 3=float) and `BitsPerSample` values
    pub fn from_tiff(sample_format: u64, bits: u64) -> Option<Self> {
        match (sample_format, bits) {
            (1, 8) => Some(DataType::U8),
            (1, 16) => Some(DataType::U16),
            (1, 32) => Some(DataType::U32),
            (2, 8) => Some(DataType::I8),
            (2, 16) => Some(DataType::I16),
            (2, 32) => Some(DataType::I32),
            (3, 32) => Some(DataType::F32),
            (3, 64) => Some(DataType::F64),
            _ => None,
        }
    }

    /// TIFF `SampleFormat` value for this type
    pub fn sample_format(&self) -> u16 {
        match self {
            DataType::U8 | DataType::U16 | DataType::U32 => 1,
            DataType::I8 | DataType::I16 | DataType::I32 => 2,
            DataType::F32 | DataType::F64 => 3,
        }
    }

    /// Returns the size in bytes for this data type
    pub fn size(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }

    /// Returns the size in bits for this data type
    pub fn bits(&self) -> u16 {
        self.size() as u16 * 8
    }

    /// Returns the name of this data type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::U8 => "U8",
            DataType::U16 => "U16",
            DataType::U32 => "U32",
            DataType::I8 => "I8",
            DataType::I16 => "I16",
            DataType::I32 => "I32",
            DataType::F32 => "F32",
            DataType::F64 => "F64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Smallest and largest representable value
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::U8 => (0.0, u8::MAX as f64),
            DataType::U16 => (0.0, u16::MAX as f64),
            DataType::U32 => (0.0, u32::MAX as f64),
            DataType::I8 => (i8::MIN as f64, i8::MAX as f64),
            DataType::I16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::I32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::F32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Null sentinel used when a map is created without an explicit one
    pub fn default_nodata(&self) -> f64 {
        match self {
            DataType::U8 | DataType::U16 | DataType::U32 => self.range().1,
            DataType::I8 | DataType::I16 | DataType::I32 => self.range().0,
            DataType::F32 | DataType::F64 => f64::NAN,
        }
    }

    /// Converts a computed value to the nearest value this type can store.
    ///
    /// Integers round half away from zero and saturate. A saturated result
    /// that lands on `nodata` steps back inside the range, so overflow never
    /// turns a cell null. Anything else is returned as computed, even when
    /// it equals `nodata`.
    pub fn to_native(&self, value: f64, nodata: f64) -> f64 {
        match self {
            DataType::F64 => value,
            DataType::F32 => value as f32 as f64,
            _ => {
                let (min, max) = self.range();
                let rounded = value.round();
                let native = rounded.clamp(min, max);
                if native == rounded || native != nodata {
                    native
                } else if native == max {
                    native - 1.0
                } else {
                    native + 1.0
                }
            }
        }
    }

    /// Decodes one sample stored in `order`
    ///
    /// `bytes` must hold at least [`DataType::size`] bytes.
    pub fn decode_sample(&self, bytes: &[u8], order: ByteOrder) -> f64 {
        macro_rules! decode {
            ($ty:ty, $n:expr) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                match order {
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf) as f64,
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(buf) as f64,
                }
            }};
        }

        match self {
            DataType::U8 => bytes[0] as f64,
            DataType::I8 => bytes[0] as i8 as f64,
            DataType::U16 => decode!(u16, 2),
            DataType::I16 => decode!(i16, 2),
            DataType::U32 => decode!(u32, 4),
            DataType::I32 => decode!(i32, 4),
            DataType::F32 => decode!(f32, 4),
            DataType::F64 => decode!(f64, 8),
        }
    }

    /// Appends one sample in `order`. `value` should already be native
    /// (see [`DataType::to_native`]); integer casts saturate.
    pub fn encode_sample(&self, value: f64, order: ByteOrder, out: &mut Vec<u8>) {
        macro_rules! encode {
            ($v:expr) => {{
                let v = $v;
                match order {
                    ByteOrder::LittleEndian => out.extend_from_slice(&v.to_le_bytes()),
                    ByteOrder::BigEndian => out.extend_from_slice(&v.to_be_bytes()),
                }
            }};
        }

        match self {
            DataType::U8 => out.push(value as u8),
            DataType::I8 => out.push(value as i8 as u8),
            DataType::U16 => encode!(value as u16),
            DataType::I16 => encode!(value as i16),
            DataType::U32 => encode!(value as u32),
            DataType::I32 => encode!(value as i32),
            DataType::F32 => encode!(value as f32),
            DataType::F64 => encode!(value),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u64,
    /// Height in pixels
    pub height: u64,
}

impl Dimensions {
    /// Creates new dimensions
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Returns the total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_size() {
        assert_eq!(DataType::U8.size(), 1);
        assert_eq!(DataType::U16.size(), 2);
        assert_eq!(DataType::U32.size(), 4);
        assert_eq!(DataType::F32.size(), 4);
        assert_eq!(DataType::F64.size(), 8);
        assert_eq!(DataType::I16.bits(), 16);
    }

    #[test]
    fn test_from_tiff() {
        assert_eq!(DataType::from_tiff(1, 8), Some(DataType::U8));
        assert_eq!(DataType::from_tiff(2, 32), Some(DataType::I32));
        assert_eq!(DataType::from_tiff(3, 64), Some(DataType::F64));
        assert_eq!(DataType::from_tiff(3, 16), None);
        assert_eq!(DataType::I16.sample_format(), 2);
    }

    #[test]
    fn test_default_nodata() {
        assert_eq!(DataType::U8.default_nodata(), 255.0);
        assert_eq!(DataType::I32.default_nodata(), i32::MIN as f64);
        assert!(DataType::F32.default_nodata().is_nan());
    }

    #[test]
    fn test_to_native_rounds_and_saturates() {
        let nodata = DataType::I16.default_nodata();
        assert_eq!(DataType::I16.to_native(2.5, nodata), 3.0);
        assert_eq!(DataType::I16.to_native(-2.5, nodata), -3.0);
        assert_eq!(DataType::I16.to_native(70000.0, nodata), i16::MAX as f64);
        // saturating onto the sentinel steps back inside the valid range
        assert_eq!(DataType::I16.to_native(-70000.0, nodata), i16::MIN as f64 + 1.0);
        assert_eq!(DataType::U8.to_native(300.0, 255.0), 254.0);
        assert_eq!(DataType::U8.to_native(-4.0, 0.0), 1.0);
    }

    #[test]
    fn test_to_native_keeps_unsaturated_values() {
        assert_eq!(DataType::I16.to_native(-10000.0, -10000.0), -10000.0);
        assert_eq!(DataType::I16.to_native(-32768.0, -32768.0), -32768.0);
        assert_eq!(DataType::U8.to_native(0.0, 0.0), 0.0);
        assert_eq!(DataType::U8.to_native(254.6, 255.0), 255.0);
    }

    #[test]
    fn test_to_native_float() {
        assert_eq!(DataType::F64.to_native(0.1, f64::NAN), 0.1);
        assert_eq!(DataType::F32.to_native(0.1, f64::NAN), 0.1f32 as f64);
        assert_eq!(DataType::F64.to_native(-9999.0, -9999.0), -9999.0);
    }

    #[test]
    fn test_sample_codec() {
        let mut out = Vec::new();
        DataType::I16.encode_sample(-2.0, ByteOrder::BigEndian, &mut out);
        assert_eq!(out, vec![0xFF, 0xFE]);
        assert_eq!(DataType::I16.decode_sample(&out, ByteOrder::BigEndian), -2.0);

        out.clear();
        DataType::F32.encode_sample(1.5, ByteOrder::LittleEndian, &mut out);
        assert_eq!(out, 1.5f32.to_le_bytes().to_vec());
        assert_eq!(DataType::F32.decode_sample(&out, ByteOrder::LittleEndian), 1.5);

        assert_eq!(DataType::I8.decode_sample(&[0xFF], ByteOrder::LittleEndian), -1.0);
    }

    #[test]
    fn test_dimensions() {
        let dims = Dimensions::new(100, 200);
        assert_eq!(dims.width, 100);
        assert_eq!(dims.height, 200);
        assert_eq!(dims.pixel_count(), 20000);
    }
}

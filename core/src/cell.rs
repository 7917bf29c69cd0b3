use crate::value::{LittleEndianConvert, Value, ValueType};

/// A fixed 16-byte cell used to pass parameters and results across the host
/// boundary without allocating.
///
/// Host code building an argument list for [`Instance::call`](https://docs.rs/wembed)
/// doesn't know ahead of time which lane of a cell a given argument occupies
/// until it has consulted the callee's signature, so `ValueCell` exposes every
/// lane width rather than a single tagged representation. A cell is always
/// read and written as whole lanes: writing through the `i32` accessor and
/// reading through the `i64` accessor at the same index observes whatever
/// bytes happen to be there, exactly as a `transmute` would.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ValueCell([u8; 16]);

macro_rules! impl_lane {
    ($get:ident, $set:ident, $ty:ty, $lanes:expr) => {
        /// Reads lane `index` of this cell as a
        #[doc = concat!("`", stringify!($ty), "`.")]
        ///
        /// # Panics
        ///
        /// Panics if `index >= ", stringify!($lanes), "`.
        #[inline]
        pub fn $get(&self, index: usize) -> $ty {
            const WIDTH: usize = core::mem::size_of::<$ty>();
            let start = index * WIDTH;
            let mut bytes = <$ty as LittleEndianConvert>::Bytes::default();
            bytes.as_mut().copy_from_slice(&self.0[start..start + WIDTH]);
            <$ty>::from_le_bytes(bytes)
        }

        /// Writes `value` into lane `index` of this cell.
        ///
        /// # Panics
        ///
        /// Panics if `index >= ", stringify!($lanes), "`.
        #[inline]
        pub fn $set(&mut self, index: usize, value: $ty) {
            const WIDTH: usize = core::mem::size_of::<$ty>();
            let start = index * WIDTH;
            let bytes = value.into_le_bytes();
            self.0[start..start + WIDTH].copy_from_slice(bytes.as_ref());
        }
    };
}

impl ValueCell {
    /// A cell with every byte zeroed.
    pub const ZERO: ValueCell = ValueCell([0; 16]);

    /// Builds a cell from its raw little-endian byte representation.
    #[inline]
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        ValueCell(bytes)
    }

    /// Returns the raw little-endian byte representation of this cell.
    #[inline]
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Converts a tagged [`Value`] into the cell lane its type occupies.
    ///
    /// A null reference is written as `-1` in the `i32` lane; there is no
    /// other bit pattern a valid function or host index could ever take.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::I32(v) => ValueCell::from(v),
            Value::I64(v) => ValueCell::from(v),
            Value::F32(v) => ValueCell::from(f32::from(v)),
            Value::F64(v) => ValueCell::from(f64::from(v)),
            Value::FuncRef(index) | Value::ExternRef(index) => {
                let mut cell = ValueCell::ZERO;
                cell.set_i32(0, index.map_or(-1, |i| i as i32));
                cell
            }
        }
    }

    /// Reads this cell back out as a [`Value`] of the given type.
    ///
    /// # Panics
    ///
    /// Panics if `value_type` is [`ValueType::V128`]: no instruction this
    /// engine lowers can produce or consume one, so no cell ever needs to
    /// carry one across the host boundary.
    pub fn to_value(self, value_type: ValueType) -> Value {
        match value_type {
            ValueType::I32 => Value::I32(self.get_i32(0)),
            ValueType::I64 => Value::I64(self.get_i64(0)),
            ValueType::F32 => Value::F32(self.get_f32(0).into()),
            ValueType::F64 => Value::F64(self.get_f64(0).into()),
            ValueType::FuncRef => {
                let raw = self.get_i32(0);
                Value::FuncRef(if raw < 0 { None } else { Some(raw as u32) })
            }
            ValueType::ExternRef => {
                let raw = self.get_i32(0);
                Value::ExternRef(if raw < 0 { None } else { Some(raw as u32) })
            }
            ValueType::V128 => panic!("v128 never crosses the host boundary"),
        }
    }

    impl_lane!(get_i8, set_i8, i8, 16);
    impl_lane!(get_u8, set_u8, u8, 16);
    impl_lane!(get_i16, set_i16, i16, 8);
    impl_lane!(get_u16, set_u16, u16, 8);
    impl_lane!(get_i32, set_i32, i32, 4);
    impl_lane!(get_u32, set_u32, u32, 4);
    impl_lane!(get_f32, set_f32, f32, 4);
    impl_lane!(get_i64, set_i64, i64, 2);
    impl_lane!(get_u64, set_u64, u64, 2);
    impl_lane!(get_f64, set_f64, f64, 2);
}

impl From<i32> for ValueCell {
    #[inline]
    fn from(value: i32) -> Self {
        let mut cell = ValueCell::ZERO;
        cell.set_i32(0, value);
        cell
    }
}

impl From<i64> for ValueCell {
    #[inline]
    fn from(value: i64) -> Self {
        let mut cell = ValueCell::ZERO;
        cell.set_i64(0, value);
        cell
    }
}

impl From<f32> for ValueCell {
    #[inline]
    fn from(value: f32) -> Self {
        let mut cell = ValueCell::ZERO;
        cell.set_f32(0, value);
        cell
    }
}

impl From<f64> for ValueCell {
    #[inline]
    fn from(value: f64) -> Self {
        let mut cell = ValueCell::ZERO;
        cell.set_f64(0, value);
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_each_lane_width() {
        let cell = ValueCell::from(-7i32);
        assert_eq!(cell.get_i32(0), -7);

        let cell = ValueCell::from(42i64);
        assert_eq!(cell.get_i64(0), 42);

        let cell = ValueCell::from(core::f32::consts::PI);
        assert_eq!(cell.get_f32(0), core::f32::consts::PI);

        let cell = ValueCell::from(core::f64::consts::E);
        assert_eq!(cell.get_f64(0), core::f64::consts::E);
    }

    #[test]
    fn lanes_alias_the_same_bytes() {
        let mut cell = ValueCell::ZERO;
        cell.set_i8(0, -1);
        cell.set_i8(1, -1);
        assert_eq!(cell.get_u16(0), 0xffff);
    }

    #[test]
    fn narrow_lanes_cover_the_whole_cell() {
        let mut cell = ValueCell::ZERO;
        for (index, byte) in (0u8..16).enumerate() {
            cell.set_u8(index, byte);
        }
        assert_eq!(cell.get_u64(0), 0x0706_0504_0302_0100);
        assert_eq!(cell.get_u64(1), 0x0f0e_0d0c_0b0a_0908);
    }
}

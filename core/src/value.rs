use crate::{
    nan_preserving_float::{F32, F64},
    TrapCode,
};
use core::{fmt, fmt::Display};

/// Type of a value that can sit on the evaluation stack, in a local, or in a
/// function signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueType {
    /// 32-bit signed or unsigned integer.
    I32,
    /// 64-bit signed or unsigned integer.
    I64,
    /// 32-bit IEEE 754-2008 floating point number.
    F32,
    /// 64-bit IEEE 754-2008 floating point number.
    F64,
    /// Nullable reference to a function.
    FuncRef,
    /// Nullable opaque reference handed in by the host.
    ExternRef,
    /// 128-bit vector value.
    ///
    /// Accepted in signatures for forward compatibility, but no instruction
    /// this engine lowers can produce or consume one.
    V128,
}

impl ValueType {
    /// Storage size of a value of this type, in bytes.
    #[inline]
    pub fn byte_size(self) -> u32 {
        match self {
            ValueType::I32 | ValueType::F32 | ValueType::FuncRef | ValueType::ExternRef => 4,
            ValueType::I64 | ValueType::F64 => 8,
            ValueType::V128 => 16,
        }
    }

    /// Whether this type can appear on the evaluation stack of this engine.
    ///
    /// `V128` is accepted in module signatures but rejected the moment the
    /// lowerer would need to move a value of this type.
    #[inline]
    pub fn is_supported(self) -> bool {
        !matches!(self, ValueType::V128)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::FuncRef => write!(f, "funcref"),
            Self::ExternRef => write!(f, "externref"),
            Self::V128 => write!(f, "v128"),
        }
    }
}

/// Runtime representation of a value.
///
/// Wasm code manipulates values of the four basic value types: integers and
/// floating-point (IEEE 754-2008) data of 32 or 64 bit width each, plus the
/// two nullable reference types. There is no distinction between signed and
/// unsigned integer types: operations interpret the bits as whichever the
/// opcode calls for.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    /// Value of 32-bit signed or unsigned integer.
    I32(i32),
    /// Value of 64-bit signed or unsigned integer.
    I64(i64),
    /// Value of 32-bit IEEE 754-2008 floating point number.
    F32(F32),
    /// Value of 64-bit IEEE 754-2008 floating point number.
    F64(F64),
    /// A function index, or `None` for `ref.null func`.
    FuncRef(Option<u32>),
    /// An opaque host-assigned index, or `None` for `ref.null extern`.
    ExternRef(Option<u32>),
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::I32(value) => write!(f, "{value}"),
            Self::I64(value) => write!(f, "{value}"),
            Self::F32(value) => write!(f, "{}", f32::from(*value)),
            Self::F64(value) => write!(f, "{}", f64::from(*value)),
            Self::FuncRef(Some(index)) => write!(f, "funcref({index})"),
            Self::FuncRef(None) => write!(f, "funcref(null)"),
            Self::ExternRef(Some(index)) => write!(f, "externref({index})"),
            Self::ExternRef(None) => write!(f, "externref(null)"),
        }
    }
}

impl Value {
    /// Creates new default value of given type.
    ///
    /// `V128` has no default here: callers must never need one, since no
    /// instruction this engine lowers can produce a `v128` value.
    #[inline]
    pub fn default(value_type: ValueType) -> Option<Self> {
        match value_type {
            ValueType::I32 => Some(Value::I32(0)),
            ValueType::I64 => Some(Value::I64(0)),
            ValueType::F32 => Some(Value::F32(0f32.into())),
            ValueType::F64 => Some(Value::F64(0f64.into())),
            ValueType::FuncRef => Some(Value::FuncRef(None)),
            ValueType::ExternRef => Some(Value::ExternRef(None)),
            ValueType::V128 => None,
        }
    }

    /// Get variable type for this value.
    #[inline]
    pub fn value_type(&self) -> ValueType {
        match *self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::FuncRef(_) => ValueType::FuncRef,
            Value::ExternRef(_) => ValueType::ExternRef,
        }
    }

    /// Returns `T` if this particular [`Value`] contains the appropriate type.
    #[inline]
    pub fn try_into<T: FromValue>(self) -> Option<T> {
        FromValue::from_value(self)
    }
}

/// Trait for creating a typed value from a [`Value`].
pub trait FromValue
where
    Self: Sized,
{
    /// Create a value of type `Self` from a given [`Value`].
    ///
    /// Returns `None` if the [`Value`] is of a different type than expected.
    fn from_value(val: Value) -> Option<Self>;
}

macro_rules! impl_from_value {
    ($expected:ident, $into:ty) => {
        impl FromValue for $into {
            #[inline]
            fn from_value(val: Value) -> Option<Self> {
                match val {
                    Value::$expected(val) => Some(val.transmute_into()),
                    _ => None,
                }
            }
        }
    };
}
impl_from_value!(I32, i32);
impl_from_value!(I64, i64);
impl_from_value!(F32, F32);
impl_from_value!(F64, F64);

impl FromValue for u32 {
    #[inline]
    fn from_value(val: Value) -> Option<Self> {
        match val {
            Value::I32(val) => Some(val.transmute_into()),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    #[inline]
    fn from_value(val: Value) -> Option<Self> {
        match val {
            Value::I64(val) => Some(val.transmute_into()),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    #[inline]
    fn from_value(val: Value) -> Option<Self> {
        match val {
            Value::F32(val) => Some(val.into()),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    #[inline]
    fn from_value(val: Value) -> Option<Self> {
        match val {
            Value::F64(val) => Some(val.into()),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(val: i32) -> Self {
        Value::I32(val)
    }
}
impl From<i64> for Value {
    #[inline]
    fn from(val: i64) -> Self {
        Value::I64(val)
    }
}
impl From<u32> for Value {
    #[inline]
    fn from(val: u32) -> Self {
        Value::I32(val.transmute_into())
    }
}
impl From<u64> for Value {
    #[inline]
    fn from(val: u64) -> Self {
        Value::I64(val.transmute_into())
    }
}
impl From<F32> for Value {
    #[inline]
    fn from(val: F32) -> Self {
        Value::F32(val)
    }
}
impl From<F64> for Value {
    #[inline]
    fn from(val: F64) -> Self {
        Value::F64(val)
    }
}

/// Convert one type to another by wrapping.
pub trait WrapInto<T> {
    /// Convert one type to another by wrapping.
    fn wrap_into(self) -> T;
}

/// Convert one type to another by rounding to the nearest integer towards zero.
///
/// Traps when the input float cannot be represented by the target integer or
/// when the input float is NaN.
pub trait TryTruncateInto<T, E> {
    /// Convert one type to another by rounding to the nearest integer towards zero.
    fn try_truncate_into(self) -> Result<T, E>;
}

/// Convert one type to another by rounding to the nearest integer towards zero,
/// saturating instead of trapping when the float is out of range or NaN.
pub trait TruncateSaturateInto<T> {
    /// - `0` when the input is NaN.
    /// - `int::MIN` when the input is -INF.
    /// - `int::MAX` when the input is +INF.
    fn truncate_saturate_into(self) -> T;
}

/// Convert one type to another by extending with leading zeroes.
pub trait ExtendInto<T> {
    /// Convert one type to another by extending with leading zeroes.
    fn extend_into(self) -> T;
}

/// Sign-extends `Self` from `T`'s bit width.
pub trait SignExtendFrom<T> {
    /// Sign-extend `Self` from `T`'s bit width.
    fn sign_extend_from(self) -> Self;
}

/// Reinterprets the bits of a value of one type as another type.
pub trait TransmuteInto<T> {
    /// Reinterprets the bits of a value of one type as another type.
    fn transmute_into(self) -> T;
}

/// Types that can be converted from and to little-endian bytes.
pub trait LittleEndianConvert {
    /// The little endian bytes representation.
    type Bytes: Default + AsRef<[u8]> + AsMut<[u8]>;

    /// Converts `self` into little endian bytes.
    fn into_le_bytes(self) -> Self::Bytes;

    /// Converts little endian bytes into `Self`.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_little_endian_convert_primitive {
    ( $($primitive:ty),* $(,)? ) => {
        $(
            impl LittleEndianConvert for $primitive {
                type Bytes = [u8; core::mem::size_of::<$primitive>()];

                #[inline]
                fn into_le_bytes(self) -> Self::Bytes {
                    <$primitive>::to_le_bytes(self)
                }

                #[inline]
                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$primitive>::from_le_bytes(bytes)
                }
            }
        )*
    };
}
impl_little_endian_convert_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

macro_rules! impl_little_endian_convert_float {
    ( $( struct $float_ty:ident($uint_ty:ty); )* $(,)? ) => {
        $(
            impl LittleEndianConvert for $float_ty {
                type Bytes = <$uint_ty as LittleEndianConvert>::Bytes;

                #[inline]
                fn into_le_bytes(self) -> Self::Bytes {
                    <$uint_ty>::into_le_bytes(self.to_bits())
                }

                #[inline]
                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    Self::from_bits(<$uint_ty>::from_le_bytes(bytes))
                }
            }
        )*
    };
}
impl_little_endian_convert_float!(
    struct F32(u32);
    struct F64(u64);
);

/// Arithmetic operations shared by integers and floats.
pub trait ArithmeticOps<T>: Copy {
    /// Add two values.
    fn add(self, other: T) -> T;
    /// Subtract two values.
    fn sub(self, other: T) -> T;
    /// Multiply two values.
    fn mul(self, other: T) -> T;
    /// Divide two values.
    fn div(self, other: T) -> Result<T, TrapCode>;
}

/// Integer value.
pub trait Integer<T>: ArithmeticOps<T> {
    /// Counts leading zeros in the bitwise representation of the value.
    fn leading_zeros(self) -> T;
    /// Counts trailing zeros in the bitwise representation of the value.
    fn trailing_zeros(self) -> T;
    /// Counts 1-bits in the bitwise representation of the value.
    fn count_ones(self) -> T;
    /// Get left bit rotation result.
    fn rotl(self, other: T) -> T;
    /// Get right bit rotation result.
    fn rotr(self, other: T) -> T;
    /// Get division remainder.
    fn rem(self, other: T) -> Result<T, TrapCode>;
}

/// Floating-point value.
pub trait Float<T>: ArithmeticOps<T> {
    /// Get absolute value.
    fn abs(self) -> T;
    /// Returns the largest integer less than or equal to a number.
    fn floor(self) -> T;
    /// Returns the smallest integer greater than or equal to a number.
    fn ceil(self) -> T;
    /// Returns the integer part of a number.
    fn trunc(self) -> T;
    /// Returns the nearest integer, ties away from zero.
    fn round(self) -> T;
    /// Returns the nearest integer, ties to even (Wasm's `nearest`).
    fn nearest(self) -> T;
    /// Takes the square root of a number.
    fn sqrt(self) -> T;
    /// Returns `true` if the sign of the number is positive.
    fn is_sign_positive(self) -> bool;
    /// Returns `true` if the sign of the number is negative.
    fn is_sign_negative(self) -> bool;
    /// Returns the minimum of the two numbers, per Wasm's NaN/sign-zero rules.
    fn min(self, other: T) -> T;
    /// Returns the maximum of the two numbers, per Wasm's NaN/sign-zero rules.
    fn max(self, other: T) -> T;
    /// Sets the sign of this value to the sign of `other`.
    fn copysign(self, other: T) -> T;
}

macro_rules! impl_transmute_into_self {
    ($($type:ident),*) => {
        $(
            impl TransmuteInto<$type> for $type {
                #[inline]
                fn transmute_into(self) -> $type {
                    self
                }
            }
        )*
    };
}
impl_transmute_into_self!(i32, u32, i64, u64, f32, f64, F32, F64);

macro_rules! impl_transmute_into_as {
    ($from:ty, $into:ty) => {
        impl TransmuteInto<$into> for $from {
            #[inline]
            fn transmute_into(self) -> $into {
                self as _
            }
        }
    };
}
impl_transmute_into_as!(i32, u32);
impl_transmute_into_as!(u32, i32);
impl_transmute_into_as!(i64, u64);
impl_transmute_into_as!(u64, i64);

impl TransmuteInto<i32> for F32 {
    #[inline]
    fn transmute_into(self) -> i32 {
        self.to_bits() as i32
    }
}
impl TransmuteInto<F32> for i32 {
    #[inline]
    fn transmute_into(self) -> F32 {
        F32::from_bits(self as u32)
    }
}
impl TransmuteInto<i64> for F64 {
    #[inline]
    fn transmute_into(self) -> i64 {
        self.to_bits() as i64
    }
}
impl TransmuteInto<F64> for i64 {
    #[inline]
    fn transmute_into(self) -> F64 {
        F64::from_bits(self as u64)
    }
}

macro_rules! impl_integer_arithmetic_ops {
    ($type:ident) => {
        impl ArithmeticOps<$type> for $type {
            #[inline]
            fn add(self, other: $type) -> $type {
                self.wrapping_add(other)
            }
            #[inline]
            fn sub(self, other: $type) -> $type {
                self.wrapping_sub(other)
            }
            #[inline]
            fn mul(self, other: $type) -> $type {
                self.wrapping_mul(other)
            }
            #[inline]
            fn div(self, other: $type) -> Result<$type, TrapCode> {
                if other == 0 {
                    Err(TrapCode::DivisionByZero)
                } else {
                    let (result, overflow) = self.overflowing_div(other);
                    if overflow {
                        Err(TrapCode::IntegerOverflow)
                    } else {
                        Ok(result)
                    }
                }
            }
        }
    };
}
impl_integer_arithmetic_ops!(i32);
impl_integer_arithmetic_ops!(u32);
impl_integer_arithmetic_ops!(i64);
impl_integer_arithmetic_ops!(u64);

macro_rules! impl_float_arithmetic_ops {
    ($type:ident) => {
        impl ArithmeticOps<$type> for $type {
            #[inline]
            fn add(self, other: $type) -> $type {
                self + other
            }
            #[inline]
            fn sub(self, other: $type) -> $type {
                self - other
            }
            #[inline]
            fn mul(self, other: $type) -> $type {
                self * other
            }
            #[inline]
            fn div(self, other: $type) -> Result<$type, TrapCode> {
                Ok(self / other)
            }
        }
    };
}
impl_float_arithmetic_ops!(f32);
impl_float_arithmetic_ops!(f64);
impl_float_arithmetic_ops!(F32);
impl_float_arithmetic_ops!(F64);

macro_rules! impl_integer {
    ($type:ident) => {
        impl Integer<$type> for $type {
            #[inline]
            fn leading_zeros(self) -> $type {
                self.leading_zeros() as $type
            }
            #[inline]
            fn trailing_zeros(self) -> $type {
                self.trailing_zeros() as $type
            }
            #[inline]
            fn count_ones(self) -> $type {
                self.count_ones() as $type
            }
            #[inline]
            fn rotl(self, other: $type) -> $type {
                self.rotate_left(other as u32)
            }
            #[inline]
            fn rotr(self, other: $type) -> $type {
                self.rotate_right(other as u32)
            }
            #[inline]
            fn rem(self, other: $type) -> Result<$type, TrapCode> {
                if other == 0 {
                    Err(TrapCode::DivisionByZero)
                } else {
                    Ok(self.wrapping_rem(other))
                }
            }
        }
    };
}
impl_integer!(i32);
impl_integer!(u32);
impl_integer!(i64);
impl_integer!(u64);

#[cfg(feature = "std")]
mod fmath {
    pub use f32;
    pub use f64;
}
#[cfg(not(feature = "std"))]
mod fmath {
    pub mod f32 {
        pub fn abs(x: f32) -> f32 {
            libm::fabsf(x)
        }
        pub fn floor(x: f32) -> f32 {
            libm::floorf(x)
        }
        pub fn ceil(x: f32) -> f32 {
            libm::ceilf(x)
        }
        pub fn trunc(x: f32) -> f32 {
            libm::truncf(x)
        }
        pub fn round(x: f32) -> f32 {
            libm::roundf(x)
        }
        pub fn sqrt(x: f32) -> f32 {
            libm::sqrtf(x)
        }
        pub fn fract(x: f32) -> f32 {
            x - trunc(x)
        }
    }
    pub mod f64 {
        pub fn abs(x: f64) -> f64 {
            libm::fabs(x)
        }
        pub fn floor(x: f64) -> f64 {
            libm::floor(x)
        }
        pub fn ceil(x: f64) -> f64 {
            libm::ceil(x)
        }
        pub fn trunc(x: f64) -> f64 {
            libm::trunc(x)
        }
        pub fn round(x: f64) -> f64 {
            libm::round(x)
        }
        pub fn sqrt(x: f64) -> f64 {
            libm::sqrt(x)
        }
        pub fn fract(x: f64) -> f64 {
            x - trunc(x)
        }
    }
}

// Wasm's float library functions aren't all available in `core`; in `no_std`
// we delegate to `libm` instead. These wrappers paper over that split.
macro_rules! impl_float {
    ($type:ident, $fxx:ident, $ixx:ident) => {
        impl Float<$type> for $type {
            #[inline]
            fn abs(self) -> $type {
                fmath::$fxx::abs($fxx::from(self)).into()
            }
            #[inline]
            fn floor(self) -> $type {
                fmath::$fxx::floor($fxx::from(self)).into()
            }
            #[inline]
            fn ceil(self) -> $type {
                fmath::$fxx::ceil($fxx::from(self)).into()
            }
            #[inline]
            fn trunc(self) -> $type {
                fmath::$fxx::trunc($fxx::from(self)).into()
            }
            #[inline]
            fn round(self) -> $type {
                fmath::$fxx::round($fxx::from(self)).into()
            }
            #[inline]
            fn nearest(self) -> $type {
                let round = self.round();
                if fmath::$fxx::fract($fxx::from(self)).abs() != 0.5 {
                    return round;
                }
                use core::ops::Rem;
                if round.rem(2.0) == 1.0 {
                    self.floor()
                } else if round.rem(2.0) == -1.0 {
                    self.ceil()
                } else {
                    round
                }
            }
            #[inline]
            fn sqrt(self) -> $type {
                fmath::$fxx::sqrt($fxx::from(self)).into()
            }
            #[inline]
            fn is_sign_positive(self) -> bool {
                $fxx::is_sign_positive($fxx::from(self))
            }
            #[inline]
            fn is_sign_negative(self) -> bool {
                $fxx::is_sign_negative($fxx::from(self))
            }
            #[inline]
            fn min(self, other: $type) -> $type {
                // Matches the Wasm spec exactly: NaN propagates, and signed
                // zeros are distinguished (-0.0 < 0.0 for `min`).
                match (self.is_nan(), other.is_nan()) {
                    (true, false) => self,
                    (false, true) => other,
                    _ => {
                        if other.is_sign_negative() {
                            return other.min(self);
                        }
                        self.min(other)
                    }
                }
            }
            #[inline]
            fn max(self, other: $type) -> $type {
                match (self.is_nan(), other.is_nan()) {
                    (true, false) => self,
                    (false, true) => other,
                    _ => {
                        if other.is_sign_positive() {
                            return other.max(self);
                        }
                        self.max(other)
                    }
                }
            }
            #[inline]
            fn copysign(self, other: $type) -> $type {
                let sign_mask: $ixx = 1 << ((core::mem::size_of::<$ixx>() << 3) - 1);
                let self_int: $ixx = self.transmute_into();
                let other_int: $ixx = other.transmute_into();
                let is_self_sign_set = (self_int & sign_mask) != 0;
                let is_other_sign_set = (other_int & sign_mask) != 0;
                if is_self_sign_set == is_other_sign_set {
                    self
                } else if is_other_sign_set {
                    (self_int | sign_mask).transmute_into()
                } else {
                    (self_int & !sign_mask).transmute_into()
                }
            }
        }
    };
}
impl_float!(f32, f32, i32);
impl_float!(f64, f64, i64);
impl_float!(F32, f32, i32);
impl_float!(F64, f64, i64);

impl TransmuteInto<f32> for F32 {
    #[inline]
    fn transmute_into(self) -> f32 {
        f32::from_bits(self.to_bits())
    }
}
impl TransmuteInto<F32> for f32 {
    #[inline]
    fn transmute_into(self) -> F32 {
        F32::from_bits(self.to_bits())
    }
}
impl TransmuteInto<f64> for F64 {
    #[inline]
    fn transmute_into(self) -> f64 {
        f64::from_bits(self.to_bits())
    }
}
impl TransmuteInto<F64> for f64 {
    #[inline]
    fn transmute_into(self) -> F64 {
        F64::from_bits(self.to_bits())
    }
}

macro_rules! impl_wrap_into {
    ($from:ident, $into:ident) => {
        impl WrapInto<$into> for $from {
            #[inline]
            fn wrap_into(self) -> $into {
                self as $into
            }
        }
    };
}
impl_wrap_into!(i64, i32);
impl_wrap_into!(f64, f32);

impl WrapInto<F32> for F64 {
    #[inline]
    fn wrap_into(self) -> F32 {
        (f64::from(self) as f32).into()
    }
}
impl WrapInto<F32> for i64 {
    #[inline]
    fn wrap_into(self) -> F32 {
        F32::from(self as f32)
    }
}
impl WrapInto<F32> for u64 {
    #[inline]
    fn wrap_into(self) -> F32 {
        F32::from(self as f32)
    }
}

macro_rules! impl_extend_into {
    ($from:ty, $into:ty) => {
        impl ExtendInto<$into> for $from {
            #[inline]
            fn extend_into(self) -> $into {
                self as $into
            }
        }
    };
}
impl_extend_into!(i32, i64);
impl_extend_into!(u32, i64);
impl_extend_into!(u32, u64);
impl_extend_into!(i32, F32);
impl_extend_into!(u32, F32);
impl_extend_into!(i32, F64);
impl_extend_into!(u32, F64);
impl_extend_into!(i64, F64);
impl_extend_into!(u64, F64);
impl_extend_into!(F32, F64);

macro_rules! impl_sign_extend_from {
    ($self:ty, $from:ty) => {
        impl SignExtendFrom<$from> for $self {
            #[inline]
            fn sign_extend_from(self) -> Self {
                (self as $from) as Self
            }
        }
    };
}
impl_sign_extend_from!(i32, i8);
impl_sign_extend_from!(i32, i16);
impl_sign_extend_from!(i64, i8);
impl_sign_extend_from!(i64, i16);
impl_sign_extend_from!(i64, i32);

macro_rules! impl_try_truncate_into {
    (@primitive $from:ident, $into:ident, $to_primitive:path) => {
        impl TryTruncateInto<$into, TrapCode> for $from {
            #[inline]
            fn try_truncate_into(self) -> Result<$into, TrapCode> {
                // Casting from a float to an integer rounds towards zero.
                if self.is_nan() {
                    return Err(TrapCode::InvalidConversionToInt);
                }
                num_rational::BigRational::from_float(self)
                    .map(|val| val.to_integer())
                    .and_then(|val| $to_primitive(&val))
                    .ok_or(TrapCode::IntegerOverflow)
            }
        }

        impl TruncateSaturateInto<$into> for $from {
            #[inline]
            fn truncate_saturate_into(self) -> $into {
                if self.is_nan() {
                    return <$into as Default>::default();
                }
                if self.is_infinite() && self.is_sign_positive() {
                    return <$into>::MAX;
                }
                if self.is_infinite() && self.is_sign_negative() {
                    return <$into>::MIN;
                }
                self as _
            }
        }
    };
    (@wrapped $from:ident, $intermediate:ident, $into:ident) => {
        impl TryTruncateInto<$into, TrapCode> for $from {
            #[inline]
            fn try_truncate_into(self) -> Result<$into, TrapCode> {
                $intermediate::from(self).try_truncate_into()
            }
        }

        impl TruncateSaturateInto<$into> for $from {
            #[inline]
            fn truncate_saturate_into(self) -> $into {
                $intermediate::from(self).truncate_saturate_into()
            }
        }
    };
}
impl_try_truncate_into!(@primitive f32, i32, num_traits::cast::ToPrimitive::to_i32);
impl_try_truncate_into!(@primitive f32, i64, num_traits::cast::ToPrimitive::to_i64);
impl_try_truncate_into!(@primitive f64, i32, num_traits::cast::ToPrimitive::to_i32);
impl_try_truncate_into!(@primitive f64, i64, num_traits::cast::ToPrimitive::to_i64);
impl_try_truncate_into!(@primitive f32, u32, num_traits::cast::ToPrimitive::to_u32);
impl_try_truncate_into!(@primitive f32, u64, num_traits::cast::ToPrimitive::to_u64);
impl_try_truncate_into!(@primitive f64, u32, num_traits::cast::ToPrimitive::to_u32);
impl_try_truncate_into!(@primitive f64, u64, num_traits::cast::ToPrimitive::to_u64);
impl_try_truncate_into!(@wrapped F32, f32, i32);
impl_try_truncate_into!(@wrapped F32, f32, i64);
impl_try_truncate_into!(@wrapped F32, f32, u32);
impl_try_truncate_into!(@wrapped F32, f32, u64);
impl_try_truncate_into!(@wrapped F64, f64, i32);
impl_try_truncate_into!(@wrapped F64, f64, i64);
impl_try_truncate_into!(@wrapped F64, f64, u32);
impl_try_truncate_into!(@wrapped F64, f64, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasm_float_min_regression_works() {
        assert_eq!(Float::min(F32::from(-0.0f32), F32::from(0.0f32)).to_bits(), 0x8000_0000);
        assert_eq!(Float::min(F32::from(0.0f32), F32::from(-0.0f32)).to_bits(), 0x8000_0000);
    }

    #[test]
    fn wasm_float_max_regression_works() {
        assert_eq!(Float::max(F32::from(-0.0f32), F32::from(0.0f32)).to_bits(), 0x0000_0000);
        assert_eq!(Float::max(F32::from(0.0f32), F32::from(-0.0f32)).to_bits(), 0x0000_0000);
    }

    #[test]
    fn div_by_zero_traps() {
        assert_eq!(ArithmeticOps::div(1i32, 0i32), Err(TrapCode::DivisionByZero));
        assert_eq!(ArithmeticOps::div(1u32, 0u32), Err(TrapCode::DivisionByZero));
    }

    #[test]
    fn int_min_div_neg_one_overflows() {
        assert_eq!(ArithmeticOps::div(i32::MIN, -1i32), Err(TrapCode::IntegerOverflow));
    }

    #[test]
    fn int_min_rem_neg_one_is_zero() {
        assert_eq!(Integer::rem(i32::MIN, -1i32), Ok(0));
    }

    #[test]
    fn truncate_nan_traps() {
        let nan = f32::NAN;
        let result: Result<i32, TrapCode> = nan.try_truncate_into();
        assert_eq!(result, Err(TrapCode::InvalidConversionToInt));
    }

    #[test]
    fn truncate_out_of_range_overflows() {
        let huge = 1.0e10_f32;
        let result: Result<i32, TrapCode> = huge.try_truncate_into();
        assert_eq!(result, Err(TrapCode::IntegerOverflow));
    }

    #[test]
    fn copysign_transplants_sign_bit() {
        let a = F64::from(3.0_f64);
        let b = F64::from(-1.0_f64);
        assert_eq!(f64::from(a.copysign(b)), -3.0);
    }
}

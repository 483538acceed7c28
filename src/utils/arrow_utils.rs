//! Arrow utility functions for extracting single values from arrays
//!
//! These helpers read one cell at a time and return `None` for nulls or for
//! data types they do not handle. Callers that need to tell the two apart
//! check [`is_string_like`] / [`is_numeric`] before reading.

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array,
    Int64Array, LargeStringArray, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;

/// Whether [`arrow_array_to_f64`] can read this type
#[must_use]
pub fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Whether [`arrow_array_to_string`] can read this type
#[must_use]
pub fn is_string_like(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Boolean
    ) || is_integer(data_type)
}

/// Whether the type is an integer type
#[must_use]
pub fn is_integer(data_type: &DataType) -> bool {
    is_numeric(data_type) && !matches!(data_type, DataType::Float32 | DataType::Float64)
}

/// Extract a string value from an Arrow array at the specified index, handling nulls
///
/// Integer and boolean cells are rendered with their `Display` form, so a sex
/// column coded as `1`/`0` works the same as one coded as `"M"`/`"F"`.
///
/// # Arguments
/// * `array` - The Arrow array
/// * `index` - The index of the value to extract
///
/// # Returns
/// `Some(String)` if the value exists and is not null, otherwise `None`
#[must_use]
pub fn arrow_array_to_string(array: &ArrayRef, index: usize) -> Option<String> {
    if array.is_null(index) {
        return None;
    }

    match array.data_type() {
        DataType::Utf8 => {
            let string_array = array.as_any().downcast_ref::<StringArray>()?;
            Some(string_array.value(index).to_string())
        }
        DataType::LargeUtf8 => {
            let string_array = array.as_any().downcast_ref::<LargeStringArray>()?;
            Some(string_array.value(index).to_string())
        }
        DataType::Boolean => {
            let bool_array = array.as_any().downcast_ref::<BooleanArray>()?;
            Some(bool_array.value(index).to_string())
        }
        dt if is_integer(dt) => arrow_array_to_i64(array, index).map(|v| v.to_string()),
        _ => None,
    }
}

/// Extract an i64 value from an integer Arrow array, handling nulls
///
/// Unsigned values above `i64::MAX` yield `None`.
#[must_use]
pub fn arrow_array_to_i64(array: &ArrayRef, index: usize) -> Option<i64> {
    if array.is_null(index) {
        return None;
    }

    macro_rules! read {
        ($ty:ty) => {
            array
                .as_any()
                .downcast_ref::<$ty>()
                .and_then(|a| i64::try_from(a.value(index)).ok())
        };
    }

    match array.data_type() {
        DataType::Int8 => read!(Int8Array),
        DataType::Int16 => read!(Int16Array),
        DataType::Int32 => read!(Int32Array),
        DataType::Int64 => read!(Int64Array),
        DataType::UInt8 => read!(UInt8Array),
        DataType::UInt16 => read!(UInt16Array),
        DataType::UInt32 => read!(UInt32Array),
        DataType::UInt64 => read!(UInt64Array),
        _ => None,
    }
}

/// Extract an f64 value from a numeric Arrow array, handling nulls
#[must_use]
pub fn arrow_array_to_f64(array: &ArrayRef, index: usize) -> Option<f64> {
    if array.is_null(index) {
        return None;
    }

    match array.data_type() {
        DataType::Float32 => {
            let float_array = array.as_any().downcast_ref::<Float32Array>()?;
            Some(f64::from(float_array.value(index)))
        }
        DataType::Float64 => {
            let float_array = array.as_any().downcast_ref::<Float64Array>()?;
            Some(float_array.value(index))
        }
        #[allow(clippy::cast_precision_loss)]
        dt if is_integer(dt) => arrow_array_to_i64(array, index).map(|v| v as f64),
        _ => None,
    }
}

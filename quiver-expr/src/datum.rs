use arrow_array::{Array, ArrayRef, Datum, Scalar as ArrowScalar, UInt32Array};
use arrow_cast::cast;
use arrow_schema::DataType;
use arrow_select::take::take;
use quiver_error::QuiverResult;

/// The result of evaluating an expression: either one value per row, or a single value that
/// applies to every row.
#[derive(Debug, Clone)]
pub enum ColumnarValue {
    /// One value per row of the batch.
    Array(ArrayRef),
    /// A single value shared by all rows, held as a one-element array.
    Scalar(ArrowScalar<ArrayRef>),
}

impl ColumnarValue {
    /// The Arrow type of the values.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Array(array) => array.data_type().clone(),
            Self::Scalar(scalar) => scalar.get().0.data_type().clone(),
        }
    }

    /// Returns true if this is a single shared value.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Materializes the values of `num_rows` rows.
    pub fn into_array(self, num_rows: usize) -> QuiverResult<ArrayRef> {
        match self {
            Self::Array(array) => Ok(array),
            Self::Scalar(scalar) => {
                let indices = UInt32Array::from(vec![0_u32; num_rows]);
                Ok(take(scalar.into_inner().as_ref(), &indices, None)?)
            }
        }
    }

    /// Casts the values to `data_type`.
    pub fn cast_to(self, data_type: &DataType) -> QuiverResult<Self> {
        Ok(match self {
            Self::Array(array) => Self::Array(cast(array.as_ref(), data_type)?),
            Self::Scalar(scalar) => Self::Scalar(ArrowScalar::new(cast(
                scalar.into_inner().as_ref(),
                data_type,
            )?)),
        })
    }
}

impl From<ArrayRef> for ColumnarValue {
    fn from(value: ArrayRef) -> Self {
        Self::Array(value)
    }
}

impl Datum for ColumnarValue {
    fn get(&self) -> (&dyn Array, bool) {
        match self {
            Self::Array(array) => (array.as_ref(), false),
            Self::Scalar(scalar) => scalar.get(),
        }
    }
}

/// Brings two operands to a common type so they can be compared.
///
/// A shared value is cast to the type of the other side, otherwise the right-hand side is cast to
/// the type of the left-hand side.
pub(crate) fn coerce(
    lhs: ColumnarValue,
    rhs: ColumnarValue,
) -> QuiverResult<(ColumnarValue, ColumnarValue)> {
    let lhs_type = lhs.data_type();
    let rhs_type = rhs.data_type();
    if lhs_type == rhs_type {
        return Ok((lhs, rhs));
    }

    if lhs.is_scalar() && !rhs.is_scalar() {
        Ok((lhs.cast_to(&rhs_type)?, rhs))
    } else {
        Ok((lhs, rhs.cast_to(&lhs_type)?))
    }
}

use std::fmt::{self, Display, Formatter};

use crate::vm::mem::ValueType;

/// Abstract value of the dataflow analysis: a type tag, or no tag at all
/// for slots not initialized on every path. The tagless value is the top
/// of the merge lattice.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BasicValue {
    vtype: Option<ValueType>,
}

pub const UNINITIALIZED_VALUE: BasicValue = BasicValue { vtype: None };
pub const INT_VALUE: BasicValue = BasicValue {
    vtype: Some(ValueType::Int),
};
pub const FLOAT_VALUE: BasicValue = BasicValue {
    vtype: Some(ValueType::Float),
};
pub const ARRAY_REF: BasicValue = BasicValue {
    vtype: Some(ValueType::Array),
};
pub const INT_ARRAY_REF: BasicValue = BasicValue {
    vtype: Some(ValueType::IntArray),
};
pub const FLOAT_ARRAY_REF: BasicValue = BasicValue {
    vtype: Some(ValueType::FloatArray),
};

impl BasicValue {
    pub fn from_type(vtype: Option<ValueType>) -> BasicValue {
        BasicValue { vtype }
    }

    pub fn vtype(&self) -> Option<ValueType> {
        self.vtype
    }

    pub fn is_array_reference(&self) -> bool {
        matches!(self.vtype, Some(t) if t.is_array_reference())
    }

    pub fn is_subtype_of(&self, other: &BasicValue) -> bool {
        match (self.vtype, other.vtype) {
            (Some(own), Some(required)) => own.is_subtype_of(required),
            _ => false,
        }
    }
}

impl Display for BasicValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.vtype {
            Some(vtype) => write!(f, "{}", vtype),
            None => write!(f, "uninitialized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality() {
        assert_eq!(INT_VALUE, BasicValue::from_type(Some(ValueType::Int)));
        assert_ne!(INT_VALUE, FLOAT_VALUE);
        assert_eq!(UNINITIALIZED_VALUE, BasicValue::from_type(None));
        assert_ne!(UNINITIALIZED_VALUE, INT_VALUE);
    }

    #[test]
    fn array_predicates() {
        assert!(ARRAY_REF.is_array_reference());
        assert!(INT_ARRAY_REF.is_array_reference());
        assert!(!INT_VALUE.is_array_reference());
        assert!(!UNINITIALIZED_VALUE.is_array_reference());

        assert!(INT_ARRAY_REF.is_subtype_of(&ARRAY_REF));
        assert!(FLOAT_ARRAY_REF.is_subtype_of(&ARRAY_REF));
        assert!(!ARRAY_REF.is_subtype_of(&INT_ARRAY_REF));
        assert!(!INT_VALUE.is_subtype_of(&ARRAY_REF));
        assert!(!UNINITIALIZED_VALUE.is_subtype_of(&ARRAY_REF));
    }
}

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Get the inner u32 value.
            pub fn inner(self) -> u32 {
                self.0
            }

            /// Create an ID from a u32 value.
            pub fn new(value: u32) -> Self {
                Self(value)
            }

            /// Create an ID from a dense position.
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Dense position of this ID, usable as a vector index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id_type!(VariableId);
define_id_type!(ConstraintId);

#[cfg(test)]
mod tests {
    use super::{ConstraintId, VariableId};

    #[test]
    fn variable_id_index_matches_inner() {
        let id = VariableId::from_index(7);
        assert_eq!(id.inner(), 7);
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn constraint_ids_order_by_position() {
        let mut ids = vec![ConstraintId::new(3), ConstraintId::new(1)];
        ids.sort();
        assert_eq!(ids, vec![ConstraintId::new(1), ConstraintId::new(3)]);
        assert_eq!(ConstraintId::new(11).to_string(), "11");
    }
}

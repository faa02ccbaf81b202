//! Shapes of primitive and standard-library types

use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::hash::Hash;

use crate::decimal::Decimal;
use crate::error::{Fault, LengthError};

use super::{
    ArrayShape, Constructor, RecordShape, Sequence, SequenceShape, Shape, Shaped,
    TransparentShape,
};

macro_rules! impl_scalar {
    ( $( $t:ty ),+ $(,)? ) => {
        $(
            impl Shaped for $t {
                fn shape() -> Shape<Self> {
                    Shape::scalar()
                }
            }
        )+
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, bool, char, Decimal, String);

macro_rules! impl_collection {
    ( $( $coll:ident $( : $bound:path )? ),+ $(,)? ) => {
        $(
            impl<T: 'static $( + $bound )?> Sequence<T> for $coll<T> {
                fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
                    Box::new(self.iter())
                }

                fn from_elements(items: Vec<T>) -> Result<Self, Fault> {
                    Ok(items.into_iter().collect())
                }
            }

            impl<T: Shaped $( + $bound )?> Shaped for $coll<T> {
                fn shape() -> Shape<Self> {
                    Shape::sequence([SequenceShape::of::<T>()])
                }
            }
        )+
    };
}

impl_collection!(VecDeque, LinkedList, HashSet: HashEq, BTreeSet: Ord);

/// Element bound of [`HashSet`] sequences
pub trait HashEq: Hash + Eq {}

impl<T: Hash + Eq> HashEq for T {}

impl<T: 'static> Sequence<T> for Vec<T> {
    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn from_elements(items: Vec<T>) -> Result<Self, Fault> {
        Ok(items)
    }
}

impl<T: Shaped> Shaped for Vec<T> {
    fn shape() -> Shape<Self> {
        Shape::sequence([SequenceShape::of::<T>()])
    }
}

impl<T: 'static> Sequence<T> for Box<[T]> {
    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn from_elements(items: Vec<T>) -> Result<Self, Fault> {
        Ok(items.into_boxed_slice())
    }
}

impl<T: Shaped> Shaped for Box<[T]> {
    fn shape() -> Shape<Self> {
        Shape::array(ArrayShape::of::<T>(1))
    }
}

impl<T: 'static, const N: usize> Sequence<T> for [T; N] {
    fn elements(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }

    fn from_elements(items: Vec<T>) -> Result<Self, Fault> {
        <[T; N]>::try_from(items).map_err(|items| {
            Fault::convert::<Self, _>(LengthError::WrongLength {
                exact: N,
                actual: items.len(),
            })
        })
    }
}

impl<T: Shaped, const N: usize> Shaped for [T; N] {
    fn shape() -> Shape<Self> {
        Shape::array(ArrayShape::of::<T>(1))
    }
}

fn unbox<T>(boxed: &Box<T>) -> &T {
    boxed
}

impl<T: Shaped> Shaped for Box<T> {
    fn shape() -> Shape<Self> {
        Shape::transparent(TransparentShape::of::<T>(Box::new, unbox))
    }
}

impl<A: Shaped, B: Shaped> Shaped for (A, B) {
    fn shape() -> Shape<Self> {
        Shape::record(
            RecordShape::<Self>::new()
                .field::<A>("0", |t| &t.0)
                .field::<B>("1", |t| &t.1)
                .constructor(
                    Constructor::<Self>::new(|args| Ok((args.take()?, args.take()?)))
                        .param::<A>("0")
                        .param::<B>("1"),
                ),
        )
    }
}

impl<A: Shaped, B: Shaped, C: Shaped> Shaped for (A, B, C) {
    fn shape() -> Shape<Self> {
        Shape::record(
            RecordShape::<Self>::new()
                .field::<A>("0", |t| &t.0)
                .field::<B>("1", |t| &t.1)
                .field::<C>("2", |t| &t.2)
                .constructor(
                    Constructor::<Self>::new(|args| {
                        Ok((args.take()?, args.take()?, args.take()?))
                    })
                    .param::<A>("0")
                    .param::<B>("1")
                    .param::<C>("2"),
                ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;

    #[test]
    fn kinds_of_builtins() {
        assert_eq!(<u32 as Shaped>::shape().kind().label(), "scalar");
        assert_eq!(<Vec<u32> as Shaped>::shape().kind().label(), "sequence");
        assert_eq!(<[u8; 4] as Shaped>::shape().kind().label(), "array");
        assert_eq!(<Box<String> as Shaped>::shape().kind().label(), "transparent");
        match <(u8, String) as Shaped>::shape().into_kind() {
            ShapeKind::Record(rec) => {
                assert_eq!(rec.field_names().collect::<Vec<_>>(), vec!["0", "1"]);
                assert_eq!(rec.matching_constructors().count(), 1);
            }
            _ => panic!("tuple is not a record"),
        }
    }

    #[test]
    fn fixed_array_checks_count() {
        let err = <[u8; 3] as Sequence<u8>>::from_elements(vec![1, 2]).unwrap_err();
        match err {
            Fault::ConvertError(err) => assert_eq!(
                err.downcast_ref::<LengthError>(),
                Some(&LengthError::WrongLength {
                    exact: 3,
                    actual: 2
                })
            ),
            other => panic!("unexpected fault {other:?}"),
        }
    }
}

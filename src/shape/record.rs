//! Builders for record shapes
//!
//! A record is an ordered list of named fields, each with a getter and
//! optionally a setter, plus whatever ways of constructing a value the type
//! offers: a default constructor, and any number of [`Constructor`]s whose
//! parameters are declared by name and type.
//!
//! ```
//! use packet::{Constructor, RecordShape, Shape, Shaped};
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Shaped for Point {
//!     fn shape() -> Shape<Self> {
//!         Shape::record(
//!             RecordShape::<Self>::new()
//!                 .field::<i32>("x", |p| &p.x)
//!                 .field::<i32>("y", |p| &p.y)
//!                 .constructor(
//!                     Constructor::new(|args| {
//!                         Ok(Point {
//!                             x: args.take()?,
//!                             y: args.take()?,
//!                         })
//!                     })
//!                     .param::<i32>("x")
//!                     .param::<i32>("y"),
//!                 ),
//!         )
//!     }
//! }
//! ```

use std::any::{type_name, Any, TypeId};

use crate::cache::PacketCache;
use crate::conv::record::{BoundField, BoundFieldOf};
use crate::error::{Fault, FieldError};

use super::Shaped;

/// Field list and construction strategies of a record type `T`
pub struct RecordShape<T> {
    pub(crate) fields: Vec<Box<dyn FieldPlan<T>>>,
    pub(crate) default: Option<fn() -> T>,
    pub(crate) constructors: Vec<Constructor<T>>,
}

impl<T: 'static> RecordShape<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            default: None,
            constructors: Vec::new(),
        }
    }

    /// Appends a read-only field; declaration order is encode order
    #[must_use]
    pub fn field<F: Shaped>(mut self, name: &'static str, get: fn(&T) -> &F) -> Self {
        self.fields.push(Box::new(FieldOf { name, get, set: None }));
        self
    }

    /// Appends a field that can also be assigned after default construction
    #[must_use]
    pub fn field_with_setter<F: Shaped>(
        mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> Self {
        self.fields.push(Box::new(FieldOf {
            name,
            get,
            set: Some(set),
        }));
        self
    }

    /// Declares a default constructor
    #[must_use]
    pub fn default_with(mut self, make: fn() -> T) -> Self {
        self.default = Some(make);
        self
    }

    /// Declares an additional constructor
    #[must_use]
    pub fn constructor(mut self, ctor: Constructor<T>) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name())
    }

    /// Whether values can be default-constructed and then assigned field by field
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        self.default.is_some() && self.fields.iter().all(|f| f.has_setter())
    }

    /// Constructors whose parameters match the field list one-for-one, by name
    /// and type, in order
    pub fn matching_constructors(&self) -> impl Iterator<Item = &Constructor<T>> + '_ {
        self.constructors
            .iter()
            .filter(|ctor| ctor.matches(&self.fields))
    }
}

impl<T: 'static> Default for RecordShape<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared name and type of one constructor parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// A way of building `T` from positional arguments
pub struct Constructor<T> {
    params: Vec<Param>,
    pub(crate) build: fn(&mut ConstructorArgs) -> Result<T, Fault>,
}

impl<T: 'static> Constructor<T> {
    /// Constructor whose body pulls its arguments from a [`ConstructorArgs`]
    /// in parameter order
    #[must_use]
    pub fn new(build: fn(&mut ConstructorArgs) -> Result<T, Fault>) -> Self {
        Self {
            params: Vec::new(),
            build,
        }
    }

    /// Declares the next parameter
    #[must_use]
    pub fn param<P: 'static>(mut self, name: &'static str) -> Self {
        self.params.push(Param {
            name,
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
        });
        self
    }

    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn matches(&self, fields: &[Box<dyn FieldPlan<T>>]) -> bool {
        self.params.len() == fields.len()
            && self
                .params
                .iter()
                .zip(fields)
                .all(|(p, f)| p.name == f.name() && p.type_id == f.field_type())
    }
}

/// Decoded field values handed to a constructor, in parameter order
pub struct ConstructorArgs {
    owner: &'static str,
    values: std::vec::IntoIter<Box<dyn Any>>,
    position: usize,
}

impl ConstructorArgs {
    pub(crate) fn new(owner: &'static str, values: Vec<Box<dyn Any>>) -> Self {
        Self {
            owner,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Takes the next argument, which must be of type `P`
    pub fn take<P: 'static>(&mut self) -> Result<P, Fault> {
        let position = self.position;
        let Some(value) = self.values.next() else {
            return Err(Fault::convert_named(
                self.owner,
                FieldError::ArgumentsExhausted { position },
            ));
        };
        self.position += 1;
        value.downcast::<P>().map(|val| *val).map_err(|_| {
            Fault::convert_named(
                self.owner,
                FieldError::ArgumentMismatch {
                    position,
                    expected: type_name::<P>(),
                },
            )
        })
    }
}

/// Field-type-erased field of a record shape
pub(crate) trait FieldPlan<T> {
    fn name(&self) -> &'static str;

    fn field_type(&self) -> TypeId;

    fn has_setter(&self) -> bool;

    /// Resolves the field's converter through `cache`
    fn bind(&self, cache: &PacketCache) -> Result<Box<dyn BoundField<T>>, Fault>;
}

struct FieldOf<T, F> {
    name: &'static str,
    get: fn(&T) -> &F,
    set: Option<fn(&mut T, F)>,
}

impl<T: 'static, F: Shaped> FieldPlan<T> for FieldOf<T, F> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn field_type(&self) -> TypeId {
        TypeId::of::<F>()
    }

    fn has_setter(&self) -> bool {
        self.set.is_some()
    }

    fn bind(&self, cache: &PacketCache) -> Result<Box<dyn BoundField<T>>, Fault> {
        let converter = cache.converter::<F>()?;
        Ok(Box::new(BoundFieldOf {
            get: self.get,
            set: self.set,
            converter,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: u8,
        b: String,
    }

    fn pair_shape() -> RecordShape<Pair> {
        RecordShape::<Pair>::new()
            .field::<u8>("a", |p| &p.a)
            .field::<String>("b", |p| &p.b)
    }

    fn build_pair(args: &mut ConstructorArgs) -> Result<Pair, Fault> {
        Ok(Pair {
            a: args.take()?,
            b: args.take()?,
        })
    }

    #[test]
    fn constructor_matching_is_order_sensitive() {
        let shape = pair_shape()
            .constructor(
                Constructor::new(build_pair)
                    .param::<String>("b")
                    .param::<u8>("a"),
            )
            .constructor(Constructor::new(build_pair).param::<u8>("a"))
            .constructor(
                Constructor::new(build_pair)
                    .param::<u8>("a")
                    .param::<String>("b"),
            );
        assert_eq!(shape.matching_constructors().count(), 1);
        assert!(!shape.is_assignable());

        let names: Vec<_> = shape
            .matching_constructors()
            .flat_map(|ctor| ctor.params().iter().map(|p| (p.name, p.type_name)))
            .collect();
        assert_eq!(names, [("a", "u8"), ("b", type_name::<String>())]);
        let ctor = shape.matching_constructors().next().unwrap();
        assert_eq!(ctor.params()[0].type_id, TypeId::of::<u8>());
    }

    #[test]
    fn args_report_mismatch_and_exhaustion() {
        let mut args = ConstructorArgs::new("Pair", vec![Box::new(7u8) as Box<dyn Any>]);
        let err = args.take::<u16>().unwrap_err();
        match err {
            Fault::ConvertError(err) => assert_eq!(
                err.downcast_ref::<FieldError>(),
                Some(&FieldError::ArgumentMismatch {
                    position: 0,
                    expected: "u16"
                })
            ),
            other => panic!("unexpected fault {other:?}"),
        }
        assert!(args.take::<u8>().unwrap_err().is_convert_error());

        let mut args = ConstructorArgs::new("Pair", vec![Box::new(7u8) as Box<dyn Any>]);
        assert_eq!(args.take::<u8>().unwrap(), 7);
    }

    #[test]
    fn assignable_needs_every_setter() {
        let shape = pair_shape().default_with(|| Pair {
            a: 0,
            b: String::new(),
        });
        assert!(!shape.is_assignable());
        let shape = RecordShape::<Pair>::new()
            .field_with_setter::<u8>("a", |p| &p.a, |p, a| p.a = a)
            .default_with(|| Pair {
                a: 0,
                b: String::new(),
            });
        assert!(shape.is_assignable());
        assert_eq!(shape.field_names().collect::<Vec<_>>(), vec!["a"]);
    }
}

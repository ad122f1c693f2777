//! Declarative macros generating the record and enumeration traits.

/// Declares a struct and implements [`Record`](crate::Record),
/// [`RecordType`](crate::RecordType) and [`FieldValue`](crate::FieldValue)
/// for it.
///
/// The struct must implement `Debug`, `Clone` and `Default`; `Default`
/// provides the zero-valued instance used on decode. A field may carry
/// `#[tag(n)]` to match by tag instead of name across schema versions.
///
/// ```rust
/// use tagframe::{record, RecordType};
///
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Point {
///         pub x: i32,
///         #[tag(2)]
///         pub y: i32,
///     }
/// }
///
/// let fields = Point::fields();
/// assert_eq!(fields[1].tag, Some(2));
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[tag($tag:literal)])?
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $fty, )*
        }

        impl $crate::model::Record for $name {
            fn record_name(&self) -> &'static str {
                stringify!($name)
            }

            #[allow(unused_variables)]
            fn get_field(&self, name: &str) -> ::std::option::Option<$crate::model::Value> {
                $(
                    if name == stringify!($field) {
                        return ::std::option::Option::Some(
                            $crate::model::FieldValue::to_value(&self.$field),
                        );
                    }
                )*
                ::std::option::Option::None
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                name: &str,
                value: $crate::model::Value,
            ) -> ::std::result::Result<(), $crate::error::SerializeError> {
                $(
                    if name == stringify!($field) {
                        self.$field = <$fty as $crate::model::FieldValue>::from_value(value)?;
                        return ::std::result::Result::Ok(());
                    }
                )*
                ::std::result::Result::Err($crate::error::SerializeError::FieldAccess {
                    class: stringify!($name).to_string(),
                    field: name.to_string(),
                })
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }

        impl $crate::model::RecordType for $name {
            fn type_name() -> &'static str {
                stringify!($name)
            }

            fn fields() -> ::std::vec::Vec<$crate::model::FieldDef> {
                ::std::vec![
                    $( $crate::model::FieldDef::of::<$fty>(stringify!($field)) $(.with_tag($tag))?, )*
                ]
            }

            fn construct() -> ::std::option::Option<Self> {
                ::std::option::Option::Some(<Self as ::std::default::Default>::default())
            }
        }

        impl $crate::model::FieldValue for $name {
            fn data_type() -> $crate::model::DataType {
                $crate::model::DataType::Object
            }

            fn class() -> ::std::option::Option<::std::any::TypeId> {
                ::std::option::Option::Some(::std::any::TypeId::of::<Self>())
            }

            fn to_value(&self) -> $crate::model::Value {
                $crate::model::Value::Object(::std::boxed::Box::new(::std::clone::Clone::clone(self)))
            }

            fn from_value(
                value: $crate::model::Value,
            ) -> ::std::result::Result<Self, $crate::error::SerializeError> {
                $crate::model::record_from_value(value)
            }
        }
    };
}

/// Declares a C-like enum and implements
/// [`Enumeration`](crate::Enumeration) and [`FieldValue`](crate::FieldValue)
/// for it.
///
/// The macro derives `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
/// `PartialOrd` and `Ord`; the first variant is the `Default`.
///
/// ```rust
/// use tagframe::{enumeration, Enumeration};
///
/// enumeration! {
///     pub enum Color { Red, Green, Blue }
/// }
///
/// assert_eq!(Color::Blue.ordinal(), 2);
/// assert_eq!(Color::from_ordinal(1), Some(Color::Green));
/// ```
#[macro_export]
macro_rules! enumeration {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $first:ident $(, $variant:ident)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        $vis enum $name {
            #[default]
            $first,
            $( $variant, )*
        }

        impl $crate::model::Enumeration for $name {
            fn type_name() -> &'static str {
                stringify!($name)
            }

            fn variants() -> &'static [&'static str] {
                &[stringify!($first) $(, stringify!($variant))*]
            }

            fn ordinal(self) -> u32 {
                self as u32
            }

            fn from_ordinal(ordinal: u32) -> ::std::option::Option<Self> {
                const ALL: &[$name] = &[$name::$first $(, $name::$variant)*];
                ALL.get(ordinal as usize).copied()
            }
        }

        impl $crate::model::FieldValue for $name {
            fn data_type() -> $crate::model::DataType {
                $crate::model::DataType::Enum
            }

            fn class() -> ::std::option::Option<::std::any::TypeId> {
                ::std::option::Option::Some(::std::any::TypeId::of::<Self>())
            }

            fn to_value(&self) -> $crate::model::Value {
                $crate::model::Value::Enum($crate::model::EnumValue::of(*self))
            }

            fn from_value(
                value: $crate::model::Value,
            ) -> ::std::result::Result<Self, $crate::error::SerializeError> {
                $crate::model::enum_from_value(value)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::model::{DataType, Enumeration, FieldValue, Record, RecordType, Value};

    crate::enumeration! {
        enum Level { Low, Mid, High }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Sample {
            id: i64,
            #[tag(3)]
            label: Option<String>,
            level: Level,
        }
    }

    #[test]
    fn test_record_fields() {
        let fields = Sample::fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "id");
        assert!(fields[0].primitive);
        assert_eq!(fields[1].tag, Some(3));
        assert_eq!(fields[2].data_type, DataType::Enum);
        assert_eq!(Sample::type_name(), "Sample");
    }

    #[test]
    fn test_record_get_set() {
        let mut s = Sample::construct().unwrap();
        s.set_field("id", Value::Integer(9)).unwrap();
        s.set_field("label", Value::String("x".into())).unwrap();
        s.set_field("level", Level::High.to_value()).unwrap();
        assert_eq!(s.id, 9);
        assert_eq!(s.label.as_deref(), Some("x"));
        assert_eq!(s.level, Level::High);

        assert!(matches!(s.get_field("id"), Some(Value::Long(9))));
        assert!(s.get_field("missing").is_none());
        assert!(s.set_field("missing", Value::Null).is_err());
    }

    #[test]
    fn test_record_as_value() {
        let s = Sample {
            id: 1,
            label: None,
            level: Level::Mid,
        };
        let back = Sample::from_value(s.to_value()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_enumeration() {
        assert_eq!(Level::variants(), &["Low", "Mid", "High"]);
        assert_eq!(Level::from_ordinal(3), None);
        assert_eq!(Level::default(), Level::Low);
    }
}

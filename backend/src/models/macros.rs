/// Defines an integer-backed identifier newtype for a persisted entity.
///
/// Generated items:
/// - derives (Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash) plus a
///   transparent serde representation, so ids travel as bare JSON numbers
/// - `Display` and `FromStr` (path segments parse straight into the id)
/// - lossless conversions to and from the inner scalar
///
/// Usage:
///   define_id_type!(i64, ScheduleId, "schedule");
#[macro_export]
macro_rules! define_id_type {
    ($inner:ty, $name:ident, $entity:literal) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Name of the entity this id refers to, used in error messages.
            pub const ENTITY: &'static str = $entity;

            pub fn new(value: $inner) -> Self {
                $name(value)
            }

            pub fn value(&self) -> $inner {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                s.trim()
                    .parse::<$inner>()
                    .map($name)
                    .map_err(|_| ::std::format!("invalid {} id: {:?}", $entity, s))
            }
        }

        impl ::std::convert::From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }

        impl ::std::convert::From<$name> for $inner {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

/// Wires a string-backed identifier into `FromStr`, `TryFrom` and serde.
///
/// The type must provide `parse(&str) -> Result<Self>` and `Display`.
macro_rules! string_identifier {
    ($ty:ty) => {
        impl std::str::FromStr for $ty {
            type Err = $crate::error::InvalidIdentifier;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <$ty>::parse(s)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = $crate::error::InvalidIdentifier;

            fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
                <$ty>::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::error::InvalidIdentifier;

            fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                <$ty>::parse(&s)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.to_string()
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                <$ty>::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

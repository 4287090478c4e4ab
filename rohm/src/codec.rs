//! Scalar conversions between attribute values and stored field strings.

/// Formats a value the way it is stored in a primary record or index key.
pub trait ToField {
    fn to_field(&self) -> String;
}

/// Parses a stored field back; the error is a human readable reason.
pub trait FromField: Sized {
    fn from_field(raw: &str) -> Result<Self, String>;
}

macro_rules! impl_field_for_number {
    ($($t:ty),*) => {
        $(
            impl ToField for $t {
                fn to_field(&self) -> String {
                    self.to_string()
                }
            }
            impl FromField for $t {
                fn from_field(raw: &str) -> Result<Self, String> {
                    raw.parse::<$t>().map_err(|e| format!("'{}' is not a valid {}: {}", raw, stringify!($t), e))
                }
            }
        )*
    };
}

impl_field_for_number!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

impl ToField for bool {
    fn to_field(&self) -> String {
        self.to_string()
    }
}

impl FromField for bool {
    fn from_field(raw: &str) -> Result<Self, String> {
        match raw {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        }
    }
}

impl ToField for char {
    fn to_field(&self) -> String {
        self.to_string()
    }
}

impl FromField for char {
    fn from_field(raw: &str) -> Result<Self, String> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(format!("'{}' is not a single character", raw)),
        }
    }
}

impl ToField for String {
    fn to_field(&self) -> String {
        self.clone()
    }
}

impl FromField for String {
    fn from_field(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl ToField for str {
    fn to_field(&self) -> String {
        self.to_string()
    }
}

impl<T: ToField + ?Sized> ToField for &T {
    fn to_field(&self) -> String {
        (**self).to_field()
    }
}

/// Error helper for derived enum codecs.
pub fn unknown_variant(enum_name: &str, raw: &str, variants: &[&str]) -> String {
    format!("'{}' is not a variant of {} (expected one of {})", raw, enum_name, variants.join(", "))
}

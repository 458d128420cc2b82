//! Plaintext secrets at the service boundary.
//!
//! Only a narrow set of inputs is accepted: text, raw bytes, integers (as
//! their decimal text) and null (as the empty secret). JSON values follow the
//! same rule so callers feeding request bodies through get the same answer.

use std::fmt;

use serde_json::Value;
use zeroize::Zeroizing;

use crate::crypto::hasher::HashError;

/// Secret bytes that are wiped from memory when dropped.
#[derive(Clone)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// The empty secret a null input coerces to.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes redacted>)", self.0.len())
    }
}

/// Conversion into a [`Secret`], failing with
/// [`HashError::InvalidSecretType`] for values that have no byte form.
pub trait IntoSecret {
    fn into_secret(self) -> Result<Secret, HashError>;
}

impl IntoSecret for Secret {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(self)
    }
}

impl IntoSecret for &Secret {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(self.clone())
    }
}

impl IntoSecret for &str {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::new(self.as_bytes()))
    }
}

impl IntoSecret for &String {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::new(self.as_bytes()))
    }
}

impl IntoSecret for String {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::new(self.into_bytes()))
    }
}

impl IntoSecret for &[u8] {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::new(self))
    }
}

impl<const N: usize> IntoSecret for &[u8; N] {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::new(&self[..]))
    }
}

impl IntoSecret for Vec<u8> {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::new(self))
    }
}

impl IntoSecret for () {
    fn into_secret(self) -> Result<Secret, HashError> {
        Ok(Secret::empty())
    }
}

impl<T: IntoSecret> IntoSecret for Option<T> {
    fn into_secret(self) -> Result<Secret, HashError> {
        match self {
            Some(inner) => inner.into_secret(),
            None => Ok(Secret::empty()),
        }
    }
}

macro_rules! integer_secret {
    ($($ty:ty),*) => {
        $(
            impl IntoSecret for $ty {
                fn into_secret(self) -> Result<Secret, HashError> {
                    Ok(Secret::new(self.to_string()))
                }
            }
        )*
    };
}

integer_secret!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl IntoSecret for &Value {
    fn into_secret(self) -> Result<Secret, HashError> {
        match self {
            Value::Null => Ok(Secret::empty()),
            Value::String(text) => Ok(Secret::new(text.as_bytes())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Secret::new(n.to_string())),
            Value::Number(_) => Err(HashError::InvalidSecretType("float")),
            Value::Bool(_) => Err(HashError::InvalidSecretType("bool")),
            Value::Array(_) => Err(HashError::InvalidSecretType("array")),
            Value::Object(_) => Err(HashError::InvalidSecretType("object")),
        }
    }
}

impl IntoSecret for Value {
    fn into_secret(self) -> Result<Secret, HashError> {
        (&self).into_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes_of(input: impl IntoSecret) -> Vec<u8> {
        input.into_secret().expect("coercible").as_bytes().to_vec()
    }

    #[test]
    fn text_and_bytes_pass_through() {
        assert_eq!(bytes_of("hunter2"), b"hunter2");
        assert_eq!(bytes_of(String::from("hunter2")), b"hunter2");
        assert_eq!(bytes_of(&b"\xffraw"[..]), b"\xffraw");
        assert_eq!(bytes_of(b"raw"), b"raw");
    }

    #[test]
    fn null_and_integers_are_stringified() {
        assert_eq!(bytes_of(()), b"");
        assert_eq!(bytes_of(None::<&str>), b"");
        assert_eq!(bytes_of(Some("x")), b"x");
        assert_eq!(bytes_of(1234_i64), b"1234");
        assert_eq!(bytes_of(-7_i32), b"-7");
        assert_eq!(bytes_of(json!(null)), b"");
        assert_eq!(bytes_of(json!(42)), b"42");
        assert_eq!(bytes_of(json!("pw")), b"pw");
    }

    #[test]
    fn other_json_types_are_rejected() {
        for value in [json!(1.5), json!(true), json!([1, 2]), json!({"a": 1})] {
            let err = (&value).into_secret().unwrap_err();
            assert!(matches!(err, HashError::InvalidSecretType(_)), "{value}");
        }
    }

    #[test]
    fn debug_output_is_redacted() {
        let secret = "topsecret".into_secret().unwrap();
        let printed = format!("{secret:?}");
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("9 bytes"));
    }
}

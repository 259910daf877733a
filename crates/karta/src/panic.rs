//! Rendering of panic payloads caught from step handlers and listeners.

use std::any::Any;

/// Extract a panic payload into a human-readable message.
///
/// `&str` and `String` payloads, the ones `panic!` produces, are returned as
/// is. Common primitives are formatted; anything else is described by its
/// type id.
///
/// # Examples
/// ```
/// use karta::panic_message;
///
/// let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
/// assert_eq!(panic_message(payload.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    macro_rules! try_downcast {
        ($($ty:ty),* $(,)?) => {
            $(
                if let Some(value) = payload.downcast_ref::<$ty>() {
                    return value.to_string();
                }
            )*
        };
    }

    try_downcast!(&str, String, i32, u32, i64, u64, usize, f64, bool);
    format!("opaque panic payload ({:?})", payload.type_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Box::new("static"), "static")]
    #[case(Box::new(String::from("owned")), "owned")]
    #[case(Box::new(7_u32), "7")]
    fn renders_common_payloads(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        assert_eq!(panic_message(payload.as_ref()), expected);
    }

    #[test]
    fn describes_opaque_payloads() {
        struct Custom;
        let payload: Box<dyn Any + Send> = Box::new(Custom);
        assert!(panic_message(payload.as_ref()).starts_with("opaque panic payload"));
    }
}

pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_format(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidFormat {
        element: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_count(count: u64) -> super::Result<u64> {
        verify_arg!(count, count > 0);
        Ok(count)
    }

    fn check_magic(magic: u64) -> super::Result<()> {
        verify_data!(magic, magic == 0xAC);
        Ok(())
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_count(3).unwrap(), 3);
        let e = check_count(0).unwrap_err();
        match e.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "count");
                assert_eq!(message, "count > 0");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_verify_data() {
        assert!(check_magic(0xAC).is_ok());
        assert!(check_magic(0xAD).unwrap_err().is_invalid_format());
    }
}

//! Result type alias
//!
//! A convenience Result type alias that uses `EtlError` as the error type.

use super::errors::EtlError;

/// Result type alias for loader operations
///
/// Use this throughout the codebase for fallible operations.
///
/// # Examples
///
/// ```
/// use ctgov_loader::domain::result::Result;
/// use ctgov_loader::domain::errors::EtlError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(EtlError::Other("oops".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::EtlError;

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(EtlError::Other("test error".to_string()));
        assert!(result.is_err());
    }
}

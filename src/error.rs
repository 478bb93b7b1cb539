pub trait ResultOkLogExt<T, E> {
    /// Converts into an `Option`, logging the error at `error` level.
    fn ok_log(self) -> Option<T>;
    /// Converts into an `Option`, logging the error at `warn` level.
    fn ok_warn(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn ok_warn(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}

/// Turns a `Result` into an `Option`, logging the error on the way.
///
/// Used where a failure for one item must not abort the whole pass, e.g. a
/// process that exited between listing and reading it.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procfs::ProcParser;

    #[test]
    fn test_ok_log() {
        let dir = tempfile::tempdir().unwrap();
        let parser = ProcParser::with_params(dir.path(), 10_000_000, 0, 4096);

        assert_eq!(parser.read_uids(1).ok_log(), None);
        assert_eq!(Ok::<u32, std::fmt::Error>(7).ok_log(), Some(7));
    }
}

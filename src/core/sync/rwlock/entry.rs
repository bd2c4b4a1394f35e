/*!
 * Entry Points
 * Caller-supplied callbacks started once a grant is issued
 */

use super::grant::ReleaseCapability;

/// Type-erased entry point as stored in the request queue
pub(super) type EntryFn = Box<dyn FnOnce(ReleaseCapability) -> anyhow::Result<()> + Send + 'static>;

/// Return type accepted from an entry point
///
/// Entry points either return `()` or a `Result`. An `Err` is treated like a
/// synchronous failure: the grant is released on the entry point's behalf.
pub trait EntryOutcome {
    fn into_result(self) -> anyhow::Result<()>;
}

impl EntryOutcome for () {
    #[inline]
    fn into_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> EntryOutcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    #[inline]
    fn into_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

pub(super) fn boxed<F, R>(entry: F) -> EntryFn
where
    F: FnOnce(ReleaseCapability) -> R + Send + 'static,
    R: EntryOutcome,
{
    Box::new(move |release| entry(release).into_result())
}

/// Best-effort text of a panic payload
pub(super) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_outcome() {
        assert!(().into_result().is_ok());
    }

    #[test]
    fn test_result_outcome() {
        let ok: Result<(), std::io::Error> = Ok(());
        assert!(ok.into_result().is_ok());

        let err: Result<(), anyhow::Error> = Err(anyhow::anyhow!("boom"));
        assert_eq!(err.into_result().unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = std::panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");
    }
}

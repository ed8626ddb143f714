use polycall_value::FfiValue;

use crate::error::Result;

/// The actual cross-language invocation. The engine calls it on a cache miss
/// and for every entry of a batch drain.
///
/// Dispatchers run while the engine holds its batch lock during drains, so
/// they must not enqueue or drain batches on the same manager. Metrics,
/// traces, the caches and export stay usable from inside `dispatch`.
pub trait CallDispatcher: Send + Sync {
    fn dispatch(
        &self,
        function_name: &str,
        args: &[FfiValue],
        target_language: &str,
    ) -> Result<FfiValue>;
}

impl<F> CallDispatcher for F
where
    F: Fn(&str, &[FfiValue], &str) -> Result<FfiValue> + Send + Sync,
{
    fn dispatch(
        &self,
        function_name: &str,
        args: &[FfiValue],
        target_language: &str,
    ) -> Result<FfiValue> {
        self(function_name, args, target_language)
    }
}

/// What a wrapped operation hands back: its payload plus whether that payload
/// came out of a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult<T> {
    pub payload: T,
    pub from_cache: bool,
}

impl<T> InvocationResult<T> {
    pub fn fresh(payload: T) -> Self {
        Self {
            payload,
            from_cache: false,
        }
    }

    pub fn cached(payload: T) -> Self {
        Self {
            payload,
            from_cache: true,
        }
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

use crate::invocation::InvocationResult;
use async_trait::async_trait;
use std::future::Future;

/// An operation that reports whether its result was served from cache.
///
/// Implemented for every `Fn(A) -> Result<InvocationResult<T>, E>`, so plain
/// closures can be gated directly. Use a tuple for `A` when the operation
/// takes several arguments and `()` when it takes none.
pub trait Invoker<A> {
    type Output;
    type Error;

    fn invoke(&self, args: A) -> Result<InvocationResult<Self::Output>, Self::Error>;
}

impl<A, T, E, F> Invoker<A> for F
where
    F: Fn(A) -> Result<InvocationResult<T>, E>,
{
    type Output = T;
    type Error = E;

    fn invoke(&self, args: A) -> Result<InvocationResult<T>, E> {
        self(args)
    }
}

#[async_trait]
pub trait AsyncInvoker<A: Send + 'static>: Send + Sync {
    type Output: Send;
    type Error: Send;

    async fn invoke(&self, args: A) -> Result<InvocationResult<Self::Output>, Self::Error>;
}

#[async_trait]
impl<A, T, E, F, Fut> AsyncInvoker<A> for F
where
    A: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<InvocationResult<T>, E>> + Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn invoke(&self, args: A) -> Result<InvocationResult<T>, E> {
        self(args).await
    }
}

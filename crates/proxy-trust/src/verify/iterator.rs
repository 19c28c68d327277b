//! Iterators over candidate bootstrap proxies.

use std::iter::Peekable;

use crate::error::{Result, TrustError};
use crate::proxy::ProxyRef;

/// Lazily yields candidate bootstrap proxies for one verification attempt.
///
/// Not restartable: the verifier asks for a fresh iterator each time.
pub trait ProxyTrustIterator {
    fn has_next(&mut self) -> bool;

    /// The next candidate.
    ///
    /// # Errors
    ///
    /// `TrustError::NoSuchElement` past the end. Producing a candidate may
    /// involve I/O, surfaced as `TrustError::Remote` or `TrustError::Io`.
    fn next(&mut self) -> Result<ProxyRef>;

    /// Told about a remote failure while verifying the last candidate.
    fn set_exception(&mut self, err: TrustError) {
        log::debug!("iterator ignoring candidate failure: {err}");
    }
}

/// Something able to produce a `ProxyTrustIterator`.
pub trait TrustIteratorSource {
    fn proxy_trust_iterator(&self) -> Result<Box<dyn ProxyTrustIterator>>;
}

/// Yields one fixed object, then is exhausted.
#[derive(Debug)]
pub struct SingletonProxyTrustIterator {
    obj: Option<ProxyRef>,
}

impl SingletonProxyTrustIterator {
    pub fn new(obj: ProxyRef) -> Self {
        Self { obj: Some(obj) }
    }
}

impl ProxyTrustIterator for SingletonProxyTrustIterator {
    fn has_next(&mut self) -> bool {
        self.obj.is_some()
    }

    fn next(&mut self) -> Result<ProxyRef> {
        self.obj.take().ok_or(TrustError::NoSuchElement)
    }
}

/// Yields the items of an underlying iterator, remembering the last
/// failure reported through `set_exception`.
pub struct SequenceProxyTrustIterator<I: Iterator<Item = Result<ProxyRef>>> {
    inner: Peekable<I>,
    last_exception: Option<TrustError>,
}

impl<I: Iterator<Item = Result<ProxyRef>>> SequenceProxyTrustIterator<I> {
    pub fn new(inner: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: inner.into_iter().peekable(),
            last_exception: None,
        }
    }

    pub fn last_exception(&self) -> Option<&TrustError> {
        self.last_exception.as_ref()
    }
}

impl SequenceProxyTrustIterator<std::vec::IntoIter<Result<ProxyRef>>> {
    /// Iterate over a fixed list of candidates.
    pub fn from_candidates(candidates: Vec<ProxyRef>) -> Self {
        Self::new(candidates.into_iter().map(Ok).collect::<Vec<_>>())
    }
}

impl<I: Iterator<Item = Result<ProxyRef>>> ProxyTrustIterator for SequenceProxyTrustIterator<I> {
    fn has_next(&mut self) -> bool {
        self.inner.peek().is_some()
    }

    fn next(&mut self) -> Result<ProxyRef> {
        self.inner.next().unwrap_or(Err(TrustError::NoSuchElement))
    }

    fn set_exception(&mut self, err: TrustError) {
        log::debug!("candidate failed: {err}");
        self.last_exception = Some(err);
    }
}

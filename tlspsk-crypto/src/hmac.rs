//! HMAC interface.

/// Keyed MAC over the binder transcript hash.
///
/// `binder = HMAC(finished_key, Transcript-Hash(truncated ClientHello))`.
/// Comparison against a received binder happens in the core, in constant
/// time.
pub trait Hmac: Send {
    /// Feed more data.
    fn update(&mut self, data: &[u8]);

    /// Consume the state and return the tag.
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

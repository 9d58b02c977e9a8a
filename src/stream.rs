//! Stream adapters for decoding received datagrams.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, ready};
use pin_project_lite::pin_project;

use crate::Result;
use crate::packets::Packet;
use crate::registry::PacketRegistry;

/// Extension trait to decode any stream of byte buffers through a registry.
pub trait DecodeExt: Stream {
    /// Identify and decode each item.
    ///
    /// Undecodable items are yielded as errors; the stream keeps going.
    fn decode_packets(self, registry: Arc<PacketRegistry>) -> Decode<Self>
    where
        Self: Sized,
        Self::Item: AsRef<[u8]>,
    {
        Decode::new(self, registry)
    }
}

impl<T: Stream> DecodeExt for T {}

pin_project! {
    /// A stream combinator that decodes datagrams into [`Packet`]s
    pub struct Decode<S> {
        #[pin]
        stream: S,
        registry: Arc<PacketRegistry>,
    }
}

impl<S> Decode<S> {
    pub fn new(stream: S, registry: Arc<PacketRegistry>) -> Self {
        Self { stream, registry }
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Stream for Decode<S>
where
    S: Stream,
    S::Item: AsRef<[u8]>,
{
    type Item = Result<Packet>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.stream.poll_next(cx));
        Poll::Ready(item.map(|bytes| this.registry.decode(bytes.as_ref())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

//! Framing of fixed-size records over byte streams.
//!
//! Every typed record has a fixed wire size, so a stream carrying a single
//! record type can be split without any length prefix. [`RecordCodec`] plugs
//! into `tokio_util::codec::{FramedRead, FramedWrite}`.

use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::PacketCodec;
use crate::types::ByteOrder;
use crate::{Result, RtdnError};

/// Splits a byte stream into consecutive `P` records.
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec<P> {
    order: ByteOrder,
    _record: PhantomData<fn() -> P>,
}

impl<P: PacketCodec> RecordCodec<P> {
    pub fn new() -> Self {
        Self::with_byte_order(ByteOrder::Native)
    }

    pub fn with_byte_order(order: ByteOrder) -> Self {
        Self { order, _record: PhantomData }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }
}

impl<P: PacketCodec> Default for RecordCodec<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PacketCodec> Decoder for RecordCodec<P> {
    type Item = P;
    type Error = RtdnError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<P>> {
        if src.len() < P::SIZE {
            src.reserve(P::SIZE - src.len());
            return Ok(None);
        }

        let frame = src.split_to(P::SIZE);
        trace!(packet = P::NAME, remaining = src.len(), "Decoding framed record");
        P::decode_with(&frame, self.order).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<P>> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => {
                let actual = src.len();
                src.clear();
                Err(RtdnError::size_mismatch(P::NAME, P::SIZE, actual))
            }
        }
    }
}

impl<P: PacketCodec> Encoder<P> for RecordCodec<P> {
    type Error = RtdnError;

    fn encode(&mut self, record: P, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(P::SIZE);
        dst.put_slice(&record.encode_with(self.order));
        Ok(())
    }
}

impl<P: PacketCodec> Encoder<&P> for RecordCodec<P> {
    type Error = RtdnError;

    fn encode(&mut self, record: &P, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(P::SIZE);
        dst.put_slice(&record.encode_with(self.order));
        Ok(())
    }
}

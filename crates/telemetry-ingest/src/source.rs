// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inbound message sources.
//!
//! A source pulls raw `(payload, topic)` pairs from somewhere and hands each
//! one to the [`FrontDoor`]. Two framings are understood, per line or per
//! datagram:
//!
//! ```text
//! iot/testing<TAB>temp=21.5,hum=40
//! temp=21.5,hum=40            (topic = default topic)
//! ```
//!
//! Messages whose topic is not subscribed are skipped before the front door
//! sees them.

use crate::filter::TopicFilter;
use crate::front_door::FrontDoor;
use std::borrow::Cow;
use std::io::{self, BufRead};
use std::net::UdpSocket;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Largest datagram accepted by [`UdpSource`].
const MAX_DATAGRAM: usize = 65_535;

/// How often a blocked UDP receive wakes up to check for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Something that delivers messages to the front door until it ends or is
/// cancelled.
pub trait MessageSource {
    /// Deliver messages; returns how many were handed to the front door.
    fn run(&mut self, door: &FrontDoor, token: &CancellationToken) -> Result<u64, SourceError>;
}

/// Split a framed message into topic and payload.
pub fn split_topic<'a>(frame: &'a [u8], default_topic: &'a str) -> (Cow<'a, str>, &'a [u8]) {
    match frame.iter().position(|&b| b == b'\t') {
        Some(tab) => (String::from_utf8_lossy(&frame[..tab]), &frame[tab + 1..]),
        None => (Cow::Borrowed(default_topic), frame),
    }
}

/// Shared delivery step: topic filter, then front door.
fn deliver(
    frame: &[u8],
    default_topic: &str,
    filter: &TopicFilter,
    door: &FrontDoor,
) -> bool {
    let (topic, payload) = split_topic(frame, default_topic);
    if !filter.matches(&topic) {
        tracing::trace!(topic = %topic, "topic not subscribed, skipping");
        return false;
    }
    door.on_message(payload, &topic);
    true
}

/// Line-oriented source (stdin, replay files).
///
/// Ends at EOF. Cancellation is checked between lines, so a reader blocked
/// on a line that never comes stays blocked until input arrives.
pub struct LineSource<R> {
    reader: R,
    filter: TopicFilter,
    default_topic: String,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R, filter: TopicFilter, default_topic: impl Into<String>) -> Self {
        Self {
            reader,
            filter,
            default_topic: default_topic.into(),
        }
    }
}

impl<R: BufRead> MessageSource for LineSource<R> {
    fn run(&mut self, door: &FrontDoor, token: &CancellationToken) -> Result<u64, SourceError> {
        let mut line = Vec::new();
        let mut delivered = 0u64;

        while !token.is_cancelled() {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                tracing::debug!(delivered, "line source reached EOF");
                break;
            }
            let frame = line
                .strip_suffix(b"\n")
                .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
                .unwrap_or(&line[..]);

            if deliver(frame, &self.default_topic, &self.filter, door) {
                delivered += 1;
            }
        }

        Ok(delivered)
    }
}

/// UDP datagram source; one message per datagram.
pub struct UdpSource {
    socket: UdpSocket,
    filter: TopicFilter,
    default_topic: String,
}

impl UdpSource {
    /// Bind `addr` (`host:port`).
    pub fn bind(
        addr: &str,
        filter: TopicFilter,
        default_topic: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let socket = UdpSocket::bind(addr).map_err(|source| SourceError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;

        tracing::info!(addr, "UDP source listening");
        Ok(Self {
            socket,
            filter,
            default_topic: default_topic.into(),
        })
    }

    /// Bound local address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, SourceError> {
        Ok(self.socket.local_addr()?)
    }
}

impl MessageSource for UdpSource {
    fn run(&mut self, door: &FrontDoor, token: &CancellationToken) -> Result<u64, SourceError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut delivered = 0u64;

        while !token.is_cancelled() {
            let len = match self.socket.recv_from(&mut buf) {
                Ok((len, _peer)) => len,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if deliver(&buf[..len], &self.default_topic, &self.filter, door) {
                delivered += 1;
            }
        }

        tracing::debug!(delivered, "UDP source stopped");
        Ok(delivered)
    }
}

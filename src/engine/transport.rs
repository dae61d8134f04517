// Tue Jan 13 2026 - Alex

//! Message passing between the coordinator and its workers.
//!
//! Every message is serialized before it crosses a channel, so the two sides
//! never hold references into each other's state.

use crate::engine::error::{Result, SchedulerError};
use crate::engine::protocol::{Inbound, Outcome, Reply, Request};
use crate::engine::result::WorkerReport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub type Packet = Vec<u8>;

pub fn encode<T: Serialize>(message: &T) -> Result<Packet> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(packet: &[u8]) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_slice(packet)
}

/// Builds one coordinator endpoint and `workers` worker endpoints wired to it.
pub fn channel_set(workers: usize) -> (CoordinatorEndpoint, Vec<WorkerEndpoint>) {
    let (inbound_tx, inbound_rx) = channel();
    let mut replies = Vec::with_capacity(workers);
    let mut endpoints = Vec::with_capacity(workers);

    for id in 0..workers {
        let (reply_tx, reply_rx) = channel();
        replies.push(reply_tx);
        endpoints.push(WorkerEndpoint::new(id, inbound_tx.clone(), reply_rx));
    }

    (CoordinatorEndpoint::new(inbound_rx, replies), endpoints)
}

pub struct CoordinatorEndpoint {
    inbound: Receiver<Packet>,
    replies: Vec<Sender<Packet>>,
}

impl CoordinatorEndpoint {
    pub fn new(inbound: Receiver<Packet>, replies: Vec<Sender<Packet>>) -> Self {
        Self { inbound, replies }
    }

    /// Blocks until any worker sends something.
    pub fn recv(&self) -> Result<Inbound> {
        let packet = self.inbound.recv().map_err(|_| SchedulerError::ChannelClosed)?;
        Ok(decode(&packet)?)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Inbound>> {
        match self.inbound.recv_timeout(timeout) {
            Ok(packet) => Ok(Some(decode(&packet)?)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SchedulerError::ChannelClosed),
        }
    }

    pub fn send(&self, worker_id: usize, reply: &Reply) -> Result<()> {
        self.send_raw(worker_id, encode(reply)?)
    }

    pub fn send_raw(&self, worker_id: usize, packet: Packet) -> Result<()> {
        let tx = self.replies.get(worker_id).ok_or_else(|| SchedulerError::Protocol {
            worker_id,
            detail: "no reply channel".to_string(),
        })?;
        tx.send(packet).map_err(|_| SchedulerError::ChannelClosed)
    }
}

pub struct WorkerEndpoint {
    id: usize,
    outbound: Sender<Packet>,
    replies: Receiver<Packet>,
}

impl WorkerEndpoint {
    pub fn new(id: usize, outbound: Sender<Packet>, replies: Receiver<Packet>) -> Self {
        Self { id, outbound, replies }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Sends a request and blocks for the reply.
    ///
    /// The outer result fails when the coordinator is gone; the inner one
    /// when the reply could not be understood.
    pub fn request(&self, outcome: Outcome) -> Result<std::result::Result<Reply, serde_json::Error>> {
        let packet = encode(&Inbound::Request(Request::new(self.id, outcome)))?;
        self.outbound.send(packet).map_err(|_| SchedulerError::ChannelClosed)?;

        let reply = self.replies.recv().map_err(|_| SchedulerError::ChannelClosed)?;
        Ok(decode(&reply))
    }

    pub fn report(&self, report: &WorkerReport) -> Result<()> {
        let packet = encode(&Inbound::Report(report.clone()))?;
        self.outbound.send(packet).map_err(|_| SchedulerError::ChannelClosed)
    }
}

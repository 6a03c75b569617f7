// src/pipeline/snapshot.rs
//
// Latest-value cell shared between one producer (camera, odometry) and the
// tick. Writers swap in a whole new `Arc`; readers clone the `Arc`, so a tick
// never observes a half-written frame or pose.

use std::sync::Arc;
use tokio::sync::watch;

pub fn snapshot_cell<T>() -> (SnapshotWriter<T>, SnapshotReader<T>) {
    let (tx, rx) = watch::channel(None);
    (SnapshotWriter { tx }, SnapshotReader { rx })
}

pub struct SnapshotWriter<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T> SnapshotWriter<T> {
    /// Replace the snapshot. Never blocks, works with no readers left.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(Some(Arc::new(value)));
    }
}

pub struct SnapshotReader<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Clone for SnapshotReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> SnapshotReader<T> {
    /// `None` until the producer has published at least once.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }
}

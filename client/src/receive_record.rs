use log::{debug, trace};
use thiserror::Error;

use metavoxel_shared::{sequence_greater_than, MetavoxelData, PacketIndex, SequenceList};

/// Errors that can occur while looking up or storing a receive record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiveRecordError {
    /// The requested baseline is older than every record still kept
    #[error("Baseline {packet_index} precedes the oldest retained record {oldest}")]
    BaselinePruned {
        packet_index: PacketIndex,
        oldest: PacketIndex,
    },

    /// Nothing has been recorded yet
    #[error("No record available for baseline {packet_index}")]
    BaselineUnavailable { packet_index: PacketIndex },

    #[error("A record for packet {packet_index} already exists")]
    Duplicate { packet_index: PacketIndex },

    /// Records must be appended newest last
    #[error("Record for packet {packet_index} is older than the newest record {newest}")]
    OutOfOrder {
        packet_index: PacketIndex,
        newest: PacketIndex,
    },
}

/// Snapshots of the confirmed tree, keyed by the index of the server packet
/// that produced them. The server encodes each update against one of these,
/// so they are kept until the server can no longer pick them.
#[derive(Default)]
pub struct ReceiveRecordBuffer {
    records: SequenceList<MetavoxelData>,
}

impl ReceiveRecordBuffer {
    pub fn new() -> Self {
        Self {
            records: SequenceList::new(),
        }
    }

    /// Appends the snapshot produced by `packet_index`, which must be newer
    /// than every record already held.
    pub fn record(
        &mut self,
        packet_index: PacketIndex,
        data: MetavoxelData,
    ) -> Result<(), ReceiveRecordError> {
        if let Some((newest, _)) = self.records.back() {
            if *newest == packet_index {
                return Err(ReceiveRecordError::Duplicate { packet_index });
            }
            if !sequence_greater_than(packet_index, *newest) {
                return Err(ReceiveRecordError::OutOfOrder {
                    packet_index,
                    newest: *newest,
                });
            }
        }
        self.records
            .try_insert_scan_from_back(packet_index, data)
            .map_err(|_| ReceiveRecordError::Duplicate { packet_index })?;
        trace!("recorded state of packet {}", packet_index);
        Ok(())
    }

    /// The tree as it stood once `packet_index` had been processed: the
    /// record for that packet, or failing that the newest one before it.
    pub fn find(&self, packet_index: PacketIndex) -> Result<&MetavoxelData, ReceiveRecordError> {
        let Some((oldest, _)) = self.records.front() else {
            return Err(ReceiveRecordError::BaselineUnavailable { packet_index });
        };
        match self.records.find_nearest_prior(&packet_index) {
            Some((found, data)) => {
                if *found != packet_index {
                    debug!(
                        "no record of packet {}, using packet {} before it",
                        packet_index, found
                    );
                }
                Ok(data)
            }
            None => Err(ReceiveRecordError::BaselinePruned {
                packet_index,
                oldest: *oldest,
            }),
        }
    }

    /// Drops every record strictly older than `packet_index`
    pub fn prune_before(&mut self, packet_index: PacketIndex) {
        let pruned = self.records.prune_before(&packet_index);
        if pruned > 0 {
            trace!("pruned {} records before packet {}", pruned, packet_index);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn oldest(&self) -> Option<PacketIndex> {
        self.records.front().map(|(index, _)| *index)
    }

    pub fn newest(&self) -> Option<PacketIndex> {
        self.records.back().map(|(index, _)| *index)
    }
}

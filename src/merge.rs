use crate::consts::DMX_UNIVERSE_SIZE;
use crate::source_table::SourceEntry;
use crate::types::MergeMode;

/// The combined output for one universe.
/// Channels past [MergedFrame::len] are always zero.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MergedFrame {
    channels: [u8; DMX_UNIVERSE_SIZE],
    length: usize,
}

impl MergedFrame {
    pub const fn new() -> Self {
        Self {
            channels: [0; DMX_UNIVERSE_SIZE],
            length: 0,
        }
    }

    /// A full universe of zeroed channels.
    pub const fn blank() -> Self {
        Self {
            channels: [0; DMX_UNIVERSE_SIZE],
            length: DMX_UNIVERSE_SIZE,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.channels[..self.length]
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn fill_from(&mut self, data: &[u8]) {
        self.channels[..data.len()].copy_from_slice(data);
        self.length = data.len();
    }
}

impl Default for MergedFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Combines the live sources of one universe into a single frame.
///
/// Only the highest priority present takes part, lower tiers contribute
/// nothing. Within the winning tier HTP keeps the per-channel maximum
/// while LTP replays the most recently refreshed source, breaking ties
/// on the lowest cid. Terminated sources are skipped entirely. With no
/// live source the result is empty and the caller decides what to
/// transmit.
pub fn merge_universe(entries: &[SourceEntry], mode: MergeMode) -> MergedFrame {
    let mut frame = MergedFrame::new();

    let winning_priority = match entries
        .iter()
        .filter(|entry| !entry.terminated)
        .map(|entry| entry.priority)
        .max()
    {
        Some(winning_priority) => winning_priority,
        None => return frame,
    };

    let mut contributors = entries
        .iter()
        .filter(|entry| !entry.terminated && entry.priority == winning_priority);

    // lone sender, both policies pass its data through
    if let (Some(only), None) = (contributors.next(), contributors.next()) {
        frame.fill_from(&only.data);
        return frame;
    }

    match mode {
        MergeMode::Htp => {
            for entry in entries {
                if entry.terminated || entry.priority != winning_priority {
                    continue;
                }

                for (channel, value) in frame.channels.iter_mut().zip(entry.data.iter()) {
                    *channel = (*channel).max(*value);
                }

                frame.length = frame.length.max(entry.data.len());
            }
        },
        MergeMode::Ltp => {
            let mut winner: Option<&SourceEntry> = None;
            for entry in entries {
                if entry.terminated || entry.priority != winning_priority {
                    continue;
                }

                let improves = match winner {
                    None => true,
                    Some(current) => {
                        entry.last_seen_millis > current.last_seen_millis
                            || (entry.last_seen_millis == current.last_seen_millis
                                && entry.cid < current.cid)
                    },
                };

                if improves {
                    winner = Some(entry);
                }
            }

            if let Some(winner) = winner {
                frame.fill_from(&winner.data);
            }
        },
    }

    frame
}

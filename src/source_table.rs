use crate::consts::{DMX_UNIVERSE_SIZE, SEQUENCE_ACCEPT_WINDOW};
use crate::source_cid::SourceCid;
use crate::types::{ConfigError, DmxData, Priority, Universe};

/// State of one network sender on one universe.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub cid: SourceCid,
    pub priority: Priority,
    pub sequence_number: u8,
    /// Monotonic milliseconds at the last accepted packet.
    /// Rejected packets do not refresh this.
    pub last_seen_millis: u64,
    /// The sender announced the end of this stream.
    pub terminated: bool,
    pub data: DmxData,
}

/// What happened to a packet handed to [SourceTable::admit].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdmitResult {
    /// First packet of this sender on this universe, an entry was created.
    NewSource,
    /// An existing entry was refreshed with the packet contents.
    Updated,
    /// The sender announced stream termination.
    Terminated,
    /// The sequence number fell outside the acceptance window, nothing changed.
    OutOfOrder,
    /// The universe is not registered.
    UnknownUniverse,
    /// No free sender slot on this universe.
    TableFull,
}

struct UniverseSources<const SOURCES: usize> {
    universe: Universe,
    entries: heapless::Vec<SourceEntry, SOURCES>,
}

/// Fixed capacity registry of the senders currently heard on each registered
/// universe, keyed by (universe, cid).
pub struct SourceTable<const UNIVERSES: usize, const SOURCES: usize> {
    slots: heapless::Vec<UniverseSources<SOURCES>, UNIVERSES>,
    source_loss_timeout_millis: u32,
}

impl<const UNIVERSES: usize, const SOURCES: usize> SourceTable<UNIVERSES, SOURCES> {
    pub fn new(source_loss_timeout_millis: u32) -> Self {
        Self {
            slots: heapless::Vec::new(),
            source_loss_timeout_millis,
        }
    }

    pub fn add_universe(&mut self, universe: Universe) -> Result<(), ConfigError> {
        if self.slots.iter().any(|slot| slot.universe == universe) {
            return Err(ConfigError::DuplicateUniverse);
        }

        self.slots
            .push(UniverseSources {
                universe,
                entries: heapless::Vec::new(),
            })
            .map_err(|_| ConfigError::TooManyUniverses)
    }

    pub fn contains(&self, universe: Universe) -> bool {
        self.slots.iter().any(|slot| slot.universe == universe)
    }

    /// Processes one packet that already passed decoding.
    ///
    /// A sequence number is accepted if this is the first packet of the
    /// sender or if it advances the previous one by 1 to 96 (wrapping).
    /// Anything else is reported as out of order and leaves the entry
    /// untouched, so a sender that jumped too far re-enters as a new
    /// source once its stale entry expired. Stream termination is gated
    /// by the same rule.
    ///
    /// `dmx_data` longer than a universe is truncated.
    pub fn admit(
        &mut self,
        universe: Universe,
        cid: SourceCid,
        priority: Priority,
        sequence_number: u8,
        dmx_data: &[u8],
        terminated: bool,
        now_millis: u64,
    ) -> AdmitResult {
        let slot = match self.slots.iter_mut().find(|slot| slot.universe == universe) {
            Some(slot) => slot,
            None => return AdmitResult::UnknownUniverse,
        };

        let dmx_data = &dmx_data[..dmx_data.len().min(DMX_UNIVERSE_SIZE)];

        match slot.entries.iter_mut().find(|entry| entry.cid == cid) {
            Some(entry) => {
                let delta = sequence_number.wrapping_sub(entry.sequence_number) as i8;
                if !(1..=SEQUENCE_ACCEPT_WINDOW).contains(&delta) {
                    return AdmitResult::OutOfOrder;
                }

                // A termination replayed from outside the window was
                // rejected above and never tears down a live source.
                if terminated {
                    entry.terminated = true;
                    entry.sequence_number = sequence_number;
                    return AdmitResult::Terminated;
                }

                entry.priority = priority;
                entry.sequence_number = sequence_number;
                entry.last_seen_millis = now_millis;
                entry.data = DmxData::from_slice(dmx_data).unwrap();

                AdmitResult::Updated
            },
            None => {
                if terminated {
                    // Nothing tracked, nothing to tear down.
                    return AdmitResult::Terminated;
                }

                if slot.entries.is_full() {
                    return AdmitResult::TableFull;
                }

                slot.entries
                    .push(SourceEntry {
                        cid,
                        priority,
                        sequence_number,
                        last_seen_millis: now_millis,
                        terminated: false,
                        data: DmxData::from_slice(dmx_data).unwrap(),
                    })
                    .unwrap();

                AdmitResult::NewSource
            },
        }
    }

    /// Removes every entry not heard from for longer than the source loss
    /// timeout. Each removal is reported through `on_evict`.
    pub fn expire<F: FnMut(Universe, SourceCid)>(
        &mut self,
        now_millis: u64,
        mut on_evict: F,
    ) -> u32 {
        let timeout_millis = self.source_loss_timeout_millis as u64;
        let mut evicted = 0;

        for slot in self.slots.iter_mut() {
            evicted += expire_slot(slot, timeout_millis, now_millis, &mut on_evict);
        }

        evicted
    }

    /// Like [SourceTable::expire] but only touches a single universe.
    pub fn expire_universe<F: FnMut(Universe, SourceCid)>(
        &mut self,
        universe: Universe,
        now_millis: u64,
        mut on_evict: F,
    ) -> u32 {
        let timeout_millis = self.source_loss_timeout_millis as u64;

        match self.slots.iter_mut().find(|slot| slot.universe == universe) {
            Some(slot) => expire_slot(slot, timeout_millis, now_millis, &mut on_evict),
            None => 0,
        }
    }

    /// Removes entries whose stream termination has been merged out.
    pub fn sweep_terminated(&mut self, universe: Universe) -> u32 {
        let slot = match self.slots.iter_mut().find(|slot| slot.universe == universe) {
            Some(slot) => slot,
            None => return 0,
        };

        let mut removed = 0;
        let mut index = 0;
        while index < slot.entries.len() {
            if slot.entries[index].terminated {
                slot.entries.swap_remove(index);
                removed += 1;
            } else {
                index += 1;
            }
        }

        removed
    }

    /// The senders currently tracked on a universe.
    /// Unregistered universes yield an empty slice.
    pub fn entries_for(&self, universe: Universe) -> &[SourceEntry] {
        self.slots
            .iter()
            .find(|slot| slot.universe == universe)
            .map(|slot| slot.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn source_loss_timeout_millis(&self) -> u32 {
        self.source_loss_timeout_millis
    }
}

fn expire_slot<const SOURCES: usize, F: FnMut(Universe, SourceCid)>(
    slot: &mut UniverseSources<SOURCES>,
    timeout_millis: u64,
    now_millis: u64,
    on_evict: &mut F,
) -> u32 {
    let mut evicted = 0;
    let mut index = 0;

    while index < slot.entries.len() {
        if now_millis.saturating_sub(slot.entries[index].last_seen_millis) > timeout_millis {
            let entry = slot.entries.swap_remove(index);
            on_evict(slot.universe, entry.cid);
            evicted += 1;
        } else {
            index += 1;
        }
    }

    evicted
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: u32 = 2500;

    fn cid(value: u8) -> SourceCid {
        SourceCid::new([value; 16])
    }

    fn universe(value: u16) -> Universe {
        Universe::new(value).unwrap()
    }

    fn table() -> SourceTable<4, 4> {
        let mut table = SourceTable::new(TIMEOUT);
        table.add_universe(universe(1)).unwrap();
        table
    }

    fn admit_data(
        table: &mut SourceTable<4, 4>,
        cid_value: u8,
        sequence_number: u8,
        data: &[u8],
        now_millis: u64,
    ) -> AdmitResult {
        table.admit(
            universe(1),
            cid(cid_value),
            Priority::default(),
            sequence_number,
            data,
            false,
            now_millis,
        )
    }

    #[test]
    fn test_admit_creates_and_updates() {
        let mut table = table();

        assert_eq!(
            admit_data(&mut table, 1, 10, &[1, 2, 3], 0),
            AdmitResult::NewSource
        );
        assert_eq!(
            admit_data(&mut table, 1, 11, &[4, 5, 6], 50),
            AdmitResult::Updated
        );

        let entries = table.entries_for(universe(1));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data.as_slice(), &[4, 5, 6]);
        assert_eq!(entries[0].sequence_number, 11);
        assert_eq!(entries[0].last_seen_millis, 50);
    }

    #[test]
    fn test_sequence_window_bounds() {
        let mut next = table();
        admit_data(&mut next, 1, 10, &[0], 0);
        assert_eq!(admit_data(&mut next, 1, 11, &[0], 0), AdmitResult::Updated);

        let mut edge = table();
        admit_data(&mut edge, 1, 10, &[0], 0);
        assert_eq!(admit_data(&mut edge, 1, 106, &[0], 0), AdmitResult::Updated);

        let mut past_edge = table();
        admit_data(&mut past_edge, 1, 10, &[0], 0);
        assert_eq!(
            admit_data(&mut past_edge, 1, 107, &[0], 0),
            AdmitResult::OutOfOrder
        );

        let mut stale = table();
        admit_data(&mut stale, 1, 10, &[0], 0);
        assert_eq!(
            admit_data(&mut stale, 1, 10, &[0], 0),
            AdmitResult::OutOfOrder
        );
        assert_eq!(admit_data(&mut stale, 1, 9, &[0], 0), AdmitResult::OutOfOrder);
    }

    #[test]
    fn test_sequence_wraps_around() {
        let mut table = table();
        admit_data(&mut table, 1, 255, &[0], 0);

        assert_eq!(admit_data(&mut table, 1, 0, &[0], 0), AdmitResult::Updated);
    }

    #[test]
    fn test_rejected_packet_leaves_entry_untouched() {
        let mut table = table();
        admit_data(&mut table, 1, 10, &[1, 2, 3], 100);

        assert_eq!(
            admit_data(&mut table, 1, 9, &[9, 9, 9], 2000),
            AdmitResult::OutOfOrder
        );

        let entries = table.entries_for(universe(1));
        assert_eq!(entries[0].data.as_slice(), &[1, 2, 3]);
        assert_eq!(entries[0].sequence_number, 10);
        assert_eq!(entries[0].last_seen_millis, 100);
    }

    #[test]
    fn test_admit_updates_priority() {
        let mut table = table();
        table.admit(
            universe(1),
            cid(1),
            Priority::new(100).unwrap(),
            10,
            &[0],
            false,
            0,
        );
        table.admit(
            universe(1),
            cid(1),
            Priority::new(150).unwrap(),
            11,
            &[0],
            false,
            0,
        );

        assert_eq!(
            table.entries_for(universe(1))[0].priority,
            Priority::new(150).unwrap()
        );
    }

    #[test]
    fn test_admit_unknown_universe() {
        let mut table = table();

        assert_eq!(
            table.admit(universe(2), cid(1), Priority::default(), 0, &[0], false, 0),
            AdmitResult::UnknownUniverse
        );
    }

    #[test]
    fn test_table_full() {
        let mut table: SourceTable<1, 2> = SourceTable::new(TIMEOUT);
        table.add_universe(universe(1)).unwrap();

        table.admit(universe(1), cid(1), Priority::default(), 0, &[0], false, 0);
        table.admit(universe(1), cid(2), Priority::default(), 0, &[0], false, 0);

        assert_eq!(
            table.admit(universe(1), cid(3), Priority::default(), 0, &[0], false, 0),
            AdmitResult::TableFull
        );
        assert_eq!(table.entries_for(universe(1)).len(), 2);
    }

    #[test]
    fn test_add_universe_failure() {
        let mut table: SourceTable<1, 4> = SourceTable::new(TIMEOUT);
        table.add_universe(universe(1)).unwrap();

        assert_eq!(
            table.add_universe(universe(1)).unwrap_err(),
            ConfigError::DuplicateUniverse
        );
        assert_eq!(
            table.add_universe(universe(2)).unwrap_err(),
            ConfigError::TooManyUniverses
        );
    }

    #[test]
    fn test_expire_removes_stale_entries() {
        let mut table = table();
        admit_data(&mut table, 1, 10, &[1], 0);
        admit_data(&mut table, 2, 20, &[2], 2000);

        let mut evicted = std::vec::Vec::new();
        let count = table.expire(2501, |universe, cid| evicted.push((universe, cid)));

        assert_eq!(count, 1);
        assert_eq!(evicted, [(universe(1), cid(1))]);

        let entries = table.entries_for(universe(1));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cid, cid(2));
    }

    #[test]
    fn test_expire_exactly_at_timeout_keeps_entry() {
        let mut table = table();
        admit_data(&mut table, 1, 10, &[1], 0);

        assert_eq!(table.expire(2500, |_, _| {}), 0);
        assert_eq!(table.entries_for(universe(1)).len(), 1);
    }

    #[test]
    fn test_expire_universe_frees_slot() {
        let mut table: SourceTable<1, 1> = SourceTable::new(TIMEOUT);
        table.add_universe(universe(1)).unwrap();
        table.admit(universe(1), cid(1), Priority::default(), 0, &[0], false, 0);

        assert_eq!(
            table.admit(
                universe(1),
                cid(2),
                Priority::default(),
                0,
                &[0],
                false,
                5000
            ),
            AdmitResult::TableFull
        );

        table.expire_universe(universe(1), 5000, |_, _| {});
        assert_eq!(
            table.admit(
                universe(1),
                cid(2),
                Priority::default(),
                0,
                &[0],
                false,
                5000
            ),
            AdmitResult::NewSource
        );
    }

    #[test]
    fn test_terminated_lifecycle() {
        let mut table = table();
        admit_data(&mut table, 1, 10, &[1], 0);

        assert_eq!(
            table.admit(universe(1), cid(1), Priority::default(), 11, &[1], true, 10),
            AdmitResult::Terminated
        );
        assert!(table.entries_for(universe(1))[0].terminated);

        assert_eq!(table.sweep_terminated(universe(1)), 1);
        assert!(table.entries_for(universe(1)).is_empty());

        // termination of an untracked sender creates nothing
        assert_eq!(
            table.admit(universe(1), cid(1), Priority::default(), 12, &[1], true, 20),
            AdmitResult::Terminated
        );
        assert!(table.entries_for(universe(1)).is_empty());
    }

    #[test]
    fn test_stale_termination_is_rejected() {
        let mut table = table();
        admit_data(&mut table, 1, 200, &[5], 0);

        assert_eq!(
            table.admit(universe(1), cid(1), Priority::default(), 150, &[], true, 10),
            AdmitResult::OutOfOrder
        );
        assert!(!table.entries_for(universe(1))[0].terminated);

        assert_eq!(
            table.admit(universe(1), cid(1), Priority::default(), 201, &[], true, 20),
            AdmitResult::Terminated
        );
        assert!(table.entries_for(universe(1))[0].terminated);
    }
}

use crate::merge::MergedFrame;
use crate::types::Universe;

/// Object to implement the physical output behind a universe,
/// for example a DMX driver or a monitor.
pub trait OutputSink {
    type SinkError;

    /// Take over the freshly merged frame of a universe.
    fn set_output(
        &mut self,
        universe: Universe,
        frame: &MergedFrame,
    ) -> Result<(), Self::SinkError>;
}

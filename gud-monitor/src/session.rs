//! Capture loop
//!
//! Pulls records from an [`EventSource`] until it reports cancellation,
//! pairs them into URBs and hands every observation to a callback.

use log::debug;

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::reconstruct::{Anomaly, Observation, Reconstructor};
use crate::stats::Stats;
use crate::urb::{Paired, UrbPairer};
use crate::usbmon::{EventSource, Fetch, Record};

pub struct Session<S> {
    source: S,
    pairer: UrbPairer,
    reconstructor: Reconstructor,
}

impl<S: EventSource> Session<S> {
    pub fn new(source: S, config: &MonitorConfig) -> Self {
        Self::with_reconstructor(source, Reconstructor::new(config))
    }

    pub fn with_reconstructor(source: S, reconstructor: Reconstructor) -> Self {
        Self {
            source,
            pairer: UrbPairer::new(),
            reconstructor,
        }
    }

    /// Run until cancelled, then resolve open transfers
    pub fn run(&mut self, mut sink: impl FnMut(&Observation)) -> Result<()> {
        loop {
            match self.source.next_event()? {
                Fetch::Event(record) => self.handle(record, &mut sink),
                Fetch::Cancelled => break,
            }
        }
        debug!("capture ended, {} records unpaired", self.pairer.pending());
        for observation in self.reconstructor.finish() {
            sink(&observation);
        }
        Ok(())
    }

    fn handle(&mut self, record: Record, sink: &mut impl FnMut(&Observation)) {
        match self.pairer.push(record) {
            Paired::Urb(urb) => {
                debug!("{}", urb);
                for observation in self.reconstructor.push(urb) {
                    sink(&observation);
                }
            }
            Paired::Dropped(dropped) => {
                let kernel_dropped = self.source.dropped();
                for record in dropped {
                    sink(&Observation::Anomaly(Anomaly::Dropped {
                        record,
                        kernel_dropped,
                    }));
                }
            }
            Paired::Pending | Paired::Skipped => {}
        }
    }

    pub fn stats(&self) -> &Stats {
        self.reconstructor.stats()
    }

    pub fn into_stats(self) -> Stats {
        self.reconstructor.into_stats()
    }
}

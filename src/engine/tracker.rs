//! Pass bookkeeping for the clustering engine
//!
//! Every input change asks for a pass and gets the next sequence number. At
//! most one pass runs at a time; changes arriving meanwhile only move the
//! tracker to `Stale` and remember the newest number. When the running pass
//! reports back its result is either published or dropped, and a dropped
//! result restarts with the newest inputs. Nothing is ever queued beyond
//! that single restart.

/// Where the engine stands with respect to clustering passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassState {
    #[default]
    Idle,
    Computing { seq: u64 },
    /// `running` is still in flight but `latest` superseded it
    Stale { running: u64, latest: u64 },
}

/// What to do with the result of a finished pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Publish,
    /// Drop the result; start `restart` if it is set
    Discard { restart: Option<u64> },
}

#[derive(Debug, Default)]
pub struct PassTracker {
    state: PassState,
    issued: u64,
}

impl PassTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state() == PassState::Idle
    }

    /// Sequence number of the newest request
    pub fn latest(&self) -> u64 {
        self.issued
    }

    /// Registers an input change
    ///
    /// Returns the sequence number of a pass to start right away, or `None`
    /// when a pass is already running and the change has to wait for it.
    pub fn request(&mut self) -> Option<u64> {
        self.issued += 1;
        let latest = self.issued;

        match self.state() {
            PassState::Idle => {
                self.state = PassState::Computing { seq: latest };
                Some(latest)
            }
            PassState::Computing { seq: running } | PassState::Stale { running, .. } => {
                self.state = PassState::Stale { running, latest };
                None
            }
        }
    }

    /// Reports the result of pass `seq`
    pub fn complete(&mut self, seq: u64) -> Completion {
        match self.state() {
            PassState::Computing { seq: running } if running == seq => {
                self.state = PassState::Idle;
                Completion::Publish
            }
            PassState::Stale { running, latest } if running == seq => {
                self.state = PassState::Computing { seq: latest };
                Completion::Discard {
                    restart: Some(latest),
                }
            }
            // a pass the tracker no longer waits for
            _ => Completion::Discard { restart: None },
        }
    }
}

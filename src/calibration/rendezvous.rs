//! Cross-thread handshake for operator-drawn regions.
//!
//! The routine thread posts a prompt into a single slot and blocks on a
//! one-shot channel. The operator side (live display, console, ...) reads
//! the prompt and answers with a region. Cancellation is the only other way
//! out; there is no timeout because the wait depends on a human.

use std::sync::mpsc::{sync_channel, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::detection::Region;
use crate::error::CalibrationError;
use crate::runtime::{CancelToken, WAIT_INCREMENT};

struct PendingRequest {
    id: u64,
    prompt: String,
    reply: SyncSender<Region>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingRequest>,
    next_id: u64,
}

/// Routine-side handle.
#[derive(Clone)]
pub struct CalibrationRequester {
    slot: Arc<Mutex<Slot>>,
}

/// Operator-side handle.
#[derive(Clone)]
pub struct CalibrationDesk {
    slot: Arc<Mutex<Slot>>,
}

/// Creates a connected requester/desk pair.
pub fn calibration_channel() -> (CalibrationRequester, CalibrationDesk) {
    let slot = Arc::new(Mutex::new(Slot::default()));
    (
        CalibrationRequester { slot: slot.clone() },
        CalibrationDesk { slot },
    )
}

impl CalibrationRequester {
    /// Asks the operator for a region and blocks until one is supplied.
    ///
    /// If `cancel` is set first, returns [`Region::DEGENERATE`] (0,0,1,1)
    /// instead of failing. Callers must check `cancel` immediately after
    /// this returns; the degenerate region is not a real answer.
    pub fn request_region(&self, prompt: &str, cancel: &CancelToken) -> Region {
        if cancel.is_cancelled() {
            return Region::DEGENERATE;
        }

        let (reply, response) = sync_channel(1);
        let id = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.next_id += 1;
            let id = slot.next_id;
            slot.pending = Some(PendingRequest {
                id,
                prompt: prompt.to_string(),
                reply,
            });
            id
        };

        loop {
            if cancel.is_cancelled() {
                self.withdraw(id);
                return Region::DEGENERATE;
            }
            match response.recv_timeout(WAIT_INCREMENT) {
                Ok(region) => return region,
                Err(RecvTimeoutError::Timeout) => continue,
                // Only reachable if the request was withdrawn from elsewhere
                Err(RecvTimeoutError::Disconnected) => return Region::DEGENERATE,
            }
        }
    }

    fn withdraw(&self, id: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.pending.as_ref().is_some_and(|p| p.id == id) {
            slot.pending = None;
        }
    }
}

impl CalibrationDesk {
    /// Prompt of the request currently waiting for an answer.
    pub fn pending_prompt(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .as_ref()
            .map(|p| p.prompt.clone())
    }

    pub fn has_pending(&self) -> bool {
        self.pending_prompt().is_some()
    }

    /// Answers the waiting request with `region`.
    ///
    /// An empty region is refused and the request stays pending.
    pub fn respond(&self, region: Region) -> Result<(), CalibrationError> {
        if region.width == 0 || region.height == 0 {
            return Err(CalibrationError::EmptyRegion(region));
        }
        let pending = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .take()
            .ok_or(CalibrationError::NoPendingRequest)?;

        // The channel has room for exactly one reply; the requester may
        // already have given up, which is fine.
        let _ = pending.reply.try_send(region);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for_prompt(desk: &CalibrationDesk) -> String {
        let start = Instant::now();
        loop {
            if let Some(prompt) = desk.pending_prompt() {
                return prompt;
            }
            assert!(start.elapsed() < Duration::from_secs(5), "no request arrived");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_operator_response_is_returned() {
        let (requester, desk) = calibration_channel();
        let cancel = CancelToken::new();

        let handle = thread::spawn(move || requester.request_region("Draw over the sprite", &cancel));

        assert_eq!(wait_for_prompt(&desk), "Draw over the sprite");
        desk.respond(Region::new(12, 34, 56, 78)).unwrap();

        assert_eq!(handle.join().unwrap(), Region::new(12, 34, 56, 78));
        assert!(!desk.has_pending());
    }

    #[test]
    fn test_cancel_before_response_returns_degenerate_region() {
        let (requester, desk) = calibration_channel();
        let cancel = CancelToken::new();
        let routine_cancel = cancel.clone();

        let handle = thread::spawn(move || {
            let region = requester.request_region("Draw a region", &routine_cancel);
            // Callers must check the signal right after the call returns
            (region, routine_cancel.is_cancelled())
        });

        wait_for_prompt(&desk);
        cancel.cancel();

        let (region, cancelled) = handle.join().unwrap();
        assert_eq!(region, Region::DEGENERATE);
        assert_eq!(region, Region::new(0, 0, 1, 1));
        assert!(cancelled);
        assert!(!desk.has_pending());
        assert!(matches!(
            desk.respond(Region::new(1, 1, 1, 1)),
            Err(CalibrationError::NoPendingRequest)
        ));
    }

    #[test]
    fn test_already_cancelled_returns_without_posting() {
        let (requester, desk) = calibration_channel();
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(requester.request_region("ignored", &cancel), Region::DEGENERATE);
        assert!(!desk.has_pending());
    }

    #[test]
    fn test_respond_without_request_fails() {
        let (_requester, desk) = calibration_channel();
        assert!(matches!(
            desk.respond(Region::new(0, 0, 5, 5)),
            Err(CalibrationError::NoPendingRequest)
        ));
    }

    #[test]
    fn test_empty_region_is_refused_and_request_stays_pending() {
        let (requester, desk) = calibration_channel();
        let cancel = CancelToken::new();

        let handle = thread::spawn(move || requester.request_region("Draw a region", &cancel));
        wait_for_prompt(&desk);

        for empty in [Region::new(5, 5, 0, 4), Region::new(5, 5, 4, 0)] {
            assert!(matches!(
                desk.respond(empty),
                Err(CalibrationError::EmptyRegion(r)) if r == empty
            ));
            assert!(desk.has_pending());
        }

        desk.respond(Region::new(5, 5, 4, 4)).unwrap();
        assert_eq!(handle.join().unwrap(), Region::new(5, 5, 4, 4));
    }

    #[test]
    fn test_sequential_requests() {
        let (requester, desk) = calibration_channel();
        let cancel = CancelToken::new();

        let handle = thread::spawn(move || {
            (1..=3)
                .map(|i| requester.request_region(&format!("Starter {}/3", i), &cancel))
                .collect::<Vec<_>>()
        });

        for i in 1..=3u32 {
            assert_eq!(wait_for_prompt(&desk), format!("Starter {}/3", i));
            desk.respond(Region::new(i * 10, 0, 8, 8)).unwrap();
        }

        assert_eq!(
            handle.join().unwrap(),
            vec![
                Region::new(10, 0, 8, 8),
                Region::new(20, 0, 8, 8),
                Region::new(30, 0, 8, 8)
            ]
        );
    }
}

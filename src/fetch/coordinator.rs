//! Gates outbound fetches: at most one request per direction, tagged with
//! the file generation so late answers for a previous file are recognisable.

use super::{CancelToken, DirectionStatus, FetchRequest, RequestId};
use crate::chunk::Direction;
use crate::error::{StaleResponse, TransportError};
use crate::record::LogFile;

#[derive(Debug)]
struct InFlight {
    id: RequestId,
    cancel: CancelToken,
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: Option<InFlight>,
    status: DirectionStatus,
}

#[derive(Debug, Default)]
pub struct FetchCoordinator {
    epoch: u64,
    next_id: u64,
    slots: [Slot; 2],
}

impl FetchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_in_flight(&self, direction: Direction) -> bool {
        self.slots[direction.index()].in_flight.is_some()
    }

    pub fn any_in_flight(&self) -> bool {
        Direction::BOTH.iter().any(|&d| self.is_in_flight(d))
    }

    pub fn status(&self, direction: Direction) -> &DirectionStatus {
        &self.slots[direction.index()].status
    }

    /// Issue a request for `direction` unless one is already in flight or
    /// the edge has reached its boundary.
    pub fn issue(
        &mut self,
        file: &LogFile,
        direction: Direction,
        anchor: Option<u64>,
        limit: usize,
        reached: bool,
    ) -> Option<FetchRequest> {
        let slot = &mut self.slots[direction.index()];
        if reached || slot.in_flight.is_some() {
            return None;
        }

        self.next_id += 1;
        let id = RequestId(self.next_id);
        let cancel = CancelToken::new();
        slot.in_flight = Some(InFlight {
            id,
            cancel: cancel.clone(),
        });
        slot.status = DirectionStatus::Pending;

        Some(FetchRequest {
            id,
            epoch: self.epoch,
            file: file.clone(),
            direction,
            anchor,
            limit,
            cancel,
        })
    }

    /// Release the slot held by `request` if the response is still wanted.
    ///
    /// Responses from an earlier epoch or for a request that no longer holds
    /// the slot leave the slot alone. A response for an edge whose boundary
    /// has since been reached releases the slot but is still stale.
    pub fn accept(&mut self, request: &FetchRequest, reached: bool) -> Result<(), StaleResponse> {
        self.release(request)?;
        self.slots[request.direction.index()].status = DirectionStatus::Idle;
        if reached {
            return Err(StaleResponse::ForeclosedBoundary(request.direction));
        }
        Ok(())
    }

    /// Record a transport failure for `request` and release its slot.
    pub fn fail(
        &mut self,
        request: &FetchRequest,
        error: TransportError,
    ) -> Result<(), StaleResponse> {
        self.release(request)?;
        self.slots[request.direction.index()].status = DirectionStatus::Error(error);
        Ok(())
    }

    /// Cancel every in-flight request and start a new file generation.
    pub fn cancel_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(in_flight) = slot.in_flight.take() {
                in_flight.cancel.cancel();
            }
            slot.status = DirectionStatus::Idle;
        }
        self.epoch += 1;
    }

    fn release(&mut self, request: &FetchRequest) -> Result<(), StaleResponse> {
        if request.epoch != self.epoch {
            return Err(StaleResponse::SupersededFile);
        }
        let slot = &mut self.slots[request.direction.index()];
        match &slot.in_flight {
            Some(in_flight) if in_flight.id == request.id => {
                slot.in_flight = None;
                Ok(())
            }
            _ => Err(StaleResponse::UnknownRequest),
        }
    }
}

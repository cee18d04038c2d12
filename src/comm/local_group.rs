//! In-process worker group backed by shared rendezvous cells.
//!
//! Simulates a fixed-size collective group with one thread per worker.
//! Each collective primitive is a round on an [`ExchangeCell`]: every
//! member contributes under a lock, the last contributor completes the
//! round, and every member reads the combined payload before the cell
//! resets for the next round.
//!
//! This backend serves two roles: the testing fake for the training core,
//! and the shipped multi-worker backend for single-host runs where workers
//! are threads rather than processes. The lockstep contract of
//! [`Communicator`] applies unchanged: all members must issue the same
//! collectives in the same order or the group blocks forever.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

use super::communicator::{CommError, Communicator};

struct CellState<V> {
    slot: Option<V>,
    contributed: usize,
    drained: usize,
    round: u64,
    fault: Option<CommError>,
}

/// A reusable rendezvous slot for one collective primitive.
///
/// A round has two phases: all `world` members contribute (merging into
/// `slot`), then all members drain a clone of the combined payload. The
/// cell resets when the last member drains. A contribution error poisons
/// the round for every member instead of hanging or corrupting it.
struct ExchangeCell<V> {
    world: usize,
    state: Mutex<CellState<V>>,
    ready: Condvar,
}

impl<V: Clone> ExchangeCell<V> {
    fn new(world: usize) -> Self {
        Self {
            world,
            state: Mutex::new(CellState {
                slot: None,
                contributed: 0,
                drained: 0,
                round: 0,
                fault: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Run one collective round. Blocks until all `world` members have
    /// called `exchange` for this round.
    fn exchange<F>(&self, contribute: F) -> Result<V, CommError>
    where
        F: FnOnce(&mut Option<V>) -> Result<(), CommError>,
    {
        let mut state = self.state.lock();

        // A member may arrive for the next round while stragglers from the
        // previous one are still draining.
        while state.drained > 0 {
            self.ready.wait(&mut state);
        }

        if let Err(fault) = contribute(&mut state.slot) {
            state.fault.get_or_insert(fault);
        }
        state.contributed += 1;

        let round = state.round;
        if state.contributed == self.world {
            state.round = state.round.wrapping_add(1);
            self.ready.notify_all();
        } else {
            while state.round == round {
                self.ready.wait(&mut state);
            }
        }

        let result = match &state.fault {
            Some(fault) => Err(fault.clone()),
            None => match &state.slot {
                Some(value) => Ok(value.clone()),
                None => Err(CommError::MissingPayload),
            },
        };

        state.drained += 1;
        if state.drained == self.world {
            state.slot = None;
            state.contributed = 0;
            state.drained = 0;
            state.fault = None;
            self.ready.notify_all();
        }

        result
    }
}

struct GroupShared {
    world: usize,
    reduce: ExchangeCell<Vec<f32>>,
    scalar: ExchangeCell<f64>,
    bcast: ExchangeCell<Vec<f32>>,
}

/// One worker's handle into an in-process group.
///
/// Handles are created together by [`local_group`] and moved onto their
/// worker threads. Cloning a handle keeps the same rank; the clone must
/// not issue collectives concurrently with the original.
#[derive(Clone)]
pub struct LocalComm {
    rank: usize,
    shared: Arc<GroupShared>,
}

/// Create the communicator handles for an in-process group of
/// `world_size` workers, one handle per rank in rank order.
pub fn local_group(world_size: usize) -> Vec<LocalComm> {
    let shared = Arc::new(GroupShared {
        world: world_size,
        reduce: ExchangeCell::new(world_size),
        scalar: ExchangeCell::new(world_size),
        bcast: ExchangeCell::new(world_size),
    });
    (0..world_size)
        .map(|rank| LocalComm {
            rank,
            shared: Arc::clone(&shared),
        })
        .collect()
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.world
    }

    fn allreduce_sum(&self, buf: &mut [f32]) -> Result<(), CommError> {
        if self.shared.world == 1 {
            return Ok(());
        }
        let combined = self.shared.reduce.exchange(|slot| match slot {
            None => {
                *slot = Some(buf.to_vec());
                Ok(())
            }
            Some(acc) => {
                if acc.len() != buf.len() {
                    return Err(CommError::Mismatch {
                        expected: acc.len(),
                        got: buf.len(),
                    });
                }
                for (a, b) in acc.iter_mut().zip(buf.iter()) {
                    *a += *b;
                }
                Ok(())
            }
        })?;
        buf.copy_from_slice(&combined);
        Ok(())
    }

    fn allreduce_scalar(&self, value: f64) -> Result<f64, CommError> {
        if self.shared.world == 1 {
            return Ok(value);
        }
        self.shared.scalar.exchange(|slot| {
            match slot {
                None => *slot = Some(value),
                Some(acc) => *acc += value,
            }
            Ok(())
        })
    }

    fn broadcast(&self, root: usize, buf: &mut [f32]) -> Result<(), CommError> {
        let world = self.shared.world;
        if root >= world {
            return Err(CommError::InvalidRoot { root, size: world });
        }
        if world == 1 {
            return Ok(());
        }
        let expected = buf.len();
        let payload = self.shared.bcast.exchange(|slot| {
            if self.rank == root {
                *slot = Some(buf.to_vec());
            }
            Ok(())
        })?;
        if payload.len() != expected {
            return Err(CommError::Mismatch {
                expected,
                got: payload.len(),
            });
        }
        if self.rank != root {
            buf.copy_from_slice(&payload);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn two_workers_allreduce_sums() {
        let comms = local_group(2);
        let results: Vec<Vec<f32>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .enumerate()
                .map(|(i, comm)| {
                    scope.spawn(move || {
                        let mut buf = if i == 0 {
                            vec![1.0, 2.0, 3.0]
                        } else {
                            vec![10.0, 20.0, 30.0]
                        };
                        comm.allreduce_sum(&mut buf).unwrap();
                        buf
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results[0], vec![11.0, 22.0, 33.0]);
        assert_eq!(results[1], vec![11.0, 22.0, 33.0]);
    }

    #[test]
    fn three_workers_scalar_allreduce() {
        let comms = local_group(3);
        let results: Vec<f64> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .enumerate()
                .map(|(i, comm)| scope.spawn(move || comm.allreduce_scalar(i as f64 + 1.0).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results, vec![6.0, 6.0, 6.0]);
    }

    #[test]
    fn broadcast_overwrites_non_root() {
        let comms = local_group(3);
        let results: Vec<Vec<f32>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .enumerate()
                .map(|(i, comm)| {
                    scope.spawn(move || {
                        let mut buf = if i == 0 {
                            vec![5.0, -1.0]
                        } else {
                            vec![0.0, 0.0]
                        };
                        comm.broadcast(0, &mut buf).unwrap();
                        buf
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for buf in results {
            assert_eq!(buf, vec![5.0, -1.0]);
        }
    }

    #[test]
    fn repeated_rounds_reset_cleanly() {
        let comms = local_group(2);
        let results: Vec<Vec<f32>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .enumerate()
                .map(|(i, comm)| {
                    scope.spawn(move || {
                        let mut out = Vec::new();
                        for step in 0..5 {
                            let mut buf = vec![(i + 1) as f32 * (step + 1) as f32];
                            comm.allreduce_sum(&mut buf).unwrap();
                            out.push(buf[0]);
                        }
                        out
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        // Per step: (step+1) + 2*(step+1) = 3*(step+1).
        assert_eq!(results[0], vec![3.0, 6.0, 9.0, 12.0, 15.0]);
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn length_mismatch_fails_the_whole_round() {
        let comms = local_group(2);
        let results: Vec<Result<(), CommError>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .enumerate()
                .map(|(i, comm)| {
                    scope.spawn(move || {
                        let mut buf = vec![0.0f32; if i == 0 { 3 } else { 5 }];
                        comm.allreduce_sum(&mut buf)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for result in results {
            assert!(matches!(result, Err(CommError::Mismatch { .. })));
        }
    }

    #[test]
    fn broadcast_rejects_root_outside_group() {
        let comms = local_group(2);
        let mut buf = vec![0.0];
        assert_eq!(
            comms[0].broadcast(7, &mut buf),
            Err(CommError::InvalidRoot { root: 7, size: 2 })
        );
    }

    #[test]
    fn ranks_are_assigned_in_order() {
        let comms = local_group(4);
        for (i, comm) in comms.iter().enumerate() {
            assert_eq!(comm.rank(), i);
            assert_eq!(comm.size(), 4);
        }
        assert!(comms[0].is_root());
        assert!(!comms[3].is_root());
    }
}
